//! User key material.

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::{Error, Result};

/// Length of a user key in bytes.
pub const USER_KEY_LEN: usize = 32;

/// The key every non-custom profile uses.
pub const DEFAULT_USER_KEY: [u8; USER_KEY_LEN] = [
    0x13, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0xB4, 0x00, 0x00, 0x00,
    0x1B, 0x00, 0x00, 0x00, 0x0F, 0x00, 0x00, 0x00, 0x33, 0x00, 0x00, 0x00, 0x52, 0x00, 0x00, 0x00,
];

/// A user key for archive encryption.
///
/// The bytes are wiped from memory when the key is dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct UserKey {
    inner: Zeroizing<[u8; USER_KEY_LEN]>,
}

impl UserKey {
    /// Creates a key from raw bytes.
    pub fn new(bytes: [u8; USER_KEY_LEN]) -> Self {
        Self {
            inner: Zeroizing::new(bytes),
        }
    }

    /// Returns the default key shared by the built-in profiles.
    pub fn default_key() -> Self {
        Self::new(DEFAULT_USER_KEY)
    }

    /// Parses a key from hex, ignoring whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] unless the input decodes to exactly
    /// [`USER_KEY_LEN`] bytes.
    pub fn from_hex(text: &str) -> Result<Self> {
        let bytes = Zeroizing::new(parse_hex(text)?);
        let array: [u8; USER_KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
            Error::InvalidKey(format!(
                "user key must be {} bytes, got {}",
                USER_KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self::new(array))
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; USER_KEY_LEN] {
        &self.inner
    }

    /// Returns true if this is the default key.
    pub fn is_default(&self) -> bool {
        *self.inner == DEFAULT_USER_KEY
    }

    /// Returns a SHA-256 fingerprint that identifies the key without exposing it.
    pub fn fingerprint(&self) -> [u8; 32] {
        Sha256::digest(self.inner.as_slice()).into()
    }
}

impl Default for UserKey {
    fn default() -> Self {
        Self::default_key()
    }
}

impl std::fmt::Debug for UserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Don't expose key bytes in debug output
        let fp = self.fingerprint();
        f.debug_struct("UserKey")
            .field("default", &self.is_default())
            .field(
                "fingerprint",
                &format_args!("{:02x}{:02x}{:02x}{:02x}", fp[0], fp[1], fp[2], fp[3]),
            )
            .finish()
    }
}

/// Decodes a hex string, skipping ASCII whitespace and an optional `0x` prefix.
pub(crate) fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    let digits: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    if digits.len() % 2 != 0 {
        return Err(Error::InvalidKey("odd number of hex digits".into()));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let hi = hex_value(pair[0])?;
            let lo = hex_value(pair[1])?;
            Ok((hi << 4) | lo)
        })
        .collect()
}

fn hex_value(digit: u8) -> Result<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        _ => Err(Error::InvalidKey(format!(
            "'{}' is not a hex digit",
            digit as char
        ))),
    }
}
