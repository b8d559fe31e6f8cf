//! Encryption profiles and their resolution.
//!
//! A profile is the combination of cipher scheme, IV and user key used to
//! serialize an archive. The built-in schemes are pure lookups; the custom
//! scheme asks a [`KeyPrompt`] for its key and installs it in the
//! process-wide [`KeyTable`](crate::crypto::KeyTable) before anything is
//! written.
//!
//! # Example
//!
//! ```rust
//! use wzsave::crypto::KeyTable;
//! use wzsave::profile::{EncryptionProfile, NoPrompt, ProfileId, ProfileSelection};
//!
//! let table = KeyTable::new();
//! let mut lease = table.lease();
//! let profile = EncryptionProfile::resolve(ProfileSelection::Gms, &mut NoPrompt, &mut lease)?;
//! assert_eq!(profile.id(), ProfileId::Gms);
//! assert_eq!(profile.iv(), [0x4D, 0x23, 0xC7, 0x2B]);
//! # Ok::<(), wzsave::Error>(())
//! ```

use std::fmt;
use std::str::FromStr;

use crate::crypto::{Keystream, KeyTableLease, UserKey, parse_hex};
use crate::{Error, Result};

/// IV of the global-region scheme.
pub const GMS_IV: [u8; 4] = [0x4D, 0x23, 0xC7, 0x2B];
/// IV of the Europe/SEA-region scheme.
pub const EMS_IV: [u8; 4] = [0xB9, 0x7D, 0x63, 0xE9];
/// IV of the unencrypted scheme.
pub const BMS_IV: [u8; 4] = [0x00, 0x00, 0x00, 0x00];

/// Identifies a cipher scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileId {
    /// Global-region cipher.
    Gms,
    /// Europe and SEA-region cipher.
    Ems,
    /// Unencrypted (zero IV). Loose data units conventionally use this.
    Bms,
    /// User-supplied IV and key.
    Custom,
}

impl ProfileId {
    /// Returns the lowercase name used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileId::Gms => "gms",
            ProfileId::Ems => "ems",
            ProfileId::Bms => "bms",
            ProfileId::Custom => "custom",
        }
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user picked in the save dialog.
///
/// Resolving a selection yields an [`EncryptionProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileSelection {
    /// Global-region cipher.
    Gms,
    /// Europe and SEA-region cipher.
    Ems,
    /// Unencrypted.
    Bms,
    /// Prompt for a custom IV and key.
    Custom,
}

impl ProfileSelection {
    /// All selections, in the order the save dialog lists them.
    pub const ALL: [ProfileSelection; 4] = [
        ProfileSelection::Gms,
        ProfileSelection::Ems,
        ProfileSelection::Bms,
        ProfileSelection::Custom,
    ];

    /// Returns the profile id this selection resolves to.
    pub fn id(&self) -> ProfileId {
        match self {
            ProfileSelection::Gms => ProfileId::Gms,
            ProfileSelection::Ems => ProfileId::Ems,
            ProfileSelection::Bms => ProfileId::Bms,
            ProfileSelection::Custom => ProfileId::Custom,
        }
    }
}

impl From<ProfileId> for ProfileSelection {
    fn from(id: ProfileId) -> Self {
        match id {
            ProfileId::Gms => ProfileSelection::Gms,
            ProfileId::Ems => ProfileSelection::Ems,
            ProfileId::Bms => ProfileSelection::Bms,
            ProfileId::Custom => ProfileSelection::Custom,
        }
    }
}

impl FromStr for ProfileSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ProfileSelection::ALL
            .into_iter()
            .find(|sel| sel.id().as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidKey(format!("unknown encryption scheme '{}'", s)))
    }
}

impl fmt::Display for ProfileSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id().as_str())
    }
}

/// A custom IV and key entered by the user.
#[derive(Debug, Clone)]
pub struct CustomKey {
    /// The 4-byte IV.
    pub iv: [u8; 4],
    /// The user key.
    pub user_key: UserKey,
}

impl CustomKey {
    /// Creates a custom key.
    pub fn new(iv: [u8; 4], user_key: UserKey) -> Self {
        Self { iv, user_key }
    }

    /// Parses a custom key from hex strings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the IV is not 4 bytes or the key is
    /// not 32 bytes.
    pub fn from_hex(iv: &str, user_key: &str) -> Result<Self> {
        let iv_bytes = parse_hex(iv)?;
        let iv: [u8; 4] = iv_bytes.as_slice().try_into().map_err(|_| {
            Error::InvalidKey(format!("IV must be 4 bytes, got {}", iv_bytes.len()))
        })?;
        Ok(Self::new(iv, UserKey::from_hex(user_key)?))
    }
}

/// Source of custom keys, usually a key-entry dialog.
pub trait KeyPrompt {
    /// Asks the user for a custom key.
    ///
    /// Returns `None` if the user cancelled.
    fn prompt_custom_key(&mut self) -> Option<CustomKey>;
}

impl<F> KeyPrompt for F
where
    F: FnMut() -> Option<CustomKey>,
{
    fn prompt_custom_key(&mut self) -> Option<CustomKey> {
        self()
    }
}

/// A prompt that always cancels.
///
/// Suitable for headless callers that never save under a custom profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl KeyPrompt for NoPrompt {
    fn prompt_custom_key(&mut self) -> Option<CustomKey> {
        None
    }
}

/// A prompt that always answers with a fixed key.
#[derive(Debug, Clone)]
pub struct FixedPrompt(pub CustomKey);

impl KeyPrompt for FixedPrompt {
    fn prompt_custom_key(&mut self) -> Option<CustomKey> {
        Some(self.0.clone())
    }
}

/// A resolved cipher scheme: IV, key policy and the key itself.
///
/// Immutable once resolved. Profiles are passed explicitly through the save
/// pipeline so nothing downstream re-reads the global key table.
#[derive(Debug, Clone)]
pub struct EncryptionProfile {
    id: ProfileId,
    iv: [u8; 4],
    requires_user_key: bool,
    user_key: UserKey,
}

impl EncryptionProfile {
    /// Returns the profile of a built-in scheme with the default key.
    ///
    /// Built-in profiles need no resolution step; this is what loaders and
    /// tests use. [`ProfileId::Custom`] has no built-in IV and maps to the
    /// unencrypted IV with the default key.
    pub fn builtin(id: ProfileId) -> Self {
        let iv = match id {
            ProfileId::Gms => GMS_IV,
            ProfileId::Ems => EMS_IV,
            ProfileId::Bms | ProfileId::Custom => BMS_IV,
        };
        Self {
            id,
            iv,
            requires_user_key: false,
            user_key: UserKey::default_key(),
        }
    }

    /// Returns a custom profile for the given key.
    pub fn custom(key: CustomKey) -> Self {
        Self {
            id: ProfileId::Custom,
            iv: key.iv,
            requires_user_key: true,
            user_key: key.user_key,
        }
    }

    /// Resolves a user selection into a profile.
    ///
    /// For [`ProfileSelection::Custom`] the prompt is asked for a key, which
    /// is installed in the key table before returning. Every other selection
    /// restores the table's default key so a custom key from an earlier save
    /// never leaks into this one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProfileUnresolved`] if the prompt was cancelled. The
    /// key table is left unchanged in that case.
    pub fn resolve(
        selection: ProfileSelection,
        prompt: &mut dyn KeyPrompt,
        lease: &mut KeyTableLease<'_>,
    ) -> Result<Self> {
        match selection {
            ProfileSelection::Custom => {
                let key = prompt.prompt_custom_key().ok_or(Error::ProfileUnresolved)?;
                lease.install(key.user_key.clone());
                Ok(Self::custom(key))
            }
            builtin => {
                lease.restore_default();
                Ok(Self::builtin(builtin.id()))
            }
        }
    }

    /// Returns the scheme id.
    pub fn id(&self) -> ProfileId {
        self.id
    }

    /// Returns the 4-byte IV.
    pub fn iv(&self) -> [u8; 4] {
        self.iv
    }

    /// Returns true if this profile needs a user-supplied key.
    pub fn requires_user_key(&self) -> bool {
        self.requires_user_key
    }

    /// Returns the user key this profile was resolved with.
    pub fn user_key(&self) -> &UserKey {
        &self.user_key
    }

    /// Returns a fresh keystream for this profile.
    pub fn keystream(&self) -> Keystream {
        Keystream::new(self.user_key.clone(), self.iv)
    }

    /// Returns true if both profiles produce the same bytes.
    ///
    /// Scheme ids alone are not enough: two custom profiles with different
    /// keys share an id but not a cipher.
    pub fn matches_cipher(&self, other: &EncryptionProfile) -> bool {
        self.id == other.id
            && self.iv == other.iv
            && self.user_key.fingerprint() == other.user_key.fingerprint()
    }
}

/// The 16-bit archive format version stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FormatVersion(u16);

impl FormatVersion {
    /// Largest accepted version.
    pub const MAX: i32 = i16::MAX as i32;

    /// Creates a version from its stored value.
    pub fn new(value: u16) -> Self {
        Self(value)
    }

    /// Returns the stored value.
    pub fn get(&self) -> u16 {
        self.0
    }
}

impl TryFrom<i32> for FormatVersion {
    type Error = Error;

    /// Validates a user-entered version.
    ///
    /// Negative values and values above `i16::MAX` are rejected.
    fn try_from(value: i32) -> Result<Self> {
        if !(0..=Self::MAX).contains(&value) {
            return Err(Error::InvalidVersion { value });
        }
        Ok(Self(value as u16))
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KeyTable, USER_KEY_LEN};

    fn custom_key(fill: u8) -> CustomKey {
        CustomKey::new([1, 2, 3, 4], UserKey::new([fill; USER_KEY_LEN]))
    }

    #[test]
    fn test_builtin_ivs() {
        assert_eq!(EncryptionProfile::builtin(ProfileId::Gms).iv(), GMS_IV);
        assert_eq!(EncryptionProfile::builtin(ProfileId::Ems).iv(), EMS_IV);
        assert_eq!(EncryptionProfile::builtin(ProfileId::Bms).iv(), BMS_IV);
        assert!(!EncryptionProfile::builtin(ProfileId::Gms).requires_user_key());
    }

    #[test]
    fn test_resolve_custom_installs_key() {
        let table = KeyTable::new();
        let mut lease = table.lease();
        let mut prompt = FixedPrompt(custom_key(9));
        let profile =
            EncryptionProfile::resolve(ProfileSelection::Custom, &mut prompt, &mut lease).unwrap();

        assert_eq!(profile.id(), ProfileId::Custom);
        assert_eq!(profile.iv(), [1, 2, 3, 4]);
        assert!(profile.requires_user_key());
        assert_eq!(lease.current().as_bytes(), &[9; USER_KEY_LEN]);
    }

    #[test]
    fn test_resolve_custom_cancelled() {
        let table = KeyTable::new();
        let mut lease = table.lease();
        let result = EncryptionProfile::resolve(ProfileSelection::Custom, &mut NoPrompt, &mut lease);
        assert!(matches!(result, Err(Error::ProfileUnresolved)));
        assert!(lease.current().is_default());
    }

    #[test]
    fn test_resolve_builtin_restores_default_key() {
        let table = KeyTable::new();
        let mut lease = table.lease();
        lease.install(UserKey::new([5; USER_KEY_LEN]));

        let profile =
            EncryptionProfile::resolve(ProfileSelection::Ems, &mut NoPrompt, &mut lease).unwrap();
        assert_eq!(profile.id(), ProfileId::Ems);
        assert!(lease.current().is_default());
        assert!(profile.user_key().is_default());
    }

    #[test]
    fn test_closure_prompt() {
        let table = KeyTable::new();
        let mut lease = table.lease();
        let mut calls = 0;
        let mut prompt = || {
            calls += 1;
            Some(custom_key(3))
        };
        EncryptionProfile::resolve(ProfileSelection::Custom, &mut prompt, &mut lease).unwrap();
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_matches_cipher() {
        let gms = EncryptionProfile::builtin(ProfileId::Gms);
        let ems = EncryptionProfile::builtin(ProfileId::Ems);
        assert!(gms.matches_cipher(&gms.clone()));
        assert!(!gms.matches_cipher(&ems));

        let a = EncryptionProfile::custom(custom_key(1));
        let b = EncryptionProfile::custom(custom_key(2));
        assert!(!a.matches_cipher(&b));
        assert!(a.matches_cipher(&EncryptionProfile::custom(custom_key(1))));
    }

    #[test]
    fn test_selection_from_str() {
        assert_eq!("GMS".parse::<ProfileSelection>().unwrap(), ProfileSelection::Gms);
        assert_eq!(" custom ".parse::<ProfileSelection>().unwrap(), ProfileSelection::Custom);
        assert!("kms".parse::<ProfileSelection>().is_err());
        assert_eq!(ProfileSelection::Bms.to_string(), "bms");
    }

    #[test]
    fn test_custom_key_from_hex() {
        let key_hex = "00".repeat(USER_KEY_LEN);
        let key = CustomKey::from_hex("4d23c72b", &key_hex).unwrap();
        assert_eq!(key.iv, GMS_IV);
        assert!(CustomKey::from_hex("4d23", &key_hex).is_err());
    }

    #[test]
    fn test_format_version_bounds() {
        assert_eq!(FormatVersion::try_from(83).unwrap().get(), 83);
        assert_eq!(FormatVersion::try_from(0).unwrap().get(), 0);
        assert_eq!(FormatVersion::try_from(32767).unwrap().get(), 32767);
        assert!(matches!(
            FormatVersion::try_from(-1),
            Err(Error::InvalidVersion { value: -1 })
        ));
        assert!(FormatVersion::try_from(40000).is_err());
    }
}
