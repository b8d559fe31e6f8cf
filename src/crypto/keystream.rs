//! Keystream used by the package codec to obfuscate names and unit bodies.
//!
//! Each block is `SHA-256(user_key || iv || block_index_le)`. Every encoded
//! field starts at keystream offset zero, so fields can be decoded
//! independently. An all-zero IV produces an all-zero keystream: archives
//! saved under such a profile store their bytes in the clear.

use sha2::{Digest, Sha256};

use super::UserKey;

/// Size of one keystream block.
const BLOCK_SIZE: usize = 32;

/// An expandable keystream bound to one (user key, IV) pair.
#[derive(Clone)]
pub struct Keystream {
    key: UserKey,
    iv: [u8; 4],
    stream: Vec<u8>,
}

impl Keystream {
    /// Creates a keystream for the given key and IV.
    pub fn new(key: UserKey, iv: [u8; 4]) -> Self {
        Self {
            key,
            iv,
            stream: Vec::new(),
        }
    }

    /// Returns the IV this keystream is bound to.
    pub fn iv(&self) -> [u8; 4] {
        self.iv
    }

    /// Returns true if this keystream leaves data unchanged.
    pub fn is_identity(&self) -> bool {
        self.iv == [0; 4]
    }

    /// XORs `data` with the keystream starting at offset zero.
    ///
    /// Applying the same keystream twice restores the original bytes.
    pub fn apply(&mut self, data: &mut [u8]) {
        if self.is_identity() {
            return;
        }
        self.expand(data.len());
        for (byte, k) in data.iter_mut().zip(&self.stream) {
            *byte ^= k;
        }
    }

    fn expand(&mut self, len: usize) {
        while self.stream.len() < len {
            let index = (self.stream.len() / BLOCK_SIZE) as u64;
            let mut sha = Sha256::new();
            sha.update(self.key.as_bytes());
            sha.update(self.iv);
            sha.update(index.to_le_bytes());
            self.stream.extend_from_slice(&sha.finalize());
        }
    }
}

impl std::fmt::Debug for Keystream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keystream")
            .field("iv", &self.iv)
            .field("expanded", &self.stream.len())
            .finish()
    }
}
