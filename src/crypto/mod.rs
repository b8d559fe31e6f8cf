//! Key material and the process-wide user key table.
//!
//! The package codec consults one user key per process, the way the editor's
//! original crypto library does. Replacing that key is the only global side
//! effect of a save, so it is isolated here:
//!
//! - [`KeyTable`] owns the current key behind a mutex.
//! - [`KeyTable::lease`] hands out a [`KeyTableLease`], the only type that can
//!   change the key. A save holds its lease from profile resolution until its
//!   write has finished, so no other resolution can swap the key mid-write.
//!
//! Resolved profiles carry a snapshot of the key, so writers never read the
//! table again after resolution.

mod key;
mod keystream;

use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

pub use key::{DEFAULT_USER_KEY, USER_KEY_LEN, UserKey};
pub use keystream::Keystream;

pub(crate) use key::parse_hex;

/// Acquires a mutex lock, recovering from poisoned state if necessary.
///
/// The key table holds a single value that is always fully written before the
/// guard is released, so a poisoned lock still guards a consistent key.
fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("KeyTable mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

static GLOBAL_TABLE: LazyLock<Arc<KeyTable>> = LazyLock::new(|| Arc::new(KeyTable::new()));

/// The user key table consulted when archives are encoded.
#[derive(Debug, Default)]
pub struct KeyTable {
    current: Mutex<UserKey>,
}

impl KeyTable {
    /// Creates a table holding the default key.
    ///
    /// Most callers want [`KeyTable::shared`]; separate tables are useful for
    /// tests and tools that must not disturb the editor's key.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(UserKey::default_key()),
        }
    }

    /// Returns the process-wide table.
    pub fn shared() -> Arc<KeyTable> {
        Arc::clone(&GLOBAL_TABLE)
    }

    /// Takes exclusive control of the table.
    ///
    /// Blocks while another save holds a lease.
    pub fn lease(&self) -> KeyTableLease<'_> {
        KeyTableLease {
            guard: lock_or_recover(&self.current),
        }
    }

    /// Returns a copy of the current key.
    pub fn current(&self) -> UserKey {
        lock_or_recover(&self.current).clone()
    }
}

/// Exclusive access to a [`KeyTable`] for the span of one save.
pub struct KeyTableLease<'a> {
    guard: MutexGuard<'a, UserKey>,
}

impl KeyTableLease<'_> {
    /// Installs a custom key, replacing whatever was there.
    pub fn install(&mut self, key: UserKey) {
        log::debug!("Installing custom user key {:?}", key);
        *self.guard = key;
    }

    /// Restores the default key.
    pub fn restore_default(&mut self) {
        if !self.guard.is_default() {
            log::debug!("Restoring default user key");
        }
        *self.guard = UserKey::default_key();
    }

    /// Returns the key currently installed.
    pub fn current(&self) -> &UserKey {
        &self.guard
    }
}

impl std::fmt::Debug for KeyTableLease<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyTableLease")
            .field("current", &*self.guard)
            .finish()
    }
}
