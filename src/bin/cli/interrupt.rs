//! Ctrl+C handling.
//!
//! Outside a save, Ctrl+C exits at once. During a save the interrupt is only
//! recorded; the save runs to its terminal state and the process exits with
//! the interrupt code afterwards, so the archive is never left between the
//! delete and the rename.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};

use crate::exit_codes;

static SAVE_LOCK: Mutex<()> = Mutex::new(());
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Held for the duration of a save.
pub struct SaveGuard {
    _lock: MutexGuard<'static, ()>,
}

/// Marks a save as running until the guard is dropped.
pub fn saving() -> SaveGuard {
    SaveGuard {
        _lock: SAVE_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
    }
}

/// Returns true if Ctrl+C was pressed.
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Installs the Ctrl+C handler.
pub fn install() {
    ctrlc::set_handler(move || {
        // Exiting while holding the lock keeps a save from starting meanwhile
        if let Some(_idle) = on_interrupt() {
            eprintln!("\nInterrupted");
            std::process::exit(exit_codes::USER_INTERRUPT);
        }
        eprintln!("\nInterrupted; finishing the current save first");
    })
    .ok();
}

/// Records the interrupt. Returns the save lock if no save is running.
fn on_interrupt() -> Option<MutexGuard<'static, ()>> {
    INTERRUPTED.store(true, Ordering::SeqCst);
    match SAVE_LOCK.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}
