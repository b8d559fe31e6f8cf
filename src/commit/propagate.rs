//! Dirty-flag propagation on cipher change.

use crate::model::Directory;
use crate::profile::EncryptionProfile;

/// Marks every unit under `root` changed if the cipher differs.
///
/// Unchanged units are copied byte for byte from their source file, still
/// encoded under `old`. After a cipher switch every one of them must be
/// decoded and re-encoded, or the written archive mixes both ciphers.
///
/// Returns the number of units marked. Does nothing and returns 0 when `old`
/// and `new` produce the same bytes.
pub fn propagate(root: &mut Directory, old: &EncryptionProfile, new: &EncryptionProfile) -> usize {
    if old.matches_cipher(new) {
        log::debug!("Cipher unchanged ({}), no units marked", new.id());
        return 0;
    }

    let mut marked = 0;
    for unit in root.walk_units_mut() {
        unit.changed = true;
        marked += 1;
    }
    log::debug!("Cipher {} -> {}: marked {} units", old.id(), new.id(), marked);
    marked
}
