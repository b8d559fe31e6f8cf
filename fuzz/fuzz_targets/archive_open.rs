//! Fuzz target for loading archives and loose units from arbitrary bytes.
//!
//! Loading must fail with an error, never panic or hang, whatever the file
//! holds. Units of a file that does load are decoded too, which exercises the
//! stored-body path and its checksum.
//!
//! Run with: cargo +nightly fuzz run archive_open

#![no_main]

use std::io::Write;

use libfuzzer_sys::fuzz_target;
use wzsave::codec::PackageCodec;
use wzsave::model::UnitKind;
use wzsave::profile::{EncryptionProfile, ProfileId};
use wzsave::registry::{CodecRegistry, FileRegistry};
use wzsave::ArchiveUnit;

fuzz_target!(|data: &[u8]| {
    let Ok(mut file) = tempfile::NamedTempFile::new() else {
        return;
    };
    if file.write_all(data).is_err() {
        return;
    }

    let mut registry = CodecRegistry::new(PackageCodec);
    for id in [ProfileId::Gms, ProfileId::Bms] {
        let profile = EncryptionProfile::builtin(id);
        for kind in [UnitKind::Hierarchy, UnitKind::Loose] {
            match registry.load(file.path(), kind, &profile) {
                Ok(ArchiveUnit::Hierarchy(h)) => {
                    for unit in h.root().walk_units() {
                        let _ = h.unit_body(unit);
                    }
                }
                Ok(ArchiveUnit::Loose(l)) => {
                    let _ = l.body();
                }
                Err(_) => {}
            }
        }
    }
});
