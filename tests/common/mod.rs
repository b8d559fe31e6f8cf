//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use wzsave::codec::{ArchiveCodec, PackageCodec, UnitWriter};
use wzsave::commit::{CommitCoordinator, SaveOptions};
use wzsave::crypto::KeyTable;
use wzsave::model::{ArchiveUnit, DataUnit, Directory, Hierarchy, LooseUnit, UnitKind};
use wzsave::profile::{EncryptionProfile, FormatVersion, KeyPrompt, ProfileId};
use wzsave::registry::{CodecRegistry, FileRegistry};

pub type TestCoordinator<P> = CommitCoordinator<PackageCodec, CodecRegistry<PackageCodec>, P>;

pub fn profile(id: ProfileId) -> EncryptionProfile {
    EncryptionProfile::builtin(id)
}

/// Builds a small archive:
///
/// ```text
/// Map.wz
/// ├── MapHelper.img
/// └── Map
///     ├── Map0
///     │   └── 000010000.img
///     └── Map1
///         └── 100000000.img
/// ```
pub fn sample_hierarchy(profile: EncryptionProfile) -> Hierarchy {
    let mut h = Hierarchy::new("Map.wz", profile, FormatVersion::new(83));
    let root = h.root_mut();
    root.add_unit(DataUnit::new("MapHelper.img", b"helper".to_vec()));
    let map = root.add_directory(Directory::new("Map"));
    map.add_directory(Directory::new("Map0"))
        .add_unit(DataUnit::new("000010000.img", b"maple island".to_vec()));
    map.add_directory(Directory::new("Map1"))
        .add_unit(DataUnit::new("100000000.img", b"henesys".to_vec()));
    h
}

/// Writes `hierarchy` to `path` under its own profile.
pub fn write_archive(path: &Path, hierarchy: &Hierarchy) {
    let file = File::create(path).expect("Failed to create archive");
    let mut out = UnitWriter::new(file, hierarchy.profile());
    PackageCodec
        .write_hierarchy(hierarchy, hierarchy.version(), &mut out)
        .expect("Failed to write archive");
    out.flush().expect("Failed to flush archive");
}

/// Writes a loose unit to `path` under `profile`.
pub fn write_loose(path: &Path, name: &str, body: &[u8], profile: &EncryptionProfile) {
    let unit = LooseUnit::new(DataUnit::new(name, body.to_vec()), profile.clone());
    let file = File::create(path).expect("Failed to create unit file");
    let mut out = UnitWriter::new(file, profile);
    PackageCodec
        .write_unit(&unit, &mut out, true)
        .expect("Failed to write unit");
    out.flush().expect("Failed to flush unit");
}

/// Loads `path` with a throwaway registry.
pub fn load(path: &Path, kind: UnitKind, profile: &EncryptionProfile) -> wzsave::Result<ArchiveUnit> {
    CodecRegistry::new(PackageCodec).load(path, kind, profile)
}

/// Returns every unit path and decoded body, in archive order.
pub fn bodies(unit: &ArchiveUnit) -> wzsave::Result<Vec<(String, Vec<u8>)>> {
    match unit {
        ArchiveUnit::Hierarchy(h) => h
            .root()
            .unit_paths()
            .into_iter()
            .zip(h.root().walk_units())
            .map(|(path, u)| Ok((path, h.unit_body(u)?)))
            .collect(),
        ArchiveUnit::Loose(l) => Ok(vec![(l.unit().name().to_string(), l.body()?)]),
    }
}

/// A coordinator with its own key table and fsync disabled.
pub fn coordinator<P: KeyPrompt>(prompt: P) -> TestCoordinator<P> {
    CommitCoordinator::new(PackageCodec, CodecRegistry::new(PackageCodec), prompt)
        .with_key_table(Arc::new(KeyTable::new()))
        .with_options(SaveOptions::new().sync(false))
}

/// Lists the file names in `dir`, sorted.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to read dir")
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}
