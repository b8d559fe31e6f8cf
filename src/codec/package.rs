//! Reference package codec.
//!
//! Layout of an archive file:
//!
//! ```text
//! "WZPK" | version: u16 | encoded KEY_CHECK
//! directory record*      (preorder)
//!
//! directory record: 0x03 | name | unit_count: u32 | subdir_count: u32 | unit record*
//! unit record:      0x04 | name | len: u32 | crc32: u32 | encoded body
//! name:             len: u16 | encoded UTF-8
//! ```
//!
//! A loose unit file is `"WZUN" | encoded KEY_CHECK | unit record`.
//!
//! Every encoded field is XORed with the profile keystream from offset zero,
//! so a file opened under the wrong profile fails the key check or, for raw
//! copied units, the per-unit CRC.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::{ArchiveCodec, UnitReader, UnitWriter};
use crate::model::{DataUnit, Directory, Hierarchy, LooseUnit, Origin, Payload};
use crate::profile::FormatVersion;
use crate::{Error, Result};

/// Magic bytes at the start of an archive file.
pub const ARCHIVE_MAGIC: [u8; 4] = *b"WZPK";

/// Magic bytes at the start of a loose unit file.
pub const UNIT_MAGIC: [u8; 4] = *b"WZUN";

/// Marker encoded after the magic; decodes correctly only under the right profile.
pub const KEY_CHECK: &[u8] = b"wzsave";

const TAG_DIRECTORY: u8 = 0x03;
const TAG_UNIT: u8 = 0x04;

/// The package codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageCodec;

impl ArchiveCodec for PackageCodec {
    fn write_hierarchy<W: Write>(
        &self,
        hierarchy: &Hierarchy,
        version: FormatVersion,
        out: &mut UnitWriter<W>,
    ) -> Result<()> {
        out.write_raw(&ARCHIVE_MAGIC)?;
        out.write_u16(version.get())?;
        out.write_encoded(KEY_CHECK)?;

        let mut written = 0usize;
        let mut stack = vec![hierarchy.root()];
        while let Some(dir) = stack.pop() {
            out.write_u8(TAG_DIRECTORY)?;
            out.write_string(dir.name())?;
            out.write_u32(count_u32(dir.units().len())?)?;
            out.write_u32(count_u32(dir.directories().len())?)?;
            for unit in dir.units() {
                write_unit_record(unit, hierarchy.origin(), out, false)?;
                written += 1;
            }
            stack.extend(dir.directories().iter().rev());
        }

        log::trace!(
            "Encoded {} units of '{}' ({} bytes)",
            written,
            hierarchy.name(),
            out.position()
        );
        Ok(())
    }

    fn write_unit<W: Write>(
        &self,
        unit: &LooseUnit,
        out: &mut UnitWriter<W>,
        force_rewrite: bool,
    ) -> Result<()> {
        out.write_raw(&UNIT_MAGIC)?;
        out.write_encoded(KEY_CHECK)?;
        write_unit_record(unit.unit(), unit.origin(), out, force_rewrite)
    }

    fn read_hierarchy(&self, origin: Origin) -> Result<Hierarchy> {
        let (version, root) = {
            let mut reader = open_reader(&origin)?;
            expect_magic(&mut reader, &ARCHIVE_MAGIC, "archive")?;
            let version = FormatVersion::new(reader.read_u16()?);
            expect_key_check(&mut reader, &origin)?;
            (version, read_tree(&mut reader)?)
        };

        let name = origin
            .path()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::debug!(
            "Loaded '{}': {} directories, {} units",
            name,
            root.directory_count(),
            root.unit_count()
        );
        Ok(Hierarchy::from_parts(name, root, version, origin))
    }

    fn read_loose_unit(&self, origin: Origin) -> Result<LooseUnit> {
        let unit = {
            let mut reader = open_reader(&origin)?;
            expect_magic(&mut reader, &UNIT_MAGIC, "loose unit")?;
            expect_key_check(&mut reader, &origin)?;
            read_unit_record(&mut reader)?
        };
        Ok(LooseUnit::from_origin(unit, origin))
    }
}

fn count_u32(count: usize) -> Result<u32> {
    u32::try_from(count).map_err(|_| Error::Codec(format!("too many entries: {}", count)))
}

fn write_unit_record<W: Write>(
    unit: &DataUnit,
    origin: &Origin,
    out: &mut UnitWriter<W>,
    force_rewrite: bool,
) -> Result<()> {
    out.write_u8(TAG_UNIT)?;
    out.write_string(unit.name())?;
    match unit.payload() {
        Payload::Stored { offset, len, crc } if !unit.changed && !force_rewrite => {
            // Already encoded under the origin's profile
            let raw = origin.read_stored(unit.name(), *offset, *len)?;
            out.write_u32(*len)?;
            out.write_u32(*crc)?;
            out.write_raw(&raw)
        }
        _ => {
            let body = unit.body(origin)?;
            let len = u32::try_from(body.len()).map_err(|_| {
                Error::Codec(format!("unit '{}' exceeds 4 GiB", unit.name()))
            })?;
            out.write_u32(len)?;
            out.write_u32(crc32fast::hash(&body))?;
            out.write_encoded(&body)
        }
    }
}

fn open_reader(origin: &Origin) -> Result<UnitReader<BufReader<&File>>> {
    let mut file = origin.file().ok_or_else(|| Error::Detached {
        name: origin
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
    })?;
    file.seek(SeekFrom::Start(0))?;
    Ok(UnitReader::new(BufReader::new(file), origin.profile()))
}

fn expect_magic<R: Read + Seek>(
    reader: &mut UnitReader<R>,
    magic: &[u8; 4],
    what: &str,
) -> Result<()> {
    if reader.read_raw(magic.len())? != magic {
        return Err(Error::InvalidFormat(format!("not a {} file", what)));
    }
    Ok(())
}

fn expect_key_check<R: Read + Seek>(reader: &mut UnitReader<R>, origin: &Origin) -> Result<()> {
    if reader.read_decoded(KEY_CHECK.len())? != KEY_CHECK {
        return Err(Error::WrongCipher {
            path: origin.path().map(Path::to_path_buf).unwrap_or_default(),
        });
    }
    Ok(())
}

fn read_unit_record<R: Read + Seek>(reader: &mut UnitReader<R>) -> Result<DataUnit> {
    let tag = reader.read_u8()?;
    if tag != TAG_UNIT {
        return Err(Error::InvalidFormat(format!(
            "expected unit record at offset {}, found tag {:#04x}",
            reader.position() - 1,
            tag
        )));
    }
    let name = reader.read_string()?;
    let len = reader.read_u32()?;
    let crc = reader.read_u32()?;
    let offset = reader.position();
    reader.skip(u64::from(len))?;
    Ok(DataUnit::stored(name, offset, len, crc))
}

fn read_directory_record<R: Read + Seek>(
    reader: &mut UnitReader<R>,
) -> Result<(Directory, u32)> {
    let tag = reader.read_u8()?;
    if tag != TAG_DIRECTORY {
        return Err(Error::InvalidFormat(format!(
            "expected directory record at offset {}, found tag {:#04x}",
            reader.position() - 1,
            tag
        )));
    }
    let mut dir = Directory::new(reader.read_string()?);
    let unit_count = reader.read_u32()?;
    let subdir_count = reader.read_u32()?;
    for _ in 0..unit_count {
        dir.add_unit(read_unit_record(reader)?);
    }
    Ok((dir, subdir_count))
}

/// Rebuilds the preorder directory records into a tree.
fn read_tree<R: Read + Seek>(reader: &mut UnitReader<R>) -> Result<Directory> {
    let mut stack: Vec<(Directory, u32)> = vec![read_directory_record(reader)?];
    loop {
        let Some((_, remaining)) = stack.last_mut() else {
            return Err(Error::InvalidFormat("empty directory stack".into()));
        };
        if *remaining > 0 {
            *remaining -= 1;
            let child = read_directory_record(reader)?;
            stack.push(child);
            continue;
        }
        let Some((finished, _)) = stack.pop() else {
            return Err(Error::InvalidFormat("empty directory stack".into()));
        };
        match stack.last_mut() {
            Some((parent, _)) => {
                parent.add_directory(finished);
            }
            None => return Ok(finished),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{CustomKey, EncryptionProfile, ProfileId};
    use tempfile::TempDir;

    fn sample(profile: EncryptionProfile) -> Hierarchy {
        let mut archive = Hierarchy::new("Sample.wz", profile, FormatVersion::new(83));
        let root = archive.root_mut();
        root.add_unit(DataUnit::new("Root.img", b"root body".to_vec()));
        let map = root.add_directory(Directory::new("Map"));
        map.add_unit(DataUnit::new("Map0.img", b"map zero".to_vec()));
        map.add_directory(Directory::new("Obj"))
            .add_unit(DataUnit::new("acc1.img", vec![7u8; 300]));
        root.add_directory(Directory::new("Empty"));
        archive
    }

    fn write_to(path: &Path, archive: &Hierarchy, profile: &EncryptionProfile) {
        let file = File::create(path).unwrap();
        let mut writer = UnitWriter::new(file, profile);
        PackageCodec
            .write_hierarchy(archive, archive.version(), &mut writer)
            .unwrap();
        writer.flush().unwrap();
    }

    fn load(path: &Path, profile: EncryptionProfile) -> Result<Hierarchy> {
        PackageCodec.read_hierarchy(Origin::open(path, profile)?)
    }

    fn bodies(archive: &Hierarchy) -> Vec<Vec<u8>> {
        archive
            .root()
            .walk_units()
            .map(|u| archive.unit_body(u).unwrap())
            .collect()
    }

    #[test]
    fn test_hierarchy_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Sample.wz");
        let gms = EncryptionProfile::builtin(ProfileId::Gms);
        let archive = sample(gms.clone());
        write_to(&path, &archive, &gms);

        let loaded = load(&path, gms).unwrap();
        assert_eq!(loaded.name(), "Sample.wz");
        assert_eq!(loaded.version(), FormatVersion::new(83));
        assert_eq!(loaded.root().unit_paths(), archive.root().unit_paths());
        assert_eq!(loaded.root().directory_count(), 3);
        assert_eq!(bodies(&loaded), bodies(&archive));
        assert!(loaded.root().walk_units().all(|u| !u.changed));
    }

    #[test]
    fn test_wrong_profile_is_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Sample.wz");
        let gms = EncryptionProfile::builtin(ProfileId::Gms);
        write_to(&path, &sample(gms.clone()), &gms);

        let err = load(&path, EncryptionProfile::builtin(ProfileId::Ems)).unwrap_err();
        assert!(matches!(err, Error::WrongCipher { .. }), "got {:?}", err);
        assert!(err.is_cipher_mismatch());
    }

    #[test]
    fn test_custom_key_must_match() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Sample.wz");
        let key_a = CustomKey::from_hex("01020304", &"11".repeat(32)).unwrap();
        let key_b = CustomKey::from_hex("01020304", &"22".repeat(32)).unwrap();
        let profile_a = EncryptionProfile::custom(key_a);
        write_to(&path, &sample(profile_a.clone()), &profile_a);

        assert!(load(&path, profile_a).is_ok());
        assert!(matches!(
            load(&path, EncryptionProfile::custom(key_b)),
            Err(Error::WrongCipher { .. })
        ));
    }

    #[test]
    fn test_unchanged_units_are_copied_raw() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.wz");
        let second = dir.path().join("second.wz");
        let gms = EncryptionProfile::builtin(ProfileId::Gms);
        let ems = EncryptionProfile::builtin(ProfileId::Ems);
        write_to(&first, &sample(gms.clone()), &gms);

        // Re-encode under EMS without marking anything changed
        let loaded = load(&first, gms).unwrap();
        write_to(&second, &loaded, &ems);

        let mixed = load(&second, ems).unwrap();
        let unit = mixed.root().walk_units().next().unwrap();
        let err = mixed.unit_body(unit).unwrap_err();
        assert!(matches!(err, Error::CorruptUnit { .. }), "got {:?}", err);
    }

    #[test]
    fn test_changed_stored_units_are_reencoded() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.wz");
        let second = dir.path().join("second.wz");
        let gms = EncryptionProfile::builtin(ProfileId::Gms);
        let bms = EncryptionProfile::builtin(ProfileId::Bms);
        let original = sample(gms.clone());
        write_to(&first, &original, &gms);

        let mut loaded = load(&first, gms).unwrap();
        for unit in loaded.root_mut().walk_units_mut() {
            unit.changed = true;
        }
        write_to(&second, &loaded, &bms);

        let reloaded = load(&second, bms).unwrap();
        assert_eq!(bodies(&reloaded), bodies(&original));
    }

    #[test]
    fn test_loose_unit_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.wz");
        let ems = EncryptionProfile::builtin(ProfileId::Ems);
        let loose = LooseUnit::new(DataUnit::new("data.img", b"loose".to_vec()), ems.clone());

        let mut writer = UnitWriter::new(File::create(&path).unwrap(), &ems);
        PackageCodec.write_unit(&loose, &mut writer, true).unwrap();
        writer.flush().unwrap();

        let loaded = PackageCodec
            .read_loose_unit(Origin::open(&path, ems).unwrap())
            .unwrap();
        assert_eq!(loaded.unit().name(), "data.img");
        assert_eq!(loaded.body().unwrap(), b"loose");
    }

    #[test]
    fn test_archive_is_not_a_loose_unit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Sample.wz");
        let bms = EncryptionProfile::builtin(ProfileId::Bms);
        write_to(&path, &sample(bms.clone()), &bms);

        let result = PackageCodec.read_loose_unit(Origin::open(&path, bms).unwrap());
        assert!(matches!(result, Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_truncated_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Sample.wz");
        let bms = EncryptionProfile::builtin(ProfileId::Bms);
        write_to(&path, &sample(bms.clone()), &bms);
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..20]).unwrap();

        assert!(matches!(load(&path, bms), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_deeply_nested_archive_loads_and_drops() {
        use crate::model::UnitKind;
        use crate::registry::{CodecRegistry, FileRegistry};
        use std::io::BufWriter;

        const DEPTH: u32 = 100_000;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Deep.wz");
        let bms = EncryptionProfile::builtin(ProfileId::Bms);

        // A chain of directory records, each holding the next one
        let file = File::create(&path).unwrap();
        let mut out = UnitWriter::new(BufWriter::new(file), &bms);
        out.write_raw(&ARCHIVE_MAGIC).unwrap();
        out.write_u16(83).unwrap();
        out.write_encoded(KEY_CHECK).unwrap();
        for level in 0..DEPTH {
            out.write_u8(TAG_DIRECTORY).unwrap();
            out.write_string("d").unwrap();
            out.write_u32(0).unwrap();
            out.write_u32(u32::from(level + 1 < DEPTH)).unwrap();
        }
        out.flush().unwrap();
        drop(out);

        let mut registry = CodecRegistry::new(PackageCodec);
        let unit = registry.load(&path, UnitKind::Hierarchy, &bms).unwrap();
        let archive = unit.as_hierarchy().unwrap();
        assert_eq!(archive.root().directory_count(), DEPTH as usize - 1);
        assert_eq!(archive.root().unit_count(), 0);
        drop(unit);
    }
}
