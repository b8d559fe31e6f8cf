//! In-memory archive model.
//!
//! An editor session holds one [`ArchiveUnit`] per open file: either a whole
//! [`Hierarchy`] or a single [`LooseUnit`]. Units loaded from disk keep their
//! encoded bodies in the source file until they are needed, which is why each
//! unit owns an [`Origin`] holding the open file handle.
//!
//! # Example
//!
//! ```rust
//! use wzsave::model::{DataUnit, Directory, Hierarchy};
//! use wzsave::profile::{EncryptionProfile, FormatVersion, ProfileId};
//!
//! let mut archive = Hierarchy::new(
//!     "Etc.wz",
//!     EncryptionProfile::builtin(ProfileId::Gms),
//!     FormatVersion::new(83),
//! );
//! let dir = archive.root_mut().add_directory(Directory::new("Quest"));
//! dir.add_unit(DataUnit::new("Act.img", b"...".to_vec()));
//! assert_eq!(archive.root().unit_count(), 1);
//! ```

mod directory;
mod unit;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::profile::EncryptionProfile;
use crate::{Error, Result};

pub use directory::{Directory, Hierarchy, Units, UnitsMut};
pub use unit::{DataUnit, LooseUnit, Payload};

/// The file a unit was loaded from and the profile it was decoded with.
#[derive(Debug)]
pub struct Origin {
    profile: EncryptionProfile,
    path: Option<PathBuf>,
    file: Option<File>,
}

impl Origin {
    /// Opens `path` and records that it is encoded under `profile`.
    pub fn open(path: impl AsRef<Path>, profile: EncryptionProfile) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::from_io(e, path))?;
        Ok(Self {
            profile,
            path: Some(path.to_path_buf()),
            file: Some(file),
        })
    }

    /// An origin with no backing file, for units created in memory.
    pub fn detached(profile: EncryptionProfile) -> Self {
        Self {
            profile,
            path: None,
            file: None,
        }
    }

    /// Returns the profile the source was decoded with.
    pub fn profile(&self) -> &EncryptionProfile {
        &self.profile
    }

    /// Returns the source path, if the unit was loaded from disk.
    ///
    /// The path is remembered after [`detach`](Self::detach).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the open source file, if still attached.
    pub fn file(&self) -> Option<&File> {
        self.file.as_ref()
    }

    /// Returns true while the source file handle is held.
    pub fn is_attached(&self) -> bool {
        self.file.is_some()
    }

    /// Releases the source file handle.
    ///
    /// Returns true if a handle was released. Stored payloads can no longer be
    /// read afterwards.
    pub fn detach(&mut self) -> bool {
        let released = self.file.take().is_some();
        if released {
            log::debug!("Released source handle for {:?}", self.path);
        }
        released
    }

    /// Re-acquires a handle on the remembered source path.
    ///
    /// Used after a failed replace, when the original file is still in place.
    pub fn reopen(&mut self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "unit has no source path",
            )));
        };
        let file = File::open(path).map_err(|e| Error::from_io(e, path))?;
        self.file = Some(file);
        Ok(())
    }

    /// Reads `len` encoded bytes at `offset` from the source file.
    pub(crate) fn read_stored(&self, name: &str, offset: u64, len: u32) -> Result<Vec<u8>> {
        let mut file = self.file.as_ref().ok_or_else(|| Error::Detached {
            name: name.to_string(),
        })?;
        let truncated = || Error::InvalidFormat(format!("unit '{}' is truncated", name));
        if offset.saturating_add(u64::from(len)) > file.metadata()?.len() {
            return Err(truncated());
        }
        file.seek(SeekFrom::Start(offset))?;
        let mut data = vec![0u8; len as usize];
        file.read_exact(&mut data).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                truncated()
            } else {
                Error::Io(e)
            }
        })?;
        Ok(data)
    }
}

/// Which variant of [`ArchiveUnit`] a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// A whole archive.
    Hierarchy,
    /// A standalone data unit.
    Loose,
}

/// The thing being saved: a whole archive or one loose unit.
#[derive(Debug)]
pub enum ArchiveUnit {
    /// A whole archive.
    Hierarchy(Hierarchy),
    /// A standalone data unit.
    Loose(LooseUnit),
}

impl ArchiveUnit {
    /// Returns which variant this is.
    pub fn kind(&self) -> UnitKind {
        match self {
            ArchiveUnit::Hierarchy(_) => UnitKind::Hierarchy,
            ArchiveUnit::Loose(_) => UnitKind::Loose,
        }
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        match self {
            ArchiveUnit::Hierarchy(h) => h.name(),
            ArchiveUnit::Loose(l) => l.unit().name(),
        }
    }

    /// Returns where the unit was loaded from.
    pub fn origin(&self) -> &Origin {
        match self {
            ArchiveUnit::Hierarchy(h) => h.origin(),
            ArchiveUnit::Loose(l) => l.origin(),
        }
    }

    /// Returns the origin mutably.
    pub fn origin_mut(&mut self) -> &mut Origin {
        match self {
            ArchiveUnit::Hierarchy(h) => h.origin_mut(),
            ArchiveUnit::Loose(l) => l.origin_mut(),
        }
    }

    /// Returns the source path, if loaded from disk.
    pub fn source_path(&self) -> Option<&Path> {
        self.origin().path()
    }

    /// Returns the hierarchy, if this is one.
    pub fn as_hierarchy(&self) -> Option<&Hierarchy> {
        match self {
            ArchiveUnit::Hierarchy(h) => Some(h),
            ArchiveUnit::Loose(_) => None,
        }
    }

    /// Returns the loose unit, if this is one.
    pub fn as_loose(&self) -> Option<&LooseUnit> {
        match self {
            ArchiveUnit::Loose(l) => Some(l),
            ArchiveUnit::Hierarchy(_) => None,
        }
    }
}

impl From<Hierarchy> for ArchiveUnit {
    fn from(hierarchy: Hierarchy) -> Self {
        ArchiveUnit::Hierarchy(hierarchy)
    }
}

impl From<LooseUnit> for ArchiveUnit {
    fn from(unit: LooseUnit) -> Self {
        ArchiveUnit::Loose(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{FormatVersion, ProfileId};
    use std::io::Write;

    #[test]
    fn test_origin_open_and_detach() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();

        let mut origin =
            Origin::open(file.path(), EncryptionProfile::builtin(ProfileId::Bms)).unwrap();
        assert!(origin.is_attached());
        assert_eq!(origin.read_stored("x", 2, 3).unwrap(), b"234");

        assert!(origin.detach());
        assert!(!origin.detach());
        assert_eq!(origin.path(), Some(file.path()));
        assert!(matches!(
            origin.read_stored("x", 0, 1),
            Err(Error::Detached { .. })
        ));

        origin.reopen().unwrap();
        assert_eq!(origin.read_stored("x", 9, 1).unwrap(), b"9");
    }

    #[test]
    fn test_reopen_without_path() {
        let mut origin = Origin::detached(EncryptionProfile::builtin(ProfileId::Ems));
        assert!(origin.reopen().is_err());
        assert!(!origin.is_attached());
    }

    #[test]
    fn test_read_stored_truncated() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        let origin = Origin::open(file.path(), EncryptionProfile::builtin(ProfileId::Bms)).unwrap();
        assert!(matches!(
            origin.read_stored("short.img", 1, 10),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_archive_unit_kind() {
        let unit: ArchiveUnit = Hierarchy::new(
            "Base.wz",
            EncryptionProfile::builtin(ProfileId::Gms),
            FormatVersion::new(1),
        )
        .into();
        assert_eq!(unit.kind(), UnitKind::Hierarchy);
        assert_eq!(unit.name(), "Base.wz");
        assert!(unit.source_path().is_none());
        assert!(unit.as_loose().is_none());
    }
}
