//! File registry: loads paths into editor units.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::Result;
use crate::codec::ArchiveCodec;
use crate::model::{ArchiveUnit, Origin, UnitKind};
use crate::profile::{EncryptionProfile, ProfileId};

/// Loads files into in-memory units and tracks which files are open.
pub trait FileRegistry {
    /// Opens `path` as a unit of the given kind, decoded under `profile`.
    fn load(&mut self, path: &Path, kind: UnitKind, profile: &EncryptionProfile)
    -> Result<ArchiveUnit>;

    /// Forgets a path whose handle was released.
    fn release(&mut self, path: &Path) {
        let _ = path;
    }
}

/// A registry that loads files through an [`ArchiveCodec`].
#[derive(Debug, Default)]
pub struct CodecRegistry<C> {
    codec: C,
    open: HashMap<PathBuf, ProfileId>,
}

impl<C: ArchiveCodec> CodecRegistry<C> {
    /// Creates an empty registry.
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            open: HashMap::new(),
        }
    }

    /// Returns true if `path` was loaded and not released since.
    pub fn is_open(&self, path: &Path) -> bool {
        self.open.contains_key(path)
    }

    /// Returns the profile `path` was loaded with.
    pub fn profile_of(&self, path: &Path) -> Option<ProfileId> {
        self.open.get(path).copied()
    }

    /// Returns the number of open paths.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}

impl<C: ArchiveCodec> FileRegistry for CodecRegistry<C> {
    fn load(
        &mut self,
        path: &Path,
        kind: UnitKind,
        profile: &EncryptionProfile,
    ) -> Result<ArchiveUnit> {
        let origin = Origin::open(path, profile.clone())?;
        let unit = match kind {
            UnitKind::Hierarchy => ArchiveUnit::Hierarchy(self.codec.read_hierarchy(origin)?),
            UnitKind::Loose => ArchiveUnit::Loose(self.codec.read_loose_unit(origin)?),
        };
        self.open.insert(path.to_path_buf(), profile.id());
        log::debug!("Registered {} ({})", path.display(), profile.id());
        Ok(unit)
    }

    fn release(&mut self, path: &Path) {
        if self.open.remove(path).is_some() {
            log::debug!("Unregistered {}", path.display());
        }
    }
}
