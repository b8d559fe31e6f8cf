//! Writing archives and loose units to side files.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use super::replace::{AtomicReplacer, loose_staging_path};
use crate::codec::{ArchiveCodec, UnitWriter};
use crate::model::{Hierarchy, LooseUnit};
use crate::profile::{EncryptionProfile, FormatVersion};
use crate::{Error, Result};

/// Serializes units through a codec into side files.
///
/// Nothing here replaces an existing file until its replacement has been
/// completely written and flushed.
#[derive(Debug, Clone)]
pub struct ArchiveWriter<C> {
    codec: C,
    sync: bool,
    cleanup_staging: bool,
}

impl<C: ArchiveCodec> ArchiveWriter<C> {
    /// Creates a writer driving `codec`.
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            sync: true,
            cleanup_staging: true,
        }
    }

    /// Enables or disables fsync before files are moved into place.
    pub fn sync(mut self, enabled: bool) -> Self {
        self.sync = enabled;
        self
    }

    /// Enables or disables removal of partial staging files on error.
    pub fn cleanup_staging(mut self, enabled: bool) -> Self {
        self.cleanup_staging = enabled;
        self
    }

    /// Writes `hierarchy` to `dest` under `profile` and `version`.
    ///
    /// The archive is written to a uniquely named temporary file in the
    /// destination directory and renamed onto `dest` once complete. `dest`
    /// must not be the file the hierarchy is being read from; use
    /// [`stage_hierarchy`](Self::stage_hierarchy) for that.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriteFailed`] if serialization fails, or
    /// [`Error::PermissionDenied`] if the destination directory or file is
    /// not writable. `dest` is untouched in every error case.
    pub fn write_hierarchy(
        &self,
        hierarchy: &Hierarchy,
        dest: &Path,
        profile: &EncryptionProfile,
        version: FormatVersion,
    ) -> Result<()> {
        let dir = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = tempfile::Builder::new()
            .prefix(".wzsave")
            .tempfile_in(dir)
            .map_err(|e| Error::from_io(e, dir))?;

        self.encode_hierarchy(hierarchy, temp.as_file(), profile, version)
            .map_err(|e| write_failed(e, dest))?;

        temp.persist(dest)
            .map_err(|e| Error::from_io(e.error, dest))?;
        log::debug!("Wrote {} under {}", dest.display(), profile.id());
        Ok(())
    }

    /// Writes `hierarchy` to the staging file `staging`, creating or
    /// truncating it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriteFailed`] if serialization fails. The partial
    /// staging file is removed unless cleanup is disabled.
    pub fn stage_hierarchy(
        &self,
        hierarchy: &Hierarchy,
        staging: &Path,
        profile: &EncryptionProfile,
        version: FormatVersion,
    ) -> Result<()> {
        let file = File::create(staging).map_err(|e| Error::from_io(e, staging))?;
        if let Err(e) = self.encode_hierarchy(hierarchy, &file, profile, version) {
            drop(file);
            self.discard(staging);
            return Err(write_failed(e, staging));
        }
        log::debug!("Staged {} under {}", staging.display(), profile.id());
        Ok(())
    }

    /// Writes `unit` to its staging file `<dest>.tmp` with a forced rewrite.
    ///
    /// Returns the staging path.
    pub fn stage_loose_unit(
        &self,
        unit: &LooseUnit,
        dest: &Path,
        profile: &EncryptionProfile,
    ) -> Result<PathBuf> {
        let staging = loose_staging_path(dest);
        let file = File::create(&staging).map_err(|e| Error::from_io(e, &staging))?;
        let result = (|| -> Result<()> {
            let mut out = UnitWriter::new(BufWriter::new(&file), profile);
            self.codec.write_unit(unit, &mut out, true)?;
            out.flush()?;
            drop(out);
            if self.sync {
                file.sync_all()?;
            }
            Ok(())
        })();
        if let Err(e) = result {
            drop(file);
            self.discard(&staging);
            return Err(write_failed(e, &staging));
        }
        Ok(staging)
    }

    /// Writes `unit` to `dest` through `<dest>.tmp`.
    ///
    /// The staging file is copied over `dest` and then removed. `dest` must
    /// not be the unit's own open source; stage and detach first in that case.
    pub fn write_loose_unit(
        &self,
        unit: &LooseUnit,
        dest: &Path,
        profile: &EncryptionProfile,
    ) -> Result<()> {
        let staging = self.stage_loose_unit(unit, dest, profile)?;
        AtomicReplacer::default()
            .sync(self.sync)
            .copy_into_place(&staging, dest)
    }

    fn encode_hierarchy(
        &self,
        hierarchy: &Hierarchy,
        file: &File,
        profile: &EncryptionProfile,
        version: FormatVersion,
    ) -> Result<()> {
        let mut out = UnitWriter::new(BufWriter::new(file), profile);
        self.codec.write_hierarchy(hierarchy, version, &mut out)?;
        out.flush()?;
        drop(out);
        if self.sync {
            file.sync_all()?;
        }
        Ok(())
    }

    fn discard(&self, staging: &Path) {
        if !self.cleanup_staging {
            return;
        }
        if let Err(e) = std::fs::remove_file(staging) {
            log::warn!("Failed to remove partial file {}: {}", staging.display(), e);
        }
    }
}

fn write_failed(error: Error, path: &Path) -> Error {
    match error {
        Error::PermissionDenied { .. } => error,
        other => Error::WriteFailed {
            path: path.to_path_buf(),
            source: Box::new(other),
        },
    }
}
