//! Atomic replacement of archive files.
//!
//! An archive saved over the file it was loaded from cannot be written in
//! place: unchanged units are still being read from that file. The new archive
//! is staged next to it at `<path>$tmp`, the source handle is released, and the
//! staging file is swapped into place. The original is never removed before
//! the staging file is completely written.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use super::options::ReplaceStrategy;
use crate::{Error, Result};

/// Returns the staging path for an in-place archive save: `<path>$tmp`.
pub fn hierarchy_staging_path(path: &Path) -> PathBuf {
    with_suffix(path, "$tmp")
}

/// Returns the staging path for a loose unit save: `<path>.tmp`.
pub fn loose_staging_path(path: &Path) -> PathBuf {
    with_suffix(path, ".tmp")
}

/// Returns the backup path used by [`ReplaceStrategy::BackupThenRename`]: `<path>.bak`.
pub fn backup_path(path: &Path) -> PathBuf {
    with_suffix(path, ".bak")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Returns true if both paths name the same file.
///
/// Paths that exist are compared after canonicalization, so `./a.wz` and
/// `a.wz` match. Otherwise they are compared as written.
pub fn same_path(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Swaps a fully written staging file into its final location.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicReplacer {
    strategy: ReplaceStrategy,
    sync: bool,
}

impl AtomicReplacer {
    /// Creates a replacer using `strategy`.
    pub fn new(strategy: ReplaceStrategy) -> Self {
        Self {
            strategy,
            sync: false,
        }
    }

    /// Enables fsync of files copied into place.
    pub fn sync(mut self, enabled: bool) -> Self {
        self.sync = enabled;
        self
    }

    /// Returns the strategy in use.
    pub fn strategy(&self) -> ReplaceStrategy {
        self.strategy
    }

    /// Moves `staged` to `target`, replacing any file already there.
    ///
    /// The caller must have released every handle on `target` first.
    ///
    /// # Errors
    ///
    /// - [`Error::PermissionDenied`] or [`Error::Io`] if `target` could not be
    ///   removed or moved aside. Both files are left in place.
    /// - [`Error::ReplaceFailed`] if the staging file could not be moved.
    ///   The staging file is never deleted.
    pub fn replace(&self, staged: &Path, target: &Path) -> Result<()> {
        match self.strategy {
            ReplaceStrategy::DeleteThenRename => self.delete_then_rename(staged, target),
            ReplaceStrategy::BackupThenRename => self.backup_then_rename(staged, target),
        }
    }

    fn delete_then_rename(&self, staged: &Path, target: &Path) -> Result<()> {
        match fs::remove_file(target) {
            Ok(()) => log::debug!("Removed original {}", target.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::from_io(e, target)),
        }

        // Only the staging file holds the archive until this succeeds
        fs::rename(staged, target).map_err(|source| Error::ReplaceFailed {
            staged: staged.to_path_buf(),
            target: target.to_path_buf(),
            source,
        })?;
        log::debug!("Renamed {} -> {}", staged.display(), target.display());
        Ok(())
    }

    fn backup_then_rename(&self, staged: &Path, target: &Path) -> Result<()> {
        let backup = backup_path(target);
        let had_original = match fs::rename(target, &backup) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(Error::from_io(e, target)),
        };

        if let Err(source) = fs::rename(staged, target) {
            if had_original {
                if let Err(restore) = fs::rename(&backup, target) {
                    log::error!(
                        "Failed to restore {} from {}: {}",
                        target.display(),
                        backup.display(),
                        restore
                    );
                }
            }
            return Err(Error::ReplaceFailed {
                staged: staged.to_path_buf(),
                target: target.to_path_buf(),
                source,
            });
        }

        if had_original {
            if let Err(e) = fs::remove_file(&backup) {
                log::warn!("Failed to remove backup {}: {}", backup.display(), e);
            }
        }
        log::debug!("Replaced {} via backup", target.display());
        Ok(())
    }

    /// Copies `staged` over `target`, then removes `staged`.
    ///
    /// Used for loose units. A failure to remove the staging file after a
    /// successful copy is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] or [`Error::ReplaceFailed`] if the
    /// copy fails. The staging file is kept in that case, since `target` may
    /// have been truncated.
    pub fn copy_into_place(&self, staged: &Path, target: &Path) -> Result<()> {
        fs::copy(staged, target).map_err(|e| commit_error(e, staged, target))?;
        if self.sync {
            OpenOptions::new()
                .write(true)
                .open(target)
                .and_then(|f| f.sync_all())
                .map_err(|e| commit_error(e, staged, target))?;
        }
        if let Err(e) = fs::remove_file(staged) {
            log::warn!("Failed to remove staging file {}: {}", staged.display(), e);
        }
        log::debug!("Copied {} -> {}", staged.display(), target.display());
        Ok(())
    }
}

fn commit_error(source: io::Error, staged: &Path, target: &Path) -> Error {
    if source.kind() == io::ErrorKind::PermissionDenied {
        Error::PermissionDenied {
            path: target.to_path_buf(),
            source,
        }
    } else {
        Error::ReplaceFailed {
            staged: staged.to_path_buf(),
            target: target.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_staging_paths() {
        let path = Path::new("/data/Map.wz");
        assert_eq!(hierarchy_staging_path(path), Path::new("/data/Map.wz$tmp"));
        assert_eq!(loose_staging_path(path), Path::new("/data/Map.wz.tmp"));
        assert_eq!(backup_path(path), Path::new("/data/Map.wz.bak"));
    }

    #[test]
    fn test_same_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.wz");
        fs::write(&file, b"x").unwrap();
        let dotted = dir.path().join(".").join("a.wz");
        assert!(same_path(&file, &dotted));
        assert!(!same_path(&file, &dir.path().join("b.wz")));
        assert!(same_path(Path::new("missing.wz"), Path::new("missing.wz")));
    }

    #[test]
    fn test_delete_then_rename() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.wz");
        let staged = hierarchy_staging_path(&target);
        fs::write(&target, b"old").unwrap();
        fs::write(&staged, b"new").unwrap();

        AtomicReplacer::default().replace(&staged, &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert!(!staged.exists());
    }

    #[test]
    fn test_replace_without_original() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.wz");
        let staged = hierarchy_staging_path(&target);
        fs::write(&staged, b"new").unwrap();

        AtomicReplacer::default().replace(&staged, &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new");
    }

    #[test]
    fn test_rename_failure_reports_staging_path() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.wz");
        let staged = hierarchy_staging_path(&target);
        fs::write(&target, b"old").unwrap();

        let err = AtomicReplacer::default()
            .replace(&staged, &target)
            .unwrap_err();
        assert_eq!(err.staged_path(), Some(staged.as_path()));
        assert!(matches!(err, Error::ReplaceFailed { .. }));
    }

    #[test]
    fn test_undeletable_original_is_not_a_replace_failure() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.wz");
        let staged = hierarchy_staging_path(&target);
        fs::create_dir(&target).unwrap();
        fs::write(target.join("inner"), b"keep").unwrap();
        fs::write(&staged, b"new").unwrap();

        let err = AtomicReplacer::default()
            .replace(&staged, &target)
            .unwrap_err();
        assert!(
            matches!(err, Error::Io(_) | Error::PermissionDenied { .. }),
            "got {:?}",
            err
        );
        assert!(err.staged_path().is_none());
        assert_eq!(fs::read(target.join("inner")).unwrap(), b"keep");
        assert_eq!(fs::read(&staged).unwrap(), b"new");
    }

    #[test]
    fn test_backup_then_rename() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.wz");
        let staged = hierarchy_staging_path(&target);
        fs::write(&target, b"old").unwrap();
        fs::write(&staged, b"new").unwrap();

        let replacer = AtomicReplacer::new(ReplaceStrategy::BackupThenRename);
        assert_eq!(replacer.strategy(), ReplaceStrategy::BackupThenRename);
        replacer.replace(&staged, &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert!(!backup_path(&target).exists());
        assert!(!staged.exists());
    }

    #[test]
    fn test_backup_restored_when_rename_fails() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.wz");
        let staged = hierarchy_staging_path(&target);
        fs::write(&target, b"old").unwrap();

        let err = AtomicReplacer::new(ReplaceStrategy::BackupThenRename)
            .replace(&staged, &target)
            .unwrap_err();
        assert!(matches!(err, Error::ReplaceFailed { .. }));
        assert_eq!(fs::read(&target).unwrap(), b"old");
        assert!(!backup_path(&target).exists());
    }

    #[test]
    fn test_copy_into_place() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("data.wz");
        let staged = loose_staging_path(&target);
        fs::write(&target, b"old").unwrap();
        fs::write(&staged, b"new unit").unwrap();

        AtomicReplacer::default()
            .sync(true)
            .copy_into_place(&staged, &target)
            .unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new unit");
        assert!(!staged.exists());
    }

    #[test]
    fn test_copy_failure_keeps_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("data.wz");
        fs::write(&target, b"old").unwrap();

        let result = AtomicReplacer::default().copy_into_place(&loose_staging_path(&target), &target);
        assert!(result.is_err());
        assert_eq!(fs::read(&target).unwrap(), b"old");
    }
}
