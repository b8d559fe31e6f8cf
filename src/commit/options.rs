//! Save options.

/// How a staged archive replaces the file it was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplaceStrategy {
    /// Delete the original, then rename the staging file into place.
    ///
    /// Between the two steps only the staging file exists. A failed rename
    /// is reported as [`Error::ReplaceFailed`](crate::Error::ReplaceFailed)
    /// with the staging path.
    #[default]
    DeleteThenRename,
    /// Rename the original to `<path>.bak`, rename the staging file into
    /// place, then delete the backup.
    ///
    /// If the second rename fails the backup is moved back, so the canonical
    /// path always names a complete archive.
    BackupThenRename,
}

/// Options for a save.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// How in-place saves swap files.
    pub strategy: ReplaceStrategy,
    /// Whether to fsync side files before they are moved into place.
    pub sync: bool,
    /// Whether to remove a partially written staging file after a write error.
    pub cleanup_staging: bool,
    /// Whether to reload the committed file into the caller's unit.
    pub reload: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            strategy: ReplaceStrategy::DeleteThenRename,
            sync: true,
            cleanup_staging: true,
            reload: true,
        }
    }
}

impl SaveOptions {
    /// Creates options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the replace strategy.
    pub fn strategy(mut self, strategy: ReplaceStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Keeps a backup of the original until the staged file is in place.
    pub fn backup(self) -> Self {
        self.strategy(ReplaceStrategy::BackupThenRename)
    }

    /// Enables or disables fsync of side files.
    pub fn sync(mut self, enabled: bool) -> Self {
        self.sync = enabled;
        self
    }

    /// Enables or disables removal of partial staging files.
    pub fn cleanup_staging(mut self, enabled: bool) -> Self {
        self.cleanup_staging = enabled;
        self
    }

    /// Enables or disables the post-commit reload.
    ///
    /// Without a reload the saved unit stays detached from any file, so
    /// stored bodies can no longer be read from it.
    pub fn reload(mut self, enabled: bool) -> Self {
        self.reload = enabled;
        self
    }
}
