//! Error types for archive save operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when resolving a profile, writing, committing and reloading
//! an archive, along with a convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! Library operations return `Result<T, Error>`. The save pipeline itself
//! never returns an `Err`; it folds every failure into
//! [`CommitOutcome::Aborted`](crate::commit::CommitOutcome::Aborted) so the
//! editor receives exactly one terminal report per save:
//!
//! ```rust
//! use wzsave::Error;
//!
//! fn user_message(error: &Error) -> String {
//!     match error {
//!         Error::ProfileUnresolved => String::new(),
//!         Error::InvalidVersion { value } => format!("Version {} is not valid", value),
//!         Error::ReplaceFailed { staged, .. } => format!(
//!             "Could not move the new archive into place. It was kept at {}",
//!             staged.display()
//!         ),
//!         Error::ReloadFailed { .. } => {
//!             "The archive was saved but could not be reopened".to_string()
//!         }
//!         other => format!("Save failed: {}", other),
//!     }
//! }
//! ```

use std::io;
use std::path::{Path, PathBuf};

/// Helper struct for formatting CorruptUnit error messages.
struct CorruptUnitDisplay<'a> {
    name: &'a str,
    expected: u32,
    actual: u32,
}

impl std::fmt::Display for CorruptUnitDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Checksum mismatch for unit")?;
        if !self.name.is_empty() {
            write!(f, " '{}'", self.name)?;
        }
        write!(
            f,
            ": expected {:#010x}, got {:#010x}",
            self.expected, self.actual
        )
    }
}

/// The main error type for archive save operations.
///
/// # Error Categories
///
/// | Category | Variants | Disk state after failure |
/// |----------|----------|--------------------------|
/// | Before I/O | [`ProfileUnresolved`][Self::ProfileUnresolved], [`InvalidVersion`][Self::InvalidVersion], [`InvalidKey`][Self::InvalidKey] | untouched |
/// | Write | [`WriteFailed`][Self::WriteFailed], [`Codec`][Self::Codec] | original untouched |
/// | Commit | [`PermissionDenied`][Self::PermissionDenied], [`ReplaceFailed`][Self::ReplaceFailed] | staging file may remain |
/// | Reload | [`ReloadFailed`][Self::ReloadFailed] | new file committed and valid |
/// | Format | [`InvalidFormat`][Self::InvalidFormat], [`CorruptUnit`][Self::CorruptUnit], [`WrongCipher`][Self::WrongCipher] | n/a |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not an archive this codec understands, or is truncated.
    #[error("Invalid archive format: {0}")]
    InvalidFormat(String),

    /// A unit's body did not match its stored checksum.
    ///
    /// With the package codec this almost always means the unit was written
    /// under a different cipher than the one it is being read with.
    #[error("{}", CorruptUnitDisplay { name, expected: *expected, actual: *actual })]
    CorruptUnit {
        /// Name of the unit.
        name: String,
        /// Checksum recorded in the file.
        expected: u32,
        /// Checksum of the decoded body.
        actual: u32,
    },

    /// The archive header did not decode under the requested profile.
    #[error("Archive at '{}' is not encrypted with the selected profile", path.display())]
    WrongCipher {
        /// The file that was being opened.
        path: PathBuf,
    },

    /// The user cancelled custom key entry.
    ///
    /// Nothing was written. Editors usually abort silently on this error.
    #[error("Encryption profile was not resolved: key entry cancelled")]
    ProfileUnresolved,

    /// A custom key or IV could not be parsed.
    #[error("Invalid custom key: {0}")]
    InvalidKey(String),

    /// The requested format version is negative or does not fit in 16 bits.
    #[error("Invalid format version {value}: must be between 0 and 32767")]
    InvalidVersion {
        /// The rejected value.
        value: i32,
    },

    /// The serializer failed while producing unit bytes.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Writing the new archive to its side file failed.
    ///
    /// The original file at `path` has not been modified.
    #[error("Failed to write '{}': {source}", path.display())]
    WriteFailed {
        /// The destination that was being written.
        path: PathBuf,
        /// What went wrong.
        #[source]
        source: Box<Error>,
    },

    /// Access to a path was denied while writing or committing.
    #[error("Permission denied for '{}'", path.display())]
    PermissionDenied {
        /// The path that could not be accessed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The staged replacement could not be moved into place.
    ///
    /// The staging file is never removed in this case: it holds the only
    /// complete copy of the new archive when the original was already deleted.
    #[error(
        "Failed to move '{}' into place at '{}'; the new archive was kept at the staging path",
        staged.display(),
        target.display()
    )]
    ReplaceFailed {
        /// The staging file holding the new archive.
        staged: PathBuf,
        /// The canonical destination.
        target: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The file was committed but could not be loaded back into the editor.
    ///
    /// The file on disk is valid; only the in-memory view is stale.
    #[error("Saved '{}' but failed to reload it: {source}", path.display())]
    ReloadFailed {
        /// The committed file.
        path: PathBuf,
        /// Why the reload failed.
        #[source]
        source: Box<Error>,
    },

    /// A stored unit body was requested after its source file was released.
    #[error("Unit '{name}' is not loaded and its source file was released")]
    Detached {
        /// Name of the unit whose bytes were requested.
        name: String,
    },
}

impl Error {
    /// Returns true if the user cancelled the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::ProfileUnresolved)
    }

    /// Returns true if the error was raised before any file was touched.
    pub fn is_pre_io(&self) -> bool {
        matches!(
            self,
            Error::ProfileUnresolved | Error::InvalidVersion { .. } | Error::InvalidKey(_)
        )
    }

    /// Returns true if the new file was committed despite the error.
    pub fn is_committed(&self) -> bool {
        matches!(self, Error::ReloadFailed { .. })
    }

    /// Returns true if decoding failed in a way that points at a cipher mismatch.
    pub fn is_cipher_mismatch(&self) -> bool {
        matches!(self, Error::CorruptUnit { .. } | Error::WrongCipher { .. })
    }

    /// Returns the staging file that holds recoverable data, if any.
    pub fn staged_path(&self) -> Option<&Path> {
        match self {
            Error::ReplaceFailed { staged, .. } => Some(staged),
            _ => None,
        }
    }

    /// Converts an I/O error on `path`, keeping access-denied failures distinct.
    pub(crate) fn from_io(source: io::Error, path: &Path) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            Error::PermissionDenied {
                path: path.to_path_buf(),
                source,
            }
        } else {
            Error::Io(source)
        }
    }

    /// Creates a CorruptUnit error.
    pub fn corrupt_unit(name: impl Into<String>, expected: u32, actual: u32) -> Self {
        Error::CorruptUnit {
            name: name.into(),
            expected,
            actual,
        }
    }
}

/// A specialized Result type for save operations.
pub type Result<T> = std::result::Result<T, Error>;
