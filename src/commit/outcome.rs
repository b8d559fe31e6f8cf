//! Save states and outcomes.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// The steps a save passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SaveState {
    /// Request accepted; nothing resolved yet.
    Idle,
    /// Version validated and profile resolved.
    ProfileResolved,
    /// Dirty flags propagated (hierarchies only).
    Propagated,
    /// The new file is completely written to a side file.
    Written,
    /// The new file is at the target path.
    Replaced,
    /// The target was loaded back into the caller's unit.
    Reloaded,
    /// Finished.
    Done,
}

impl SaveState {
    /// Returns a short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveState::Idle => "idle",
            SaveState::ProfileResolved => "profile-resolved",
            SaveState::Propagated => "propagated",
            SaveState::Written => "written",
            SaveState::Replaced => "replaced",
            SaveState::Reloaded => "reloaded",
            SaveState::Done => "done",
        }
    }
}

impl fmt::Display for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The terminal result of one save request.
#[derive(Debug)]
pub enum CommitOutcome {
    /// The file at the path is the new archive and the unit is bound to it.
    Committed(PathBuf),
    /// The save stopped.
    Aborted {
        /// The last state reached before the failure.
        state: SaveState,
        /// What went wrong.
        error: Error,
    },
}

impl CommitOutcome {
    /// Returns true if the save finished.
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed(_))
    }

    /// Returns true if the new file is on disk, even if the save aborted.
    pub fn file_committed(&self) -> bool {
        match self {
            CommitOutcome::Committed(_) => true,
            CommitOutcome::Aborted { state, error } => {
                *state >= SaveState::Replaced || error.is_committed()
            }
        }
    }

    /// Returns the committed path.
    pub fn path(&self) -> Option<&Path> {
        match self {
            CommitOutcome::Committed(path) => Some(path),
            CommitOutcome::Aborted { .. } => None,
        }
    }

    /// Returns the error of an aborted save.
    pub fn error(&self) -> Option<&Error> {
        match self {
            CommitOutcome::Committed(_) => None,
            CommitOutcome::Aborted { error, .. } => Some(error),
        }
    }

    /// Converts into a `Result`.
    pub fn into_result(self) -> Result<PathBuf> {
        match self {
            CommitOutcome::Committed(path) => Ok(path),
            CommitOutcome::Aborted { error, .. } => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_order() {
        assert!(SaveState::Idle < SaveState::ProfileResolved);
        assert!(SaveState::Written < SaveState::Replaced);
        assert!(SaveState::Reloaded < SaveState::Done);
        assert_eq!(SaveState::ProfileResolved.to_string(), "profile-resolved");
    }

    #[test]
    fn test_reload_failure_is_committed() {
        let outcome = CommitOutcome::Aborted {
            state: SaveState::Replaced,
            error: Error::ReloadFailed {
                path: "a.wz".into(),
                source: Box::new(Error::InvalidFormat("bad".into())),
            },
        };
        assert!(!outcome.is_committed());
        assert!(outcome.file_committed());
        assert!(outcome.path().is_none());
        assert!(outcome.into_result().is_err());
    }

    #[test]
    fn test_cancelled_is_not_committed() {
        let outcome = CommitOutcome::Aborted {
            state: SaveState::Idle,
            error: Error::ProfileUnresolved,
        };
        assert!(!outcome.file_committed());
        assert!(outcome.error().is_some_and(Error::is_cancelled));
    }

    #[test]
    fn test_committed() {
        let outcome = CommitOutcome::Committed("b.wz".into());
        assert!(outcome.is_committed());
        assert_eq!(outcome.path(), Some(Path::new("b.wz")));
        assert_eq!(outcome.into_result().unwrap(), PathBuf::from("b.wz"));
    }
}
