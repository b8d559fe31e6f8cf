//! Exit codes for the CLI tool.

use wzsave::Error;

/// Exit code constants
pub const SUCCESS: i32 = 0;
/// Saved, but the new file could not be reloaded
pub const WARNING: i32 = 1;
/// Fatal error occurred
pub const FATAL_ERROR: i32 = 2;
/// Archive format error
pub const BAD_ARCHIVE: i32 = 3;
/// File is not encrypted with the given profile
pub const WRONG_KEY: i32 = 4;
/// I/O error
pub const IO_ERROR: i32 = 5;
/// Custom key entry was cancelled
pub const CANCELLED: i32 = 6;
/// Ctrl+C (128 + SIGINT)
pub const USER_INTERRUPT: i32 = 130;
/// Invalid command line arguments
pub const BAD_ARGS: i32 = 255;

/// Exit code enum for structured handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    Warning,
    FatalError,
    BadArchive,
    WrongKey,
    IoError,
    Cancelled,
    UserInterrupt,
    BadArgs,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::Warning => WARNING,
            Self::FatalError => FATAL_ERROR,
            Self::BadArchive => BAD_ARCHIVE,
            Self::WrongKey => WRONG_KEY,
            Self::IoError => IO_ERROR,
            Self::Cancelled => CANCELLED,
            Self::UserInterrupt => USER_INTERRUPT,
            Self::BadArgs => BAD_ARGS,
        }
    }
}

/// Converts a wzsave error to an exit code
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Io(_) | Error::PermissionDenied { .. } => ExitCode::IoError,
        Error::ReplaceFailed { .. } => ExitCode::IoError,
        Error::InvalidFormat(_) | Error::Detached { .. } => ExitCode::BadArchive,
        Error::CorruptUnit { .. } | Error::WrongCipher { .. } => ExitCode::WrongKey,
        Error::ProfileUnresolved => ExitCode::Cancelled,
        Error::InvalidKey(_) | Error::InvalidVersion { .. } => ExitCode::BadArgs,
        Error::Codec(_) => ExitCode::FatalError,
        Error::WriteFailed { source, .. } => error_to_exit_code(source),
        Error::ReloadFailed { .. } => ExitCode::Warning,
        // Future error variants - required by #[non_exhaustive]
        _ => ExitCode::FatalError,
    }
}
