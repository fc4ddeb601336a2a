//! Error types for archive operations.

use thiserror::Error;

/// Archive operation result type
pub type Result<T> = std::result::Result<T, Error>;

/// Archive operation errors
#[derive(Error, Debug)]
pub enum Error {
    /// Open, seek, read or write failed at the OS boundary
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Header JSON or an entry's metadata is malformed
    #[error("Invalid archive: {0}")]
    Format(String),

    /// Path does not resolve in the directory tree
    #[error("File '{0}' not found in the archive")]
    NotFound(String),

    /// Path resolves to a directory where file content was expected
    #[error("'{0}' is a directory")]
    IsDirectory(String),

    /// Patch content does not match the entry's declared size
    #[error("Content for '{path}' is {actual} bytes but the entry holds {expected} bytes")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },

    /// Too many symbolic links followed while resolving a path
    #[error("Too many levels of links while resolving '{0}'")]
    LinkLoop(String),
}

impl Error {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Error::Format(message.into())
    }

    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        // serde_json reports truncated input as EOF; that is still a bad header
        Error::Format(format!("header JSON: {err}"))
    }
}
