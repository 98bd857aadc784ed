//! Error types for vwbackup-core

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using vwbackup-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while building or encrypting a backup
#[derive(Error, Debug)]
pub enum Error {
    /// One or more tokens in a target specification were not recognized
    #[error("unsupported backup targets: {}", .tokens.join(", "))]
    UnsupportedTargets { tokens: Vec<String> },

    /// Stat, open, read or write failure on a required path
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The payload streamed for an entry did not match its declared size
    #[error("size mismatch for archive entry '{}': declared {declared} bytes, {}", .path.display(), size_detail(.provided, .more_available))]
    SizeMismatch {
        path: PathBuf,
        declared: u64,
        provided: u64,
        more_available: bool,
    },

    /// Invalid glob pattern for a file-pattern target
    #[error("invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// Directory traversal failed
    #[error("failed to walk '{}': {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Opening, copying or closing the live database failed
    #[error("database snapshot of '{}' failed: {source}", .path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Key derivation or cipher failure
    #[error("encryption failed: {message}")]
    Encryption { message: String },

    /// Removing a temporary or plaintext file failed after the main work succeeded
    #[error("cleanup of '{}' failed: {source}", .path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Path cannot be handed to the database engine
    #[error("path is not valid UTF-8: {}", .path.display())]
    NonUtf8Path { path: PathBuf },
}

impl Error {
    /// Create an I/O error bound to a path
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a snapshot error bound to the live database path
    pub fn snapshot(path: impl AsRef<Path>, source: rusqlite::Error) -> Self {
        Self::Snapshot {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create an encryption error
    pub fn encryption(message: impl Into<String>) -> Self {
        Self::Encryption {
            message: message.into(),
        }
    }

    /// Create a cleanup error
    pub fn cleanup(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Cleanup {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Returns true if this error is a target specification parse error
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::UnsupportedTargets { .. })
    }
}

fn size_detail(provided: &u64, more_available: &bool) -> String {
    if *more_available {
        "source has more data than declared".to_string()
    } else {
        format!("source ended after {} bytes", provided)
    }
}

/// Attach a path to an `io::Result`
pub(crate) trait IoResultExt<T> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| Error::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_targets_message_lists_all_tokens() {
        let err = Error::UnsupportedTargets {
            tokens: vec!["bogus".to_string(), "nope".to_string()],
        };
        assert_eq!(err.to_string(), "unsupported backup targets: bogus, nope");
        assert!(err.is_parse_error());
    }

    #[test]
    fn test_size_mismatch_message() {
        let short = Error::SizeMismatch {
            path: PathBuf::from("data/config.json"),
            declared: 10,
            provided: 4,
            more_available: false,
        };
        assert!(short.to_string().contains("ended after 4 bytes"));

        let grown = Error::SizeMismatch {
            path: PathBuf::from("data/config.json"),
            declared: 10,
            provided: 10,
            more_available: true,
        };
        assert!(grown.to_string().contains("more data than declared"));
    }

    #[test]
    fn test_io_error_carries_path() {
        let err = Error::io(
            "/srv/data/config.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/srv/data/config.json"));
        assert!(msg.contains("denied"));
        assert!(!err.is_parse_error());
    }
}
