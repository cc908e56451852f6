//! Error types for the docparity data model
//!
//! Covers value conversion and the on-disk suite / results documents.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::path::Path;
use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the data model
#[derive(Debug, Error)]
pub enum Error {
    /// A value could not be converted into the document model
    #[error("conversion error: {reason}")]
    Conversion {
        /// What went wrong
        reason: String,
    },

    /// A scalar kind the document model does not represent
    #[error("unsupported scalar: {kind}")]
    UnsupportedScalar {
        /// Description of the rejected scalar
        kind: String,
    },

    /// A suite or results document could not be (de)serialized
    #[error("serialization error in {document}: {reason}")]
    Serialization {
        /// Which document kind ("suite", "results")
        document: String,
        /// Underlying serializer message
        reason: String,
    },

    /// File read/write failure
    #[error("I/O error on {path}: {reason}")]
    Io {
        /// Path being accessed
        path: String,
        /// Underlying I/O message
        reason: String,
    },

    /// Two test cases in one suite share a name
    #[error("duplicate test name in suite: {name}")]
    DuplicateTestName {
        /// The repeated name
        name: String,
    },

    /// Mode string other than "api" or "wire"
    #[error("invalid mode '{mode}': expected 'api' or 'wire'")]
    InvalidMode {
        /// The rejected input
        mode: String,
    },
}

impl Error {
    /// Build a conversion error
    pub fn conversion(reason: impl Into<String>) -> Self {
        Error::Conversion {
            reason: reason.into(),
        }
    }

    /// Build an unsupported-scalar error
    pub fn unsupported_scalar(kind: impl Into<String>) -> Self {
        Error::UnsupportedScalar { kind: kind.into() }
    }

    /// Build a serialization error for the named document kind
    pub fn serialization(document: &str, err: impl std::fmt::Display) -> Self {
        Error::Serialization {
            document: document.to_string(),
            reason: err.to_string(),
        }
    }

    /// Build an I/O error for a path
    pub fn io(path: &Path, err: impl std::fmt::Display) -> Self {
        Error::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }

    /// True for serialization failures
    pub fn is_serialization(&self) -> bool {
        matches!(self, Error::Serialization { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unsupported_scalar() {
        let err = Error::unsupported_scalar("bytes");
        assert_eq!(err.to_string(), "unsupported scalar: bytes");
    }

    #[test]
    fn test_error_display_io_includes_path() {
        let err = Error::io(Path::new("/tmp/suite.json"), "not found");
        let msg = err.to_string();
        assert!(msg.contains("/tmp/suite.json"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn test_error_is_serialization() {
        assert!(Error::serialization("suite", "eof").is_serialization());
        assert!(!Error::conversion("x").is_serialization());
    }
}
