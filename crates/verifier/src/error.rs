//! Error types for aggregation and reporting

use std::path::Path;

use thiserror::Error;

/// Result type alias for verifier operations
pub type Result<T> = std::result::Result<T, VerifyError>;

/// Fatal verifier errors.
///
/// A missing or unparseable results file is not one of these: it is logged
/// and left out of the comparison.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Malformed run list or unreadable results directory
    #[error("invalid run manifest: {reason}")]
    Manifest { reason: String },

    /// Report or suite could not be (de)serialized
    #[error("serialization error in {document}: {reason}")]
    Serialization { document: String, reason: String },

    /// Filesystem failure while reading inputs or writing a report
    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },
}

impl VerifyError {
    pub(crate) fn manifest(reason: impl Into<String>) -> Self {
        VerifyError::Manifest {
            reason: reason.into(),
        }
    }

    pub(crate) fn serialization(document: &str, reason: impl std::fmt::Display) -> Self {
        VerifyError::Serialization {
            document: document.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: &Path, reason: impl std::fmt::Display) -> Self {
        VerifyError::Io {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<docparity_core::Error> for VerifyError {
    fn from(e: docparity_core::Error) -> Self {
        match e {
            docparity_core::Error::Io { path, reason } => VerifyError::Io { path, reason },
            other => VerifyError::Serialization {
                document: "suite".to_string(),
                reason: other.to_string(),
            },
        }
    }
}
