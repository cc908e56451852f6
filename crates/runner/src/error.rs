//! Error types for test execution.
//!
//! Two families, matching how far an error is allowed to travel:
//!
//! | Type | Scope | Handling |
//! |------|-------|----------|
//! | [`ActionError`] | one test case (setup or action) | captured into its `TestResult` |
//! | [`HarnessError`] | the whole run | terminates the process, no results written |

use docparity_engine::StoreError;
use docparity_wire::WireError;
use thiserror::Error;

/// Per-test failure. Never escapes `Runner::run_test`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    /// An argument is missing or has the wrong shape
    #[error("invalid argument for {method}: {reason}")]
    InvalidArgument { method: String, reason: String },

    /// The method name is not one of the supported operations
    #[error("unsupported operation: {method}")]
    UnsupportedOperation { method: String },

    /// The setup operation name is not supported
    #[error("unsupported setup operation: {operation}")]
    UnsupportedSetup { operation: String },

    /// The store rejected the call
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The wire round trip failed
    #[error(transparent)]
    Wire(#[from] WireError),
}

impl ActionError {
    pub(crate) fn invalid(method: &str, reason: impl Into<String>) -> Self {
        ActionError::InvalidArgument {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}

/// Run-level failure: configuration, serialization or I/O.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Invalid or inconsistent configuration
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    /// The store could not be opened
    #[error("cannot open store: {0}")]
    StoreOpen(StoreError),

    /// The protocol server could not be started
    #[error("cannot start protocol server: {0}")]
    ServerStart(WireError),

    /// The client could not connect to the server
    #[error("cannot connect protocol client: {0}")]
    ClientConnect(WireError),

    /// Suite or results document could not be (de)serialized
    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    /// Releasing the client, server or store failed
    #[error("teardown of {component} failed: {reason}")]
    Teardown { component: String, reason: String },

    /// File or runtime I/O failure
    #[error("I/O error: {reason}")]
    Io { reason: String },
}

impl HarnessError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        HarnessError::Configuration {
            reason: reason.into(),
        }
    }
}

impl HarnessError {
    pub(crate) fn teardown(component: &str, reason: impl std::fmt::Display) -> Self {
        HarnessError::Teardown {
            component: component.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<docparity_core::Error> for HarnessError {
    fn from(e: docparity_core::Error) -> Self {
        match e {
            docparity_core::Error::Io { .. } => HarnessError::Io {
                reason: e.to_string(),
            },
            docparity_core::Error::Serialization { .. }
            | docparity_core::Error::Conversion { .. }
            | docparity_core::Error::UnsupportedScalar { .. } => HarnessError::Serialization {
                reason: e.to_string(),
            },
            other => HarnessError::Configuration {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_is_transparent() {
        let err = ActionError::from(StoreError::IndexNotFound {
            name: "x_1".into(),
        });
        assert_eq!(err.to_string(), "index not found with name [x_1]");
    }

    #[test]
    fn test_core_errors_map_to_harness_categories() {
        let io = HarnessError::from(docparity_core::Error::Io {
            path: "a".into(),
            reason: "gone".into(),
        });
        assert!(matches!(io, HarnessError::Io { .. }));

        let dup = HarnessError::from(docparity_core::Error::DuplicateTestName { name: "t".into() });
        assert!(matches!(dup, HarnessError::Configuration { .. }));
    }
}
