//! Store error types
//!
//! Every failure a [`crate::Store`] can report. Each variant maps to a numeric
//! code so the wire protocol can carry it in a command error reply.

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors reported by a store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The store could not be opened at the given location
    #[error("cannot open store at {location}: {reason}")]
    Open { location: String, reason: String },

    /// Operation attempted after `close`
    #[error("store is closed")]
    Closed,

    /// Insert or update would violate a unique index
    #[error("E11000 duplicate key error collection: {collection} index: {index} dup key: {key}")]
    DuplicateKey {
        collection: String,
        index: String,
        key: String,
    },

    /// Malformed filter or unknown query operator
    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    /// Malformed update document
    #[error("invalid update: {reason}")]
    InvalidUpdate { reason: String },

    /// Update tried to change `_id`
    #[error("performing an update on the path '_id' would modify the immutable field '_id'")]
    ImmutableId,

    /// Malformed aggregation pipeline
    #[error("invalid pipeline: {reason}")]
    InvalidPipeline { reason: String },

    /// Malformed index specification
    #[error("invalid index specification: {reason}")]
    InvalidIndex { reason: String },

    /// An index with the same name or keys already exists with different options
    #[error("index conflict: {reason}")]
    IndexConflict { reason: String },

    /// No index with the given name
    #[error("index not found with name [{name}]")]
    IndexNotFound { name: String },

    /// The collection does not exist
    #[error("ns does not exist: {collection}")]
    NamespaceNotFound { collection: String },

    /// The implicit `_id_` index cannot be dropped
    #[error("cannot drop _id index")]
    CannotDropIdIndex,
}

impl StoreError {
    /// Numeric error code carried in wire error replies
    pub fn code(&self) -> i32 {
        match self {
            StoreError::Open { .. } => 1,
            StoreError::InvalidQuery { .. }
            | StoreError::InvalidUpdate { .. }
            | StoreError::InvalidPipeline { .. } => 2,
            StoreError::NamespaceNotFound { .. } => 26,
            StoreError::IndexNotFound { .. } => 27,
            StoreError::ImmutableId => 66,
            StoreError::InvalidIndex { .. } => 67,
            StoreError::CannotDropIdIndex => 72,
            StoreError::IndexConflict { .. } => 85,
            StoreError::Closed => 91,
            StoreError::DuplicateKey { .. } => 11000,
        }
    }

    pub(crate) fn query(reason: impl Into<String>) -> Self {
        StoreError::InvalidQuery {
            reason: reason.into(),
        }
    }

    pub(crate) fn update(reason: impl Into<String>) -> Self {
        StoreError::InvalidUpdate {
            reason: reason.into(),
        }
    }

    pub(crate) fn pipeline(reason: impl Into<String>) -> Self {
        StoreError::InvalidPipeline {
            reason: reason.into(),
        }
    }

    pub(crate) fn index(reason: impl Into<String>) -> Self {
        StoreError::InvalidIndex {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key_message_and_code() {
        let err = StoreError::DuplicateKey {
            collection: "users".into(),
            index: "_id_".into(),
            key: "{ _id: \"a\" }".into(),
        };
        assert_eq!(err.code(), 11000);
        assert!(err.to_string().starts_with("E11000 duplicate key error"));
    }

    #[test]
    fn test_codes_are_distinct_for_index_errors() {
        assert_ne!(
            StoreError::CannotDropIdIndex.code(),
            StoreError::IndexNotFound { name: "x".into() }.code()
        );
    }
}
