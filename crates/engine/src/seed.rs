//! Seed snapshots
//!
//! A seed is a JSON document `{"collections": {"<name>": [documents...]}}`
//! loaded into a fresh in-memory store. Seeds are read-only inputs: nothing is
//! ever written back.

use std::collections::BTreeMap;
use std::path::Path;

use docparity_core::Document;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Collections and their initial documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedSnapshot {
    #[serde(default)]
    pub collections: BTreeMap<String, Vec<Document>>,
}

impl SeedSnapshot {
    /// Parse a seed document; `location` only labels errors
    pub fn from_json_str(location: &str, s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| StoreError::Open {
            location: location.to_string(),
            reason: format!("invalid seed document: {}", e),
        })
    }

    /// Read a seed file
    pub fn load(path: &Path) -> Result<Self> {
        let location = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::Open {
            location: location.clone(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&location, &content)
    }

    /// Total number of documents across collections
    pub fn document_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed() {
        let seed = SeedSnapshot::from_json_str(
            "inline",
            r#"{"collections": {"users": [{"_id": "u1"}, {"_id": "u2"}], "empty": []}}"#,
        )
        .unwrap();
        assert_eq!(seed.collections.len(), 2);
        assert_eq!(seed.document_count(), 2);
    }

    #[test]
    fn test_bad_seed_is_open_error() {
        let err = SeedSnapshot::from_json_str("inline", "[1, 2]").unwrap_err();
        assert!(matches!(err, StoreError::Open { .. }));
    }

    #[test]
    fn test_missing_seed_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SeedSnapshot::load(&dir.path().join("absent.json")).unwrap_err();
        match err {
            StoreError::Open { location, .. } => assert!(location.ends_with("absent.json")),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
