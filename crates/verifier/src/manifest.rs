//! Run manifest: which results files take part in a comparison
//!
//! A manifest is either discovered from a directory (every `*.json` file, keyed
//! by file stem) or given explicitly as `key=path` / `path` entries. Entries are
//! only names and paths; nothing is read until aggregation.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{Result, VerifyError};

/// Field names of a comparison row; run keys share that object
pub const RESERVED_KEYS: [&str; 2] = ["test_name", "consistent"];

/// One named run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEntry {
    /// Run key, e.g. `go_api`
    pub key: String,
    pub path: PathBuf,
}

/// Ordered set of runs with unique keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunManifest {
    entries: Vec<RunEntry>,
}

impl RunManifest {
    pub fn new() -> Self {
        RunManifest::default()
    }

    /// Every `*.json` file directly inside `dir`, sorted by key
    pub fn scan_dir(dir: &Path) -> Result<Self> {
        let read = std::fs::read_dir(dir).map_err(|e| VerifyError::io(dir, e))?;
        let mut found = Vec::new();
        for entry in read {
            let entry = entry.map_err(|e| VerifyError::io(dir, e))?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(key) = stem(&path) {
                found.push(RunEntry { key, path });
            }
        }
        found.sort_by(|a, b| a.key.cmp(&b.key));

        let mut manifest = RunManifest::new();
        for entry in found {
            manifest.push(entry.key, entry.path)?;
        }
        Ok(manifest)
    }

    /// Parse `key=path` or bare `path` entries; a bare path is keyed by its stem
    pub fn from_entries<S: AsRef<str>>(specs: &[S]) -> Result<Self> {
        let mut manifest = RunManifest::new();
        for spec in specs {
            let spec = spec.as_ref().trim();
            if spec.is_empty() {
                return Err(VerifyError::manifest("empty run entry"));
            }
            let (key, path) = match spec.split_once('=') {
                Some((key, path)) => (key.trim().to_string(), PathBuf::from(path.trim())),
                None => {
                    let path = PathBuf::from(spec);
                    let key = stem(&path).ok_or_else(|| {
                        VerifyError::manifest(format!("cannot derive a run key from '{}'", spec))
                    })?;
                    (key, path)
                }
            };
            manifest.push(key, path)?;
        }
        Ok(manifest)
    }

    /// Add a run; keys must be non-empty, unique and not reserved
    pub fn push(&mut self, key: impl Into<String>, path: impl Into<PathBuf>) -> Result<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(VerifyError::manifest("run key must not be empty"));
        }
        if RESERVED_KEYS.contains(&key.as_str()) {
            return Err(VerifyError::manifest(format!(
                "run key '{}' is reserved for report fields",
                key
            )));
        }
        if self.entries.iter().any(|e| e.key == key) {
            return Err(VerifyError::manifest(format!("duplicate run key '{}'", key)));
        }
        self.entries.push(RunEntry {
            key,
            path: path.into(),
        });
        Ok(())
    }

    pub fn entries(&self) -> &[RunEntry] {
        &self.entries
    }

    pub fn keys(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|e| e.key.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
