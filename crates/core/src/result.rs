//! Test results and results files
//!
//! A [`TestResult`] is produced exactly once per (test case, runner) execution.
//! A [`ResultsFile`] collects every result of one run together with its summary
//! counters and is written once when the run completes.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::Value;

/// Access path used by a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Direct in-process calls against the store
    Api,
    /// Requests over the wire protocol
    Wire,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Api => "api",
            Mode::Wire => "wire",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "api" => Ok(Mode::Api),
            "wire" => Ok(Mode::Wire),
            _ => Err(Error::InvalidMode {
                mode: s.to_string(),
            }),
        }
    }
}

/// Normalized outcome of one test case under one runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_name: String,
    #[serde(alias = "language")]
    pub implementation: String,
    pub mode: Mode,
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<Value>,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub matched_count: i64,
    #[serde(default)]
    pub modified_count: i64,
    #[serde(default)]
    pub deleted_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upserted_id: Option<Value>,
}

impl TestResult {
    /// A not-yet-successful result with every count zeroed
    pub fn new(test_name: impl Into<String>, implementation: impl Into<String>, mode: Mode) -> Self {
        TestResult {
            test_name: test_name.into(),
            implementation: implementation.into(),
            mode,
            success: false,
            error: String::new(),
            duration_ms: 0,
            documents: Vec::new(),
            count: 0,
            matched_count: 0,
            modified_count: 0,
            deleted_count: 0,
            upserted_id: None,
        }
    }

    /// Mark the result failed with a message
    pub fn fail(&mut self, message: impl Into<String>) {
        self.success = false;
        self.error = message.into();
    }
}

/// Pass/fail counters of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Summary {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl Summary {
    /// Count results; nothing is ever skipped by the runners
    pub fn from_results(results: &[TestResult]) -> Self {
        let passed = results.iter().filter(|r| r.success).count() as u64;
        let total = results.len() as u64;
        Summary {
            total,
            passed,
            failed: total - passed,
            skipped: 0,
        }
    }

    /// Add another summary's counters into this one
    pub fn absorb(&mut self, other: &Summary) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Serialized outcome of running a whole suite once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsFile {
    #[serde(alias = "language")]
    pub implementation: String,
    pub mode: Mode,
    #[serde(default)]
    pub results: Vec<TestResult>,
    #[serde(default)]
    pub summary: Summary,
}

impl ResultsFile {
    /// Build a results file, computing the summary from `results`
    pub fn new(implementation: impl Into<String>, mode: Mode, results: Vec<TestResult>) -> Self {
        let summary = Summary::from_results(&results);
        ResultsFile {
            implementation: implementation.into(),
            mode,
            results,
            summary,
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::serialization("results", e))
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::serialization("results", e))
    }

    /// Read a results file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json_str(&content)
    }

    /// Write the results file, creating parent directories as needed
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = self.to_json_string()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        std::fs::write(path, content).map_err(|e| Error::io(path, e))
    }

    /// Look up the result for a test name
    pub fn get(&self, test_name: &str) -> Option<&TestResult> {
        self.results.iter().find(|r| r.test_name == test_name)
    }
}
