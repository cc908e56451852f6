//! Consistency report document

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VerifyError};

/// Global verdict counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_tests: u64,
    pub total_passed: u64,
    pub total_failed: u64,
    /// `total_passed / total_tests * 100`, zero when there are no tests
    pub consistency_rate: f64,
}

impl ReportSummary {
    pub fn new(total_passed: u64, total_failed: u64) -> Self {
        let total_tests = total_passed + total_failed;
        ReportSummary {
            total_tests,
            total_passed,
            total_failed,
            consistency_rate: rate(total_passed, total_tests),
        }
    }
}

/// Pass rate in percent; zero for an empty denominator
pub fn rate(passed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64 * 100.0
    }
}

/// Total / passed / failed for one grouping key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
}

impl Stats {
    pub fn pass_rate(&self) -> f64 {
        rate(self.passed, self.total)
    }
}

/// One row of the comparison matrix.
///
/// `runs` only has entries for runs that report this test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub test_name: String,
    #[serde(flatten)]
    pub runs: BTreeMap<String, bool>,
    pub consistent: bool,
}

/// Error messages of every run that failed one inconsistent test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub test_name: String,
    pub failures: BTreeMap<String, String>,
}

/// The aggregated consistency report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub generated: DateTime<Utc>,
    pub summary: ReportSummary,
    #[serde(default)]
    pub by_category: BTreeMap<String, Stats>,
    #[serde(default)]
    pub by_implementation: BTreeMap<String, Stats>,
    #[serde(default)]
    pub by_mode: BTreeMap<String, Stats>,
    #[serde(default)]
    pub comparisons: Vec<Comparison>,
    #[serde(default)]
    pub failures: Vec<FailureDetail>,
}

impl Report {
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| VerifyError::serialization("report", e))
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| VerifyError::serialization("report", e))
    }

    /// Read a report from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| VerifyError::io(path, e))?;
        Self::from_json_str(&content)
    }

    /// Write the JSON form, creating parent directories as needed
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let content = self.to_json_string()?;
        write_file(path, &content)
    }

    /// Look up the comparison row for a test
    pub fn comparison(&self, test_name: &str) -> Option<&Comparison> {
        self.comparisons.iter().find(|c| c.test_name == test_name)
    }

    pub fn is_consistent(&self) -> bool {
        self.summary.total_failed == 0
    }
}

pub(crate) fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| VerifyError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| VerifyError::io(path, e))
}
