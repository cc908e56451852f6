//! Cross-run aggregation
//!
//! A test is consistent when no run that reports it reports a failure. Runs
//! that never mention a test are left out of its verdict entirely, so a test
//! seen by a single passing run is consistent.
//!
//! Per-implementation and per-mode statistics are sums of each results file's
//! own `summary` block. They are not recomputed from the result lists and may
//! therefore disagree with the matrix when a file's summary is off.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use docparity_core::{ResultsFile, TestResult, TestSuite};
use tracing::{info, warn};

use crate::manifest::RunManifest;
use crate::report::{Comparison, FailureDetail, Report, ReportSummary, Stats};

/// Category assigned to tests the suite does not know
pub const UNCATEGORIZED: &str = "uncategorized";

/// What to compare
#[derive(Debug, Clone, Default)]
pub struct VerifierConfig {
    pub manifest: RunManifest,
    /// Suite used to group verdicts by category
    pub suite: Option<TestSuite>,
}

/// A results file that loaded successfully
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRun {
    pub key: String,
    pub results: ResultsFile,
}

/// Builds a [`Report`] from the runs named in a [`VerifierConfig`]
pub struct Aggregator {
    config: VerifierConfig,
}

impl Aggregator {
    pub fn new(config: VerifierConfig) -> Self {
        Aggregator { config }
    }

    /// Read every run in the manifest, skipping the ones that cannot be used
    pub fn load(&self) -> Vec<LoadedRun> {
        let mut runs = Vec::with_capacity(self.config.manifest.len());
        for entry in self.config.manifest.entries() {
            if !entry.path.exists() {
                warn!(
                    target: "docparity::verifier",
                    run = %entry.key,
                    path = %entry.path.display(),
                    "Results file missing, skipping"
                );
                continue;
            }
            match ResultsFile::load(&entry.path) {
                Ok(results) => {
                    info!(
                        target: "docparity::verifier",
                        run = %entry.key,
                        tests = results.results.len(),
                        "Loaded results"
                    );
                    runs.push(LoadedRun {
                        key: entry.key.clone(),
                        results,
                    });
                }
                Err(err) => warn!(
                    target: "docparity::verifier",
                    run = %entry.key,
                    error = %err,
                    "Results file unusable, skipping"
                ),
            }
        }
        runs
    }

    /// Load the manifest and compare everything that loaded
    pub fn run(&self) -> Report {
        let runs = self.load();
        self.compare(&runs, Utc::now())
    }

    /// Compare already-loaded runs
    pub fn compare(&self, runs: &[LoadedRun], generated: DateTime<Utc>) -> Report {
        // test name -> run key -> result
        let mut matrix: BTreeMap<&str, BTreeMap<&str, &TestResult>> = BTreeMap::new();
        for run in runs {
            for result in &run.results.results {
                matrix
                    .entry(result.test_name.as_str())
                    .or_default()
                    .insert(run.key.as_str(), result);
            }
        }

        let categories = self.categories();
        let mut comparisons = Vec::with_capacity(matrix.len());
        let mut failures = Vec::new();
        let mut by_category: BTreeMap<String, Stats> = BTreeMap::new();
        let (mut passed, mut failed) = (0u64, 0u64);

        for (name, by_run) in &matrix {
            let runs: BTreeMap<String, bool> = by_run
                .iter()
                .map(|(key, r)| (key.to_string(), r.success))
                .collect();
            let failing: BTreeMap<String, String> = by_run
                .iter()
                .filter(|(_, r)| !r.success)
                .map(|(key, r)| (key.to_string(), r.error.clone()))
                .collect();
            let consistent = failing.is_empty();

            if consistent {
                passed += 1;
            } else {
                failed += 1;
                failures.push(FailureDetail {
                    test_name: name.to_string(),
                    failures: failing,
                });
            }

            if let Some(categories) = &categories {
                let category = categories
                    .get(name)
                    .filter(|c| !c.is_empty())
                    .copied()
                    .unwrap_or(UNCATEGORIZED);
                let stats = by_category.entry(category.to_string()).or_default();
                stats.total += 1;
                if consistent {
                    stats.passed += 1;
                } else {
                    stats.failed += 1;
                }
            }

            comparisons.push(Comparison {
                test_name: name.to_string(),
                runs,
                consistent,
            });
        }

        let mut by_implementation: BTreeMap<String, Stats> = BTreeMap::new();
        let mut by_mode: BTreeMap<String, Stats> = BTreeMap::new();
        for run in runs {
            let summary = &run.results.summary;
            for stats in [
                by_implementation
                    .entry(run.results.implementation.clone())
                    .or_default(),
                by_mode.entry(run.results.mode.to_string()).or_default(),
            ] {
                stats.total += summary.total;
                stats.passed += summary.passed;
                stats.failed += summary.failed;
            }
        }

        let summary = ReportSummary::new(passed, failed);
        info!(
            target: "docparity::verifier",
            runs = runs.len(),
            tests = summary.total_tests,
            inconsistent = summary.total_failed,
            "Aggregation complete"
        );

        Report {
            generated,
            summary,
            by_category,
            by_implementation,
            by_mode,
            comparisons,
            failures,
        }
    }

    fn categories(&self) -> Option<BTreeMap<&str, &str>> {
        self.config.suite.as_ref().map(|suite| {
            suite
                .tests
                .iter()
                .map(|t| (t.name.as_str(), t.category.as_str()))
                .collect()
        })
    }
}

/// Run keys present in `runs`
pub fn run_keys(runs: &[LoadedRun]) -> BTreeSet<&str> {
    runs.iter().map(|r| r.key.as_str()).collect()
}
