//! Verifier behavior over results files on disk.

#[path = "../common/mod.rs"]
mod common;

use std::collections::BTreeSet;

use common::*;
use docparity::{
    render_markdown, run_suite, Aggregator, Mode, Report, ResultsFile, RunManifest, Runner,
    TestResult, VerifierConfig,
};
use proptest::prelude::*;

fn result(name: &str, implementation: &str, mode: Mode, success: bool) -> TestResult {
    let mut r = TestResult::new(name, implementation, mode);
    r.success = success;
    if !success {
        r.error = format!("{} broke", name);
    }
    r
}

fn write_run(dir: &std::path::Path, key: &str, file: &ResultsFile) -> std::path::PathBuf {
    let path = dir.join(format!("{}.json", key));
    file.write_json(&path).unwrap();
    path
}

#[test]
fn single_file_report_mirrors_its_results() {
    let dir = temp_dir();
    let file = ResultsFile::new(
        "go",
        Mode::Api,
        vec![
            result("a", "go", Mode::Api, true),
            result("b", "go", Mode::Api, false),
            result("c", "go", Mode::Api, true),
        ],
    );
    write_run(dir.path(), "go_api", &file);

    let manifest = RunManifest::scan_dir(dir.path()).unwrap();
    let report = Aggregator::new(VerifierConfig { manifest, suite: None }).run();

    assert_eq!(report.summary.total_tests, 3);
    assert_eq!(report.summary.total_passed, 2);
    assert_eq!(report.summary.total_failed, 1);
    assert_eq!(report.failures[0].failures["go_api"], "b broke");
    assert_eq!(report.by_implementation["go"].total, 3);
    assert_eq!(report.by_mode["api"].failed, 1);
}

#[test]
fn missing_run_is_skipped_not_fatal() {
    let dir = temp_dir();
    let file = ResultsFile::new("rust", Mode::Wire, vec![result("a", "rust", Mode::Wire, true)]);
    let present = write_run(dir.path(), "rust_wire", &file);

    let manifest = RunManifest::from_entries(&[
        format!("rust_wire={}", present.display()),
        format!("go_wire={}", dir.path().join("go_wire.json").display()),
    ])
    .unwrap();
    let report = Aggregator::new(VerifierConfig { manifest, suite: None }).run();
    assert_eq!(report.summary.total_tests, 1);
    assert!(report.is_consistent());
}

#[test]
fn harness_runs_feed_the_verifier_end_to_end() {
    let dir = temp_dir();
    let suite = fixture_suite();
    for mode in MODES {
        let mut runner = seeded_runner(mode);
        let results = run_suite(runner.as_mut(), &suite);
        runner.close().unwrap();
        results
            .write_json(dir.path().join(format!("rust_{}.json", mode)))
            .unwrap();
    }

    let manifest = RunManifest::scan_dir(dir.path()).unwrap();
    assert_eq!(manifest.keys(), BTreeSet::from(["rust_api", "rust_wire"]));
    let report = Aggregator::new(VerifierConfig {
        manifest,
        suite: Some(suite.clone()),
    })
    .run();

    assert_eq!(report.summary.total_tests, suite.len() as u64);
    assert!(report.is_consistent(), "failures: {:?}", report.failures);
    assert_eq!(report.summary.consistency_rate, 100.0);
    assert_eq!(report.by_mode.len(), 2);
    assert_eq!(report.by_category["aggregate"].total, 5);

    let json_path = dir.path().join("out").join("report.json");
    report.write_json(&json_path).unwrap();
    let back = Report::load(&json_path).unwrap();
    assert_eq!(back.summary, report.summary);
    assert_eq!(back.comparisons, report.comparisons);

    let md = render_markdown(&report);
    assert!(md.contains("| Test | rust_api | rust_wire | Consistent |"));
    assert!(!md.contains("## Failure Details"));
}

#[test]
fn run_key_colliding_with_row_fields_is_rejected() {
    let dir = temp_dir();
    let file = ResultsFile::new("go", Mode::Api, vec![result("a", "go", Mode::Api, true)]);
    write_run(dir.path(), "go_api", &file);
    write_run(dir.path(), "consistent", &file);

    let err = RunManifest::scan_dir(dir.path()).unwrap_err();
    assert!(err.to_string().contains("reserved"), "{}", err);

    // every accepted key keeps the report readable
    std::fs::remove_file(dir.path().join("consistent.json")).unwrap();
    let manifest = RunManifest::scan_dir(dir.path()).unwrap();
    let report = Aggregator::new(VerifierConfig { manifest, suite: None }).run();
    let back = Report::from_json_str(&report.to_json_string().unwrap()).unwrap();
    assert_eq!(back.comparisons, report.comparisons);
}

#[test]
fn language_alias_is_accepted_in_results_files() {
    let dir = temp_dir();
    let path = dir.path().join("go_api.json");
    std::fs::write(
        &path,
        r#"{"language":"go","mode":"api",
            "results":[{"test_name":"a","language":"go","mode":"api","success":true}],
            "summary":{"total":1,"passed":1,"failed":0,"skipped":0}}"#,
    )
    .unwrap();
    let manifest = RunManifest::scan_dir(dir.path()).unwrap();
    let report = Aggregator::new(VerifierConfig { manifest, suite: None }).run();
    assert_eq!(report.by_implementation["go"].passed, 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// With disjoint test sets and truthful summaries, the report's verdict
    /// counts equal the sums over all files.
    #[test]
    fn prop_disjoint_files_sum(outcomes in prop::collection::vec(prop::collection::vec(any::<bool>(), 0..8), 1..5)) {
        let dir = temp_dir();
        let mut manifest = RunManifest::new();
        let (mut passed, mut failed) = (0u64, 0u64);
        for (i, run) in outcomes.iter().enumerate() {
            let results = run
                .iter()
                .enumerate()
                .map(|(j, ok)| result(&format!("run{}_test{}", i, j), "rust", Mode::Api, *ok))
                .collect::<Vec<_>>();
            passed += run.iter().filter(|ok| **ok).count() as u64;
            failed += run.iter().filter(|ok| !**ok).count() as u64;
            let key = format!("run{}", i);
            let path = write_run(dir.path(), &key, &ResultsFile::new("rust", Mode::Api, results));
            manifest.push(key, path).unwrap();
        }

        let report = Aggregator::new(VerifierConfig { manifest, suite: None }).run();
        prop_assert_eq!(report.summary.total_tests, passed + failed);
        prop_assert_eq!(report.summary.total_passed, passed);
        prop_assert_eq!(report.summary.total_failed, failed);
        prop_assert_eq!(report.failures.len() as u64, failed);
        prop_assert_eq!(report.by_mode["api"].total, passed + failed);
    }
}
