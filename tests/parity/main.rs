//! Runs the shipped fixture suite through both access paths and checks that
//! the two results files agree test by test.

#[path = "../common/mod.rs"]
mod common;

use common::*;
use docparity::{run_suite, Mode, ResultsFile, Runner, TestSuite};

fn run(mode: Mode, suite: &TestSuite) -> ResultsFile {
    let mut runner = seeded_runner(mode);
    let results = run_suite(runner.as_mut(), suite);
    runner.close().unwrap();
    results
}

#[test]
fn fixture_suite_passes_in_both_modes() {
    let suite = fixture_suite();
    for mode in MODES {
        let results = run(mode, &suite);
        let failed: Vec<_> = results
            .results
            .iter()
            .filter(|r| !r.success)
            .map(|r| format!("{}: {}", r.test_name, r.error))
            .collect();
        assert!(failed.is_empty(), "[{}] failures: {:#?}", mode, failed);
        assert_eq!(results.summary.total, suite.len() as u64);
        assert_eq!(results.mode, mode);
    }
}

#[test]
fn api_and_wire_results_agree() {
    let suite = fixture_suite();
    let api = run(Mode::Api, &suite);
    let wire = run(Mode::Wire, &suite);

    assert_eq!(api.results.len(), wire.results.len());
    for (a, w) in api.results.iter().zip(&wire.results) {
        assert_eq!(a.test_name, w.test_name);
        let name = &a.test_name;
        assert_eq!(a.success, w.success, "{}: success differs", name);
        assert_eq!(a.error.is_empty(), w.error.is_empty(), "{}: error presence differs", name);
        assert_eq!(a.count, w.count, "{}: count differs", name);
        assert_eq!(a.matched_count, w.matched_count, "{}: matched differs", name);
        assert_eq!(a.modified_count, w.modified_count, "{}: modified differs", name);
        assert_eq!(a.deleted_count, w.deleted_count, "{}: deleted differs", name);
        assert_eq!(a.upserted_id, w.upserted_id, "{}: upserted_id differs", name);
    }
}

#[test]
fn fixture_counts_match_expectations() {
    let suite = fixture_suite();
    let results = run(Mode::Api, &suite);
    for case in &suite.tests {
        let result = results.get(&case.name).unwrap();
        let expected = &case.expected;
        if expected.expects_error() {
            assert!(!result.error.is_empty(), "{} should have errored", case.name);
            continue;
        }
        if let Some(count) = expected.count {
            assert_eq!(result.count, count, "{}: count", case.name);
        }
        if let Some(matched) = expected.matched_count {
            assert_eq!(result.matched_count, matched, "{}: matched", case.name);
        }
        if let Some(modified) = expected.modified_count {
            assert_eq!(result.modified_count, modified, "{}: modified", case.name);
        }
        if let Some(deleted) = expected.deleted_count {
            assert_eq!(result.deleted_count, deleted, "{}: deleted", case.name);
        }
        if expected.upserted_id.is_some() {
            assert_eq!(result.upserted_id, expected.upserted_id, "{}: upserted_id", case.name);
        }
        if !expected.index_name.is_empty() {
            let name = result.documents[0]
                .as_document()
                .and_then(|d| d.get_str("indexName"));
            assert_eq!(name, Some(expected.index_name.as_str()), "{}: index name", case.name);
        }
    }
}

#[test]
fn results_file_round_trips_through_disk() {
    let dir = temp_dir();
    let path = dir.path().join("rust_wire.json");
    let results = run(Mode::Wire, &fixture_suite());
    results.write_json(&path).unwrap();

    let back = ResultsFile::load(&path).unwrap();
    assert_eq!(back.implementation, "rust");
    assert_eq!(back.mode, Mode::Wire);
    assert_eq!(back.summary, results.summary);
    assert_eq!(back.results.len(), results.results.len());
}
