//! End-to-end scenarios run through both access paths.
//!
//! Each scenario opens a fresh runner per mode and checks the normalized
//! result, so any divergence between the API and wire paths shows up as a
//! failure in exactly one of the two iterations.

#[path = "../common/mod.rs"]
mod common;

use common::*;
use docparity::{Mode, Runner, Value};

fn assert_success(mode: Mode, result: &docparity::TestResult) {
    assert!(
        result.success,
        "[{}] {} failed: {}",
        mode, result.test_name, result.error
    );
}

#[test]
fn insert_one_reports_count() {
    for mode in MODES {
        let mut runner = empty_runner(mode);
        let result = runner.run_test(&case(
            r#"{"name":"insert_single_doc","collection":"crud_test",
                "action":{"method":"insertOne","doc":{"name":"Alice","age":25}},
                "expected":{"count":1}}"#,
        ));
        assert_success(mode, &result);
        assert_eq!(result.count, 1);
        assert_eq!(result.mode, mode);
        assert!(result.error.is_empty());
        runner.close().unwrap();
    }
}

#[test]
fn find_all_returns_seeded_documents() {
    for mode in MODES {
        let mut runner = seeded_runner(mode);
        let result = runner.run_test(&case(
            r#"{"name":"find_all","collection":"base",
                "action":{"method":"find","filter":{}}}"#,
        ));
        assert_success(mode, &result);
        assert_eq!(result.count, 8);
        assert_eq!(result.documents.len(), 8);
        runner.close().unwrap();
    }
}

#[test]
fn aggregate_match_filters_department() {
    for mode in MODES {
        let mut runner = seeded_runner(mode);
        let result = runner.run_test(&case(
            r#"{"name":"agg_match_simple","collection":"agg_test",
                "action":{"method":"aggregate","options":{"pipeline":[{"$match":{"dept":"Engineering"}}]}}}"#,
        ));
        assert_success(mode, &result);
        assert_eq!(result.count, 3);
        for doc in &result.documents {
            let dept = doc.as_document().and_then(|d| d.get_str("dept"));
            assert_eq!(dept, Some("Engineering"));
        }
        runner.close().unwrap();
    }
}

#[test]
fn upsert_on_missing_document_reports_zero_counts() {
    for mode in MODES {
        let mut runner = empty_runner(mode);
        let result = runner.run_test(&case(
            r#"{"name":"upsert","collection":"u",
                "action":{"method":"updateOne","filter":{"_id":"missing"},
                          "update":{"$set":{"name":"X"}},"options":{"upsert":true}}}"#,
        ));
        assert_success(mode, &result);
        assert_eq!(result.matched_count, 0);
        assert_eq!(result.modified_count, 0);
        assert_eq!(result.upserted_id, Some(Value::from("missing")));

        let found = runner.run_test(&case(
            r#"{"name":"find_upserted","collection":"u",
                "action":{"method":"findOne","filter":{"_id":"missing"}}}"#,
        ));
        assert_success(mode, &found);
        assert_eq!(found.count, 1);
        runner.close().unwrap();
    }
}

#[test]
fn delete_without_match_is_success() {
    for mode in MODES {
        let mut runner = seeded_runner(mode);
        let result = runner.run_test(&case(
            r#"{"name":"delete_no_match","collection":"base",
                "action":{"method":"deleteOne","filter":{"_id":"nobody"}}}"#,
        ));
        assert_success(mode, &result);
        assert_eq!(result.deleted_count, 0);
        runner.close().unwrap();
    }
}

#[test]
fn setup_steps_apply_in_order_before_action() {
    for mode in MODES {
        let mut runner = empty_runner(mode);
        let result = runner.run_test(&case(
            r#"{"name":"ordered_setup","collection":"s",
                "setup":[
                    {"operation":"insert","data":{"_id":"a","n":1}},
                    {"operation":"insert","data":{"_id":"b","n":2}},
                    {"operation":"createIndex","data":{"keys":{"n":1}}}
                ],
                "action":{"method":"listIndexes"}}"#,
        ));
        assert_success(mode, &result);
        assert_eq!(result.count, 2);
        runner.close().unwrap();
    }
}

#[test]
fn failing_setup_step_skips_action() {
    for mode in MODES {
        let mut runner = empty_runner(mode);
        let result = runner.run_test(&case(
            r#"{"name":"bad_setup","collection":"s2",
                "setup":[
                    {"operation":"createIndex","data":{"keys":{"sku":1},"options":{"unique":true}}},
                    {"operation":"insert","data":{"_id":"x1","sku":"A"}},
                    {"operation":"insert","data":{"_id":"x2","sku":"A"}}
                ],
                "action":{"method":"insertOne","doc":{"_id":"never"}},
                "expected":{"error":"anything"}}"#,
        ));
        assert!(!result.success, "[{}] setup failure must not be tolerated", mode);
        assert!(
            result.error.starts_with("setup failed at step 2 (insert)"),
            "[{}] unexpected error: {}",
            mode,
            result.error
        );

        // the action never ran
        let probe = runner.run_test(&case(
            r#"{"name":"probe","collection":"s2",
                "action":{"method":"findOne","filter":{"_id":"never"}}}"#,
        ));
        assert_success(mode, &probe);
        assert_eq!(probe.count, 0);
        runner.close().unwrap();
    }
}

#[test]
fn unknown_setup_operation_fails_the_test() {
    for mode in MODES {
        let mut runner = empty_runner(mode);
        let result = runner.run_test(&case(
            r#"{"name":"bogus_setup","collection":"s3",
                "setup":[{"operation":"insert","data":{"_id":1}},{"operation":"truncate","data":{}}],
                "action":{"method":"find"}}"#,
        ));
        assert!(!result.success);
        assert!(result.error.contains("step 1 (truncate)"), "{}", result.error);
        runner.close().unwrap();
    }
}

#[test]
fn expected_error_is_tolerated_and_recorded() {
    for mode in MODES {
        let mut runner = empty_runner(mode);
        let setup = r#"{"operation":"insert","data":{"_id":"dup"}}"#;
        let tolerated = runner.run_test(&case(&format!(
            r#"{{"name":"dup_expected","collection":"d","setup":[{}],
                "action":{{"method":"insertOne","doc":{{"_id":"dup2"}}}},
                "expected":{{"error":"duplicate key"}}}}"#,
            setup
        )));
        // an expected error that does not happen still passes
        assert_success(mode, &tolerated);

        let result = runner.run_test(&case(
            r#"{"name":"dup_insert","collection":"d",
                "action":{"method":"insertOne","doc":{"_id":"dup"}},
                "expected":{"error":"duplicate key"}}"#,
        ));
        assert_success(mode, &result);
        assert!(result.error.contains("duplicate key"), "[{}] {}", mode, result.error);

        let strict = runner.run_test(&case(
            r#"{"name":"dup_unexpected","collection":"d",
                "action":{"method":"insertOne","doc":{"_id":"dup"}}}"#,
        ));
        assert!(!strict.success);
        assert!(strict.error.contains("duplicate key"));
        runner.close().unwrap();
    }
}

#[test]
fn unknown_method_fails_with_unsupported_operation() {
    for mode in MODES {
        let mut runner = empty_runner(mode);
        let result = runner.run_test(&case(
            r#"{"name":"weird","collection":"c","action":{"method":"mapReduce"}}"#,
        ));
        assert!(!result.success);
        assert_eq!(result.error, "unsupported operation: mapReduce");
        runner.close().unwrap();
    }
}

#[test]
fn invalid_arguments_fail_identically() {
    let mut errors = Vec::new();
    for mode in MODES {
        let mut runner = empty_runner(mode);
        let result = runner.run_test(&case(
            r#"{"name":"plain_update","collection":"c",
                "action":{"method":"updateOne","filter":{},"update":{"name":"no operators"}}}"#,
        ));
        assert!(!result.success);
        errors.push(result.error);
        runner.close().unwrap();
    }
    assert_eq!(errors[0], errors[1]);
    assert!(errors[0].starts_with("invalid argument for updateOne"));
}

#[test]
fn state_carries_across_tests_in_one_run() {
    for mode in MODES {
        let mut runner = empty_runner(mode);
        let suite = suite(
            r#"{"version":"1","tests":[
                {"name":"put","collection":"k","action":{"method":"insertMany","docs":[{"v":1},{"v":2}]}},
                {"name":"bump","collection":"k","action":{"method":"updateMany","filter":{},"update":{"$inc":{"v":10}}}},
                {"name":"check","collection":"k","action":{"method":"find","filter":{"v":{"$gt":10}}}}
            ]}"#,
        );
        let results = docparity::run_suite(runner.as_mut(), &suite);
        assert_eq!(results.summary.total, 3);
        assert_eq!(results.summary.passed, 3, "[{}] {:?}", mode, results.results);
        assert_eq!(results.get("put").unwrap().count, 2);
        assert_eq!(results.get("bump").unwrap().modified_count, 2);
        assert_eq!(results.get("check").unwrap().count, 2);
        runner.close().unwrap();
    }
}
