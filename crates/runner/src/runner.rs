//! The runner contract and the suite run loop

use std::time::Instant;

use docparity_core::{Mode, ResultsFile, TestCase, TestResult, TestSuite};
use tracing::{debug, info, warn};

use crate::error::{ActionError, HarnessError};
use crate::operation::Operation;
use crate::outcome::Outcome;

/// Executes test cases against one exclusively owned store.
///
/// Implementors only provide access-path specifics; the per-test algorithm
/// (setup, action, error tolerance, timing) lives in [`Runner::run_test`].
pub trait Runner {
    /// Implementation name recorded in results
    fn implementation(&self) -> &str;

    fn mode(&self) -> Mode;

    /// Carry one operation to the store against `collection`
    fn execute(&mut self, collection: &str, op: &Operation) -> Result<Outcome, ActionError>;

    /// Release everything the runner holds. Safe to call more than once.
    fn close(&mut self) -> Result<(), HarnessError>;

    /// Run one test case. Never fails; every error lands in the result.
    fn run_test(&mut self, case: &TestCase) -> TestResult {
        let start = Instant::now();
        let mut result = TestResult::new(&case.name, self.implementation(), self.mode());

        if let Err(message) = run_setup(self, case) {
            result.fail(message);
            result.duration_ms = elapsed_ms(start);
            return result;
        }

        let outcome = Operation::from_action(&case.action)
            .and_then(|op| self.execute(&case.collection, &op));
        match outcome {
            Ok(outcome) => {
                outcome.apply(&mut result);
                result.success = true;
            }
            Err(err) => {
                result.error = err.to_string();
                // only the presence of an expected error is checked, not its text
                result.success = case.expected.expects_error();
                debug!(
                    target: "docparity::runner",
                    test = %case.name,
                    tolerated = result.success,
                    error = %err,
                    "Action failed"
                );
            }
        }
        result.duration_ms = elapsed_ms(start);
        result
    }
}

fn run_setup<R: Runner + ?Sized>(runner: &mut R, case: &TestCase) -> Result<(), String> {
    for (i, step) in case.setup.iter().enumerate() {
        Operation::from_setup(step)
            .and_then(|op| runner.execute(&case.collection, &op))
            .map_err(|err| {
                format!(
                    "setup failed at step {} ({}): {}",
                    i, step.operation, err
                )
            })?;
    }
    Ok(())
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Run every test of `suite` in order and collect a results file.
///
/// Tests run strictly one after another against the same runner, so state
/// left by one test is visible to the next.
pub fn run_suite(runner: &mut dyn Runner, suite: &TestSuite) -> ResultsFile {
    let total = suite.tests.len();
    info!(
        target: "docparity::runner",
        implementation = runner.implementation(),
        mode = %runner.mode(),
        tests = total,
        "Running suite"
    );

    let mut results = Vec::with_capacity(total);
    for (i, case) in suite.tests.iter().enumerate() {
        info!(target: "docparity::runner", "[{}/{}] {}", i + 1, total, case.name);
        let result = runner.run_test(case);
        if result.success {
            info!(target: "docparity::runner", test = %case.name, duration_ms = result.duration_ms, "pass");
        } else {
            warn!(
                target: "docparity::runner",
                test = %case.name,
                duration_ms = result.duration_ms,
                error = %result.error,
                "fail"
            );
        }
        results.push(result);
    }

    let file = ResultsFile::new(runner.implementation(), runner.mode(), results);
    info!(
        target: "docparity::runner",
        passed = file.summary.passed,
        failed = file.summary.failed,
        "Suite finished"
    );
    file
}

#[cfg(test)]
mod tests {
    use super::*;
    use docparity_core::{doc, Expected, Method, SetupOperation, SetupStep, TestAction};
    use docparity_engine::StoreError;

    /// Records operations and fails on a chosen method
    struct Scripted {
        seen: Vec<Method>,
        fail_on: Option<Method>,
    }

    impl Runner for Scripted {
        fn implementation(&self) -> &str {
            "scripted"
        }

        fn mode(&self) -> Mode {
            Mode::Api
        }

        fn execute(&mut self, _collection: &str, op: &Operation) -> Result<Outcome, ActionError> {
            self.seen.push(op.method());
            if self.fail_on.as_ref() == Some(&op.method()) {
                return Err(StoreError::Closed.into());
            }
            Ok(Outcome::counted(1))
        }

        fn close(&mut self) -> Result<(), HarnessError> {
            Ok(())
        }
    }

    fn case(name: &str, method: Method) -> TestCase {
        let mut action = TestAction::new(method);
        action.doc = Some(doc! { "name" => "Alice" }.into());
        TestCase {
            name: name.to_string(),
            category: "crud".to_string(),
            operation: "insert".to_string(),
            collection: "users".to_string(),
            description: String::new(),
            setup: Vec::new(),
            action,
            expected: Expected::default(),
        }
    }

    #[test]
    fn test_successful_action() {
        let mut runner = Scripted { seen: vec![], fail_on: None };
        let result = runner.run_test(&case("ok", Method::InsertOne));
        assert!(result.success);
        assert_eq!(result.count, 1);
        assert!(result.error.is_empty());
        assert_eq!(result.implementation, "scripted");
    }

    #[test]
    fn test_expected_error_tolerates_any_message() {
        let mut runner = Scripted {
            seen: vec![],
            fail_on: Some(Method::InsertOne),
        };
        let mut tc = case("dup", Method::InsertOne);
        tc.expected.error = "duplicate key".to_string();
        let result = runner.run_test(&tc);
        assert!(result.success);
        assert!(!result.error.contains("duplicate"));
        assert!(!result.error.is_empty());
    }

    #[test]
    fn test_unexpected_error_fails() {
        let mut runner = Scripted {
            seen: vec![],
            fail_on: Some(Method::InsertOne),
        };
        let result = runner.run_test(&case("boom", Method::InsertOne));
        assert!(!result.success);
        assert_eq!(result.error, StoreError::Closed.to_string());
    }

    #[test]
    fn test_setup_failure_skips_action() {
        let mut runner = Scripted { seen: vec![], fail_on: None };
        let mut tc = case("setup", Method::Find);
        tc.setup = vec![
            SetupStep {
                operation: SetupOperation::Insert,
                data: doc! { "_id" => 1 }.into(),
            },
            SetupStep {
                operation: SetupOperation::Unknown("truncate".into()),
                data: Default::default(),
            },
        ];
        tc.expected.error = "anything".to_string();
        let result = runner.run_test(&tc);
        assert!(!result.success);
        assert!(result.error.starts_with("setup failed at step 1 (truncate)"));
        assert_eq!(runner.seen, vec![Method::InsertOne]);
    }

    #[test]
    fn test_unknown_method_fails_test_only() {
        let mut runner = Scripted { seen: vec![], fail_on: None };
        let suite = TestSuite {
            version: "1".into(),
            generated: String::new(),
            tests: vec![
                case("bad", Method::Unknown("mapReduce".into())),
                case("good", Method::InsertOne),
            ],
        };
        let file = run_suite(&mut runner, &suite);
        assert_eq!(file.results.len(), 2);
        assert!(file.results[0].error.contains("unsupported operation"));
        assert!(file.results[1].success);
        assert_eq!(file.summary.total, 2);
        assert_eq!(file.summary.passed, 1);
        assert_eq!(file.summary.failed, 1);
        assert_eq!(file.summary.skipped, 0);
    }
}
