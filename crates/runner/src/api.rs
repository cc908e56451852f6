//! API-mode runner: direct in-process calls on the store

use std::sync::Arc;

use docparity_core::Mode;
use docparity_engine::{Store, UpdateOptions};
use tracing::{info, warn};

use crate::config::RunnerConfig;
use crate::error::{ActionError, HarnessError};
use crate::operation::Operation;
use crate::outcome::Outcome;
use crate::runner::Runner;

/// Drives a [`Store`] through its library interface
pub struct ApiRunner {
    implementation: String,
    store: Option<Arc<dyn Store>>,
}

impl ApiRunner {
    /// Open the store named by `config.store`
    pub fn open(config: &RunnerConfig) -> Result<Self, HarnessError> {
        let location = config.store.to_string_lossy();
        let store = docparity_engine::open(&location).map_err(HarnessError::StoreOpen)?;
        info!(target: "docparity::runner", store = %location, "API runner opened");
        Ok(Self::with_store(config.implementation.clone(), store))
    }

    /// Wrap an already-open store
    pub fn with_store(implementation: impl Into<String>, store: Arc<dyn Store>) -> Self {
        ApiRunner {
            implementation: implementation.into(),
            store: Some(store),
        }
    }

    fn store(&self) -> Result<&dyn Store, ActionError> {
        self.store
            .as_deref()
            .ok_or(ActionError::Store(docparity_engine::StoreError::Closed))
    }
}

impl Runner for ApiRunner {
    fn implementation(&self) -> &str {
        &self.implementation
    }

    fn mode(&self) -> Mode {
        Mode::Api
    }

    fn execute(&mut self, collection: &str, op: &Operation) -> Result<Outcome, ActionError> {
        let store = self.store()?;
        let outcome = match op {
            Operation::InsertOne { doc } => {
                let id = store.insert_one(collection, doc.clone())?;
                Outcome::inserted(&[id])
            }
            Operation::InsertMany { docs } => {
                Outcome::inserted(&store.insert_many(collection, docs.clone())?)
            }
            Operation::Find { filter, options } => {
                Outcome::documents(store.find(collection, filter, options)?)
            }
            Operation::FindOne { filter } => {
                Outcome::maybe_document(store.find_one(collection, filter)?)
            }
            Operation::UpdateOne {
                filter,
                update,
                upsert,
            } => Outcome::updated(store.update(
                collection,
                filter,
                update,
                UpdateOptions {
                    upsert: *upsert,
                    multi: false,
                },
            )?),
            Operation::UpdateMany { filter, update } => Outcome::updated(store.update(
                collection,
                filter,
                update,
                UpdateOptions {
                    upsert: false,
                    multi: true,
                },
            )?),
            Operation::DeleteOne { filter } => Outcome::deleted(store.delete(collection, filter, true)?),
            Operation::DeleteMany { filter } => {
                Outcome::deleted(store.delete(collection, filter, false)?)
            }
            Operation::ReplaceOne {
                filter,
                replacement,
            } => Outcome::replaced(&store.replace_one(collection, filter, replacement)?),
            Operation::FindAndModify { filter, options } => {
                Outcome::maybe_document(store.find_and_modify(collection, filter, options)?)
            }
            Operation::Distinct { field, filter } => {
                Outcome::counted(store.distinct(collection, field, filter)?.len())
            }
            Operation::Aggregate { pipeline } => {
                Outcome::documents(store.aggregate(collection, pipeline)?)
            }
            Operation::CreateIndex { spec } => {
                Outcome::index_created(&store.create_index(collection, spec)?)
            }
            Operation::ListIndexes => Outcome::indexes(&store.list_indexes(collection)?),
            Operation::DropIndex { name } => {
                store.drop_index(collection, name)?;
                Outcome::empty()
            }
        };
        Ok(outcome)
    }

    fn close(&mut self) -> Result<(), HarnessError> {
        let Some(store) = self.store.take() else {
            return Ok(());
        };
        store.close().map_err(|e| {
            warn!(target: "docparity::runner", error = %e, "Store close failed");
            HarnessError::teardown("store", e)
        })?;
        info!(target: "docparity::runner", "API runner closed");
        Ok(())
    }
}

impl Drop for ApiRunner {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::run_suite;
    use docparity_core::{doc, Expected, Method, TestAction, TestCase, TestSuite, Value};
    use docparity_engine::MemoryStore;

    fn runner() -> (ApiRunner, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ApiRunner::with_store("rust", store.clone()), store)
    }

    fn case(name: &str, action: TestAction) -> TestCase {
        TestCase {
            name: name.to_string(),
            category: "crud".to_string(),
            operation: action.method.to_string(),
            collection: "users".to_string(),
            description: String::new(),
            setup: Vec::new(),
            action,
            expected: Expected::default(),
        }
    }

    #[test]
    fn test_insert_one_counts_one() {
        let (mut runner, store) = runner();
        let mut action = TestAction::new(Method::InsertOne);
        action.doc = Some(doc! { "name" => "Alice", "age" => 25 }.into());
        let result = runner.run_test(&case("insert", action));
        assert!(result.success, "{}", result.error);
        assert_eq!(result.count, 1);
        assert_eq!(store.count("users"), 1);
    }

    #[test]
    fn test_upsert_reports_zero_matched_and_modified() {
        let (mut runner, _) = runner();
        let mut action = TestAction::new(Method::UpdateOne);
        action.filter = Some(doc! { "_id" => "missing" }.into());
        action.update = Some(doc! { "$set" => doc! { "name" => "X" } }.into());
        action.options = Some(doc! { "upsert" => true }.into());
        let result = runner.run_test(&case("upsert", action));
        assert!(result.success, "{}", result.error);
        assert_eq!(result.matched_count, 0);
        assert_eq!(result.modified_count, 0);
        assert_eq!(result.upserted_id, Some(Value::from("missing")));
    }

    #[test]
    fn test_delete_without_match_succeeds() {
        let (mut runner, _) = runner();
        let mut action = TestAction::new(Method::DeleteOne);
        action.filter = Some(doc! { "_id" => "nobody" }.into());
        let result = runner.run_test(&case("delete", action));
        assert!(result.success);
        assert_eq!(result.deleted_count, 0);
    }

    #[test]
    fn test_create_and_list_indexes() {
        let (mut runner, _) = runner();
        let mut create = TestAction::new(Method::CreateIndex);
        create.options = Some(doc! { "keys" => doc! { "email" => 1 } }.into());
        let result = runner.run_test(&case("create", create));
        assert!(result.success, "{}", result.error);
        assert_eq!(result.count, 1);
        assert_eq!(
            result.documents,
            vec![Value::from(doc! { "indexName" => "email_1" })]
        );

        let result = runner.run_test(&case("list", TestAction::new(Method::ListIndexes)));
        assert_eq!(result.count, 2);

        let mut drop = TestAction::new(Method::DropIndex);
        drop.options = Some(doc! { "name" => "email_1" }.into());
        let result = runner.run_test(&case("drop", drop));
        assert!(result.success, "{}", result.error);
        assert_eq!(result.count, 0);
    }

    #[test]
    fn test_closed_runner_fails_tests() {
        let (mut runner, _) = runner();
        runner.close().unwrap();
        runner.close().unwrap();
        let suite = TestSuite {
            version: "1".into(),
            generated: String::new(),
            tests: vec![case("after-close", TestAction::new(Method::ListIndexes))],
        };
        let file = run_suite(&mut runner, &suite);
        assert!(!file.results[0].success);
    }

    #[test]
    fn test_open_from_config() {
        let config = RunnerConfig::in_memory(Mode::Api);
        let mut runner = ApiRunner::open(&config).unwrap();
        assert_eq!(runner.implementation(), "rust");
        runner.close().unwrap();
    }

    #[test]
    fn test_open_missing_seed_is_store_open_error() {
        let mut config = RunnerConfig::in_memory(Mode::Api);
        config.store = "/nonexistent/seed.json".into();
        assert!(matches!(
            ApiRunner::open(&config),
            Err(HarnessError::StoreOpen(_))
        ));
    }
}
