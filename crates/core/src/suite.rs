//! Test case model
//!
//! A [`TestSuite`] is the canonical, data-driven description of the behavioral
//! checks every implementation must pass. Suites are loaded once, validated, and
//! never mutated; test cases are identified by `name` when results from
//! different runs are joined.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::Value;

/// Operation kind of a test action.
///
/// Parsing never fails: names outside the known set become [`Method::Unknown`]
/// so a suite written for a newer harness still loads, and only the affected
/// test fails.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Method {
    InsertOne,
    InsertMany,
    Find,
    FindOne,
    UpdateOne,
    UpdateMany,
    DeleteOne,
    DeleteMany,
    ReplaceOne,
    FindAndModify,
    Distinct,
    Aggregate,
    CreateIndex,
    ListIndexes,
    DropIndex,
    /// Any method name the harness does not know
    Unknown(String),
}

impl Method {
    /// The 15 supported methods, in canonical order
    pub const ALL: [Method; 15] = [
        Method::InsertOne,
        Method::InsertMany,
        Method::Find,
        Method::FindOne,
        Method::UpdateOne,
        Method::UpdateMany,
        Method::DeleteOne,
        Method::DeleteMany,
        Method::ReplaceOne,
        Method::FindAndModify,
        Method::Distinct,
        Method::Aggregate,
        Method::CreateIndex,
        Method::ListIndexes,
        Method::DropIndex,
    ];

    /// Wire name of the method as it appears in suite documents
    pub fn as_str(&self) -> &str {
        match self {
            Method::InsertOne => "insertOne",
            Method::InsertMany => "insertMany",
            Method::Find => "find",
            Method::FindOne => "findOne",
            Method::UpdateOne => "updateOne",
            Method::UpdateMany => "updateMany",
            Method::DeleteOne => "deleteOne",
            Method::DeleteMany => "deleteMany",
            Method::ReplaceOne => "replaceOne",
            Method::FindAndModify => "findAndModify",
            Method::Distinct => "distinct",
            Method::Aggregate => "aggregate",
            Method::CreateIndex => "createIndex",
            Method::ListIndexes => "listIndexes",
            Method::DropIndex => "dropIndex",
            Method::Unknown(name) => name,
        }
    }

    /// Parse a method name
    pub fn parse(name: &str) -> Method {
        Method::ALL
            .iter()
            .find(|m| m.as_str() == name)
            .cloned()
            .unwrap_or_else(|| Method::Unknown(name.to_string()))
    }
}

impl From<String> for Method {
    fn from(s: String) -> Self {
        Method::parse(&s)
    }
}

impl From<Method> for String {
    fn from(m: Method) -> Self {
        m.as_str().to_string()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation kind of a setup step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SetupOperation {
    Insert,
    CreateIndex,
    Unknown(String),
}

impl SetupOperation {
    /// Name as it appears in suite documents
    pub fn as_str(&self) -> &str {
        match self {
            SetupOperation::Insert => "insert",
            SetupOperation::CreateIndex => "createIndex",
            SetupOperation::Unknown(name) => name,
        }
    }
}

impl From<String> for SetupOperation {
    fn from(s: String) -> Self {
        match s.as_str() {
            "insert" => SetupOperation::Insert,
            "createIndex" => SetupOperation::CreateIndex,
            _ => SetupOperation::Unknown(s),
        }
    }
}

impl From<SetupOperation> for String {
    fn from(op: SetupOperation) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for SetupOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step applied to the target collection before the action runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupStep {
    pub operation: SetupOperation,
    #[serde(default)]
    pub data: Value,
}

/// The operation under test and its Document-Value arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestAction {
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

impl TestAction {
    /// Bare action with no arguments
    pub fn new(method: Method) -> Self {
        TestAction {
            method,
            filter: None,
            update: None,
            doc: None,
            docs: None,
            options: None,
        }
    }
}

/// Optional hints about the outcome.
///
/// The runner only consults [`Expected::expects_error`]; the remaining fields
/// are carried for comparison tooling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Expected {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upserted_id: Option<Value>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub index_name: String,
}

impl Expected {
    /// True when an action failure is acceptable for this test
    pub fn expects_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// One canonical behavioral check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub operation: String,
    pub collection: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub setup: Vec<SetupStep>,
    pub action: TestAction,
    #[serde(default)]
    pub expected: Expected,
}

/// A versioned set of test cases
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub generated: String,
    pub tests: Vec<TestCase>,
}

impl TestSuite {
    /// Parse a suite document and validate it
    pub fn from_json_str(s: &str) -> Result<Self> {
        let suite: TestSuite =
            serde_json::from_str(s).map_err(|e| Error::serialization("suite", e))?;
        suite.validate()?;
        Ok(suite)
    }

    /// Load and validate a suite from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json_str(&content)
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::serialization("suite", e))
    }

    /// Reject suites whose test names are not unique
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.tests.len());
        for test in &self.tests {
            if !seen.insert(test.name.as_str()) {
                return Err(Error::DuplicateTestName {
                    name: test.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Look up a test case by name
    pub fn get(&self, name: &str) -> Option<&TestCase> {
        self.tests.iter().find(|t| t.name == name)
    }

    /// Number of test cases
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// True if the suite has no test cases
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}
