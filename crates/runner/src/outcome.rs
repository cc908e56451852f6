//! Normalized action outcome
//!
//! Both runners translate their native replies into an [`Outcome`] with the
//! constructors below, so a given store answer always lands in the same
//! result fields regardless of access path.

use docparity_core::{doc, Document, TestResult, Value};
use docparity_engine::{IndexInfo, UpdateResult};

/// The result fields an action populates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub count: i64,
    pub matched_count: i64,
    pub modified_count: i64,
    pub deleted_count: i64,
    pub documents: Vec<Value>,
    pub upserted_id: Option<Value>,
}

fn to_i64(n: impl TryInto<i64>) -> i64 {
    n.try_into().unwrap_or(i64::MAX)
}

impl Outcome {
    /// No result fields
    pub fn empty() -> Self {
        Outcome::default()
    }

    /// Only `count`
    pub fn counted(n: usize) -> Self {
        Outcome {
            count: to_i64(n),
            ..Default::default()
        }
    }

    /// Inserted ids: `count` is the number of ids
    pub fn inserted(ids: &[Value]) -> Self {
        Outcome::counted(ids.len())
    }

    /// Returned documents with `count` set to their number
    pub fn documents(docs: Vec<Document>) -> Self {
        Outcome {
            count: to_i64(docs.len()),
            documents: docs.into_iter().map(Value::Document).collect(),
            ..Default::default()
        }
    }

    /// Zero or one returned document
    pub fn maybe_document(doc: Option<Document>) -> Self {
        Outcome::documents(doc.into_iter().collect())
    }

    pub fn updated(result: UpdateResult) -> Self {
        Outcome {
            matched_count: to_i64(result.matched_count),
            modified_count: to_i64(result.modified_count),
            upserted_id: result.upserted_id,
            ..Default::default()
        }
    }

    /// A replace reports the replaced count as both matched and modified
    pub fn replaced(result: &UpdateResult) -> Self {
        let n = to_i64(result.matched_count);
        Outcome {
            matched_count: n,
            modified_count: n,
            ..Default::default()
        }
    }

    pub fn deleted(n: u64) -> Self {
        Outcome {
            deleted_count: to_i64(n),
            ..Default::default()
        }
    }

    pub fn index_created(name: &str) -> Self {
        Outcome {
            count: 1,
            documents: vec![Value::Document(doc! { "indexName" => name })],
            ..Default::default()
        }
    }

    pub fn indexes(list: &[IndexInfo]) -> Self {
        Outcome::counted(list.len())
    }

    /// Copy the populated fields into `result`
    pub fn apply(self, result: &mut TestResult) {
        result.count = self.count;
        result.matched_count = self.matched_count;
        result.modified_count = self.modified_count;
        result.deleted_count = self.deleted_count;
        result.documents = self.documents;
        result.upserted_id = self.upserted_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docparity_core::Mode;

    #[test]
    fn test_upsert_creation_reports_zero_counts() {
        let outcome = Outcome::updated(UpdateResult {
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some("missing".into()),
        });
        let mut result = TestResult::new("t", "rust", Mode::Api);
        outcome.apply(&mut result);
        assert_eq!(result.matched_count, 0);
        assert_eq!(result.modified_count, 0);
        assert_eq!(result.upserted_id, Some(Value::from("missing")));
    }

    #[test]
    fn test_replace_mirrors_matched() {
        let outcome = Outcome::replaced(&UpdateResult {
            matched_count: 1,
            modified_count: 0,
            upserted_id: None,
        });
        assert_eq!(outcome.matched_count, 1);
        assert_eq!(outcome.modified_count, 1);
    }

    #[test]
    fn test_maybe_document() {
        assert_eq!(Outcome::maybe_document(None).count, 0);
        let one = Outcome::maybe_document(Some(doc! { "_id" => 1 }));
        assert_eq!(one.count, 1);
        assert_eq!(one.documents.len(), 1);
    }

    #[test]
    fn test_index_created_document() {
        let outcome = Outcome::index_created("email_1");
        assert_eq!(outcome.count, 1);
        assert_eq!(
            outcome.documents,
            vec![Value::Document(doc! { "indexName" => "email_1" })]
        );
    }
}
