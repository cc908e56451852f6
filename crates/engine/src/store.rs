//! The Store capability
//!
//! [`Store`] is the boundary between the harness and a document storage
//! engine. Both access paths drive the same trait: the API runner calls it
//! directly, the protocol server calls it on behalf of remote clients.
//!
//! ## Thread Safety
//!
//! Implementations are `Send + Sync`; the wire server shares one
//! `Arc<dyn Store>` between its connection tasks.

use docparity_core::{Document, Value};

use crate::error::Result;
use crate::index::{IndexInfo, IndexSpec};

/// Options for `find`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Option<Document>,
    pub skip: u64,
    /// Maximum number of documents; `None` is unbounded
    pub limit: Option<u64>,
    pub projection: Option<Document>,
}

impl FindOptions {
    /// Options selecting at most one document
    pub fn one() -> Self {
        FindOptions {
            limit: Some(1),
            ..Default::default()
        }
    }
}

/// Options for `update`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert a document built from the filter and update when nothing matches
    pub upsert: bool,
    /// Update every match instead of the first
    pub multi: bool,
}

/// Outcome of an update or replace
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
    /// `_id` of the inserted document when an upsert created one.
    ///
    /// A creating upsert reports zero matched and zero modified.
    pub upserted_id: Option<Value>,
}

/// Options for `find_and_modify`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindAndModifyOptions {
    /// Update or replacement to apply; ignored when `remove` is set
    pub update: Option<Document>,
    pub remove: bool,
    /// Return the document after modification instead of before
    pub return_new: bool,
    pub upsert: bool,
    pub sort: Option<Document>,
}

/// A document store addressed by collection name.
///
/// Collections are created implicitly by the first write.
pub trait Store: Send + Sync {
    /// Insert one document, generating `_id` if absent. Returns the `_id`.
    fn insert_one(&self, collection: &str, doc: Document) -> Result<Value>;

    /// Insert documents in order, stopping at the first failure.
    fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<Vec<Value>> {
        docs.into_iter()
            .map(|d| self.insert_one(collection, d))
            .collect()
    }

    /// Query documents
    fn find(&self, collection: &str, filter: &Document, options: &FindOptions) -> Result<Vec<Document>>;

    /// First matching document
    fn find_one(&self, collection: &str, filter: &Document) -> Result<Option<Document>> {
        Ok(self
            .find(collection, filter, &FindOptions::one())?
            .into_iter()
            .next())
    }

    /// Apply an operator update to the first match, or every match with `multi`.
    ///
    /// A document without `$` operators is treated as a replacement.
    fn update(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateResult>;

    /// Replace the first matching document
    fn replace_one(&self, collection: &str, filter: &Document, replacement: &Document) -> Result<UpdateResult>;

    /// Delete the first match (`limit_one`) or all matches. Returns the count deleted.
    fn delete(&self, collection: &str, filter: &Document, limit_one: bool) -> Result<u64>;

    /// Atomically find one document and update or remove it.
    ///
    /// Returns the pre- or post-image depending on `return_new`.
    fn find_and_modify(
        &self,
        collection: &str,
        filter: &Document,
        options: &FindAndModifyOptions,
    ) -> Result<Option<Document>>;

    /// Distinct values of `field` among matching documents; array values are flattened
    fn distinct(&self, collection: &str, field: &str, filter: &Document) -> Result<Vec<Value>>;

    /// Run an aggregation pipeline
    fn aggregate(&self, collection: &str, pipeline: &[Document]) -> Result<Vec<Document>>;

    /// Create an index, returning its name
    fn create_index(&self, collection: &str, spec: &IndexSpec) -> Result<String>;

    /// Indexes of an existing collection
    fn list_indexes(&self, collection: &str) -> Result<Vec<IndexInfo>>;

    /// Drop an index by name
    fn drop_index(&self, collection: &str, name: &str) -> Result<()>;

    /// Release the store. Further calls fail with `StoreError::Closed`.
    fn close(&self) -> Result<()>;
}
