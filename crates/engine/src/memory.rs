//! In-memory reference store
//!
//! `MemoryStore` keeps every collection in a `Vec<Document>` behind one
//! `parking_lot::RwLock`. Documents keep insertion order, which is the natural
//! order of unsorted queries. Nothing is persisted: a store opened from a seed
//! file starts from the seed and forgets every write when dropped.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use docparity_core::{Document, Value};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::compare::compare_values;
use crate::error::{Result, StoreError};
use crate::filter;
use crate::index::{IndexCatalog, IndexInfo, IndexSpec};
use crate::path;
use crate::pipeline;
use crate::seed::SeedSnapshot;
use crate::store::{FindAndModifyOptions, FindOptions, Store, UpdateOptions, UpdateResult};
use crate::update::{self, UpdateKind};

/// Location string for an empty, unseeded store
pub const MEMORY_LOCATION: &str = ":memory:";

#[derive(Debug, Clone, Default)]
struct Collection {
    docs: Vec<Document>,
    indexes: IndexCatalog,
}

impl Collection {
    fn matching(&self, filter: &Document) -> Result<Vec<usize>> {
        let mut out = Vec::new();
        for (i, d) in self.docs.iter().enumerate() {
            if filter::matches(d, filter)? {
                out.push(i);
            }
        }
        Ok(out)
    }

    fn insert(&mut self, name: &str, mut doc: Document) -> Result<Value> {
        let id = ensure_id(&mut doc);
        let others: Vec<&Document> = self.docs.iter().collect();
        self.indexes.check(name, &doc, &others)?;
        self.docs.push(doc);
        Ok(id)
    }

    /// Swap in a modified document after re-checking unique indexes
    fn store_at(&mut self, name: &str, idx: usize, doc: Document) -> Result<()> {
        let others: Vec<&Document> = self
            .docs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, d)| d)
            .collect();
        self.indexes.check(name, &doc, &others)?;
        self.docs[idx] = doc;
        Ok(())
    }
}

/// Give `doc` a generated `_id` if it has none, placing it first. Returns the `_id`.
fn ensure_id(doc: &mut Document) -> Value {
    if let Some(id) = doc.get("_id") {
        return id.clone();
    }
    let id = Value::String(uuid::Uuid::new_v4().to_string());
    let mut with_id = Document::new();
    with_id.insert("_id", id.clone());
    for (k, v) in std::mem::take(doc) {
        with_id.insert(k, v);
    }
    *doc = with_id;
    id
}

/// Apply an operator update or a replacement to a copy of `doc`.
///
/// Returns the new document and whether it differs.
fn modified_copy(doc: &Document, update: &Document) -> Result<(Document, bool)> {
    match update::classify(update)? {
        UpdateKind::Operators => {
            let mut next = doc.clone();
            let changed = update::apply_operators(&mut next, update)?;
            Ok((next, changed))
        }
        UpdateKind::Replacement => {
            let next = update::replace(doc, update)?;
            let changed = next != *doc;
            Ok((next, changed))
        }
    }
}

/// Build the document an upsert inserts
fn upsert_document(filter: &Document, update: &Document) -> Result<Document> {
    let seed = update::upsert_seed(filter)?;
    match update::classify(update)? {
        UpdateKind::Operators => {
            let mut doc = seed;
            update::apply_operators(&mut doc, update)?;
            Ok(doc)
        }
        UpdateKind::Replacement => {
            let mut doc = Document::new();
            if let Some(id) = seed.get("_id") {
                doc.insert("_id", id.clone());
            }
            update::replace(&doc, update)
        }
    }
}

/// The bundled in-memory [`Store`]
#[derive(Debug)]
pub struct MemoryStore {
    location: String,
    collections: RwLock<BTreeMap<String, Collection>>,
    closed: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        MemoryStore {
            location: MEMORY_LOCATION.to_string(),
            collections: RwLock::new(BTreeMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Open a store: `:memory:` (or empty) for an empty store, otherwise the
    /// path of a seed snapshot.
    pub fn open(location: &str) -> Result<Self> {
        if location.is_empty() || location == MEMORY_LOCATION {
            debug!(target: "docparity::engine", "Opened empty in-memory store");
            return Ok(MemoryStore::new());
        }
        let seed = SeedSnapshot::load(Path::new(location))?;
        let mut store = MemoryStore::from_seed(seed).map_err(|e| StoreError::Open {
            location: location.to_string(),
            reason: e.to_string(),
        })?;
        store.location = location.to_string();
        Ok(store)
    }

    /// Build a store from a seed snapshot
    pub fn from_seed(seed: SeedSnapshot) -> Result<Self> {
        let store = MemoryStore::new();
        let total = seed.document_count();
        {
            let mut collections = store.collections.write();
            for (name, docs) in seed.collections {
                let coll = collections.entry(name.clone()).or_default();
                for d in docs {
                    coll.insert(&name, d)?;
                }
            }
        }
        info!(
            target: "docparity::engine",
            documents = total,
            collections = store.collections.read().len(),
            "Loaded seed snapshot"
        );
        Ok(store)
    }

    /// Where the store was opened from
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Names of existing collections, sorted
    pub fn collection_names(&self) -> Vec<String> {
        self.collections.read().keys().cloned().collect()
    }

    /// Number of documents in a collection (0 when absent)
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.docs.len())
            .unwrap_or(0)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(AtomicOrdering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn insert_one(&self, collection: &str, doc: Document) -> Result<Value> {
        self.ensure_open()?;
        let mut collections = self.collections.write();
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(collection, doc)
    }

    fn find(&self, collection: &str, filter: &Document, options: &FindOptions) -> Result<Vec<Document>> {
        self.ensure_open()?;
        let collections = self.collections.read();
        let Some(coll) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut docs: Vec<Document> = coll
            .matching(filter)?
            .into_iter()
            .map(|i| coll.docs[i].clone())
            .collect();
        drop(collections);

        if let Some(sort) = &options.sort {
            pipeline::sort(&mut docs, sort)?;
        }
        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .filter(|n| *n > 0)
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        let docs = docs.into_iter().skip(skip).take(limit);
        match &options.projection {
            Some(spec) if !spec.is_empty() => docs.map(|d| pipeline::project(&d, spec)).collect(),
            _ => Ok(docs.collect()),
        }
    }

    fn update(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateResult> {
        self.ensure_open()?;
        let kind = update::classify(update)?;
        if options.multi && kind == UpdateKind::Replacement {
            return Err(StoreError::update("multi update only works with $ operators"));
        }

        let mut collections = self.collections.write();
        let targets = match collections.get(collection) {
            Some(coll) => coll.matching(filter)?,
            None => Vec::new(),
        };

        if targets.is_empty() {
            if !options.upsert {
                return Ok(UpdateResult::default());
            }
            let doc = upsert_document(filter, update)?;
            let id = collections
                .entry(collection.to_string())
                .or_default()
                .insert(collection, doc)?;
            debug!(target: "docparity::engine", collection, "Upsert inserted a document");
            return Ok(UpdateResult {
                matched_count: 0,
                modified_count: 0,
                upserted_id: Some(id),
            });
        }

        let Some(coll) = collections.get_mut(collection) else {
            return Ok(UpdateResult::default());
        };
        let take = if options.multi { targets.len() } else { 1 };
        let mut result = UpdateResult::default();
        for idx in targets.into_iter().take(take) {
            result.matched_count += 1;
            let (next, changed) = modified_copy(&coll.docs[idx], update)?;
            if changed {
                coll.store_at(collection, idx, next)?;
                result.modified_count += 1;
            }
        }
        Ok(result)
    }

    fn replace_one(&self, collection: &str, filter: &Document, replacement: &Document) -> Result<UpdateResult> {
        if update::classify(replacement)? != UpdateKind::Replacement {
            return Err(StoreError::update(
                "replacement document must not contain update operators",
            ));
        }
        self.update(collection, filter, replacement, UpdateOptions::default())
    }

    fn delete(&self, collection: &str, filter: &Document, limit_one: bool) -> Result<u64> {
        self.ensure_open()?;
        let mut collections = self.collections.write();
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut targets = coll.matching(filter)?;
        if limit_one {
            targets.truncate(1);
        }
        for idx in targets.iter().rev() {
            coll.docs.remove(*idx);
        }
        Ok(targets.len() as u64)
    }

    fn find_and_modify(
        &self,
        collection: &str,
        filter: &Document,
        options: &FindAndModifyOptions,
    ) -> Result<Option<Document>> {
        self.ensure_open()?;
        if !options.remove && options.update.is_none() {
            return Err(StoreError::update(
                "either an update or remove=true must be specified",
            ));
        }

        let mut collections = self.collections.write();
        let mut target = None;
        if let Some(coll) = collections.get(collection) {
            let mut candidates = coll.matching(filter)?;
            if let Some(sort) = &options.sort {
                let mut keyed: Vec<Document> = candidates.iter().map(|i| coll.docs[*i].clone()).collect();
                pipeline::sort(&mut keyed, sort)?;
                if let Some(first) = keyed.first() {
                    candidates = coll
                        .docs
                        .iter()
                        .position(|d| d == first)
                        .into_iter()
                        .collect();
                }
            }
            target = candidates.first().copied();
        }

        match (target, options.remove, &options.update) {
            (Some(idx), true, _) => {
                let Some(coll) = collections.get_mut(collection) else {
                    return Ok(None);
                };
                Ok(Some(coll.docs.remove(idx)))
            }
            (Some(idx), false, Some(update)) => {
                let Some(coll) = collections.get_mut(collection) else {
                    return Ok(None);
                };
                let before = coll.docs[idx].clone();
                let (after, changed) = modified_copy(&before, update)?;
                if changed {
                    coll.store_at(collection, idx, after.clone())?;
                }
                Ok(Some(if options.return_new { after } else { before }))
            }
            (None, false, Some(update)) if options.upsert => {
                let mut doc = upsert_document(filter, update)?;
                ensure_id(&mut doc);
                collections
                    .entry(collection.to_string())
                    .or_default()
                    .insert(collection, doc.clone())?;
                Ok(if options.return_new { Some(doc) } else { None })
            }
            _ => Ok(None),
        }
    }

    fn distinct(&self, collection: &str, field: &str, filter: &Document) -> Result<Vec<Value>> {
        self.ensure_open()?;
        let collections = self.collections.read();
        let Some(coll) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut values: Vec<Value> = Vec::new();
        let mut push = |v: &Value| {
            if !values.iter().any(|e| compare_values(e, v) == Ordering::Equal) {
                values.push(v.clone());
            }
        };
        for idx in coll.matching(filter)? {
            for v in path::lookup(&coll.docs[idx], field) {
                match v {
                    Value::Array(items) => items.iter().for_each(&mut push),
                    other => push(other),
                }
            }
        }
        Ok(values)
    }

    fn aggregate(&self, collection: &str, stages: &[Document]) -> Result<Vec<Document>> {
        self.ensure_open()?;
        let docs = self
            .collections
            .read()
            .get(collection)
            .map(|c| c.docs.clone())
            .unwrap_or_default();
        pipeline::run(docs, stages)
    }

    fn create_index(&self, collection: &str, spec: &IndexSpec) -> Result<String> {
        self.ensure_open()?;
        let mut collections = self.collections.write();
        let coll = collections.entry(collection.to_string()).or_default();
        let name = coll.indexes.create(collection, spec, &coll.docs)?;
        debug!(target: "docparity::engine", collection, index = %name, "Created index");
        Ok(name)
    }

    fn list_indexes(&self, collection: &str) -> Result<Vec<IndexInfo>> {
        self.ensure_open()?;
        self.collections
            .read()
            .get(collection)
            .map(|c| c.indexes.list().to_vec())
            .ok_or_else(|| StoreError::NamespaceNotFound {
                collection: collection.to_string(),
            })
    }

    fn drop_index(&self, collection: &str, name: &str) -> Result<()> {
        self.ensure_open()?;
        let mut collections = self.collections.write();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::NamespaceNotFound {
                collection: collection.to_string(),
            })?;
        coll.indexes.drop(name)
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, AtomicOrdering::AcqRel) {
            return Ok(());
        }
        self.collections.write().clear();
        debug!(target: "docparity::engine", location = %self.location, "Closed store");
        Ok(())
    }
}
