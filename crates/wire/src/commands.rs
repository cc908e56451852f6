//! Server-side command execution
//!
//! Translates command documents into [`Store`] calls and shapes the replies the
//! way a document-database server does: cursor replies carry every document in
//! `cursor.firstBatch`, write replies carry `n`-style counters.

use docparity_core::{doc, Document, Value};
use docparity_engine::{FindAndModifyOptions, FindOptions, IndexSpec, Store, StoreError, UpdateOptions};
use tracing::debug;

use crate::codec::MAX_FRAME_LEN;
use crate::envelope::{ApiError, Request, Response, BAD_VALUE, COMMAND_NOT_FOUND, TYPE_MISMATCH};

type CommandResult = std::result::Result<Document, ApiError>;

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::from(&e)
    }
}

/// Execute one request against the store
pub fn dispatch(store: &dyn Store, request: &Request) -> Response {
    match execute(store, request) {
        Ok(result) => Response::success(&request.id, result),
        Err(e) => {
            debug!(target: "docparity::wire", op = %request.op, code = e.code, "Command failed: {}", e.message);
            Response::error(&request.id, e)
        }
    }
}

fn execute(store: &dyn Store, req: &Request) -> CommandResult {
    match req.op.as_str() {
        "hello" | "isMaster" => Ok(doc! {
            "helloOk" => true,
            "isWritablePrimary" => true,
            "maxMessageSizeBytes" => MAX_FRAME_LEN as i64,
            "minWireVersion" => 0,
            "maxWireVersion" => 17,
        }),
        "ping" => Ok(doc! { "ok" => 1.0 }),
        "insert" => insert(store, req),
        "find" => find(store, req),
        "update" => update(store, req),
        "delete" => delete(store, req),
        "findAndModify" => find_and_modify(store, req),
        "distinct" => distinct(store, req),
        "aggregate" => aggregate(store, req),
        "createIndexes" => create_indexes(store, req),
        "listIndexes" => list_indexes(store, req),
        "dropIndexes" => drop_indexes(store, req),
        other => Err(ApiError::new(
            COMMAND_NOT_FOUND,
            format!("no such command: '{}'", other),
        )),
    }
}

// ---------------------------------------------------------------------------
// Parameter extraction
// ---------------------------------------------------------------------------

fn collection(req: &Request) -> std::result::Result<&str, ApiError> {
    req.params
        .get_str(&req.op)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ApiError::new(
                TYPE_MISMATCH,
                format!("collection name has invalid type for '{}'", req.op),
            )
        })
}

fn doc_param<'a>(params: &'a Document, key: &str) -> std::result::Result<Option<&'a Document>, ApiError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Document(d)) => Ok(Some(d)),
        Some(other) => Err(ApiError::new(
            TYPE_MISMATCH,
            format!("'{}' must be an object, not {}", key, other.type_name()),
        )),
    }
}

fn docs_param<'a>(params: &'a Document, key: &str) -> std::result::Result<Vec<&'a Document>, ApiError> {
    let items = params.get_array(key).ok_or_else(|| {
        ApiError::new(TYPE_MISMATCH, format!("'{}' must be an array", key))
    })?;
    items
        .iter()
        .map(|v| {
            v.as_document().ok_or_else(|| {
                ApiError::new(TYPE_MISMATCH, format!("entries of '{}' must be objects", key))
            })
        })
        .collect()
}

fn int_param(params: &Document, key: &str) -> std::result::Result<Option<i64>, ApiError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_i64().map(Some).ok_or_else(|| {
            ApiError::new(TYPE_MISMATCH, format!("'{}' must be a number", key))
        }),
    }
}

fn bool_param(params: &Document, key: &str) -> bool {
    match params.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(v) => v.as_f64().map(|n| n != 0.0).unwrap_or(false),
        None => false,
    }
}

fn empty() -> Document {
    Document::new()
}

fn cursor_reply(req: &Request, coll: &str, docs: Vec<Document>) -> Document {
    doc! {
        "cursor" => doc! {
            "id" => 0_i64,
            "ns" => format!("{}.{}", req.db, coll),
            "firstBatch" => docs.into_iter().map(Value::Document).collect::<Vec<_>>(),
        },
    }
}

fn count(n: u64) -> Value {
    match i32::try_from(n) {
        Ok(small) => Value::Int32(small),
        Err(_) => Value::Int64(n as i64),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn insert(store: &dyn Store, req: &Request) -> CommandResult {
    let coll = collection(req)?;
    let docs: Vec<Document> = docs_param(&req.params, "documents")?
        .into_iter()
        .cloned()
        .collect();
    let ids = store.insert_many(coll, docs)?;
    Ok(doc! {
        "n" => count(ids.len() as u64),
        "insertedIds" => ids,
    })
}

fn find(store: &dyn Store, req: &Request) -> CommandResult {
    let coll = collection(req)?;
    let p = &req.params;
    let filter = doc_param(p, "filter")?.cloned().unwrap_or_else(empty);
    let skip = int_param(p, "skip")?.unwrap_or(0);
    if skip < 0 {
        return Err(ApiError::new(BAD_VALUE, "skip value must be non-negative"));
    }
    let options = FindOptions {
        sort: doc_param(p, "sort")?.cloned(),
        skip: skip as u64,
        limit: int_param(p, "limit")?
            .map(|n| n.unsigned_abs())
            .filter(|n| *n > 0),
        projection: doc_param(p, "projection")?.cloned(),
    };
    let docs = store.find(coll, &filter, &options)?;
    Ok(cursor_reply(req, coll, docs))
}

fn update(store: &dyn Store, req: &Request) -> CommandResult {
    let coll = collection(req)?;
    let statements = docs_param(&req.params, "updates")?;
    let mut n = 0u64;
    let mut modified = 0u64;
    let mut upserted = Vec::new();
    for (index, stmt) in statements.into_iter().enumerate() {
        let filter = doc_param(stmt, "q")?.cloned().unwrap_or_else(empty);
        let update = doc_param(stmt, "u")?
            .ok_or_else(|| ApiError::new(BAD_VALUE, "update statement requires 'u'"))?;
        let options = UpdateOptions {
            upsert: bool_param(stmt, "upsert"),
            multi: bool_param(stmt, "multi"),
        };
        let result = store.update(coll, &filter, update, options)?;
        n += result.matched_count;
        modified += result.modified_count;
        if let Some(id) = result.upserted_id {
            n += 1;
            upserted.push(Value::Document(doc! { "index" => index as i32, "_id" => id }));
        }
    }
    let mut reply = doc! { "n" => count(n), "nModified" => count(modified) };
    if !upserted.is_empty() {
        reply.insert("upserted", upserted);
    }
    Ok(reply)
}

fn delete(store: &dyn Store, req: &Request) -> CommandResult {
    let coll = collection(req)?;
    let mut n = 0u64;
    for stmt in docs_param(&req.params, "deletes")? {
        let filter = doc_param(stmt, "q")?.cloned().unwrap_or_else(empty);
        let limit_one = match int_param(stmt, "limit")?.unwrap_or(0) {
            0 => false,
            1 => true,
            other => {
                return Err(ApiError::new(
                    BAD_VALUE,
                    format!("the limit field in delete objects must be 0 or 1, got {}", other),
                ))
            }
        };
        n += store.delete(coll, &filter, limit_one)?;
    }
    Ok(doc! { "n" => count(n) })
}

fn find_and_modify(store: &dyn Store, req: &Request) -> CommandResult {
    let coll = collection(req)?;
    let p = &req.params;
    let filter = doc_param(p, "query")?.cloned().unwrap_or_else(empty);
    let options = FindAndModifyOptions {
        update: doc_param(p, "update")?.cloned(),
        remove: bool_param(p, "remove"),
        return_new: bool_param(p, "new"),
        upsert: bool_param(p, "upsert"),
        sort: doc_param(p, "sort")?.cloned(),
    };
    if options.remove && options.update.is_some() {
        return Err(ApiError::new(BAD_VALUE, "cannot specify both an update and remove=true"));
    }
    let value = store.find_and_modify(coll, &filter, &options)?;
    let n = i32::from(value.is_some());
    Ok(doc! {
        "lastErrorObject" => doc! { "n" => n },
        "value" => value,
    })
}

fn distinct(store: &dyn Store, req: &Request) -> CommandResult {
    let coll = collection(req)?;
    let key = req
        .params
        .get_str("key")
        .ok_or_else(|| ApiError::new(TYPE_MISMATCH, "'key' must be a string"))?;
    let filter = doc_param(&req.params, "query")?.cloned().unwrap_or_else(empty);
    let values = store.distinct(coll, key, &filter)?;
    Ok(doc! { "values" => values })
}

fn aggregate(store: &dyn Store, req: &Request) -> CommandResult {
    let coll = collection(req)?;
    let stages: Vec<Document> = docs_param(&req.params, "pipeline")?
        .into_iter()
        .cloned()
        .collect();
    let docs = store.aggregate(coll, &stages)?;
    Ok(cursor_reply(req, coll, docs))
}

fn create_indexes(store: &dyn Store, req: &Request) -> CommandResult {
    let coll = collection(req)?;
    let specs = docs_param(&req.params, "indexes")?;
    if specs.is_empty() {
        return Err(ApiError::new(BAD_VALUE, "must specify at least one index"));
    }
    let before = match store.list_indexes(coll) {
        Ok(list) => Some(list.len()),
        Err(StoreError::NamespaceNotFound { .. }) => None,
        Err(e) => return Err(e.into()),
    };
    for spec in specs {
        let keys = doc_param(spec, "key")?
            .ok_or_else(|| ApiError::new(BAD_VALUE, "index specification requires 'key'"))?;
        let name = spec
            .get_str("name")
            .ok_or_else(|| ApiError::new(BAD_VALUE, "index specification requires 'name'"))?;
        store.create_index(
            coll,
            &IndexSpec {
                keys: keys.clone(),
                name: Some(name.to_string()),
                unique: bool_param(spec, "unique"),
            },
        )?;
    }
    let after = store.list_indexes(coll)?.len();
    Ok(doc! {
        "createdCollectionAutomatically" => before.is_none(),
        "numIndexesBefore" => count(before.unwrap_or(1) as u64),
        "numIndexesAfter" => count(after as u64),
    })
}

fn list_indexes(store: &dyn Store, req: &Request) -> CommandResult {
    let coll = collection(req)?;
    let docs = store
        .list_indexes(coll)?
        .iter()
        .map(|i| i.to_document())
        .collect();
    Ok(cursor_reply(req, coll, docs))
}

fn drop_indexes(store: &dyn Store, req: &Request) -> CommandResult {
    let coll = collection(req)?;
    let name = req
        .params
        .get_str("index")
        .ok_or_else(|| ApiError::new(TYPE_MISMATCH, "'index' must be an index name"))?;
    let was = store.list_indexes(coll)?.len();
    store.drop_index(coll, name)?;
    Ok(doc! { "nIndexesWas" => count(was as u64) })
}
