//! Update application
//!
//! An update document is either made of operators (`$set`, `$unset`, `$inc`,
//! `$push`) or is a plain replacement document. Mixing the two is rejected.

use docparity_core::{Document, Value};

use crate::compare::add_numbers;
use crate::error::{Result, StoreError};
use crate::filter::is_operator_doc;
use crate::path;

/// Shape of an update document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Operators,
    Replacement,
}

/// Classify an update document
pub fn classify(update: &Document) -> Result<UpdateKind> {
    let dollar = update.keys().filter(|k| k.starts_with('$')).count();
    match dollar {
        0 => Ok(UpdateKind::Replacement),
        n if n == update.len() => Ok(UpdateKind::Operators),
        _ => Err(StoreError::update(
            "update document cannot mix operators and plain fields",
        )),
    }
}

/// Apply operator updates to `doc` in place. Returns true if anything changed.
pub fn apply_operators(doc: &mut Document, update: &Document) -> Result<bool> {
    if update.is_empty() {
        return Err(StoreError::update("update document must not be empty"));
    }
    let mut changed = false;
    for (op, args) in update.iter() {
        let fields = args
            .as_document()
            .ok_or_else(|| StoreError::update(format!("modifier {} expects a document", op)))?;
        for (field, arg) in fields.iter() {
            if field == "_id" || field.starts_with("_id.") {
                let unchanged = op == "$set" && doc.get("_id") == Some(arg);
                if !unchanged {
                    return Err(StoreError::ImmutableId);
                }
                continue;
            }
            changed |= apply_one(doc, op, field, arg)?;
        }
    }
    Ok(changed)
}

fn apply_one(doc: &mut Document, op: &str, field: &str, arg: &Value) -> Result<bool> {
    match op {
        "$set" => {
            let previous = path::set(doc, field, arg.clone())?;
            Ok(previous.as_ref() != Some(arg))
        }
        "$unset" => Ok(path::unset(doc, field).is_some()),
        "$inc" => {
            if !arg.is_number() {
                return Err(StoreError::update(format!(
                    "cannot increment with non-numeric argument: {{{}: {}}}",
                    field,
                    arg.type_name()
                )));
            }
            let next = match path::get(doc, field) {
                None => arg.clone(),
                Some(current) => add_numbers(current, arg).ok_or_else(|| {
                    StoreError::update(format!(
                        "cannot apply $inc to a value of non-numeric type {} in field '{}'",
                        current.type_name(),
                        field
                    ))
                })?,
            };
            let unchanged = arg.as_f64() == Some(0.0);
            path::set(doc, field, next)?;
            Ok(!unchanged)
        }
        "$push" => {
            let additions = match arg.as_document().and_then(|d| d.get("$each")) {
                Some(Value::Array(each)) => each.clone(),
                Some(_) => return Err(StoreError::update("$each requires an array")),
                None => vec![arg.clone()],
            };
            match path::get(doc, field) {
                None => {
                    path::set(doc, field, Value::Array(additions))?;
                }
                Some(Value::Array(existing)) => {
                    let mut items = existing.clone();
                    items.extend(additions);
                    path::set(doc, field, Value::Array(items))?;
                }
                Some(other) => {
                    return Err(StoreError::update(format!(
                        "the field '{}' must be an array but is of type {}",
                        field,
                        other.type_name()
                    )))
                }
            }
            Ok(true)
        }
        other => Err(StoreError::update(format!("unknown modifier: {}", other))),
    }
}

/// Replace `doc` with `replacement`, keeping `_id` first.
///
/// A replacement carrying a different `_id` is rejected.
pub fn replace(doc: &Document, replacement: &Document) -> Result<Document> {
    if let (Some(new_id), Some(old_id)) = (replacement.get("_id"), doc.get("_id")) {
        if new_id != old_id {
            return Err(StoreError::ImmutableId);
        }
    }
    let mut out = Document::new();
    if let Some(id) = doc.get("_id") {
        out.insert("_id", id.clone());
    }
    for (k, v) in replacement.iter() {
        if k != "_id" {
            out.insert(k, v.clone());
        }
    }
    Ok(out)
}

/// Seed document for an upsert: the filter's plain equality fields
pub fn upsert_seed(filter: &Document) -> Result<Document> {
    let mut seed = Document::new();
    for (k, v) in filter.iter() {
        if k.starts_with('$') {
            continue;
        }
        match v {
            cond if is_operator_doc(cond) => {
                if let Some(eq) = cond.as_document().and_then(|d| d.get("$eq")) {
                    path::set(&mut seed, k, eq.clone())?;
                }
            }
            literal => {
                path::set(&mut seed, k, literal.clone())?;
            }
        }
    }
    Ok(seed)
}
