//! Dotted field paths
//!
//! `a.b.c` addresses nested documents. Query matching fans out across arrays
//! (`tags.name` reaches `name` in every element of `tags`); updates and
//! projections address one location only.

use docparity_core::{Document, Value};

use crate::error::{Result, StoreError};

/// All values reachable at `path`, fanning out through arrays.
///
/// Numeric segments index into arrays as well.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Vec<&'a Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    collect_in_doc(doc, &segments, &mut out);
    out
}

fn collect_in_doc<'a>(doc: &'a Document, segments: &[&str], out: &mut Vec<&'a Value>) {
    if let Some(v) = segments.first().and_then(|s| doc.get(s)) {
        collect_in_value(v, &segments[1..], out);
    }
}

fn collect_in_value<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    let Some(head) = segments.first() else {
        out.push(value);
        return;
    };
    match value {
        Value::Document(d) => collect_in_doc(d, segments, out),
        Value::Array(items) => {
            if let Some(item) = head.parse::<usize>().ok().and_then(|i| items.get(i)) {
                collect_in_value(item, &segments[1..], out);
            }
            for item in items {
                if let Value::Document(d) = item {
                    collect_in_doc(d, segments, out);
                }
            }
        }
        _ => {}
    }
}

/// The single value at `path`, without array fan-out
pub fn get<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for seg in segments {
        current = match current {
            Value::Document(d) => d.get(seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Set the value at `path`, creating intermediate documents.
///
/// Returns the previous value.
pub fn set(doc: &mut Document, path: &str, value: Value) -> Result<Option<Value>> {
    match path.split_once('.') {
        None => Ok(doc.insert(path, value)),
        Some((head, rest)) => {
            if !doc.contains_key(head) {
                doc.insert(head, Document::new());
            }
            match doc.get_mut(head) {
                Some(Value::Document(child)) => set(child, rest, value),
                Some(Value::Array(items)) => {
                    let (idx, tail) = match rest.split_once('.') {
                        Some((i, t)) => (i, Some(t)),
                        None => (rest, None),
                    };
                    let i = idx.parse::<usize>().map_err(|_| {
                        StoreError::update(format!("cannot create field '{}' in array '{}'", idx, head))
                    })?;
                    while items.len() <= i {
                        items.push(Value::Null);
                    }
                    match tail {
                        None => Ok(Some(std::mem::replace(&mut items[i], value))),
                        Some(t) => {
                            if items[i].is_null() {
                                items[i] = Value::Document(Document::new());
                            }
                            match &mut items[i] {
                                Value::Document(child) => set(child, t, value),
                                other => Err(StoreError::update(format!(
                                    "cannot create field '{}' in element of type {}",
                                    t,
                                    other.type_name()
                                ))),
                            }
                        }
                    }
                }
                Some(other) => Err(StoreError::update(format!(
                    "cannot create field '{}' in element {{{}: {}}}",
                    rest,
                    head,
                    other.type_name()
                ))),
                None => Ok(None),
            }
        }
    }
}

/// Remove the value at `path`. Returns the removed value, if any.
pub fn unset(doc: &mut Document, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => doc.remove(path),
        Some((head, rest)) => match doc.get_mut(head)? {
            Value::Document(child) => unset(child, rest),
            Value::Array(items) => {
                let i = rest.parse::<usize>().ok()?;
                let slot = items.get_mut(i)?;
                Some(std::mem::replace(slot, Value::Null))
            }
            _ => None,
        },
    }
}
