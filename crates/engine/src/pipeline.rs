//! Aggregation pipeline, sorting and projection
//!
//! Supported stages: `$match`, `$sort`, `$skip`, `$limit`, `$project`,
//! `$group` (with `$sum`, `$avg`, `$min`, `$max`) and `$count`.

use std::cmp::Ordering;

use docparity_core::{Document, Value};

use crate::compare::{add_numbers, compare_values};
use crate::error::{Result, StoreError};
use crate::filter;
use crate::path;

/// Run `stages` over `docs`
pub fn run(mut docs: Vec<Document>, stages: &[Document]) -> Result<Vec<Document>> {
    for stage in stages {
        if stage.len() != 1 {
            return Err(StoreError::pipeline(
                "a pipeline stage specification object must contain exactly one field",
            ));
        }
        let Some((name, spec)) = stage.iter().next() else {
            continue;
        };
        docs = match name {
            "$match" => {
                let f = stage_doc(name, spec)?;
                let mut kept = Vec::with_capacity(docs.len());
                for d in docs {
                    if filter::matches(&d, f)? {
                        kept.push(d);
                    }
                }
                kept
            }
            "$sort" => {
                let spec = stage_doc(name, spec)?;
                sort(&mut docs, spec)?;
                docs
            }
            "$skip" => {
                let n = stage_count(name, spec)?;
                docs.into_iter().skip(n).collect()
            }
            "$limit" => {
                let n = stage_count(name, spec)?;
                if n == 0 {
                    return Err(StoreError::pipeline("the limit must be positive"));
                }
                docs.into_iter().take(n).collect()
            }
            "$project" => {
                let spec = stage_doc(name, spec)?;
                docs.iter().map(|d| project(d, spec)).collect::<Result<_>>()?
            }
            "$group" => group(&docs, stage_doc(name, spec)?)?,
            "$count" => {
                let field = spec
                    .as_str()
                    .filter(|s| !s.is_empty() && !s.starts_with('$') && !s.contains('.'))
                    .ok_or_else(|| StoreError::pipeline("$count requires a non-empty field name"))?;
                if docs.is_empty() {
                    Vec::new()
                } else {
                    let mut out = Document::new();
                    out.insert(field, count_value(docs.len()));
                    vec![out]
                }
            }
            other => {
                return Err(StoreError::pipeline(format!(
                    "unrecognized pipeline stage name: '{}'",
                    other
                )))
            }
        };
    }
    Ok(docs)
}

fn stage_doc<'a>(name: &str, spec: &'a Value) -> Result<&'a Document> {
    spec.as_document()
        .ok_or_else(|| StoreError::pipeline(format!("{} specification must be an object", name)))
}

fn stage_count(name: &str, spec: &Value) -> Result<usize> {
    spec.as_i64()
        .filter(|n| *n >= 0)
        .map(|n| n as usize)
        .ok_or_else(|| StoreError::pipeline(format!("{} requires a non-negative number", name)))
}

fn count_value(n: usize) -> Value {
    match i32::try_from(n) {
        Ok(small) => Value::Int32(small),
        Err(_) => Value::Int64(n as i64),
    }
}

/// Stable sort by a `{field: 1 | -1}` specification. Missing fields sort as null.
pub fn sort(docs: &mut [Document], spec: &Document) -> Result<()> {
    let mut keys = Vec::with_capacity(spec.len());
    for (field, dir) in spec.iter() {
        let descending = match dir.as_i64() {
            Some(1) => false,
            Some(-1) => true,
            _ => {
                return Err(StoreError::query(format!(
                    "invalid sort direction for '{}': must be 1 or -1",
                    field
                )))
            }
        };
        keys.push((field, descending));
    }
    if keys.is_empty() {
        return Err(StoreError::query("sort specification must not be empty"));
    }
    docs.sort_by(|a, b| {
        for (field, descending) in &keys {
            let ord = compare_values(sort_key(a, field), sort_key(b, field));
            let ord = if *descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    Ok(())
}

static NULL: Value = Value::Null;

fn sort_key<'a>(doc: &'a Document, field: &str) -> &'a Value {
    path::get(doc, field).unwrap_or(&NULL)
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Null => false,
        other => other.as_f64().map(|n| n != 0.0).unwrap_or(true),
    }
}

/// Apply an inclusion or exclusion projection.
///
/// `_id` is included unless explicitly excluded. Mixing inclusion and
/// exclusion of other fields is rejected.
pub fn project(doc: &Document, spec: &Document) -> Result<Document> {
    let mut include = None;
    for (field, flag) in spec.iter() {
        if field == "_id" {
            continue;
        }
        let incl = truthy(flag);
        match include {
            None => include = Some(incl),
            Some(prev) if prev != incl => {
                return Err(StoreError::query(format!(
                    "cannot do {} on field {} in {} projection",
                    if incl { "inclusion" } else { "exclusion" },
                    field,
                    if prev { "inclusion" } else { "exclusion" }
                )))
            }
            Some(_) => {}
        }
    }
    let keep_id = spec.get("_id").map(truthy).unwrap_or(true);

    match include {
        Some(true) => {
            let mut out = Document::new();
            if keep_id {
                if let Some(id) = doc.get("_id") {
                    out.insert("_id", id.clone());
                }
            }
            for (field, _) in spec.iter().filter(|(f, _)| *f != "_id") {
                if let Some(v) = path::get(doc, field) {
                    path::set(&mut out, field, v.clone())?;
                }
            }
            Ok(out)
        }
        _ => {
            let mut out = doc.clone();
            for (field, _) in spec.iter().filter(|(f, _)| *f != "_id") {
                path::unset(&mut out, field);
            }
            if !keep_id {
                out.remove("_id");
            }
            Ok(out)
        }
    }
}

/// Evaluate a group expression: `"$path"` reads a field, documents evaluate
/// their values, anything else is a literal.
fn eval(doc: &Document, expr: &Value) -> Value {
    match expr {
        Value::String(s) if s.starts_with('$') => {
            path::get(doc, &s[1..]).cloned().unwrap_or(Value::Null)
        }
        Value::Document(fields) => Value::Document(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), eval(doc, v)))
                .collect(),
        ),
        literal => literal.clone(),
    }
}

#[derive(Debug, Clone, Copy)]
enum Accumulator {
    Sum,
    Avg,
    Min,
    Max,
}

struct AccState {
    sum: Value,
    numeric: usize,
    extreme: Option<Value>,
}

impl AccState {
    fn new() -> Self {
        AccState {
            sum: Value::Int32(0),
            numeric: 0,
            extreme: None,
        }
    }

    fn feed(&mut self, acc: Accumulator, v: Value) {
        match acc {
            Accumulator::Sum | Accumulator::Avg => {
                if let Some(s) = add_numbers(&self.sum, &v) {
                    self.sum = s;
                    self.numeric += 1;
                }
            }
            Accumulator::Min | Accumulator::Max => {
                if v.is_null() {
                    return;
                }
                let replace = match &self.extreme {
                    None => true,
                    Some(cur) => {
                        let ord = compare_values(&v, cur);
                        matches!(
                            (acc, ord),
                            (Accumulator::Min, Ordering::Less) | (Accumulator::Max, Ordering::Greater)
                        )
                    }
                };
                if replace {
                    self.extreme = Some(v);
                }
            }
        }
    }

    fn finish(self, acc: Accumulator) -> Value {
        match acc {
            Accumulator::Sum => self.sum,
            Accumulator::Avg => match (self.numeric, self.sum.as_f64()) {
                (0, _) | (_, None) => Value::Null,
                (n, Some(total)) => Value::Double(total / n as f64),
            },
            Accumulator::Min | Accumulator::Max => self.extreme.unwrap_or(Value::Null),
        }
    }
}

fn group(docs: &[Document], spec: &Document) -> Result<Vec<Document>> {
    let id_expr = spec
        .get("_id")
        .ok_or_else(|| StoreError::pipeline("a group specification must include an _id"))?;

    let mut fields = Vec::new();
    for (name, acc_spec) in spec.iter().filter(|(k, _)| *k != "_id") {
        let acc_doc = acc_spec
            .as_document()
            .filter(|d| d.len() == 1)
            .ok_or_else(|| {
                StoreError::pipeline(format!("the field '{}' must be an accumulator object", name))
            })?;
        let Some((op, expr)) = acc_doc.iter().next() else {
            continue;
        };
        let acc = match op {
            "$sum" => Accumulator::Sum,
            "$avg" => Accumulator::Avg,
            "$min" => Accumulator::Min,
            "$max" => Accumulator::Max,
            other => {
                return Err(StoreError::pipeline(format!(
                    "unknown group operator '{}'",
                    other
                )))
            }
        };
        fields.push((name, acc, expr));
    }

    // Groups keep first-seen order.
    let mut groups: Vec<(Value, Vec<AccState>)> = Vec::new();
    for d in docs {
        let key = eval(d, id_expr);
        let idx = match groups
            .iter()
            .position(|(k, _)| compare_values(k, &key) == Ordering::Equal)
        {
            Some(i) => i,
            None => {
                groups.push((key, fields.iter().map(|_| AccState::new()).collect()));
                groups.len() - 1
            }
        };
        for ((_, acc, expr), state) in fields.iter().zip(groups[idx].1.iter_mut()) {
            state.feed(*acc, eval(d, expr));
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, states)| {
            let mut out = Document::new();
            out.insert("_id", key);
            for ((name, acc, _), state) in fields.iter().zip(states) {
                out.insert(*name, state.finish(*acc));
            }
            out
        })
        .collect())
}
