//! Query filter evaluation
//!
//! A filter is a document of `field: condition` pairs that must all hold, plus
//! the logical operators `$and`, `$or` and `$nor` at any level. A condition is
//! either a literal (equality, including array membership) or an operator
//! document such as `{"$gt": 5, "$lt": 10}`.

use std::cmp::Ordering;

use docparity_core::{Document, Value};

use crate::compare::{compare_values, same_bracket, values_equal};
use crate::error::{Result, StoreError};
use crate::path;

/// Evaluate `filter` against `doc`
pub fn matches(doc: &Document, filter: &Document) -> Result<bool> {
    for (key, cond) in filter.iter() {
        let ok = match key {
            "$and" => clauses(key, cond)?
                .iter()
                .try_fold(true, |acc, c| Ok::<_, StoreError>(acc && matches(doc, c)?))?,
            "$or" => {
                let mut any = false;
                for c in clauses(key, cond)? {
                    if matches(doc, c)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$nor" => {
                let mut none = true;
                for c in clauses(key, cond)? {
                    if matches(doc, c)? {
                        none = false;
                        break;
                    }
                }
                none
            }
            k if k.starts_with('$') => {
                return Err(StoreError::query(format!("unknown top level operator: {}", k)))
            }
            field => field_matches(doc, field, cond)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(op: &str, cond: &'a Value) -> Result<Vec<&'a Document>> {
    let items = cond
        .as_array()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| StoreError::query(format!("{} must be a nonempty array", op)))?;
    items
        .iter()
        .map(|v| {
            v.as_document()
                .ok_or_else(|| StoreError::query(format!("{} argument's entries must be objects", op)))
        })
        .collect()
}

/// True when a condition is an operator document (`{"$op": ...}`)
pub fn is_operator_doc(cond: &Value) -> bool {
    cond.as_document()
        .and_then(Document::first_key)
        .map(|k| k.starts_with('$'))
        .unwrap_or(false)
}

fn field_matches(doc: &Document, field: &str, cond: &Value) -> Result<bool> {
    let candidates = path::lookup(doc, field);
    match cond {
        Value::Document(ops) if is_operator_doc(cond) => {
            for (op, operand) in ops.iter() {
                if !operator_matches(&candidates, op, operand)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        literal => Ok(equals_any(&candidates, literal)),
    }
}

/// Equality semantics: a missing field equals null; an array field matches if
/// it equals the operand or any element does.
fn equals_any(candidates: &[&Value], operand: &Value) -> bool {
    if candidates.is_empty() {
        return operand.is_null();
    }
    candidates.iter().any(|c| {
        values_equal(c, operand)
            || c.as_array()
                .map(|items| items.iter().any(|i| values_equal(i, operand)))
                .unwrap_or(false)
    })
}

fn operator_matches(candidates: &[&Value], op: &str, operand: &Value) -> Result<bool> {
    match op {
        "$eq" => Ok(equals_any(candidates, operand)),
        "$ne" => Ok(!equals_any(candidates, operand)),
        "$gt" => Ok(range_any(candidates, operand, |o| o == Ordering::Greater)),
        "$gte" => Ok(range_any(candidates, operand, |o| o != Ordering::Less)),
        "$lt" => Ok(range_any(candidates, operand, |o| o == Ordering::Less)),
        "$lte" => Ok(range_any(candidates, operand, |o| o != Ordering::Greater)),
        "$in" => {
            let options = operand
                .as_array()
                .ok_or_else(|| StoreError::query("$in needs an array"))?;
            Ok(options.iter().any(|o| equals_any(candidates, o)))
        }
        "$nin" => {
            let options = operand
                .as_array()
                .ok_or_else(|| StoreError::query("$nin needs an array"))?;
            Ok(!options.iter().any(|o| equals_any(candidates, o)))
        }
        "$exists" => {
            let want = match operand {
                Value::Bool(b) => *b,
                v => v.as_f64().map(|n| n != 0.0).unwrap_or(true),
            };
            Ok(candidates.is_empty() != want)
        }
        other => Err(StoreError::query(format!("unknown operator: {}", other))),
    }
}

// Range operators look inside arrays and only compare within the operand's bracket.
fn range_any(candidates: &[&Value], operand: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    let check = |v: &Value| same_bracket(v, operand) && accept(compare_values(v, operand));
    candidates.iter().any(|c| match c {
        Value::Array(items) => check(c) || items.iter().any(check),
        _ => check(c),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use docparity_core::doc;

    fn person() -> Document {
        doc! {
            "_id" => "p1",
            "name" => "Alice",
            "age" => 25,
            "score" => 88.5,
            "tags" => vec![Value::from("admin"), Value::from("dev")],
            "address" => doc! { "city" => "Paris" },
            "manager" => Value::Null,
        }
    }

    fn check(filter: Document) -> bool {
        matches(&person(), &filter).unwrap()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(check(doc! {}));
    }

    #[test]
    fn test_equality_and_numeric_crossing() {
        assert!(check(doc! { "name" => "Alice" }));
        assert!(check(doc! { "age" => 25.0 }));
        assert!(check(doc! { "age" => 25_i64 }));
        assert!(!check(doc! { "age" => "25" }));
    }

    #[test]
    fn test_array_membership_and_dotted_paths() {
        assert!(check(doc! { "tags" => "dev" }));
        assert!(check(doc! { "address.city" => "Paris" }));
        assert!(!check(doc! { "address.city" => "Rome" }));
    }

    #[test]
    fn test_null_matches_missing_and_null() {
        assert!(check(doc! { "manager" => Value::Null }));
        assert!(check(doc! { "nickname" => Value::Null }));
    }

    #[test]
    fn test_comparison_operators() {
        assert!(check(doc! { "age" => doc! { "$gt" => 20, "$lte" => 25 } }));
        assert!(!check(doc! { "age" => doc! { "$lt" => 25 } }));
        assert!(check(doc! { "score" => doc! { "$gte" => 88.5 } }));
        assert!(!check(doc! { "name" => doc! { "$gt" => 5 } }));
        assert!(check(doc! { "age" => doc! { "$ne" => 30 } }));
    }

    #[test]
    fn test_in_nin_exists() {
        assert!(check(doc! { "name" => doc! { "$in" => vec![Value::from("Bob"), Value::from("Alice")] } }));
        assert!(check(doc! { "tags" => doc! { "$nin" => vec![Value::from("guest")] } }));
        assert!(check(doc! { "score" => doc! { "$exists" => true } }));
        assert!(check(doc! { "nickname" => doc! { "$exists" => false } }));
    }

    #[test]
    fn test_logical_operators() {
        let or = doc! { "$or" => vec![
            Value::from(doc! { "name" => "Bob" }),
            Value::from(doc! { "age" => 25 }),
        ]};
        assert!(check(or));

        let nor = doc! { "$nor" => vec![Value::from(doc! { "name" => "Alice" })] };
        assert!(!check(nor));

        let and = doc! { "$and" => vec![
            Value::from(doc! { "age" => doc! { "$gte" => 18 } }),
            Value::from(doc! { "tags" => "admin" }),
        ]};
        assert!(check(and));
    }

    #[test]
    fn test_unknown_operator_is_error() {
        let err = matches(&person(), &doc! { "age" => doc! { "$near" => 1 } }).unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery { .. }));

        let err = matches(&person(), &doc! { "$where" => "1" }).unwrap_err();
        assert!(err.to_string().contains("$where"));
    }
}
