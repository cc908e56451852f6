//! Value ordering and arithmetic
//!
//! Values of different kinds order by a fixed type rank
//! (null < numbers < strings < documents < arrays < booleans); numbers compare
//! by value across Int32, Int64 and Double.

use std::cmp::Ordering;

use docparity_core::Value;

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 1,
        Value::Int32(_) | Value::Int64(_) | Value::Double(_) => 2,
        Value::String(_) => 3,
        Value::Document(_) => 4,
        Value::Array(_) => 5,
        Value::Bool(_) => 6,
    }
}

/// Total order over values
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Value::Int32(x), Value::Int32(y)) => x.cmp(y),
        (Value::Int64(x), Value::Int64(y)) => x.cmp(y),
        (Value::Int32(x), Value::Int64(y)) => i64::from(*x).cmp(y),
        (Value::Int64(x), Value::Int32(y)) => x.cmp(&i64::from(*y)),
        _ if a.is_number() => compare_f64(a.as_f64(), b.as_f64()),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Document(x), Value::Document(y)) => {
            for ((lk, lv), (rk, rv)) in x.iter().zip(y.iter()) {
                let ord = lk.cmp(rk).then_with(|| compare_values(lv, rv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => Ordering::Equal,
    }
}

// NaN sorts below every other number.
fn compare_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => match (x.is_nan(), y.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        },
        _ => Ordering::Equal,
    }
}

/// Equality used by queries: numeric across variants, order-insensitive documents
pub fn values_equal(a: &Value, b: &Value) -> bool {
    a.numeric_eq(b)
}

/// True when both values belong to the same comparison bracket.
///
/// Range operators only match values of the same kind as the operand.
pub fn same_bracket(a: &Value, b: &Value) -> bool {
    type_rank(a) == type_rank(b)
}

/// Add two numbers, widening Int32 to Int64 on overflow and to Double when
/// either side is a Double. Returns `None` for non-numeric input.
pub fn add_numbers(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::Int32(x), Value::Int32(y)) => Some(match x.checked_add(*y) {
            Some(sum) => Value::Int32(sum),
            None => Value::Int64(i64::from(*x) + i64::from(*y)),
        }),
        (Value::Int32(_) | Value::Int64(_), Value::Int32(_) | Value::Int64(_)) => {
            let (x, y) = (a.as_i64()?, b.as_i64()?);
            Some(match x.checked_add(y) {
                Some(sum) => Value::Int64(sum),
                None => Value::Double(x as f64 + y as f64),
            })
        }
        _ if a.is_number() && b.is_number() => Some(Value::Double(a.as_f64()? + b.as_f64()?)),
        _ => None,
    }
}
