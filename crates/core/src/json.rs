//! Canonical JSON serialization for docparity values.
//!
//! `Value` and `Document` serialize to plain JSON. Documents keep their key
//! order in both directions: the deserializer walks JSON objects in file order,
//! so sort specifications and index keys survive a suite round trip.
//!
//! Integer typing on input:
//!
//! | JSON number | Value |
//! |-------------|-------|
//! | fits in i32 | `Int32` |
//! | fits in i64 | `Int64` |
//! | larger than i64 | rejected |
//! | non-integer | `Double` |
//!
//! Doubles without a JSON representation use a tagged object:
//!
//! | Double | JSON Representation |
//! |--------|---------------------|
//! | NaN | `{"$f64": "NaN"}` |
//! | +Infinity | `{"$f64": "+Inf"}` |
//! | -Infinity | `{"$f64": "-Inf"}` |
//! | -0.0 | `{"$f64": "-0.0"}` |

use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::value::Value;

const F64_TAG: &str = "$f64";

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int32(i) => serializer.serialize_i32(*i),
            Value::Int64(i) => serializer.serialize_i64(*i),
            Value::Double(f) => match special_float_tag(*f) {
                Some(tag) => {
                    let mut map = serializer.serialize_map(Some(1))?;
                    map.serialize_entry(F64_TAG, tag)?;
                    map.end()
                }
                None => serializer.serialize_f64(*f),
            },
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Document(doc) => doc.serialize(serializer),
        }
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a null, bool, number, string, array or document")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Value, E> {
        Ok(integer_value(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Value, E> {
        i64::try_from(v)
            .map(integer_value)
            .map_err(|_| E::custom(Error::unsupported_scalar(format!("integer {} exceeds int64", v))))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Value, E> {
        Ok(Value::Double(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_bytes<E: de::Error>(self, _v: &[u8]) -> std::result::Result<Value, E> {
        Err(E::custom(Error::unsupported_scalar("bytes")))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Value>()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A>(self, map: A) -> std::result::Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let doc = DocumentVisitor.visit_map(map)?;
        match tagged_float(&doc) {
            Some(Ok(f)) => Ok(Value::Double(f)),
            Some(Err(e)) => Err(de::Error::custom(e)),
            None => Ok(Value::Document(doc)),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = Document;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a document")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Document, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut doc = Document::new();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            doc.insert(key, value);
        }
        Ok(doc)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(DocumentVisitor)
    }
}

/// Convert untyped JSON into a [`Value`].
///
/// The conversion is total over JSON: every object becomes a `Document`, every
/// array an `Array`. Integers beyond the int64 range are rejected.
impl TryFrom<JsonValue> for Value {
    type Error = Error;

    fn try_from(json: JsonValue) -> Result<Self> {
        match json {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Bool(b) => Ok(Value::Bool(b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(integer_value(i))
                } else if n.is_u64() {
                    Err(Error::unsupported_scalar(format!("integer {} exceeds int64", n)))
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::Double(f))
                } else {
                    Err(Error::conversion(format!("invalid number {}", n)))
                }
            }
            JsonValue::String(s) => Ok(Value::String(s)),
            JsonValue::Array(arr) => arr
                .into_iter()
                .map(Value::try_from)
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            JsonValue::Object(obj) => {
                let mut doc = Document::new();
                for (k, v) in obj {
                    doc.insert(k, Value::try_from(v)?);
                }
                match tagged_float(&doc) {
                    Some(result) => result.map(Value::Double),
                    None => Ok(Value::Document(doc)),
                }
            }
        }
    }
}

/// Convert a [`Value`] to JSON with the special float encoding.
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int32(i) => JsonValue::Number((*i).into()),
        Value::Int64(i) => JsonValue::Number((*i).into()),
        Value::Double(f) => match special_float_tag(*f) {
            Some(tag) => serde_json::json!({ F64_TAG: tag }),
            None => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
        },
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Array(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
        Value::Document(doc) => JsonValue::Object(
            doc.iter()
                .map(|(k, v)| (k.to_string(), value_to_json(v)))
                .collect(),
        ),
    }
}

impl From<&Value> for JsonValue {
    fn from(v: &Value) -> Self {
        value_to_json(v)
    }
}

fn integer_value(i: i64) -> Value {
    match i32::try_from(i) {
        Ok(small) => Value::Int32(small),
        Err(_) => Value::Int64(i),
    }
}

fn special_float_tag(f: f64) -> Option<&'static str> {
    if f.is_nan() {
        Some("NaN")
    } else if f.is_infinite() {
        Some(if f.is_sign_positive() { "+Inf" } else { "-Inf" })
    } else if f == 0.0 && f.is_sign_negative() {
        Some("-0.0")
    } else {
        None
    }
}

/// Recognize a `{"$f64": "..."}` document.
fn tagged_float(doc: &Document) -> Option<Result<f64>> {
    if doc.len() != 1 {
        return None;
    }
    let tag = doc.get_str(F64_TAG)?;
    Some(match tag {
        "NaN" => Ok(f64::NAN),
        "+Inf" => Ok(f64::INFINITY),
        "-Inf" => Ok(f64::NEG_INFINITY),
        "-0.0" => Ok(-0.0_f64),
        other => other
            .parse::<f64>()
            .map_err(|e| Error::conversion(format!("invalid float '{}': {}", other, e))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use proptest::prelude::*;

    #[test]
    fn test_integer_typing() {
        let v: Value = serde_json::from_str("[1, 3000000000, -2147483648, 2.5]").unwrap();
        assert_eq!(
            v,
            Value::Array(vec![
                Value::Int32(1),
                Value::Int64(3_000_000_000),
                Value::Int32(i32::MIN),
                Value::Double(2.5),
            ])
        );
    }

    #[test]
    fn test_u64_beyond_i64_is_rejected() {
        let err = serde_json::from_str::<Value>("18446744073709551615").unwrap_err();
        assert!(err.to_string().contains("unsupported scalar"));

        let json: JsonValue = serde_json::from_str("18446744073709551615").unwrap();
        assert!(matches!(
            Value::try_from(json),
            Err(Error::UnsupportedScalar { .. })
        ));
    }

    #[test]
    fn test_document_key_order_survives_parse() {
        let v: Value = serde_json::from_str(r#"{"zeta": 1, "alpha": -1, "mid": 1}"#).unwrap();
        let doc = v.as_document().unwrap();
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);

        let out = serde_json::to_string(&v).unwrap();
        assert_eq!(out, r#"{"zeta":1,"alpha":-1,"mid":1}"#);
    }

    #[test]
    fn test_nested_conversion_is_recursive() {
        let json = serde_json::json!({
            "outer": { "inner": [1, { "deep": null }] }
        });
        let v = Value::try_from(json).unwrap();
        let inner = v
            .as_document()
            .and_then(|d| d.get_document("outer"))
            .and_then(|d| d.get_array("inner"))
            .unwrap();
        assert_eq!(inner[0], Value::Int32(1));
        assert_eq!(inner[1], Value::Document(doc! { "deep" => Value::Null }));
    }

    #[test]
    fn test_special_floats_round_trip() {
        for f in [f64::INFINITY, f64::NEG_INFINITY, -0.0_f64] {
            let s = serde_json::to_string(&Value::Double(f)).unwrap();
            let back: Value = serde_json::from_str(&s).unwrap();
            match back {
                Value::Double(g) => {
                    assert_eq!(f, g);
                    assert_eq!(f.is_sign_negative(), g.is_sign_negative());
                }
                other => panic!("expected Double, got {:?}", other),
            }
        }

        let s = serde_json::to_string(&Value::Double(f64::NAN)).unwrap();
        match serde_json::from_str::<Value>(&s).unwrap() {
            Value::Double(g) => assert!(g.is_nan()),
            other => panic!("expected Double, got {:?}", other),
        }
    }

    #[test]
    fn test_value_to_json_matches_serializer() {
        let v = Value::Document(doc! {
            "name" => "Alice",
            "age" => 25,
            "big" => 9_007_199_254_740_993_i64,
            "tags" => vec![Value::from("a"), Value::Null],
        });
        let via_fn = value_to_json(&v);
        let via_serde = serde_json::to_value(&v).unwrap();
        assert_eq!(via_fn, via_serde);
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(Value::Int32),
            (i64::from(i32::MAX) + 1..i64::MAX).prop_map(Value::Int64),
            (-1.0e9..1.0e9f64).prop_map(Value::Double),
            "[a-z]{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::vec(("[a-z]{1,6}", inner), 0..4)
                    .prop_map(|pairs| Value::Document(pairs.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_json_text_round_trip(v in arb_value()) {
            let text = serde_json::to_string(&v).unwrap();
            let back: Value = serde_json::from_str(&text).unwrap();
            prop_assert_eq!(back, v);
        }
    }
}
