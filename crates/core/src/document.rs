//! Ordered document type.
//!
//! A [`Document`] maps unique string keys to [`Value`]s and remembers the order in
//! which keys were first inserted. Order matters for output fidelity and for
//! order-sensitive arguments such as sort specifications and index keys; it is
//! not significant for equality.

use crate::value::Value;

/// Insertion-ordered mapping of string keys to values.
///
/// Keys are unique: inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default)]
pub struct Document {
    entries: Vec<(String, Value)>,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the document has no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a key, replacing any previous value in place.
    ///
    /// Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look up a key mutably
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Remove a key, preserving the order of the remaining keys
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// True if the key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// First key, if any. Command documents are identified by their first key.
    pub fn first_key(&self) -> Option<&str> {
        self.entries.first().map(|(k, _)| k.as_str())
    }

    /// Get a string field
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Get a bool field
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Get a numeric field as i64
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Get a nested document field
    pub fn get_document(&self, key: &str) -> Option<&Document> {
        self.get(key).and_then(Value::as_document)
    }

    /// Get an array field
    pub fn get_array(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_array)
    }
}

/// Equality ignores key order: same key set, equal values.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Build a [`Document`] from `key => value` pairs.
///
/// ```
/// use docparity_core::{doc, Value};
///
/// let d = doc! { "name" => "Alice", "age" => 25 };
/// assert_eq!(d.get("age"), Some(&Value::Int32(25)));
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut d = $crate::Document::new();
        $( d.insert($key, $crate::Value::from($value)); )+
        d
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_insert_preserves_first_position() {
        let mut d = doc! { "a" => 1, "b" => 2, "c" => 3 };
        let old = d.insert("b", 20);
        assert_eq!(old, Some(Value::Int32(2)));
        assert_eq!(d.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(d.get("b"), Some(&Value::Int32(20)));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut d = doc! { "x" => 1, "y" => 2, "z" => 3 };
        assert_eq!(d.remove("y"), Some(Value::Int32(2)));
        assert_eq!(d.keys().collect::<Vec<_>>(), vec!["x", "z"]);
        assert_eq!(d.remove("missing"), None);
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = doc! { "a" => 1, "b" => "two" };
        let b = doc! { "b" => "two", "a" => 1 };
        assert_eq!(a, b);
        assert_ne!(a, doc! { "a" => 1 });
    }

    #[test]
    fn test_typed_getters() {
        let d = doc! {
            "name" => "Alice",
            "active" => true,
            "limit" => 2.0,
            "nested" => doc! { "k" => "v" },
            "list" => vec![Value::Int32(1)],
        };
        assert_eq!(d.get_str("name"), Some("Alice"));
        assert_eq!(d.get_bool("active"), Some(true));
        assert_eq!(d.get_i64("limit"), Some(2));
        assert_eq!(d.get_document("nested").and_then(|n| n.get_str("k")), Some("v"));
        assert_eq!(d.get_array("list").map(|l| l.len()), Some(1));
        assert_eq!(d.first_key(), Some("name"));
    }

    #[test]
    fn test_empty_macro() {
        let d = doc! {};
        assert!(d.is_empty());
    }
}
