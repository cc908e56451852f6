//! Index catalog of a collection
//!
//! Indexes in the reference store are metadata plus uniqueness enforcement;
//! queries always scan. Every collection has the implicit unique `_id_` index.

use std::cmp::Ordering;

use docparity_core::{doc, Document, Value};

use crate::compare::compare_values;
use crate::error::{Result, StoreError};
use crate::path;

/// Name of the implicit primary key index
pub const ID_INDEX: &str = "_id_";

/// A request to create an index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    /// Ordered `{field: direction}` key pattern
    pub keys: Document,
    /// Explicit name; derived from the keys when absent
    pub name: Option<String>,
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(keys: Document) -> Self {
        IndexSpec {
            keys,
            name: None,
            unique: false,
        }
    }

    /// The name this index will be created under
    pub fn resolved_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| default_index_name(&self.keys))
    }
}

/// A created index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexInfo {
    pub name: String,
    pub keys: Document,
    pub unique: bool,
}

impl IndexInfo {
    /// Document form used by `listIndexes` replies
    pub fn to_document(&self) -> Document {
        let mut d = doc! {
            "v" => 2,
            "key" => self.keys.clone(),
            "name" => self.name.as_str(),
        };
        if self.unique {
            d.insert("unique", true);
        }
        d
    }

    /// Parse the document form produced by [`IndexInfo::to_document`]
    pub fn from_document(d: &Document) -> Option<IndexInfo> {
        Some(IndexInfo {
            name: d.get_str("name")?.to_string(),
            keys: d.get_document("key")?.clone(),
            unique: d.get_bool("unique").unwrap_or(false),
        })
    }
}

/// Default index name: `field_dir` pairs joined by `_`, e.g. `name_1_age_-1`
pub fn default_index_name(keys: &Document) -> String {
    keys.iter()
        .map(|(field, dir)| {
            let dir = match dir {
                Value::String(s) => s.clone(),
                other => other
                    .as_i64()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| other.type_name().to_string()),
            };
            format!("{}_{}", field, dir)
        })
        .collect::<Vec<_>>()
        .join("_")
}

fn validate_keys(keys: &Document) -> Result<()> {
    if keys.is_empty() {
        return Err(StoreError::index("index keys cannot be empty"));
    }
    for (field, dir) in keys.iter() {
        let ok = match dir {
            Value::String(s) => !s.is_empty(),
            other => other.as_f64().map(|n| n != 0.0).unwrap_or(false),
        };
        if !ok {
            return Err(StoreError::index(format!(
                "bad index key pattern for field '{}'",
                field
            )));
        }
    }
    Ok(())
}

/// Indexes of one collection
#[derive(Debug, Clone)]
pub struct IndexCatalog {
    indexes: Vec<IndexInfo>,
}

impl Default for IndexCatalog {
    fn default() -> Self {
        IndexCatalog {
            indexes: vec![IndexInfo {
                name: ID_INDEX.to_string(),
                keys: doc! { "_id" => 1 },
                unique: true,
            }],
        }
    }
}

impl IndexCatalog {
    pub fn list(&self) -> &[IndexInfo] {
        &self.indexes
    }

    /// Validate and register an index. Re-creating an identical index is a no-op.
    ///
    /// `existing` are the collection's documents, checked against a new unique index.
    pub fn create(&mut self, collection: &str, spec: &IndexSpec, existing: &[Document]) -> Result<String> {
        validate_keys(&spec.keys)?;
        let name = spec.resolved_name();
        if let Some(found) = self.indexes.iter().find(|i| i.name == name) {
            if found.keys == spec.keys && found.unique == spec.unique {
                return Ok(name);
            }
            return Err(StoreError::IndexConflict {
                reason: format!("an index named '{}' already exists with different options", name),
            });
        }
        if let Some(found) = self.indexes.iter().find(|i| i.keys == spec.keys) {
            return Err(StoreError::IndexConflict {
                reason: format!("index already exists with a different name: {}", found.name),
            });
        }
        let info = IndexInfo {
            name: name.clone(),
            keys: spec.keys.clone(),
            unique: spec.unique,
        };
        if info.unique {
            for (i, d) in existing.iter().enumerate() {
                check_unique(collection, &info, d, &existing[..i])?;
            }
        }
        self.indexes.push(info);
        Ok(name)
    }

    /// Remove an index by name
    pub fn drop(&mut self, name: &str) -> Result<()> {
        if name == ID_INDEX {
            return Err(StoreError::CannotDropIdIndex);
        }
        let pos = self
            .indexes
            .iter()
            .position(|i| i.name == name)
            .ok_or_else(|| StoreError::IndexNotFound {
                name: name.to_string(),
            })?;
        self.indexes.remove(pos);
        Ok(())
    }

    /// Check `candidate` against `others` for every unique index
    pub fn check(&self, collection: &str, candidate: &Document, others: &[&Document]) -> Result<()> {
        for info in self.indexes.iter().filter(|i| i.unique) {
            let key = index_key(info, candidate);
            if others
                .iter()
                .any(|o| keys_equal(&index_key(info, o), &key))
            {
                return Err(duplicate(collection, info, &key));
            }
        }
        Ok(())
    }
}

fn check_unique(collection: &str, info: &IndexInfo, candidate: &Document, others: &[Document]) -> Result<()> {
    let key = index_key(info, candidate);
    if others.iter().any(|o| keys_equal(&index_key(info, o), &key)) {
        return Err(duplicate(collection, info, &key));
    }
    Ok(())
}

// Missing fields index as null.
fn index_key(info: &IndexInfo, d: &Document) -> Vec<Value> {
    info.keys
        .keys()
        .map(|field| path::get(d, field).cloned().unwrap_or(Value::Null))
        .collect()
}

fn keys_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| compare_values(x, y) == Ordering::Equal)
}

fn duplicate(collection: &str, info: &IndexInfo, key: &[Value]) -> StoreError {
    let rendered = info
        .keys
        .keys()
        .zip(key)
        .map(|(field, v)| format!("{}: {}", field, render(v)))
        .collect::<Vec<_>>()
        .join(", ");
    StoreError::DuplicateKey {
        collection: collection.to_string(),
        index: info.name.clone(),
        key: format!("{{ {} }}", rendered),
    }
}

fn render(v: &Value) -> String {
    serde_json::to_string(v).unwrap_or_else(|_| v.type_name().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_index_name() {
        assert_eq!(default_index_name(&doc! { "name" => 1 }), "name_1");
        assert_eq!(
            default_index_name(&doc! { "field" => 1, "other" => -1 }),
            "field_1_other_-1"
        );
        assert_eq!(default_index_name(&doc! { "body" => "text" }), "body_text");
    }

    #[test]
    fn test_implicit_id_index_cannot_be_dropped() {
        let mut catalog = IndexCatalog::default();
        assert_eq!(catalog.list().len(), 1);
        assert_eq!(catalog.drop(ID_INDEX), Err(StoreError::CannotDropIdIndex));
        assert!(matches!(
            catalog.drop("nope_1"),
            Err(StoreError::IndexNotFound { .. })
        ));
    }

    #[test]
    fn test_create_is_idempotent_and_detects_conflicts() {
        let mut catalog = IndexCatalog::default();
        let spec = IndexSpec::new(doc! { "email" => 1 });
        assert_eq!(catalog.create("users", &spec, &[]).unwrap(), "email_1");
        assert_eq!(catalog.create("users", &spec, &[]).unwrap(), "email_1");

        let renamed = IndexSpec {
            name: Some("by_email".into()),
            ..spec.clone()
        };
        assert!(matches!(
            catalog.create("users", &renamed, &[]),
            Err(StoreError::IndexConflict { .. })
        ));
    }

    #[test]
    fn test_unique_index_rejects_existing_duplicates() {
        let docs = vec![
            doc! { "_id" => 1, "email" => "a@x" },
            doc! { "_id" => 2, "email" => "a@x" },
        ];
        let mut catalog = IndexCatalog::default();
        let spec = IndexSpec {
            unique: true,
            ..IndexSpec::new(doc! { "email" => 1 })
        };
        let err = catalog.create("users", &spec, &docs).unwrap_err();
        assert_eq!(err.code(), 11000);
        assert_eq!(catalog.list().len(), 1);
    }

    #[test]
    fn test_check_uses_numeric_equality() {
        let catalog = IndexCatalog::default();
        let existing = doc! { "_id" => 1 };
        let err = catalog
            .check("c", &doc! { "_id" => 1.0 }, &[&existing])
            .unwrap_err();
        assert!(err.to_string().contains("_id_"));
    }

    #[test]
    fn test_empty_keys_rejected() {
        let mut catalog = IndexCatalog::default();
        assert!(catalog.create("c", &IndexSpec::new(doc! {}), &[]).is_err());
    }
}
