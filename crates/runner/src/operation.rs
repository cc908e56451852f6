//! Typed operation plan
//!
//! Test actions carry loosely-shaped Document-Value arguments. They are parsed
//! once into an [`Operation`] so both runners see exactly the same argument
//! rules; a runner only decides *how* to carry an operation to the store.

use docparity_core::{Document, Method, SetupOperation, SetupStep, TestAction, Value};
use docparity_engine::{FindAndModifyOptions, FindOptions, IndexSpec};

use crate::error::ActionError;

/// One fully-parsed store call
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    InsertOne {
        doc: Document,
    },
    InsertMany {
        docs: Vec<Document>,
    },
    Find {
        filter: Document,
        options: FindOptions,
    },
    FindOne {
        filter: Document,
    },
    UpdateOne {
        filter: Document,
        update: Document,
        upsert: bool,
    },
    UpdateMany {
        filter: Document,
        update: Document,
    },
    DeleteOne {
        filter: Document,
    },
    DeleteMany {
        filter: Document,
    },
    ReplaceOne {
        filter: Document,
        replacement: Document,
    },
    FindAndModify {
        filter: Document,
        options: FindAndModifyOptions,
    },
    Distinct {
        field: String,
        filter: Document,
    },
    Aggregate {
        pipeline: Vec<Document>,
    },
    CreateIndex {
        spec: IndexSpec,
    },
    ListIndexes,
    DropIndex {
        name: String,
    },
}

impl Operation {
    /// The method this operation was parsed from
    pub fn method(&self) -> Method {
        match self {
            Operation::InsertOne { .. } => Method::InsertOne,
            Operation::InsertMany { .. } => Method::InsertMany,
            Operation::Find { .. } => Method::Find,
            Operation::FindOne { .. } => Method::FindOne,
            Operation::UpdateOne { .. } => Method::UpdateOne,
            Operation::UpdateMany { .. } => Method::UpdateMany,
            Operation::DeleteOne { .. } => Method::DeleteOne,
            Operation::DeleteMany { .. } => Method::DeleteMany,
            Operation::ReplaceOne { .. } => Method::ReplaceOne,
            Operation::FindAndModify { .. } => Method::FindAndModify,
            Operation::Distinct { .. } => Method::Distinct,
            Operation::Aggregate { .. } => Method::Aggregate,
            Operation::CreateIndex { .. } => Method::CreateIndex,
            Operation::ListIndexes => Method::ListIndexes,
            Operation::DropIndex { .. } => Method::DropIndex,
        }
    }

    /// Parse a test action.
    ///
    /// An unknown method is [`ActionError::UnsupportedOperation`]; a missing or
    /// wrongly-typed argument is [`ActionError::InvalidArgument`].
    pub fn from_action(action: &TestAction) -> Result<Operation, ActionError> {
        let args = Args::new(action.method.as_str(), action.options.as_ref())?;
        let op = match &action.method {
            Method::InsertOne => Operation::InsertOne {
                doc: args.required_doc("doc", action.doc.as_ref())?,
            },
            Method::InsertMany => {
                let raw = action
                    .docs
                    .as_ref()
                    .ok_or_else(|| args.invalid("docs is required"))?;
                if raw.is_empty() {
                    return Err(args.invalid("docs must not be empty"));
                }
                let docs = raw
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        v.as_document()
                            .cloned()
                            .ok_or_else(|| args.invalid(format!("docs[{}] must be a document", i)))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Operation::InsertMany { docs }
            }
            Method::Find => Operation::Find {
                filter: args.filter(action.filter.as_ref())?,
                options: FindOptions {
                    sort: args.option_doc("sort")?,
                    skip: args.option_count("skip")?.unwrap_or(0),
                    // a zero limit means no limit
                    limit: args.option_count("limit")?.filter(|n| *n > 0),
                    projection: args.option_doc("projection")?,
                },
            },
            Method::FindOne => Operation::FindOne {
                filter: args.filter(action.filter.as_ref())?,
            },
            Method::UpdateOne => Operation::UpdateOne {
                filter: args.filter(action.filter.as_ref())?,
                update: args.operator_update(action.update.as_ref())?,
                upsert: args.option_bool("upsert")?,
            },
            Method::UpdateMany => Operation::UpdateMany {
                filter: args.filter(action.filter.as_ref())?,
                update: args.operator_update(action.update.as_ref())?,
            },
            Method::DeleteOne => Operation::DeleteOne {
                filter: args.filter(action.filter.as_ref())?,
            },
            Method::DeleteMany => Operation::DeleteMany {
                filter: args.filter(action.filter.as_ref())?,
            },
            Method::ReplaceOne => {
                let replacement = args.required_doc("doc", action.doc.as_ref())?;
                if replacement.keys().any(|k| k.starts_with('$')) {
                    return Err(args.invalid("replacement document must not contain update operators"));
                }
                Operation::ReplaceOne {
                    filter: args.filter(action.filter.as_ref())?,
                    replacement,
                }
            }
            Method::FindAndModify => {
                let remove = args.option_bool("remove")?;
                let update = match action.update.as_ref() {
                    None | Some(Value::Null) => None,
                    Some(v) => Some(args.doc("update", v)?),
                };
                if !remove && update.is_none() {
                    return Err(args.invalid("either update or options.remove is required"));
                }
                Operation::FindAndModify {
                    filter: args.filter(action.filter.as_ref())?,
                    options: FindAndModifyOptions {
                        update: if remove { None } else { update },
                        remove,
                        return_new: args.option_bool("new")?,
                        upsert: args.option_bool("upsert")?,
                        sort: args.option_doc("sort")?,
                    },
                }
            }
            Method::Distinct => Operation::Distinct {
                field: args
                    .option_str("field")?
                    .ok_or_else(|| args.invalid("options.field is required"))?,
                filter: args.filter(action.filter.as_ref())?,
            },
            Method::Aggregate => {
                let stages = args
                    .option("pipeline")
                    .ok_or_else(|| args.invalid("options.pipeline is required"))?
                    .as_array()
                    .ok_or_else(|| args.invalid("options.pipeline must be an array"))?;
                let pipeline = stages
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        v.as_document().cloned().ok_or_else(|| {
                            args.invalid(format!("pipeline stage {} must be a document", i))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Operation::Aggregate { pipeline }
            }
            Method::CreateIndex => Operation::CreateIndex {
                spec: index_spec(&args, args.options)?,
            },
            Method::ListIndexes => Operation::ListIndexes,
            Method::DropIndex => Operation::DropIndex {
                name: args
                    .option_str("name")?
                    .ok_or_else(|| args.invalid("options.name is required"))?,
            },
            Method::Unknown(name) => {
                return Err(ActionError::UnsupportedOperation {
                    method: name.clone(),
                })
            }
        };
        Ok(op)
    }

    /// Parse a setup step into the operation it applies
    pub fn from_setup(step: &SetupStep) -> Result<Operation, ActionError> {
        match &step.operation {
            SetupOperation::Insert => {
                let args = Args::new("insert", None)?;
                Ok(Operation::InsertOne {
                    doc: args.doc("data", &step.data)?,
                })
            }
            SetupOperation::CreateIndex => {
                let args = Args::new("createIndex", None)?;
                let data = args.doc("data", &step.data)?;
                Ok(Operation::CreateIndex {
                    spec: index_spec(&args, Some(&data))?,
                })
            }
            SetupOperation::Unknown(name) => Err(ActionError::UnsupportedSetup {
                operation: name.clone(),
            }),
        }
    }
}

/// `{keys: {...}, options: {unique?, name?}}`
fn index_spec(args: &Args<'_>, source: Option<&Document>) -> Result<IndexSpec, ActionError> {
    let keys = source
        .and_then(|d| d.get("keys"))
        .ok_or_else(|| args.invalid("keys is required"))?;
    let keys = args.doc("keys", keys)?;
    if keys.is_empty() {
        return Err(args.invalid("keys must not be empty"));
    }
    let mut spec = IndexSpec::new(keys);
    match source.and_then(|d| d.get("options")) {
        None | Some(Value::Null) => {}
        Some(Value::Document(opts)) => {
            if let Some(unique) = opts.get("unique") {
                spec.unique = unique
                    .as_bool()
                    .ok_or_else(|| args.invalid("options.unique must be a boolean"))?;
            }
            if let Some(name) = opts.get("name") {
                spec.name = Some(
                    name.as_str()
                        .ok_or_else(|| args.invalid("options.name must be a string"))?
                        .to_string(),
                );
            }
        }
        Some(other) => {
            return Err(args.invalid(format!(
                "index options must be a document, got {}",
                other.type_name()
            )))
        }
    }
    Ok(spec)
}

/// Argument accessor bound to one method name for error messages
struct Args<'a> {
    method: &'a str,
    options: Option<&'a Document>,
}

impl<'a> Args<'a> {
    fn new(method: &'a str, options: Option<&'a Value>) -> Result<Self, ActionError> {
        let options = match options {
            None | Some(Value::Null) => None,
            Some(Value::Document(d)) => Some(d),
            Some(other) => {
                return Err(ActionError::invalid(
                    method,
                    format!("options must be a document, got {}", other.type_name()),
                ))
            }
        };
        Ok(Args { method, options })
    }

    fn invalid(&self, reason: impl Into<String>) -> ActionError {
        ActionError::invalid(self.method, reason)
    }

    fn doc(&self, name: &str, value: &Value) -> Result<Document, ActionError> {
        value.as_document().cloned().ok_or_else(|| {
            self.invalid(format!("{} must be a document, got {}", name, value.type_name()))
        })
    }

    fn required_doc(&self, name: &str, value: Option<&Value>) -> Result<Document, ActionError> {
        match value {
            None | Some(Value::Null) => Err(self.invalid(format!("{} is required", name))),
            Some(v) => self.doc(name, v),
        }
    }

    fn filter(&self, value: Option<&Value>) -> Result<Document, ActionError> {
        match value {
            None | Some(Value::Null) => Ok(Document::new()),
            Some(v) => self.doc("filter", v),
        }
    }

    fn operator_update(&self, value: Option<&Value>) -> Result<Document, ActionError> {
        let update = self.required_doc("update", value)?;
        match update.first_key() {
            Some(k) if k.starts_with('$') => Ok(update),
            _ => Err(self.invalid("update document must contain update operators")),
        }
    }

    fn option(&self, key: &str) -> Option<&'a Value> {
        self.options
            .and_then(|o| o.get(key))
            .filter(|v| !v.is_null())
    }

    fn option_doc(&self, key: &str) -> Result<Option<Document>, ActionError> {
        self.option(key)
            .map(|v| self.doc(&format!("options.{}", key), v))
            .transpose()
    }

    fn option_bool(&self, key: &str) -> Result<bool, ActionError> {
        match self.option(key) {
            None => Ok(false),
            Some(v) => v
                .as_bool()
                .ok_or_else(|| self.invalid(format!("options.{} must be a boolean", key))),
        }
    }

    fn option_str(&self, key: &str) -> Result<Option<String>, ActionError> {
        self.option(key)
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.invalid(format!("options.{} must be a string", key)))
            })
            .transpose()
    }

    /// Non-negative integer; Int32, Int64 and integral Double are accepted
    fn option_count(&self, key: &str) -> Result<Option<u64>, ActionError> {
        let Some(v) = self.option(key) else {
            return Ok(None);
        };
        let n = match v {
            Value::Int32(n) => Some(i64::from(*n)),
            Value::Int64(n) => Some(*n),
            Value::Double(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        };
        match n {
            Some(n) if n >= 0 => Ok(Some(n as u64)),
            _ => Err(self.invalid(format!("options.{} must be a non-negative integer", key))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docparity_core::doc;

    fn action(method: Method) -> TestAction {
        TestAction::new(method)
    }

    #[test]
    fn test_find_options_parsed() {
        let mut a = action(Method::Find);
        a.filter = Some(doc! { "age" => doc! { "$gt" => 20 } }.into());
        a.options = Some(
            doc! {
                "sort" => doc! { "age" => -1 },
                "limit" => 2i64,
                "skip" => 1.0,
                "projection" => doc! { "name" => 1 },
            }
            .into(),
        );
        let Operation::Find { filter, options } = Operation::from_action(&a).unwrap() else {
            panic!("expected find");
        };
        assert_eq!(filter.len(), 1);
        assert_eq!(options.limit, Some(2));
        assert_eq!(options.skip, 1);
        assert_eq!(options.sort, Some(doc! { "age" => -1 }));
        assert!(options.projection.is_some());
    }

    #[test]
    fn test_absent_or_null_filter_is_empty() {
        let a = action(Method::DeleteMany);
        assert_eq!(
            Operation::from_action(&a).unwrap(),
            Operation::DeleteMany { filter: Document::new() }
        );
        let mut a = action(Method::FindOne);
        a.filter = Some(Value::Null);
        assert_eq!(
            Operation::from_action(&a).unwrap(),
            Operation::FindOne { filter: Document::new() }
        );
    }

    #[test]
    fn test_zero_limit_is_unbounded() {
        let mut a = action(Method::Find);
        a.options = Some(doc! { "limit" => 0 }.into());
        let Operation::Find { options, .. } = Operation::from_action(&a).unwrap() else {
            panic!("expected find");
        };
        assert_eq!(options.limit, None);
    }

    #[test]
    fn test_negative_limit_rejected() {
        let mut a = action(Method::Find);
        a.options = Some(doc! { "limit" => -1 }.into());
        assert!(matches!(
            Operation::from_action(&a),
            Err(ActionError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_update_one_reads_upsert() {
        let mut a = action(Method::UpdateOne);
        a.filter = Some(doc! { "_id" => "missing" }.into());
        a.update = Some(doc! { "$set" => doc! { "name" => "X" } }.into());
        a.options = Some(doc! { "upsert" => true }.into());
        let op = Operation::from_action(&a).unwrap();
        assert!(matches!(op, Operation::UpdateOne { upsert: true, .. }));
        assert_eq!(op.method(), Method::UpdateOne);
    }

    #[test]
    fn test_update_many_ignores_upsert() {
        let mut a = action(Method::UpdateMany);
        a.update = Some(doc! { "$inc" => doc! { "n" => 1 } }.into());
        a.options = Some(doc! { "upsert" => true }.into());
        assert!(matches!(
            Operation::from_action(&a).unwrap(),
            Operation::UpdateMany { .. }
        ));
    }

    #[test]
    fn test_update_requires_operators() {
        let mut a = action(Method::UpdateOne);
        a.update = Some(doc! { "name" => "plain" }.into());
        let err = Operation::from_action(&a).unwrap_err();
        assert!(err.to_string().contains("update operators"));
    }

    #[test]
    fn test_replace_rejects_operators() {
        let mut a = action(Method::ReplaceOne);
        a.doc = Some(doc! { "$set" => doc! { "a" => 1 } }.into());
        assert!(Operation::from_action(&a).is_err());
    }

    #[test]
    fn test_insert_many_rules() {
        let mut a = action(Method::InsertMany);
        assert!(Operation::from_action(&a).is_err());
        a.docs = Some(vec![]);
        assert!(Operation::from_action(&a).is_err());
        a.docs = Some(vec![doc! { "a" => 1 }.into(), Value::from(3)]);
        assert!(Operation::from_action(&a)
            .unwrap_err()
            .to_string()
            .contains("docs[1]"));
        a.docs = Some(vec![doc! { "a" => 1 }.into(), doc! { "a" => 2 }.into()]);
        assert!(matches!(
            Operation::from_action(&a).unwrap(),
            Operation::InsertMany { docs } if docs.len() == 2
        ));
    }

    #[test]
    fn test_aggregate_requires_pipeline_array() {
        let mut a = action(Method::Aggregate);
        assert!(Operation::from_action(&a).is_err());
        a.options = Some(doc! { "pipeline" => doc! { "$match" => doc! {} } }.into());
        assert!(Operation::from_action(&a)
            .unwrap_err()
            .to_string()
            .contains("must be an array"));
        a.options = Some(
            doc! { "pipeline" => vec![Value::from(doc! { "$match" => doc! { "dept" => "Engineering" } })] }
                .into(),
        );
        assert!(matches!(
            Operation::from_action(&a).unwrap(),
            Operation::Aggregate { pipeline } if pipeline.len() == 1
        ));
    }

    #[test]
    fn test_find_and_modify_options() {
        let mut a = action(Method::FindAndModify);
        assert!(Operation::from_action(&a).is_err());

        a.filter = Some(doc! { "_id" => "x" }.into());
        a.update = Some(doc! { "$inc" => doc! { "n" => 1 } }.into());
        a.options = Some(doc! { "new" => true, "upsert" => true }.into());
        let Operation::FindAndModify { options, .. } = Operation::from_action(&a).unwrap() else {
            panic!("expected findAndModify");
        };
        assert!(options.return_new);
        assert!(options.upsert);
        assert!(!options.remove);
        assert!(options.update.is_some());

        a.update = None;
        a.options = Some(doc! { "remove" => true }.into());
        let Operation::FindAndModify { options, .. } = Operation::from_action(&a).unwrap() else {
            panic!("expected findAndModify");
        };
        assert!(options.remove);
        assert!(options.update.is_none());
    }

    #[test]
    fn test_distinct_and_drop_index_require_names() {
        assert!(Operation::from_action(&action(Method::Distinct)).is_err());
        assert!(Operation::from_action(&action(Method::DropIndex)).is_err());

        let mut a = action(Method::Distinct);
        a.options = Some(doc! { "field" => "dept" }.into());
        assert!(matches!(
            Operation::from_action(&a).unwrap(),
            Operation::Distinct { field, .. } if field == "dept"
        ));
    }

    #[test]
    fn test_create_index_with_options() {
        let mut a = action(Method::CreateIndex);
        a.options = Some(
            doc! {
                "keys" => doc! { "email" => 1 },
                "options" => doc! { "unique" => true, "name" => "email_unique" },
            }
            .into(),
        );
        let Operation::CreateIndex { spec } = Operation::from_action(&a).unwrap() else {
            panic!("expected createIndex");
        };
        assert!(spec.unique);
        assert_eq!(spec.resolved_name(), "email_unique");
    }

    #[test]
    fn test_unknown_method_is_unsupported() {
        let a = action(Method::Unknown("mapReduce".into()));
        assert_eq!(
            Operation::from_action(&a).unwrap_err(),
            ActionError::UnsupportedOperation {
                method: "mapReduce".into()
            }
        );
    }

    #[test]
    fn test_options_must_be_document() {
        let mut a = action(Method::Find);
        a.options = Some(Value::from("fast"));
        assert!(matches!(
            Operation::from_action(&a),
            Err(ActionError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_setup_steps() {
        let insert = SetupStep {
            operation: SetupOperation::Insert,
            data: doc! { "_id" => "s1" }.into(),
        };
        assert!(matches!(
            Operation::from_setup(&insert).unwrap(),
            Operation::InsertOne { .. }
        ));

        let index = SetupStep {
            operation: SetupOperation::CreateIndex,
            data: doc! { "keys" => doc! { "email" => 1 }, "options" => doc! { "unique" => true } }
                .into(),
        };
        let Operation::CreateIndex { spec } = Operation::from_setup(&index).unwrap() else {
            panic!("expected createIndex");
        };
        assert!(spec.unique);
        assert_eq!(spec.resolved_name(), "email_1");

        let unknown = SetupStep {
            operation: SetupOperation::Unknown("drop".into()),
            data: Value::Null,
        };
        assert!(matches!(
            Operation::from_setup(&unknown),
            Err(ActionError::UnsupportedSetup { .. })
        ));

        let bad = SetupStep {
            operation: SetupOperation::Insert,
            data: Value::from(1),
        };
        assert!(Operation::from_setup(&bad).is_err());
    }
}
