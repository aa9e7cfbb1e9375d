//! Variable resolution

use crate::error::{FormulaError, FormulaResult};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;

/// Nested field mapping backing a static context
pub type Record = HashMap<String, Field>;

/// A field of a [`Record`]: either a value or a nested record
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Value(Value),
    Record(Record),
}

impl From<Value> for Field {
    fn from(v: Value) -> Self {
        Field::Value(v)
    }
}

impl From<Record> for Field {
    fn from(r: Record) -> Self {
        Field::Record(r)
    }
}

/// Callback resolving a full variable path
pub type Resolver = dyn Fn(&[&str]) -> FormulaResult<Value> + Send + Sync;

/// Where variables get their values from during one evaluation
pub enum Context {
    /// Walk a nested mapping one path segment at a time
    Static(Record),
    /// Hand the whole path to a callback and use its answer as is
    Dynamic(Box<Resolver>),
}

impl Context {
    /// Empty static context
    pub fn new() -> Self {
        Context::Static(Record::new())
    }

    pub fn dynamic<F>(resolver: F) -> Self
    where
        F: Fn(&[&str]) -> FormulaResult<Value> + Send + Sync + 'static,
    {
        Context::Dynamic(Box::new(resolver))
    }

    /// Static context with the given top-level fields
    pub fn from_fields<K, F, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, F)>,
        K: Into<String>,
        F: Into<Field>,
    {
        Context::Static(
            fields
                .into_iter()
                .map(|(k, f)| (k.into(), f.into()))
                .collect(),
        )
    }

    /// Build a static context from a JSON object
    ///
    /// Objects nest, `null` becomes [`Value::Null`]. Arrays have no value
    /// representation and are rejected.
    pub fn from_json(json: &serde_json::Value) -> FormulaResult<Self> {
        match json {
            serde_json::Value::Object(map) => Ok(Context::Static(record_from_json(map)?)),
            other => Err(FormulaError::type_mismatch(format!(
                "Context must be a JSON object, got {}",
                json_type(other)
            ))),
        }
    }

    /// Resolve a dotted variable path
    ///
    /// The single-segment paths `null` and `undefined` are literals and
    /// never reach the context. Missing keys resolve to `Undefined`.
    pub fn resolve(&self, path: &[&str]) -> FormulaResult<Value> {
        match path {
            ["null"] => return Ok(Value::Null),
            ["undefined"] => return Ok(Value::Undefined),
            [] => return Ok(Value::Undefined),
            _ => {}
        }

        match self {
            Context::Dynamic(resolver) => resolver(path),
            Context::Static(record) => resolve_static(record, path),
        }
    }
}

fn resolve_static(record: &Record, path: &[&str]) -> FormulaResult<Value> {
    let mut current = record;

    for (i, segment) in path.iter().enumerate() {
        match current.get(*segment) {
            None => return Ok(Value::Undefined),
            Some(Field::Record(inner)) => current = inner,
            Some(Field::Value(value)) => {
                return match path.get(i + 1) {
                    None => Ok(value.clone()),
                    Some(next) => Err(FormulaError::type_mismatch(format!(
                        "Cannot read field '{}' of {} value '{}'",
                        next,
                        value.type_name(),
                        path[..=i].join(".")
                    ))),
                };
            }
        }
    }

    Err(FormulaError::type_mismatch(format!(
        "Variable '{}' is a record, not a value",
        path.join(".")
    )))
}

fn record_from_json(map: &serde_json::Map<String, serde_json::Value>) -> FormulaResult<Record> {
    let mut record = Record::with_capacity(map.len());
    for (key, value) in map {
        let field = match value {
            serde_json::Value::Object(inner) => Field::Record(record_from_json(inner)?),
            serde_json::Value::Array(_) => {
                return Err(FormulaError::type_mismatch(format!(
                    "Field '{}' is an array, which has no formula value",
                    key
                )))
            }
            serde_json::Value::Null => Field::Value(Value::Null),
            serde_json::Value::Bool(b) => Field::Value(Value::Boolean(*b)),
            serde_json::Value::Number(n) => Field::Value(Value::Number(n.as_f64().unwrap_or(f64::NAN))),
            serde_json::Value::String(s) => Field::Value(Value::String(s.clone())),
        };
        record.insert(key.clone(), field);
    }
    Ok(record)
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Record> for Context {
    fn from(record: Record) -> Self {
        Context::Static(record)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Static(record) => f.debug_tuple("Static").field(record).finish(),
            Context::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Context {
        Context::from_json(&json!({
            "FirstName": "John",
            "Amount": 1500,
            "Owner": null,
            "a": { "b": { "c": "Super" } }
        }))
        .unwrap()
    }

    #[test]
    fn test_resolve_top_level() {
        let ctx = sample();
        assert_eq!(ctx.resolve(&["FirstName"]).unwrap(), Value::from("John"));
        assert_eq!(ctx.resolve(&["Amount"]).unwrap(), Value::from(1500));
        assert_eq!(ctx.resolve(&["Owner"]).unwrap(), Value::Null);
    }

    #[test]
    fn test_resolve_nested() {
        assert_eq!(
            sample().resolve(&["a", "b", "c"]).unwrap(),
            Value::from("Super")
        );
    }

    #[test]
    fn test_missing_is_undefined() {
        let ctx = sample();
        assert_eq!(ctx.resolve(&["Missing"]).unwrap(), Value::Undefined);
        assert_eq!(ctx.resolve(&["a", "x", "y"]).unwrap(), Value::Undefined);
    }

    #[test]
    fn test_sentinels_skip_context() {
        let ctx = Context::dynamic(|_| Err(FormulaError::evaluation("should not be called")));
        assert_eq!(ctx.resolve(&["null"]).unwrap(), Value::Null);
        assert_eq!(ctx.resolve(&["undefined"]).unwrap(), Value::Undefined);
        assert!(ctx.resolve(&["other"]).is_err());
    }

    #[test]
    fn test_path_through_scalar_fails() {
        let err = sample().resolve(&["FirstName", "value"]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_path_ending_on_record_fails() {
        assert!(sample().resolve(&["a", "b"]).is_err());
    }

    #[test]
    fn test_dynamic_gets_full_path() {
        let ctx = Context::dynamic(|path| Ok(Value::from(path.join("/"))));
        assert_eq!(ctx.resolve(&["x", "y"]).unwrap(), Value::from("x/y"));
    }

    #[test]
    fn test_json_arrays_rejected() {
        assert!(Context::from_json(&json!({ "list": [1, 2] })).is_err());
        assert!(Context::from_json(&json!("text")).is_err());
    }
}
