//! Flat, primitive-only call parameters and their validation.
//!
//! A call's `params` must be a JSON object whose values are strings, numbers, booleans or `null`.
//! Nested containers are rejected with an error naming the offending key.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
/// One parameter value. Containers are unrepresentable by construction.
pub enum ParamValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl ParamValue {
    /// Short type label used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(n) if n.is_f64() => "float",
            Self::Number(_) => "integer",
            Self::String(_) => "string",
        }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Self::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text form used when the value travels in a query string.
    ///
    /// `null` is sent as an empty value.
    pub fn to_query_value(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.clone(),
        }
    }
}

impl From<ParamValue> for Value {
    fn from(value: ParamValue) -> Self {
        match value {
            ParamValue::Null => Value::Null,
            ParamValue::Bool(b) => Value::Bool(b),
            ParamValue::Number(n) => Value::Number(n),
            ParamValue::String(s) => Value::String(s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
/// Validated call parameters.
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(key, value)` pairs for a GET query string.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_query_value()))
            .collect()
    }
}

impl From<Params> for Value {
    fn from(params: Params) -> Self {
        Value::Object(
            params
                .0
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single rejected field: `path` is dotted (`params.a`), `reason` is human readable.
pub struct FieldIssue {
    pub path: String,
    pub reason: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", join_issues(.issues))]
/// Malformed request shape or parameter types. Carries every issue found.
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn single(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            issues: vec![FieldIssue::new(path, reason)],
        }
    }

    /// Field paths in report order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().map(|i| i.path.as_str())
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// JSON type label for a raw value (`object`, `array`, ...).
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validate raw `params` into [`Params`], reporting issues under the `params` path.
pub fn validate(value: &Value) -> Result<Params, ValidationError> {
    validate_at("params", value)
}

/// Validate raw params, prefixing every reported path with `prefix`.
pub fn validate_at(prefix: &str, value: &Value) -> Result<Params, ValidationError> {
    let Value::Object(map) = value else {
        return Err(ValidationError::single(
            prefix,
            format!("expected object, got {}", json_type_name(value)),
        ));
    };

    let mut params = BTreeMap::new();
    let mut issues = Vec::new();
    for (key, value) in map {
        let primitive = match value {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Bool(*b),
            Value::Number(n) => ParamValue::Number(n.clone()),
            Value::String(s) => ParamValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => {
                issues.push(FieldIssue::new(
                    format!("{prefix}.{key}"),
                    format!(
                        "unsupported type {}; expected string, number, boolean or null",
                        json_type_name(value)
                    ),
                ));
                continue;
            }
        };
        params.insert(key.clone(), primitive);
    }

    if !issues.is_empty() {
        return Err(ValidationError { issues });
    }
    Ok(Params(params))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_flat_primitives() {
        let params = validate(&json!({
            "s": "x",
            "i": 5,
            "f": 1.5,
            "b": true,
            "n": null
        }))
        .unwrap();

        assert_eq!(params.len(), 5);
        assert_eq!(params.get("s").unwrap().as_str(), Some("x"));
        assert_eq!(params.get("i").unwrap().type_name(), "integer");
        assert_eq!(params.get("f").unwrap().type_name(), "float");
        assert_eq!(params.get("b").unwrap().as_bool(), Some(true));
        assert!(params.get("n").unwrap().is_null());
    }

    #[test]
    fn rejects_nested_values_naming_every_key() {
        let err = validate(&json!({ "a": 1, "cfg": { "x": 1 }, "list": [1, 2] })).unwrap_err();

        let paths: Vec<&str> = err.paths().collect();
        assert_eq!(paths, vec!["params.cfg", "params.list"]);
        let msg = err.to_string();
        assert!(msg.contains("params.cfg: unsupported type object"));
        assert!(msg.contains("; params.list: unsupported type array"));
    }

    #[test]
    fn rejects_non_object_top_level() {
        let err = validate(&json!([1, 2])).unwrap_err();
        assert_eq!(err.to_string(), "params: expected object, got array");

        let err = validate(&json!("a=1")).unwrap_err();
        assert_eq!(err.to_string(), "params: expected object, got string");
    }

    #[test]
    fn empty_object_is_valid() {
        assert!(validate(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn converts_back_to_json_object() {
        let params = validate(&json!({ "a": 5, "b": "x" })).unwrap();
        assert_eq!(Value::from(params), json!({ "a": 5, "b": "x" }));
    }

    #[test]
    fn query_pairs_render_primitives_as_text() {
        let params = validate(&json!({ "a": 1.5, "b": false, "c": null, "d": "hi" })).unwrap();
        assert_eq!(
            params.query_pairs(),
            vec![
                ("a".to_string(), "1.5".to_string()),
                ("b".to_string(), "false".to_string()),
                ("c".to_string(), String::new()),
                ("d".to_string(), "hi".to_string()),
            ]
        );
    }
}
