//! Per-module parameter schemas.
//!
//! Local modules declare the named, typed parameters they accept. The dispatcher checks a call's
//! params against the schema before invoking the handler, so an argument mismatch surfaces as a
//! validation error instead of a handler failure.

use std::fmt;

use serde::Serialize;

use crate::params::{FieldIssue, ParamValue, Params, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    /// Integer or float.
    Number,
    Integer,
    Boolean,
}

impl ParamKind {
    fn accepts(self, value: &ParamValue) -> bool {
        match self {
            Self::String => value.as_str().is_some(),
            Self::Boolean => value.as_bool().is_some(),
            Self::Number => value.as_number().is_some(),
            Self::Integer => value
                .as_number()
                .is_some_and(|n| n.is_i64() || n.is_u64()),
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParamSchema(Vec<ParamSpec>);

impl ParamSchema {
    pub fn new(specs: impl IntoIterator<Item = ParamSpec>) -> Self {
        Self(specs.into_iter().collect())
    }

    /// Check `params` against the schema, collecting every mismatch.
    pub fn check(&self, params: &Params) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        for key in params.keys() {
            if !self.0.iter().any(|spec| spec.name == key) {
                issues.push(FieldIssue::new(
                    format!("params.{key}"),
                    "unexpected parameter",
                ));
            }
        }

        for spec in &self.0 {
            let path = format!("params.{}", spec.name);
            match params.get(spec.name) {
                None if spec.required => issues.push(FieldIssue::new(path, "field required")),
                None => {}
                Some(value) if value.is_null() => {
                    if spec.required {
                        issues.push(FieldIssue::new(
                            path,
                            format!("expected {}, got null", spec.kind),
                        ));
                    }
                }
                Some(value) if !spec.kind.accepts(value) => issues.push(FieldIssue::new(
                    path,
                    format!("expected {}, got {}", spec.kind, value.type_name()),
                )),
                Some(_) => {}
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}
