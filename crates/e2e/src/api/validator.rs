//! Response validation
//!
//! Every check returns `Result<_, Mismatch>` and logs its own diagnostics.
//! Nothing here panics on a mismatch; the caller decides whether a
//! mismatch fails the test.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info};

use playtype_common::HarnessError;

use super::path::{resolve, strict_equals};
use super::request::primitive_to_string;

/// A failed expectation with a readable diagnostic
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct Mismatch {
    pub message: String,
}

impl Mismatch {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<Mismatch> for HarnessError {
    fn from(mismatch: Mismatch) -> Self {
        HarnessError::AssertionFailed(mismatch.message)
    }
}

/// One refinement failure at a field path
#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub path: Vec<String>,
    pub message: String,
}

impl FieldIssue {
    pub fn new<I, S>(path: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            message: message.into(),
        }
    }
}

/// A runtime type a response body can be checked against.
///
/// Deserialization covers structure and primitive types; `refine` adds
/// value-level rules such as formats and ranges.
pub trait TypeSchema: DeserializeOwned {
    fn refine(&self) -> Vec<FieldIssue> {
        Vec::new()
    }
}

/// Stateless collection of response checks
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseValidator;

impl ResponseValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate `body` against a JSON Schema document
    pub fn validate_schema(&self, schema: &Value, body: &Value) -> Result<(), Mismatch> {
        let compiled = match jsonschema::validator_for(schema) {
            Ok(compiled) => compiled,
            Err(e) => {
                error!("Schema failed to compile: {}", e);
                debug!("Expected schema: {}", pretty(schema));
                return Err(Mismatch::new(format!("invalid schema: {}", e)));
            }
        };

        let errors: Vec<String> = compiled
            .iter_errors(body)
            .map(|e| {
                let location = e.instance_path.to_string();
                if location.is_empty() {
                    e.to_string()
                } else {
                    format!("{}: {}", location, e)
                }
            })
            .collect();

        if errors.is_empty() {
            info!("Response schema matches with Api response");
            return Ok(());
        }

        debug!("Expected schema: {}", pretty(schema));
        for message in &errors {
            debug!("Schema error: {}", message);
        }
        error!("Response schema does not match Api response");
        Err(Mismatch::new(format!(
            "Schema validation failed: {}",
            errors.join("; ")
        )))
    }

    /// Parse `body` into `T` and apply its refinements
    pub fn validate_type<T: TypeSchema>(&self, body: &Value) -> Result<T, Mismatch> {
        let parsed: T = match serde_path_to_error::deserialize(body) {
            Ok(parsed) => parsed,
            Err(e) => {
                let path = path_segments(e.path());
                let tree = error_tree(&[FieldIssue {
                    path,
                    message: e.inner().to_string(),
                }]);
                return Err(type_mismatch(tree));
            }
        };

        let issues = parsed.refine();
        if issues.is_empty() {
            info!("Response matches type schema");
            Ok(parsed)
        } else {
            Err(type_mismatch(error_tree(&issues)))
        }
    }

    /// Strict comparison of the value at `path` with `expected`
    pub fn validate_field(&self, body: &Value, path: &str, expected: &Value) -> Result<(), Mismatch> {
        match resolve(body, path) {
            Some(actual) if strict_equals(actual, expected) => {
                info!("Field '{}' matches expected value: {}", path, expected);
                Ok(())
            }
            Some(actual) => {
                error!(
                    "Field '{}' mismatch. Expected: {}, Actual: {}",
                    path, expected, actual
                );
                Err(Mismatch::new(format!(
                    "Field '{}' expected {} but was {}",
                    path, expected, actual
                )))
            }
            None => {
                error!("Field '{}' is undefined in response. Expected: {}", path, expected);
                Err(Mismatch::new(format!(
                    "Field '{}' expected {} but was undefined",
                    path, expected
                )))
            }
        }
    }

    /// Strict comparison of a top-level key only
    pub fn validate_field_value(
        &self,
        body: &Value,
        key: &str,
        expected: &Value,
    ) -> Result<(), Mismatch> {
        let actual = body.as_object().and_then(|map| map.get(key));
        match actual {
            Some(actual) if strict_equals(actual, expected) => {
                info!("Field '{}' matches expected value: {}", key, expected);
                Ok(())
            }
            other => {
                let shown = other
                    .map(Value::to_string)
                    .unwrap_or_else(|| "undefined".to_string());
                error!("Field '{}' mismatch. Expected: {}, Actual: {}", key, expected, shown);
                Err(Mismatch::new(format!(
                    "Field '{}' expected {} but was {}",
                    key, expected, shown
                )))
            }
        }
    }

    /// Compare a plain-text body with `expected` after trimming both
    pub fn validate_text(&self, raw: &str, expected: &Value) -> Result<(), Mismatch> {
        let actual = raw.trim();
        let wanted = primitive_to_string(expected);
        if actual == wanted.trim() {
            info!("Plain text response matches: {}", actual);
            Ok(())
        } else {
            error!(
                "Plain text response mismatch. Expected: {}, Actual: {}",
                wanted.trim(),
                actual
            );
            Err(Mismatch::new(format!(
                "Text expected '{}' but was '{}'",
                wanted.trim(),
                actual
            )))
        }
    }

    /// Route a raw response body to field-path or plain-text comparison
    pub fn validate_response_field(
        &self,
        text: &str,
        path: &str,
        expected: &Value,
    ) -> Result<(), Mismatch> {
        match serde_json::from_str::<Value>(text) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => {
                self.validate_field(&value, path, expected)
            }
            Ok(scalar) => self.validate_text(&primitive_to_string(&scalar), expected),
            Err(_) => self.validate_text(text, expected),
        }
    }
}

fn type_mismatch(tree: Value) -> Mismatch {
    let rendered = pretty(&tree);
    error!("Type schema validation failed: {}", rendered);
    Mismatch::new(format!("Type schema validation failed: {}", rendered))
}

fn path_segments(path: &serde_path_to_error::Path) -> Vec<String> {
    use serde_path_to_error::Segment;

    path.iter()
        .filter_map(|segment| match segment {
            Segment::Seq { index } => Some(index.to_string()),
            Segment::Map { key } => Some(key.clone()),
            Segment::Enum { variant } => Some(variant.clone()),
            Segment::Unknown => None,
        })
        .collect()
}

/// Nest issues by path segment, collecting messages under `errors`
pub fn error_tree(issues: &[FieldIssue]) -> Value {
    let mut root = Map::new();
    for issue in issues {
        insert_issue(&mut root, &issue.path, &issue.message);
    }
    Value::Object(root)
}

fn insert_issue(node: &mut Map<String, Value>, path: &[String], message: &str) {
    match path.split_first() {
        None => {
            let errors = node
                .entry("errors".to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(list) = errors {
                list.push(Value::String(message.to_string()));
            }
        }
        Some((head, rest)) => {
            let child = node
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                insert_issue(map, rest, message);
            }
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
