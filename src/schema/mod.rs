//! Response-shape validation against JSON-Schema-like documents.
//!
//! The conformance bar is required-field presence. On top of that the
//! validator understands `type`, `enum`, nested `properties`/`required` and
//! array `items`, recursively. Every failure mode collapses to `false` at
//! the [`SchemaValidator::validate`] boundary.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

pub mod store;

pub use self::store::{DirSchemaStore, MemorySchemaStore, SchemaStore};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("schema `{reference}` not found")]
    SchemaNotFound { reference: String },

    #[error("schema `{reference}` could not be read: {reason}")]
    SchemaUnreadable { reference: String, reason: String },

    #[error("schema `{reference}` is malformed: {reason}")]
    SchemaMalformed { reference: String, reason: String },

    #[error("response body is not valid JSON: {reason}")]
    BodyNotJson { reason: String },

    #[error("required field `{path}` is missing")]
    MissingField { path: String },

    #[error("`{path}` should be {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: &'static str,
    },

    #[error("`{path}` is not one of the allowed values")]
    NotInEnum { path: String },
}

/// Decides whether a response body conforms to a referenced schema.
#[derive(Clone)]
pub struct SchemaValidator {
    store: Arc<dyn SchemaStore>,
}

impl SchemaValidator {
    pub fn new(store: impl SchemaStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// `true` when there is no schema or the body conforms; `false` otherwise.
    pub fn validate(&self, schema_ref: Option<&str>, body: &str) -> bool {
        match self.check(schema_ref, body) {
            Ok(()) => true,
            Err(e) => {
                debug!(schema = ?schema_ref, error = %e, "schema validation failed");
                false
            }
        }
    }

    /// Like [`validate`](Self::validate) but keeps the reason for failure.
    pub fn check(&self, schema_ref: Option<&str>, body: &str) -> Result<(), ValidationError> {
        let Some(reference) = schema_ref else {
            return Ok(());
        };

        let schema = self.store.load(reference)?;
        if !schema.is_object() {
            return Err(malformed(reference, "schema document must be an object"));
        }

        let data: Value = serde_json::from_str(body).map_err(|e| ValidationError::BodyNotJson {
            reason: e.to_string(),
        })?;

        conform(reference, &schema, &data, "$")
    }
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator").finish_non_exhaustive()
    }
}

fn malformed(reference: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::SchemaMalformed {
        reference: reference.to_string(),
        reason: reason.into(),
    }
}

fn conform(reference: &str, schema: &Value, value: &Value, path: &str) -> Result<(), ValidationError> {
    let Some(schema) = schema.as_object() else {
        return Err(malformed(reference, format!("schema at `{path}` must be an object")));
    };

    if let Some(declared) = schema.get("type") {
        check_type(reference, declared, value, path)?;
    }

    if let Some(allowed) = schema.get("enum") {
        let allowed = allowed
            .as_array()
            .ok_or_else(|| malformed(reference, format!("`enum` at `{path}` must be an array")))?;
        if !allowed.contains(value) {
            return Err(ValidationError::NotInEnum {
                path: path.to_string(),
            });
        }
    }

    check_required(reference, schema, value, path)?;

    if let Some(properties) = schema.get("properties") {
        let properties = properties.as_object().ok_or_else(|| {
            malformed(reference, format!("`properties` at `{path}` must be an object"))
        })?;
        if let Some(object) = value.as_object() {
            for (name, sub_schema) in properties {
                if let Some(field) = object.get(name) {
                    conform(reference, sub_schema, field, &join(path, name))?;
                }
            }
        }
    }

    if let (Some(items), Some(elements)) = (schema.get("items"), value.as_array()) {
        for (i, element) in elements.iter().enumerate() {
            conform(reference, items, element, &format!("{path}[{i}]"))?;
        }
    }

    Ok(())
}

fn check_required(
    reference: &str,
    schema: &Map<String, Value>,
    value: &Value,
    path: &str,
) -> Result<(), ValidationError> {
    let Some(required) = schema.get("required") else {
        return Ok(());
    };
    let required = required
        .as_array()
        .ok_or_else(|| malformed(reference, format!("`required` at `{path}` must be an array")))?;

    let object = value.as_object();
    for name in required {
        let name = name.as_str().ok_or_else(|| {
            malformed(reference, format!("`required` at `{path}` must list field names"))
        })?;
        if !object.is_some_and(|o| o.contains_key(name)) {
            return Err(ValidationError::MissingField {
                path: join(path, name),
            });
        }
    }
    Ok(())
}

fn check_type(reference: &str, declared: &Value, value: &Value, path: &str) -> Result<(), ValidationError> {
    let names: Vec<&str> = match declared {
        Value::String(name) => vec![name.as_str()],
        Value::Array(list) => list
            .iter()
            .map(|v| {
                v.as_str()
                    .ok_or_else(|| malformed(reference, format!("`type` at `{path}` must list type names")))
            })
            .collect::<Result<_, _>>()?,
        _ => return Err(malformed(reference, format!("`type` at `{path}` must be a string or array"))),
    };

    let mut matched = false;
    for name in &names {
        matched |= match *name {
            "object" => value.is_object(),
            "array" => value.is_array(),
            "string" => value.is_string(),
            "number" => value.is_number(),
            "integer" => is_integer(value),
            "boolean" => value.is_boolean(),
            "null" => value.is_null(),
            other => return Err(malformed(reference, format!("unknown type `{other}` at `{path}`"))),
        };
    }

    if matched {
        Ok(())
    } else {
        Err(ValidationError::TypeMismatch {
            path: path.to_string(),
            expected: names.join(" or "),
            found: kind(value),
        })
    }
}

fn is_integer(value: &Value) -> bool {
    value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(path: &str, name: &str) -> String {
    if path == "$" {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}
