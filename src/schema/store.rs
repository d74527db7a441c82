//! Schema document lookup.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use serde_json::Value;

use super::ValidationError;

/// Resolves a schema reference to a parsed schema document.
pub trait SchemaStore: Send + Sync {
    fn load(&self, reference: &str) -> Result<Value, ValidationError>;
}

/// Schemas stored as JSON files under a root directory (`schemas/` by default).
#[derive(Debug, Clone)]
pub struct DirSchemaStore {
    root: PathBuf,
}

impl DirSchemaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, reference: &str) -> Result<PathBuf, ValidationError> {
        let relative = Path::new(reference);
        // References stay inside the store.
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ValidationError::SchemaNotFound {
                reference: reference.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl SchemaStore for DirSchemaStore {
    fn load(&self, reference: &str) -> Result<Value, ValidationError> {
        let path = self.resolve(reference)?;
        let content = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ValidationError::SchemaNotFound {
                    reference: reference.to_string(),
                }
            } else {
                ValidationError::SchemaUnreadable {
                    reference: reference.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;
        serde_json::from_str(&content).map_err(|e| ValidationError::SchemaMalformed {
            reference: reference.to_string(),
            reason: e.to_string(),
        })
    }
}

/// In-memory schemas keyed by reference.
#[derive(Debug, Clone, Default)]
pub struct MemorySchemaStore {
    schemas: HashMap<String, Value>,
}

impl MemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, reference: impl Into<String>, schema: Value) -> Self {
        self.schemas.insert(reference.into(), schema);
        self
    }
}

impl SchemaStore for MemorySchemaStore {
    fn load(&self, reference: &str) -> Result<Value, ValidationError> {
        self.schemas
            .get(reference)
            .cloned()
            .ok_or_else(|| ValidationError::SchemaNotFound {
                reference: reference.to_string(),
            })
    }
}
