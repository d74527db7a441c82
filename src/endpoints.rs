//! Endpoint definitions and the JSON endpoint list loader.
//!
//! The endpoint file is a JSON document with a single top-level `endpoints`
//! array. Each entry carries a `url`, a `method` and an optional `schema`
//! reference resolved against the schema store.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("endpoint config not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read endpoint config {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed endpoint config {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("endpoint #{index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },
}

/// A single endpoint to probe. Never mutated after loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub method: String,
    pub schema_ref: Option<String>,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            schema_ref: None,
        }
    }

    /// Builder-style setter for `schema_ref`.
    pub fn with_schema(mut self, schema_ref: impl Into<String>) -> Self {
        self.schema_ref = Some(schema_ref.into());
        self
    }
}

/// Supplies the ordered endpoint list for a run.
pub trait EndpointSource: Send + Sync {
    fn load(&self) -> Result<Vec<Endpoint>, ConfigError>;
}

/// Reads endpoints from a JSON file on every `load`.
#[derive(Debug, Clone)]
pub struct FileEndpointSource {
    path: PathBuf,
}

impl FileEndpointSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EndpointSource for FileEndpointSource {
    fn load(&self) -> Result<Vec<Endpoint>, ConfigError> {
        load_endpoints(&self.path)
    }
}

/// Fixed endpoint list, mostly useful for tests and embedding.
impl EndpointSource for Vec<Endpoint> {
    fn load(&self) -> Result<Vec<Endpoint>, ConfigError> {
        Ok(self.clone())
    }
}

// Fields are optional on the wire so a missing one can be reported by index.
#[derive(Debug, Deserialize)]
struct RawConfig {
    endpoints: Vec<RawEndpoint>,
}

#[derive(Debug, Deserialize)]
struct RawEndpoint {
    url: Option<String>,
    method: Option<String>,
    schema: Option<String>,
}

/// Load endpoints from `path`, preserving file order.
pub fn load_endpoints(path: &Path) -> Result<Vec<Endpoint>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let endpoints = parse_endpoints(&content).map_err(|e| match e {
        ParseFailure::Json(source) => ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        },
        ParseFailure::Field(err) => err,
    })?;

    debug!(path = %path.display(), count = endpoints.len(), "loaded endpoints");
    Ok(endpoints)
}

enum ParseFailure {
    Json(serde_json::Error),
    Field(ConfigError),
}

fn parse_endpoints(content: &str) -> Result<Vec<Endpoint>, ParseFailure> {
    let raw: RawConfig = serde_json::from_str(content).map_err(ParseFailure::Json)?;

    raw.endpoints
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let url = required(entry.url, index, "url")?;
            let method = required(entry.method, index, "method")?;
            let schema_ref = entry
                .schema
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            Ok(Endpoint {
                url,
                method,
                schema_ref,
            })
        })
        .collect()
}

fn required(
    value: Option<String>,
    index: usize,
    field: &'static str,
) -> Result<String, ParseFailure> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ParseFailure::Field(ConfigError::MissingField { index, field })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("urls.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_preserves_file_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"endpoints":[
                {"url":"https://a.example","method":"GET"},
                {"url":"https://b.example","method":"POST","schema":"b.json"},
                {"url":"https://c.example","method":"HEAD"}
            ]}"#,
        );

        let endpoints = load_endpoints(&path).unwrap();
        let urls: Vec<&str> = endpoints.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, ["https://a.example", "https://b.example", "https://c.example"]);
        assert_eq!(endpoints[1].method, "POST");
        assert_eq!(endpoints[1].schema_ref.as_deref(), Some("b.json"));
        assert!(endpoints[0].schema_ref.is_none());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = load_endpoints(Path::new("/nonexistent/urls.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_config(&dir, "{ not json");
        let err = load_endpoints(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn test_missing_endpoints_key_is_malformed() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"targets":[]}"#);
        let err = load_endpoints(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn test_missing_method_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"endpoints":[{"url":"https://a.example","method":"GET"},{"url":"https://b.example"}]}"#,
        );
        match load_endpoints(&path).unwrap_err() {
            ConfigError::MissingField { index, field } => {
                assert_eq!(index, 1);
                assert_eq!(field, "method");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_url_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"endpoints":[{"url":"  ","method":"GET"}]}"#);
        match load_endpoints(&path).unwrap_err() {
            ConfigError::MissingField { index, field } => {
                assert_eq!(index, 0);
                assert_eq!(field, "url");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_schema_is_absent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"endpoints":[{"url":"https://a.example","method":"GET","schema":""}]}"#,
        );
        let endpoints = load_endpoints(&path).unwrap();
        assert!(endpoints[0].schema_ref.is_none());
    }

    #[test]
    fn test_file_source_delegates_to_loader() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"endpoints":[]}"#);
        let source = FileEndpointSource::new(&path);
        assert!(source.load().unwrap().is_empty());
        assert_eq!(source.path(), path.as_path());
    }
}
