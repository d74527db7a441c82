//! TOML application configuration.
//!
//! Every section is optional; anything left out falls back to the defaults
//! below, which mirror the conventional layout (`urls.json`, `schemas/`,
//! `logs/`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::report::WriteMode;

/// Environment variable naming the config file to load.
pub const CONFIG_ENV: &str = "HEALTHWATCH_CONFIG";

/// Config file looked up in the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "healthwatch.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub checks: ChecksConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Resolve configuration, in order:
    /// 1. An explicit path (from the command line). Errors are fatal here.
    /// 2. The path in `HEALTHWATCH_CONFIG`.
    /// 3. `healthwatch.toml` in the working directory.
    /// 4. Compiled-in defaults.
    ///
    /// Nothing is logged here; resolution usually happens before the
    /// subscriber exists, so call [`ResolvedConfig::log`] once it does.
    pub fn resolve(explicit: Option<&Path>) -> Result<ResolvedConfig> {
        if let Some(path) = explicit {
            return Ok(ResolvedConfig::from_file(Self::load(path)?, path));
        }

        let mut skipped = Vec::new();
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(env_path);
            match Self::load(&path) {
                Ok(cfg) => return Ok(ResolvedConfig::from_file(cfg, &path)),
                Err(e) => skipped.push((path, e)),
            }
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        let mut resolved = if local.exists() {
            ResolvedConfig::from_file(Self::load(local)?, local)
        } else {
            ResolvedConfig {
                config: Self::default(),
                origin: None,
                skipped: Vec::new(),
            }
        };
        resolved.skipped = skipped;
        Ok(resolved)
    }
}

/// A resolved [`AppConfig`] plus how it was found.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub config: AppConfig,
    /// File the config came from; `None` for compiled-in defaults.
    pub origin: Option<PathBuf>,
    /// Candidates named by `HEALTHWATCH_CONFIG` that failed to load.
    pub skipped: Vec<(PathBuf, anyhow::Error)>,
}

impl ResolvedConfig {
    fn from_file(config: AppConfig, path: &Path) -> Self {
        Self {
            config,
            origin: Some(path.to_path_buf()),
            skipped: Vec::new(),
        }
    }

    /// Report how the config was resolved.
    pub fn log(&self) {
        for (path, e) in &self.skipped {
            warn!(
                path = %path.display(),
                error = %e,
                "HEALTHWATCH_CONFIG set but file could not be loaded, using fallback"
            );
        }
        match &self.origin {
            Some(path) => info!(path = %path.display(), "loaded configuration"),
            None => debug!("no config file found, using compiled-in defaults"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Where endpoints and schemas come from and how they are probed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    /// JSON file with the top-level `endpoints` array.
    pub endpoints_path: PathBuf,
    /// Directory schema references are resolved against.
    pub schema_dir: PathBuf,
    /// Endpoints probed at once; `1` runs them one after another.
    pub concurrency: usize,
    /// Per-request timeout. Unset leaves the HTTP client without one.
    pub timeout_ms: Option<u64>,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            endpoints_path: PathBuf::from("urls.json"),
            schema_dir: PathBuf::from("schemas"),
            concurrency: 1,
            timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub dir: PathBuf,
    pub mode: WriteMode,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            mode: WriteMode::Overwrite,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Text,
    Json,
}

/// Cadence used by `healthwatch watch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_ms: 300_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
