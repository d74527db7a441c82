//! Daily JSON report files.
//!
//! One file per calendar date, `health-check-<YYYY-MM-DD>.json`, holding a
//! JSON array of [`CheckResult`]. Files are written to a temporary sibling
//! and renamed into place so readers never observe a half-written report.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::{CheckResult, RunReport};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to create report directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to read report {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse report {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// What to do when a report for the same date already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Replace the file with the latest run's results.
    #[default]
    Overwrite,
    /// Add the latest run's results after those already on disk.
    Append,
}

/// Destination for completed run reports.
#[async_trait::async_trait]
pub trait ReportSink: Send + Sync {
    /// Persist `report` as one unit, returning where it went.
    async fn persist(&self, report: &RunReport) -> Result<PathBuf, PersistenceError>;
}

/// Writes reports under a directory (`logs/` by default).
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
    mode: WriteMode,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            mode: WriteMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the report file for `date`.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("health-check-{}.json", date.format("%Y-%m-%d")))
    }
}

#[async_trait::async_trait]
impl ReportSink for JsonFileSink {
    async fn persist(&self, report: &RunReport) -> Result<PathBuf, PersistenceError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| PersistenceError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.path_for(report.date());

        let mut results = match self.mode {
            WriteMode::Append => existing_results(&path).await?,
            WriteMode::Overwrite => Vec::new(),
        };
        let previous = results.len();
        results.extend(report.results.iter().cloned());

        let json = serde_json::to_vec_pretty(&results)?;

        let tmp = path.with_extension("json.tmp");
        if let Err(e) = write_then_rename(&tmp, &path, &json).await {
            // Leave no stray temp file behind.
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }

        debug!(
            path = %path.display(),
            mode = ?self.mode,
            previous,
            written = report.results.len(),
            "report persisted"
        );
        Ok(path)
    }
}

async fn write_then_rename(tmp: &Path, path: &Path, json: &[u8]) -> Result<(), PersistenceError> {
    tokio::fs::write(tmp, json)
        .await
        .map_err(|source| PersistenceError::Write {
            path: tmp.to_path_buf(),
            source,
        })?;
    tokio::fs::rename(tmp, path)
        .await
        .map_err(|source| PersistenceError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Results already filed under `path`; a missing file means none.
async fn existing_results(path: &Path) -> Result<Vec<CheckResult>, PersistenceError> {
    match tokio::fs::metadata(path).await {
        Ok(_) => read_report(path).await,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(PersistenceError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read a persisted report file back into memory.
pub async fn read_report(path: &Path) -> Result<Vec<CheckResult>, PersistenceError> {
    let content = tokio::fs::read(path)
        .await
        .map_err(|source| PersistenceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_slice(&content).map_err(|source| PersistenceError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone, Utc};

    fn sample_report() -> RunReport {
        let started = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let ts = Utc::now();
        RunReport::new(
            started,
            vec![
                CheckResult::completed("https://api.github.com", ts, 200, 120, true),
                CheckResult::completed("https://weather.example/now", ts, 200, 45, false),
                CheckResult::failed("http://nowhere.invalid", ts, 3, "dns error"),
            ],
        )
    }

    #[test]
    fn test_path_for_date() {
        let sink = JsonFileSink::new("logs");
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(
            sink.path_for(date),
            PathBuf::from("logs/health-check-2024-05-01.json")
        );
    }

    #[tokio::test]
    async fn test_persist_and_read_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = JsonFileSink::new(dir.path().join("logs"));
        let report = sample_report();

        let path = sink.persist(&report).await.unwrap();
        assert_eq!(path, dir.path().join("logs/health-check-2024-05-01.json"));

        let read_back = read_report(&path).await.unwrap();
        assert_eq!(read_back, report.results);
    }

    #[tokio::test]
    async fn test_overwrite_keeps_latest_run_only() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = JsonFileSink::new(dir.path());
        let report = sample_report();

        sink.persist(&report).await.unwrap();
        let path = sink.persist(&report).await.unwrap();

        let read_back = read_report(&path).await.unwrap();
        assert_eq!(read_back.len(), report.len());
    }

    #[tokio::test]
    async fn test_append_accumulates_runs() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = JsonFileSink::new(dir.path()).with_mode(WriteMode::Append);
        let report = sample_report();

        sink.persist(&report).await.unwrap();
        let path = sink.persist(&report).await.unwrap();

        let read_back = read_report(&path).await.unwrap();
        assert_eq!(read_back.len(), report.len() * 2);
        assert_eq!(&read_back[..3], &report.results[..]);
        assert_eq!(&read_back[3..], &report.results[..]);
    }

    #[tokio::test]
    async fn test_unwritable_directory_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file in the way").unwrap();

        let sink = JsonFileSink::new(blocker.join("logs"));
        let err = sink.persist(&sample_report()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::CreateDir { .. }));
    }

    #[tokio::test]
    async fn test_append_does_not_overwrite_unreadable_report() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = JsonFileSink::new(dir.path()).with_mode(WriteMode::Append);
        let report = sample_report();

        // Something that exists but cannot be read as a report.
        let path = sink.path_for(report.date());
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        let err = sink.persist(&report).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Read { .. }));
        assert!(path.join("occupied").is_dir());
    }

    #[tokio::test]
    async fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let sink = JsonFileSink::new(dir.path());
        let report = sample_report();

        // A non-empty directory at the target path makes the rename fail.
        let path = sink.path_for(report.date());
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        let err = sink.persist(&report).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Write { .. }));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_missing_report_is_error() {
        let err = read_report(Path::new("/nonexistent/health-check.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Read { .. }));
    }
}
