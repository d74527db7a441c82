//! Check results, run reports and their on-disk form.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub mod sink;

pub use self::sink::{JsonFileSink, PersistenceError, ReportSink, WriteMode};

/// Outcome of checking one endpoint in one run.
///
/// `status_code == 0` exactly when `error` is set. `error` never carries
/// schema failures; those show up only as `schema_valid == false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub url: String,
    pub status_code: u16,
    pub response_time_millis: u64,
    pub schema_valid: bool,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
}

impl CheckResult {
    /// Result for a probe that completed an HTTP exchange.
    pub fn completed(
        url: impl Into<String>,
        timestamp: DateTime<Utc>,
        status_code: u16,
        response_time_millis: u64,
        schema_valid: bool,
    ) -> Self {
        Self {
            url: url.into(),
            status_code,
            response_time_millis,
            schema_valid,
            timestamp,
            error: None,
        }
    }

    /// Result for a probe that never got a response.
    pub fn failed(
        url: impl Into<String>,
        timestamp: DateTime<Utc>,
        response_time_millis: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            status_code: 0,
            response_time_millis,
            schema_valid: false,
            timestamp,
            error: Some(error.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.error.is_none() && self.schema_valid && (200..400).contains(&self.status_code)
    }
}

/// All results of one run, in endpoint order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub results: Vec<CheckResult>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Local>, results: Vec<CheckResult>) -> Self {
        Self { started_at, results }
    }

    /// Calendar date the report is filed under.
    pub fn date(&self) -> NaiveDate {
        self.started_at.date_naive()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn healthy_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_healthy()).count()
    }
}

/// Format a check result as a single human-readable line.
pub fn format_summary(result: &CheckResult) -> String {
    let status = if result.status_code == 0 {
        "no response".to_string()
    } else {
        result.status_code.to_string()
    };

    let mut summary = format!(
        "{}: status {}, {}ms, schema {}",
        result.url,
        status,
        result.response_time_millis,
        if result.schema_valid { "valid" } else { "invalid" },
    );

    if let Some(error) = &result.error {
        summary.push_str(&format!(", error: {}", error));
    }

    summary
}
