//! One health-check run: load endpoints, probe, validate, persist.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use futures::StreamExt;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::endpoints::{ConfigError, Endpoint, EndpointSource, FileEndpointSource};
use crate::probes::{HttpProbe, Probe};
use crate::report::{format_summary, CheckResult, JsonFileSink, PersistenceError, ReportSink, RunReport};
use crate::schema::{DirSchemaStore, SchemaValidator};

/// Everything a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    /// Where the report was written, or why it could not be.
    pub persisted: Result<PathBuf, PersistenceError>,
}

/// Orchestrates a single pass over all configured endpoints.
///
/// Runs are independent: the runner keeps no state between calls to
/// [`run`](Self::run), so a caller may invoke it on whatever cadence it likes.
#[derive(Clone)]
pub struct CheckRunner {
    source: Arc<dyn EndpointSource>,
    probe: Arc<dyn Probe>,
    validator: SchemaValidator,
    sink: Arc<dyn ReportSink>,
    concurrency: usize,
}

impl CheckRunner {
    pub fn new(
        source: impl EndpointSource + 'static,
        probe: impl Probe + 'static,
        validator: SchemaValidator,
        sink: impl ReportSink + 'static,
    ) -> Self {
        Self {
            source: Arc::new(source),
            probe: Arc::new(probe),
            validator,
            sink: Arc::new(sink),
            concurrency: 1,
        }
    }

    /// Build the standard file-backed runner from application config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let probe = HttpProbe::new(config.checks.timeout_ms.map(Duration::from_millis))?;
        let runner = Self::new(
            FileEndpointSource::new(&config.checks.endpoints_path),
            probe,
            SchemaValidator::new(DirSchemaStore::new(&config.checks.schema_dir)),
            JsonFileSink::new(&config.report.dir).with_mode(config.report.mode),
        )
        .with_concurrency(config.checks.concurrency);
        Ok(runner)
    }

    /// Maximum number of endpoints probed at once. `1` is sequential.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Execute one run.
    ///
    /// Fails only when the endpoint list cannot be loaded. Persistence
    /// failures are reported in the returned [`RunOutcome`].
    pub async fn run(&self) -> Result<RunOutcome, ConfigError> {
        let started_at: DateTime<Local> = Local::now();

        let endpoints = match self.source.load() {
            Ok(endpoints) => endpoints,
            Err(e) => {
                error!(error = %e, "Failed to load endpoints; run aborted");
                return Err(e);
            }
        };
        info!(
            endpoints = endpoints.len(),
            concurrency = self.concurrency,
            "Starting health check run"
        );

        let results = self.check_all(endpoints).await;
        let report = RunReport::new(started_at, results);

        let persisted = self.sink.persist(&report).await;
        match &persisted {
            Ok(path) => info!(
                path = %path.display(),
                checked = report.len(),
                healthy = report.healthy_count(),
                "Health check run complete"
            ),
            Err(e) => error!(error = %e, "Failed to persist health check report"),
        }

        Ok(RunOutcome { report, persisted })
    }

    /// Check every endpoint, returning results in endpoint order.
    pub async fn check_all(&self, endpoints: Vec<Endpoint>) -> Vec<CheckResult> {
        // `buffered` yields in input order regardless of completion order.
        futures::stream::iter(endpoints)
            .map(|endpoint| self.spawn_check(endpoint))
            .buffered(self.concurrency)
            .inspect(log_result)
            .collect::<Vec<_>>()
            .await
    }

    async fn spawn_check(&self, endpoint: Endpoint) -> CheckResult {
        let probe = Arc::clone(&self.probe);
        let validator = self.validator.clone();
        let url = endpoint.url.clone();
        let timestamp = Utc::now();
        let start = Instant::now();

        // A panic inside one check must not take the run down with it.
        let task = tokio::spawn(check_endpoint(probe, validator, endpoint, timestamp));
        match task.await {
            Ok(result) => result,
            Err(e) => {
                warn!(%url, error = %e, "Check task failed");
                CheckResult::failed(
                    url,
                    timestamp,
                    millis(start.elapsed()),
                    format!("check task failed: {}", e),
                )
            }
        }
    }
}

impl std::fmt::Debug for CheckRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckRunner")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

async fn check_endpoint(
    probe: Arc<dyn Probe>,
    validator: SchemaValidator,
    endpoint: Endpoint,
    timestamp: DateTime<Utc>,
) -> CheckResult {
    let outcome = probe.probe(&endpoint).await;
    let elapsed = outcome.elapsed_millis();

    match outcome.transport_error {
        Some(e) => CheckResult::failed(endpoint.url, timestamp, elapsed, e.to_string()),
        None => {
            let schema_valid = validator.validate(endpoint.schema_ref.as_deref(), &outcome.body);
            CheckResult::completed(
                endpoint.url,
                timestamp,
                outcome.status_code,
                elapsed,
                schema_valid,
            )
        }
    }
}

fn log_result(result: &CheckResult) {
    let summary = format_summary(result);
    match &result.error {
        Some(e) => warn!(
            url = %result.url,
            status = result.status_code,
            response_time_ms = result.response_time_millis,
            schema_valid = result.schema_valid,
            error = %e,
            "{}", summary
        ),
        None => info!(
            url = %result.url,
            status = result.status_code,
            response_time_ms = result.response_time_millis,
            schema_valid = result.schema_valid,
            "{}", summary
        ),
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
