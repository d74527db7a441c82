//! Single-attempt endpoint probes.

use std::time::Duration;

use thiserror::Error;

use crate::endpoints::Endpoint;

pub mod http;

pub use self::http::HttpProbe;

/// Why a probe never produced an HTTP response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("invalid HTTP method `{method}`")]
    InvalidMethod { method: String },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Result of one probe attempt.
///
/// `status_code` is zero exactly when `transport_error` is set.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub status_code: u16,
    pub body: String,
    pub elapsed: Duration,
    pub transport_error: Option<TransportError>,
}

impl ProbeOutcome {
    pub fn completed(status_code: u16, body: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            status_code,
            body: body.into(),
            elapsed,
            transport_error: None,
        }
    }

    pub fn failed(error: TransportError, elapsed: Duration) -> Self {
        Self {
            status_code: 0,
            body: String::new(),
            elapsed,
            transport_error: Some(error),
        }
    }

    pub fn elapsed_millis(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Trait for endpoint probes. One call is one attempt; no retries.
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, endpoint: &Endpoint) -> ProbeOutcome;
}
