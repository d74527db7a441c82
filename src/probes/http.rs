use super::{Probe, ProbeOutcome, TransportError};
use crate::endpoints::Endpoint;
use anyhow::{Context, Result};
use reqwest::{Client, Method};
use std::error::Error as StdError;
use std::time::{Duration, Instant};

/// HTTP probe reporting status code, body and wall-clock latency.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    /// Build a probe. `timeout` of `None` keeps the transport default (no limit).
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, endpoint: &Endpoint) -> ProbeOutcome {
        let start = Instant::now();

        let method = match standard_method(&endpoint.method) {
            Some(m) => m,
            None => {
                return ProbeOutcome::failed(
                    TransportError::InvalidMethod {
                        method: endpoint.method.clone(),
                    },
                    start.elapsed(),
                )
            }
        };

        let response = match self.client.request(method, &endpoint.url).send().await {
            Ok(r) => r,
            Err(e) => return ProbeOutcome::failed(classify(&e), start.elapsed()),
        };

        let status = response.status().as_u16();
        // The exchange is only complete once the body has been read.
        match response.text().await {
            Ok(body) => ProbeOutcome::completed(status, body, start.elapsed()),
            Err(e) => ProbeOutcome::failed(
                TransportError::Body(error_chain(&e)),
                start.elapsed(),
            ),
        }
    }
}

/// Map a configured verb onto one of the standard HTTP methods.
fn standard_method(method: &str) -> Option<Method> {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Some(Method::GET),
        "HEAD" => Some(Method::HEAD),
        "POST" => Some(Method::POST),
        "PUT" => Some(Method::PUT),
        "DELETE" => Some(Method::DELETE),
        "PATCH" => Some(Method::PATCH),
        "OPTIONS" => Some(Method::OPTIONS),
        "TRACE" => Some(Method::TRACE),
        "CONNECT" => Some(Method::CONNECT),
        _ => None,
    }
}

fn classify(err: &reqwest::Error) -> TransportError {
    let message = error_chain(err);
    if err.is_timeout() {
        TransportError::Timeout(message)
    } else if err.is_connect() {
        TransportError::Connect(message)
    } else {
        TransportError::Request(message)
    }
}

/// Flatten an error and its sources into one line.
///
/// reqwest's top-level message omits the cause (e.g. "dns error"), which
/// lives further down the chain.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
