//! HTTP fetcher for bulk sensor documents.
//!
//! A thin wrapper over a `ureq` agent configured once from the accessory's
//! URL settings. One call makes exactly one request: retry policy lives in
//! the staleness cache, which stays unmarked after a failure so the next
//! host query fetches again.

use std::sync::Mutex;

use airbridge_core::config::{HttpMethod, UrlSettings};
use async_trait::async_trait;
use base64::prelude::*;
use thiserror::Error;

/// Transport-level fetch failures.
///
/// An HTTP error status is not one of these: the endpoint answered, and the
/// caller decides what a `503` means. Only failures to converse at all land
/// here.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection, DNS, TLS, or timeout failure.
    #[error("request failed: {0}")]
    Transport(String),

    /// The response arrived but its body could not be read.
    #[error("failed reading response body: {0}")]
    Body(String),
}

/// Raw response from the sensor endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body, possibly empty.
    pub body: String,
}

impl FetchResponse {
    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Counters for fetch diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Requests attempted.
    pub attempts: u64,
    /// Requests that failed at the transport level.
    pub failures: u64,
}

/// Source of bulk sensor documents.
///
/// The accessory task only sees this trait; tests swap in scripted
/// implementations.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Execute the configured request once.
    async fn fetch(&self) -> Result<FetchResponse, FetchError>;
}

/// `ureq`-backed fetcher configured from validated URL settings.
///
/// The underlying request blocks the calling task, which keeps queries
/// strictly one at a time per accessory.
pub struct HttpFetcher {
    settings: UrlSettings,
    agent: ureq::Agent,
    stats: Mutex<FetchStats>,
}

impl HttpFetcher {
    /// Build an agent for the given settings.
    pub fn new(settings: UrlSettings) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(settings.timeout)
            .user_agent(concat!("airbridge/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { settings, agent, stats: Mutex::new(FetchStats::default()) }
    }

    /// Counters since construction.
    pub fn stats(&self) -> FetchStats {
        *self.stats.lock().unwrap()
    }

    fn record_failure(&self) {
        self.stats.lock().unwrap().failures += 1;
    }

    fn build_request(&self) -> ureq::Request {
        let mut request = match self.settings.method {
            HttpMethod::Get => self.agent.get(&self.settings.url),
            other => self.agent.request(other.as_str(), &self.settings.url),
        };

        if let Some(auth) = &self.settings.auth {
            let credentials =
                BASE64_STANDARD.encode(format!("{}:{}", auth.username, auth.password));
            request = request.set("Authorization", &format!("Basic {credentials}"));
        }
        if self.settings.body.is_some() {
            request = request.set("Content-Type", "application/json");
        }
        for (name, value) in &self.settings.headers {
            request = request.set(name, value);
        }
        request.set("Accept", "application/json")
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self) -> Result<FetchResponse, FetchError> {
        self.stats.lock().unwrap().attempts += 1;

        let request = self.build_request();
        let result = match &self.settings.body {
            Some(body) => request.send_string(body),
            None => request.call(),
        };

        match result {
            Ok(response) => {
                let status = response.status();
                let body = response.into_string().map_err(|error| {
                    self.record_failure();
                    FetchError::Body(error.to_string())
                })?;
                Ok(FetchResponse { status, body })
            }
            // Error statuses still carry a response; surface them as one.
            Err(ureq::Error::Status(status, response)) => Ok(FetchResponse {
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(transport)) => {
                self.record_failure();
                Err(FetchError::Transport(transport.to_string()))
            }
        }
    }
}
