//! Outbound transport abstraction.
//!
//! Translation strategies issue wire payloads through an injectable
//! [`Transport`] so probes can run against a real network edge in
//! production and an in-process emulated edge in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde_json::Value;

use crate::error::{RelayError, Result};

/// Default timeout for outbound probe requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One response from the transport edge.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl TransportResponse {
    /// Whether the status is in the success range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Parse the body as JSON, tolerating empty bodies.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

/// Injectable outbound HTTP edge.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON body and return the raw response.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] or [`RelayError::Timeout`] when the
    /// call itself fails; non-success statuses are returned as responses,
    /// not errors, so the caller can classify the body.
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
    ) -> Result<TransportResponse>;
}

// =============================================================================
// HTTP Transport
// =============================================================================

/// Production transport on a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns error if client construction fails.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(format!("relaymon/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RelayError::Transport {
                message: e.to_string(),
            })?;
        Ok(Self { client, timeout })
    }

    /// Build a transport with the default timeout.
    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
    ) -> Result<TransportResponse> {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RelayError::Timeout {
                    seconds: self.timeout.as_secs(),
                }
            } else {
                RelayError::Transport {
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| RelayError::Transport {
            message: e.to_string(),
        })?;

        Ok(TransportResponse { status, body })
    }
}
