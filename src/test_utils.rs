//! Shared test fixtures.
//!
//! Compiled for unit tests and, behind the `test-utils` feature, for the
//! integration suite. Provides an in-process transport edge and a fully
//! wired in-memory dependency bundle.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::core::audit::MemoryAuditSink;
use crate::core::channel::{
    Channel, ChannelStatus, ChannelType, LogNotifier, MemoryChannelStore, MemoryModelMapper,
    MemoryOverrideStore, StaticGroupResolver,
};
use crate::core::policy::DefaultBanPolicy;
use crate::core::pricing::MemoryPricingSource;
use crate::core::probe::MonitorDeps;
use crate::core::settings::MonitorSettings;
use crate::error::{RelayError, Result};
use crate::relay::transport::{Transport, TransportResponse};

// =============================================================================
// Static Transport
// =============================================================================

/// One request captured by [`StaticTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

enum Reply {
    Status(u16, String),
    Failure(String),
}

/// In-process transport edge that replies with one canned response and
/// records every request it sees.
pub struct StaticTransport {
    reply: Reply,
    calls: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl StaticTransport {
    /// Reply 200 with an OpenAI-shaped usage body.
    #[must_use]
    pub fn ok_chat(prompt_tokens: i64, completion_tokens: i64) -> Self {
        let body = json!({
            "id": "chatcmpl-test",
            "choices": [{"message": {"role": "assistant", "content": "hello"}}],
            "usage": {
                "prompt_tokens": prompt_tokens,
                "completion_tokens": completion_tokens,
                "total_tokens": prompt_tokens + completion_tokens
            }
        });
        Self::status(200, &body.to_string())
    }

    /// Reply with a fixed status and raw body.
    #[must_use]
    pub fn status(status: u16, body: &str) -> Self {
        Self {
            reply: Reply::Status(status, body.to_string()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call with a transport error.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            reply: Reply::Failure(message.to_string()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of requests issued through this transport.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Snapshot of all captured requests.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("transport lock poisoned").clone()
    }
}

#[async_trait]
impl Transport for StaticTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
    ) -> Result<TransportResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("transport lock poisoned")
            .push(RecordedRequest {
                url: url.to_string(),
                headers: headers.to_vec(),
                body: body.clone(),
            });
        match &self.reply {
            Reply::Status(status, body) => Ok(TransportResponse {
                status: *status,
                body: body.clone(),
            }),
            Reply::Failure(message) => Err(RelayError::Transport {
                message: message.clone(),
            }),
        }
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Fully wired in-memory dependency bundle; the concrete stores stay
/// visible so tests can seed and inspect them.
pub struct TestHarness {
    pub channels: Arc<MemoryChannelStore>,
    pub aliases: Arc<MemoryModelMapper>,
    pub overrides: Arc<MemoryOverrideStore>,
    pub pricing: Arc<MemoryPricingSource>,
    pub audit: Arc<MemoryAuditSink>,
    pub settings: Arc<MonitorSettings>,
    pub deps: MonitorDeps,
}

/// Build a harness around the given transport edge.
#[must_use]
pub fn make_test_deps(transport: Arc<dyn Transport>) -> TestHarness {
    let channels = Arc::new(MemoryChannelStore::new());
    let aliases = Arc::new(MemoryModelMapper::new());
    let overrides = Arc::new(MemoryOverrideStore::new());
    let pricing = Arc::new(MemoryPricingSource::new());
    let audit = Arc::new(MemoryAuditSink::new());
    let settings = Arc::new(MonitorSettings::default());

    let deps = MonitorDeps {
        channels: channels.clone(),
        groups: Arc::new(StaticGroupResolver::default()),
        aliases: aliases.clone(),
        overrides: overrides.clone(),
        pricing: pricing.clone(),
        policy: Arc::new(DefaultBanPolicy::new()),
        audit: audit.clone(),
        notifier: Arc::new(LogNotifier),
        transport,
        settings: settings.clone(),
    };

    TestHarness {
        channels,
        aliases,
        overrides,
        pricing,
        audit,
        settings,
        deps,
    }
}

/// An enabled test channel with a stored test model.
#[must_use]
pub fn make_test_channel(id: i64, channel_type: ChannelType) -> Channel {
    Channel {
        id,
        name: format!("test-channel-{id}"),
        channel_type,
        status: ChannelStatus::Enabled,
        auto_ban: true,
        test_model: Some("gpt-4o-mini".to_string()),
        base_url: "https://api.example.com".to_string(),
        api_key: Some("sk-test".to_string()),
        response_time_ms: 0,
    }
}
