//! Channel health monitor.
//!
//! Runs one end-to-end probe against one channel: resolve the endpoint,
//! synthesize or override the canonical request, map the model name, look
//! up pricing, dispatch through the translation strategy, and classify the
//! outcome. Exactly one audit row is written per non-skipped probe,
//! success or failure, from a single finalization point.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::core::audit::{AuditEntry, AuditSink, PROBE_CONTENT, PROBE_FAILED_CONTENT};
use crate::core::channel::{
    Channel, ChannelStore, GroupResolver, ModelMapper, Notifier, OverrideStore,
};
use crate::core::endpoint;
use crate::core::policy::BanPolicy;
use crate::core::pricing::{PricingSource, compute_quota};
use crate::core::request::{CanonicalRequest, build_probe_request, parse_override};
use crate::core::settings::MonitorSettings;
use crate::core::usage::NormalizedUsage;
use crate::error::{RelayError, Result};
use crate::relay::transport::Transport;
use crate::relay::{self, RelayContext};

// =============================================================================
// Dependencies
// =============================================================================

/// External collaborators the monitor and orchestrator depend on.
///
/// All members are narrow trait objects; the core owns no persistence.
#[derive(Clone)]
pub struct MonitorDeps {
    pub channels: Arc<dyn ChannelStore>,
    pub groups: Arc<dyn GroupResolver>,
    pub aliases: Arc<dyn ModelMapper>,
    pub overrides: Arc<dyn OverrideStore>,
    pub pricing: Arc<dyn PricingSource>,
    pub policy: Arc<dyn BanPolicy>,
    pub audit: Arc<dyn AuditSink>,
    pub notifier: Arc<dyn Notifier>,
    pub transport: Arc<dyn Transport>,
    pub settings: Arc<MonitorSettings>,
}

// =============================================================================
// Test Outcome
// =============================================================================

/// Terminal state of one probe.
#[derive(Debug)]
pub enum TestOutcome {
    /// No test model configured or derivable; not an error.
    Skipped,
    /// The probe failed with a classified cause.
    Failed(RelayError),
    /// The probe completed; the provider answered with usable usage.
    Succeeded {
        /// End-to-end elapsed time of the probe.
        elapsed: Duration,
    },
}

impl TestOutcome {
    /// Whether this probe was skipped.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// The classified failure, when the probe failed.
    #[must_use]
    pub const fn failure(&self) -> Option<&RelayError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

// =============================================================================
// Probe Execution
// =============================================================================

/// Per-probe execution state; isolated so one probe's state never leaks
/// into another's.
struct ProbeSession<'a> {
    deps: &'a MonitorDeps,
    channel: &'a Channel,
    /// Current model name; rewritten in place after alias mapping.
    model: String,
    group: String,
    is_stream: bool,
}

impl ProbeSession<'_> {
    async fn run(&mut self, endpoint_hint: &str) -> Result<(NormalizedUsage, i64)> {
        let resolved = endpoint::resolve(endpoint_hint, &self.model, self.channel.channel_type);

        let mut request = build_probe_request(&self.model, resolved.mode);
        if let Some(body) = self.deps.overrides.probe_override(&self.model)? {
            request = parse_override(&body, &self.model, resolved.format)?;
        }

        self.group = self.deps.groups.probe_group()?;

        if let Some(upstream) = self.deps.aliases.map(self.channel, &self.model)? {
            self.model = upstream;
            request.set_model(&self.model);
        }
        if let CanonicalRequest::ChatCompletion(chat) = &request {
            self.is_stream = chat.stream;
        }

        let price = self.deps.pricing.price(self.channel, &self.model)?;

        let strategy = relay::strategy_for(self.channel.channel_type).ok_or_else(|| {
            RelayError::Dispatch {
                channel_type: self.channel.channel_type.display_name().to_string(),
            }
        })?;

        let cx = RelayContext {
            base_url: self.channel.base_url.clone(),
            api_key: self.channel.api_key.clone(),
            upstream_model: self.model.clone(),
            path: resolved.path,
            format: resolved.format,
            mode: resolved.mode,
        };
        let wire = relay::convert_request(strategy, &request, &cx)?;

        tracing::info!(
            channel_id = self.channel.id,
            channel = %self.channel.name,
            model = %self.model,
            strategy = strategy.name(),
            path = resolved.path,
            "testing channel"
        );

        let response = relay::issue(&wire, self.deps.transport.as_ref()).await?;
        if !response.is_success() {
            let cause = self
                .deps
                .policy
                .classify_response(response.status, &response.body);
            tracing::error!(
                channel_id = self.channel.id,
                channel = %self.channel.name,
                model = %self.model,
                status = response.status,
                cause = %cause,
                "channel test bad response"
            );
            return Err(RelayError::BadResponse {
                status: response.status,
                message: cause,
            });
        }

        let usage = strategy.normalize(&response.json())?;
        let quota = compute_quota(&usage, &price);
        Ok((usage, quota))
    }
}

/// Run one probe against one channel.
///
/// `model_hint` overrides the channel's stored test model; `endpoint_hint`
/// overrides endpoint auto-detection. With neither a hint nor a stored test
/// model the probe is skipped, never failed.
pub async fn probe_channel(
    deps: &MonitorDeps,
    channel: &Channel,
    model_hint: Option<&str>,
    endpoint_hint: &str,
) -> TestOutcome {
    if !channel.channel_type.supports_testing() {
        return TestOutcome::Failed(RelayError::UnsupportedChannel {
            channel_type: channel.channel_type.display_name().to_string(),
        });
    }

    let model = match model_hint.map(str::trim).filter(|m| !m.is_empty()) {
        Some(m) => m.to_string(),
        None => match channel.stored_test_model() {
            Some(m) => m.to_string(),
            None => return TestOutcome::Skipped,
        },
    };

    let started = Instant::now();
    let mut session = ProbeSession {
        deps,
        channel,
        model,
        group: String::new(),
        is_stream: false,
    };
    let result = session.run(endpoint_hint).await;
    let elapsed = started.elapsed();

    // Single audit finalization point: one row per non-skipped probe,
    // whichever step failed.
    #[allow(clippy::cast_possible_wrap)]
    let use_time_seconds = elapsed.as_secs() as i64;
    match result {
        Ok((usage, quota)) => {
            deps.audit.record(AuditEntry {
                channel_id: channel.id,
                model_name: session.model.clone(),
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                quota,
                content: PROBE_CONTENT.to_string(),
                use_time_seconds,
                is_stream: session.is_stream,
                group: session.group.clone(),
                error: None,
                created_at: Utc::now(),
            });
            tracing::info!(
                channel_id = channel.id,
                model = %session.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                quota,
                elapsed_ms = elapsed.as_millis() as u64,
                "channel test succeeded"
            );
            TestOutcome::Succeeded { elapsed }
        }
        Err(err) => {
            deps.audit.record(AuditEntry {
                channel_id: channel.id,
                model_name: session.model.clone(),
                prompt_tokens: 0,
                completion_tokens: 0,
                quota: 0,
                content: PROBE_FAILED_CONTENT.to_string(),
                use_time_seconds,
                is_stream: false,
                group: session.group.clone(),
                error: Some(err.to_string()),
                created_at: Utc::now(),
            });
            tracing::warn!(
                channel_id = channel.id,
                model = %session.model,
                code = err.code(),
                error = %err,
                "channel test failed"
            );
            TestOutcome::Failed(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::channel::ChannelType;
    use crate::test_utils::{StaticTransport, make_test_channel, make_test_deps};

    #[tokio::test]
    async fn unsupported_channel_type_never_calls_the_network() {
        let transport = Arc::new(StaticTransport::ok_chat(1, 1));
        let harness = make_test_deps(transport.clone());
        let channel = make_test_channel(1, ChannelType::Midjourney);

        let outcome = probe_channel(&harness.deps, &channel, Some("some-model"), "").await;
        let failure = outcome.failure().expect("expected failure");
        assert!(failure.to_string().contains("Midjourney"));
        assert_eq!(transport.calls(), 0);
        // Unsupported-provider rejection happens before model resolution,
        // so no audit row is written.
        assert!(harness.audit.is_empty());
    }

    #[tokio::test]
    async fn missing_test_model_skips_instead_of_failing() {
        let harness = make_test_deps(Arc::new(StaticTransport::ok_chat(10, 5)));
        let mut channel = make_test_channel(1, ChannelType::OpenAI);
        channel.test_model = None;

        let outcome = probe_channel(&harness.deps, &channel, None, "").await;
        assert!(outcome.is_skipped());
        assert!(harness.audit.is_empty());
    }

    #[tokio::test]
    async fn successful_probe_records_one_audit_row_with_quota() {
        let harness = make_test_deps(Arc::new(StaticTransport::ok_chat(100, 50)));
        let channel = make_test_channel(1, ChannelType::OpenAI);

        let outcome = probe_channel(&harness.deps, &channel, Some("gpt-4o-mini"), "").await;
        assert!(matches!(outcome, TestOutcome::Succeeded { .. }));

        let entries = harness.audit.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].prompt_tokens, 100);
        assert_eq!(entries[0].completion_tokens, 50);
        // Default pricing: ratios of 1.0 -> quota 150.
        assert_eq!(entries[0].quota, 150);
        assert_eq!(entries[0].error, None);
        assert_eq!(entries[0].content, PROBE_CONTENT);
        assert_eq!(entries[0].group, "default");
    }

    #[tokio::test]
    async fn alias_mapping_rewrites_the_audited_model_name() {
        let transport = Arc::new(StaticTransport::ok_chat(1, 1));
        let harness = make_test_deps(transport.clone());
        let channel = make_test_channel(1, ChannelType::OpenAI);
        harness.aliases.insert(1, "gpt-4o-mini", "upstream-gpt");

        let outcome = probe_channel(&harness.deps, &channel, Some("gpt-4o-mini"), "").await;
        assert!(matches!(outcome, TestOutcome::Succeeded { .. }));
        assert_eq!(harness.audit.entries()[0].model_name, "upstream-gpt");
        // The rewritten name is also what went over the wire.
        assert_eq!(transport.requests()[0].body["model"], "upstream-gpt");
    }

    #[tokio::test]
    async fn bad_override_fails_the_probe_before_any_network_call() {
        let transport = Arc::new(StaticTransport::ok_chat(1, 1));
        let harness = make_test_deps(transport.clone());
        let channel = make_test_channel(1, ChannelType::OpenAI);
        harness.overrides.insert("gpt-4o-mini", "{not json");

        let outcome = probe_channel(&harness.deps, &channel, Some("gpt-4o-mini"), "").await;
        assert!(matches!(
            outcome.failure(),
            Some(RelayError::OverrideParse { .. })
        ));
        assert_eq!(transport.calls(), 0);
        // The failed probe still writes its single audit row.
        assert_eq!(harness.audit.len(), 1);
        assert_eq!(harness.audit.entries()[0].quota, 0);
    }

    #[tokio::test]
    async fn failed_probe_audit_row_carries_the_classified_cause() {
        let body = r#"{"error":{"message":"The server is overloaded"}}"#;
        let harness = make_test_deps(Arc::new(StaticTransport::status(503, body)));
        let channel = make_test_channel(1, ChannelType::OpenAI);

        let outcome = probe_channel(&harness.deps, &channel, None, "").await;
        let failure = outcome.failure().expect("expected failure");
        assert!(failure.to_string().contains("The server is overloaded"));

        let entries = harness.audit.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content, PROBE_FAILED_CONTENT);
        assert_eq!(entries[0].prompt_tokens, 0);
        assert_eq!(entries[0].quota, 0);
        assert!(
            entries[0]
                .error
                .as_deref()
                .is_some_and(|e| e.contains("The server is overloaded"))
        );
    }

    #[tokio::test]
    async fn transport_failure_is_a_probe_failure() {
        let harness = make_test_deps(Arc::new(StaticTransport::failing("connection refused")));
        let channel = make_test_channel(1, ChannelType::OpenAI);

        let outcome = probe_channel(&harness.deps, &channel, None, "").await;
        assert!(matches!(
            outcome.failure(),
            Some(RelayError::Transport { .. })
        ));
        assert_eq!(harness.audit.len(), 1);
    }
}
