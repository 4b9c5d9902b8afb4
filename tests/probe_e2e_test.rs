//! End-to-end probe tests against a wiremock upstream.
//!
//! Each test wires the in-memory dependency bundle to the real HTTP
//! transport and points a channel at a mock provider, verifying:
//! - provider-correct wire paths, headers, and bodies
//! - usage normalization and quota audit rows
//! - failure classification from non-success responses

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use relaymon::core::channel::{ChannelStore, ChannelType};
use relaymon::core::fleet::FleetTester;
use relaymon::core::pricing::PriceData;
use relaymon::core::probe::{TestOutcome, probe_channel};
use relaymon::core::settings::MonitorConfig;
use relaymon::error::RelayError;
use relaymon::relay::transport::HttpTransport;
use relaymon::test_utils::{TestHarness, make_test_channel, make_test_deps};

fn live_harness() -> TestHarness {
    let transport = Arc::new(HttpTransport::with_defaults().expect("client build"));
    make_test_deps(transport)
}

// =============================================================================
// OpenAI Family
// =============================================================================

#[tokio::test]
async fn openai_probe_round_trips_usage_into_an_audit_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "choices": [{"message": {"role": "assistant", "content": "hello"}}],
            "usage": {"prompt_tokens": 8, "completion_tokens": 3, "total_tokens": 11}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = live_harness();
    harness.pricing.insert(
        "gpt-4o-mini",
        PriceData {
            model_ratio: 2.0,
            completion_ratio: 2.0,
            ..PriceData::default()
        },
    );
    let mut channel = make_test_channel(1, ChannelType::OpenAI);
    channel.base_url = server.uri();

    let outcome = probe_channel(&harness.deps, &channel, None, "").await;
    assert!(matches!(outcome, TestOutcome::Succeeded { .. }));

    let entries = harness.audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].prompt_tokens, 8);
    assert_eq!(entries[0].completion_tokens, 3);
    // round(3 * 2.0) = 6; (8 + 6) * 2.0 = 28
    assert_eq!(entries[0].quota, 28);
    assert_eq!(entries[0].error, None);
}

#[tokio::test]
async fn missing_usage_in_a_success_response_fails_the_probe() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "choices": [{"message": {"role": "assistant", "content": "hello"}}]
        })))
        .mount(&server)
        .await;

    let harness = live_harness();
    let mut channel = make_test_channel(1, ChannelType::OpenAI);
    channel.base_url = server.uri();

    let outcome = probe_channel(&harness.deps, &channel, None, "").await;
    assert!(matches!(
        outcome.failure(),
        Some(RelayError::BadResponseBody { .. })
    ));
    assert_eq!(harness.audit.entries()[0].quota, 0);
}

#[tokio::test]
async fn probe_override_replaces_the_synthesized_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [{"role": "user", "content": "ping"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "usage": {"prompt_tokens": 1, "completion_tokens": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = live_harness();
    harness.overrides.insert(
        "gpt-4o-mini",
        r#"{"model":"something-else","messages":[{"role":"user","content":"ping"}],"max_tokens":1}"#,
    );
    let mut channel = make_test_channel(1, ChannelType::OpenAI);
    channel.base_url = server.uri();

    let outcome = probe_channel(&harness.deps, &channel, None, "").await;
    assert!(matches!(outcome, TestOutcome::Succeeded { .. }));
}

#[tokio::test]
async fn embedding_models_probe_the_embeddings_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({"input": ["hello world"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "usage": {"prompt_tokens": 2, "completion_tokens": 0}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = live_harness();
    let mut channel = make_test_channel(1, ChannelType::OpenAI);
    channel.base_url = server.uri();

    let outcome = probe_channel(&harness.deps, &channel, Some("text-embedding-3-small"), "").await;
    assert!(matches!(outcome, TestOutcome::Succeeded { .. }));
}

// =============================================================================
// Claude / Gemini
// =============================================================================

#[tokio::test]
async fn claude_probe_hits_messages_with_version_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(header("x-api-key", "sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "hi"}],
            "usage": {"input_tokens": 10, "output_tokens": 4}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = live_harness();
    let mut channel = make_test_channel(1, ChannelType::Anthropic);
    channel.base_url = server.uri();

    let outcome = probe_channel(&harness.deps, &channel, Some("claude-sonnet-4"), "").await;
    assert!(matches!(outcome, TestOutcome::Succeeded { .. }));
    let entries = harness.audit.entries();
    assert_eq!(entries[0].prompt_tokens, 10);
    assert_eq!(entries[0].completion_tokens, 4);
}

#[tokio::test]
async fn gemini_probe_embeds_the_model_in_the_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(header("x-goog-api-key", "sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 7}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = live_harness();
    let mut channel = make_test_channel(1, ChannelType::Gemini);
    channel.base_url = server.uri();

    let outcome = probe_channel(&harness.deps, &channel, Some("gemini-2.0-flash"), "").await;
    assert!(matches!(outcome, TestOutcome::Succeeded { .. }));
}

// =============================================================================
// Failure Classification
// =============================================================================

#[tokio::test]
async fn provider_error_message_is_classified_and_audited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": {"message": "The server is overloaded", "type": "server_error"}
        })))
        .mount(&server)
        .await;

    let harness = live_harness();
    let mut channel = make_test_channel(1, ChannelType::OpenAI);
    channel.base_url = server.uri();

    let outcome = probe_channel(&harness.deps, &channel, None, "").await;
    let failure = outcome.failure().expect("expected failure");
    assert!(matches!(failure, RelayError::BadResponse { status: 503, .. }));
    assert!(failure.to_string().contains("The server is overloaded"));

    let entries = harness.audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].quota, 0);
    assert!(
        entries[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("The server is overloaded"))
    );
}

#[tokio::test]
async fn unreachable_upstream_is_a_transport_failure() {
    let transport =
        Arc::new(HttpTransport::new(std::time::Duration::from_millis(300)).expect("client build"));
    let harness = make_test_deps(transport);
    let mut channel = make_test_channel(1, ChannelType::OpenAI);
    // Reserved TEST-NET-1 address; nothing listens there.
    channel.base_url = "http://192.0.2.1:9".to_string();

    let outcome = probe_channel(&harness.deps, &channel, None, "").await;
    assert!(matches!(
        outcome.failure(),
        Some(RelayError::Transport { .. } | RelayError::Timeout { .. })
    ));
    assert_eq!(harness.audit.len(), 1);
}

// =============================================================================
// Fleet Sweep Over Live Transport
// =============================================================================

#[tokio::test]
async fn sweep_disables_the_dead_credential_and_keeps_the_healthy_channel() {
    let good = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "usage": {"prompt_tokens": 1, "completion_tokens": 1}
        })))
        .mount(&good)
        .await;

    let bad = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "invalid api key"}
        })))
        .mount(&bad)
        .await;

    let harness = live_harness();
    harness.settings.update(MonitorConfig {
        request_interval_ms: 0,
        ..MonitorConfig::default()
    });
    let mut healthy = make_test_channel(1, ChannelType::OpenAI);
    healthy.base_url = good.uri();
    harness.channels.upsert(healthy);
    let mut dead = make_test_channel(2, ChannelType::OpenAI);
    dead.base_url = bad.uri();
    harness.channels.upsert(dead);

    let fleet = FleetTester::new(harness.deps.clone());
    let summary = fleet.run_blocking(false).await.expect("sweep claim");

    assert_eq!(summary.tested, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.disabled, 1);
    assert!(harness.channels.get(1).unwrap().status.is_enabled());
    assert!(!harness.channels.get(2).unwrap().status.is_enabled());
    // One audit row per tested channel.
    assert_eq!(harness.audit.len(), 2);
}
