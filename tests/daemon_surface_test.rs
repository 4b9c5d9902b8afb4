//! Integration tests for the daemon surface: config wiring plus the three
//! operator-facing operations.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use relaymon::core::api;
use relaymon::core::channel::ChannelStore;
use relaymon::daemon;
use relaymon::error::RelayError;
use relaymon::relay::transport::HttpTransport;
use relaymon::storage::DaemonConfig;

fn config_pointing_at(base_url: &str) -> DaemonConfig {
    let raw = format!(
        r#"
[monitor]
request_interval_ms = 0

[[channel]]
id = 1
name = "primary"
type = "openai"
base_url = "{base_url}"
api_key = "sk-test"
test_model = "gpt-4o-mini"

[pricing."gpt-4o-mini"]
model_ratio = 2.0
"#
    );
    toml::from_str(&raw).expect("config parse")
}

// =============================================================================
// Template Endpoint
// =============================================================================

#[test]
fn template_previews_the_synthesized_body() {
    let template = api::probe_template("gpt-4o-mini", "").expect("template");
    assert_eq!(template.request_type, "chat_completions");
    let body: serde_json::Value =
        serde_json::from_str(&template.test_request_body).expect("valid json");
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["messages"][0]["content"], "hi");
    assert_eq!(body["max_tokens"], 16);
}

#[test]
fn template_honors_the_endpoint_hint() {
    let template = api::probe_template("gpt-4o-mini", "embeddings").expect("template");
    assert_eq!(template.request_type, "embeddings");

    let template = api::probe_template("gpt-4o-mini", "openai-response").expect("template");
    assert_eq!(template.request_type, "responses");
}

// =============================================================================
// Single-Channel Endpoint
// =============================================================================

#[tokio::test]
async fn configured_channel_tests_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "usage": {"prompt_tokens": 4, "completion_tokens": 2}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_pointing_at(&server.uri());
    let transport = Arc::new(HttpTransport::with_defaults().expect("client build"));
    let state = daemon::build_state(&config, transport).expect("state");

    let report = api::test_channel(&state.deps, 1, "", "").await.expect("report");
    assert!(report.success);
    assert!(report.time >= 0.0);
    assert!(state.deps.channels.get(1).unwrap().response_time_ms >= 0);
}

#[tokio::test]
async fn unknown_channel_is_rejected_before_any_probe() {
    let config = config_pointing_at("http://127.0.0.1:1");
    let transport = Arc::new(HttpTransport::with_defaults().expect("client build"));
    let state = daemon::build_state(&config, transport).expect("state");

    let err = api::test_channel(&state.deps, 99, "", "").await.unwrap_err();
    assert!(matches!(err, RelayError::InvalidArgument { .. }));
}

// =============================================================================
// Fleet Endpoint
// =============================================================================

#[tokio::test]
async fn fleet_endpoint_acknowledges_then_rejects_concurrent_sweeps() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "usage": {"prompt_tokens": 1, "completion_tokens": 1}
                }))
                .set_delay(std::time::Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let config = config_pointing_at(&server.uri());
    let transport = Arc::new(HttpTransport::with_defaults().expect("client build"));
    let state = daemon::build_state(&config, transport).expect("state");

    let first = api::test_all_channels(&state.fleet).expect("first sweep starts");
    assert!(first.success);

    // The delayed upstream keeps the first sweep in flight.
    let second = api::test_all_channels(&state.fleet);
    assert!(matches!(second, Err(RelayError::SweepAlreadyRunning)));

    while state.fleet.is_running() {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(api::test_all_channels(&state.fleet).is_ok());
}
