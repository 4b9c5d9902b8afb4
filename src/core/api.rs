//! Operator-facing operations behind the daemon's HTTP surface.
//!
//! Three entry points: preview the probe body for a model, test one
//! channel, and kick off a fleet sweep. Each returns a serializable report;
//! HTTP status mapping lives in the daemon.

use std::time::Instant;

use serde::Serialize;

use crate::core::channel::{ChannelStore, ChannelType};
use crate::core::endpoint;
use crate::core::fleet::FleetTester;
use crate::core::probe::{self, MonitorDeps, TestOutcome};
use crate::core::request::build_probe_request;
use crate::error::{RelayError, Result};

// =============================================================================
// Template Preview
// =============================================================================

/// Synthesized probe body preview for one model.
#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    /// Pretty-printed canonical probe body.
    pub test_request_body: String,
    /// Canonical request family the body belongs to.
    #[serde(rename = "type")]
    pub request_type: String,
}

/// Preview the probe body that would be synthesized for `model`.
///
/// `endpoint_hint` forces the endpoint family; empty means auto-detect.
/// The preview uses provider-neutral detection, so it shows the canonical
/// body before any per-channel translation.
pub fn probe_template(model: &str, endpoint_hint: &str) -> Result<TemplateResponse> {
    let model = model.trim();
    if model.is_empty() {
        return Err(RelayError::InvalidArgument {
            message: "model name is required".to_string(),
        });
    }

    let resolved = endpoint::resolve(endpoint_hint, model, ChannelType::OpenAI);
    let request = build_probe_request(model, resolved.mode);
    Ok(TemplateResponse {
        test_request_body: request.to_pretty_json()?,
        request_type: request.variant_name().to_string(),
    })
}

// =============================================================================
// Single-Channel Test
// =============================================================================

/// Outcome report for one on-demand channel test.
#[derive(Debug, Serialize)]
pub struct TestReport {
    pub success: bool,
    pub message: String,
    /// End-to-end probe time in seconds; 0 for skipped probes.
    pub time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
}

/// Probe one channel on demand.
///
/// `model` and `endpoint_hint` override the channel's stored test model and
/// endpoint auto-detection; empty strings mean "use the stored defaults".
pub async fn test_channel(
    deps: &MonitorDeps,
    channel_id: i64,
    model: &str,
    endpoint_hint: &str,
) -> Result<TestReport> {
    let channel = deps
        .channels
        .get(channel_id)
        .ok_or_else(|| RelayError::InvalidArgument {
            message: format!("channel {channel_id} not found"),
        })?;

    let model_hint = Some(model).filter(|m| !m.trim().is_empty());
    let started = Instant::now();
    let outcome = probe::probe_channel(deps, &channel, model_hint, endpoint_hint).await;
    let elapsed = started.elapsed();

    match outcome {
        TestOutcome::Succeeded { .. } => {
            #[allow(clippy::cast_possible_truncation)]
            deps.channels
                .record_response_time(channel_id, elapsed.as_millis() as i64);
            Ok(TestReport {
                success: true,
                message: String::new(),
                time: elapsed.as_secs_f64(),
                skipped: None,
            })
        }
        TestOutcome::Skipped => Ok(TestReport {
            success: true,
            message: "channel has no test model configured; test skipped".to_string(),
            time: 0.0,
            skipped: Some(true),
        }),
        TestOutcome::Failed(err) => {
            // Classified upstream failures still took measurable time.
            #[allow(clippy::cast_possible_truncation)]
            deps.channels
                .record_response_time(channel_id, elapsed.as_millis() as i64);
            Ok(TestReport {
                success: false,
                message: err.to_string(),
                time: elapsed.as_secs_f64(),
                skipped: None,
            })
        }
    }
}

// =============================================================================
// Fleet Sweep
// =============================================================================

/// Acknowledgement for a fleet sweep request.
#[derive(Debug, Serialize)]
pub struct SweepReport {
    pub success: bool,
    pub message: String,
}

/// Start a background sweep over every channel.
///
/// Returns as soon as the sweep is claimed; a sweep already in flight is
/// rejected with [`RelayError::SweepAlreadyRunning`].
pub fn test_all_channels(fleet: &std::sync::Arc<FleetTester>) -> Result<SweepReport> {
    fleet.run_all(true)?;
    Ok(SweepReport {
        success: true,
        message: "channel test started".to_string(),
    })
}
