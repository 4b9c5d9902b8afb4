//! Ban policy and response-error classification.
//!
//! The health monitor surfaces classified outcomes; whether a failure flips
//! channel status is decided here, behind the [`BanPolicy`] boundary, so
//! deployments can swap in their own rules.

use serde_json::Value;

use crate::core::channel::{ChannelStatus, ChannelType};
use crate::error::RelayError;

/// External response-error classifier and enable/disable policy.
pub trait BanPolicy: Send + Sync {
    /// Extract a human-readable cause from a non-success provider response.
    fn classify_response(&self, status: u16, body: &str) -> String;

    /// Whether this failure should disable the channel that produced it.
    fn should_disable(&self, channel_type: ChannelType, failure: &RelayError) -> bool;

    /// Whether a currently disabled channel should be re-enabled, given the
    /// ban decision for its latest probe.
    fn should_enable(&self, status: ChannelStatus, should_ban: bool) -> bool;
}

// =============================================================================
// Default Policy
// =============================================================================

/// Body substrings that indicate a dead credential or account rather than a
/// transient provider fault.
const FATAL_BODY_MARKERS: &[&str] = &[
    "invalid api key",
    "incorrect api key",
    "account is not active",
    "organization has been disabled",
    "insufficient quota",
    "insufficient balance",
    "balance is insufficient",
    "credit",
    "billing",
];

/// Default heuristic policy.
///
/// Authentication and quota failures disable; transient transport errors
/// and server-side 5xx do not. Only auto-disabled channels are eligible for
/// automatic re-enable.
#[derive(Debug, Default, Clone)]
pub struct DefaultBanPolicy;

impl DefaultBanPolicy {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl BanPolicy for DefaultBanPolicy {
    fn classify_response(&self, status: u16, body: &str) -> String {
        // Providers disagree on error envelopes; try the common shapes
        // before falling back to the raw body.
        let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
        let message = parsed
            .pointer("/error/message")
            .or_else(|| parsed.pointer("/error"))
            .or_else(|| parsed.pointer("/message"))
            .and_then(Value::as_str)
            .map(str::to_string);

        message.map_or_else(
            || {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("upstream returned status {status} with an empty body")
                } else {
                    let mut cause = trimmed.chars().take(200).collect::<String>();
                    if trimmed.chars().count() > 200 {
                        cause.push('…');
                    }
                    cause
                }
            },
            |m| m,
        )
    }

    fn should_disable(&self, _channel_type: ChannelType, failure: &RelayError) -> bool {
        match failure {
            RelayError::BadResponse { status, message } => {
                if matches!(status, 401 | 403) {
                    return true;
                }
                let lower = message.to_lowercase();
                FATAL_BODY_MARKERS.iter().any(|marker| lower.contains(marker))
            }
            // Network faults and missing usage are transient or local; the
            // next sweep gets another look.
            RelayError::Transport { .. }
            | RelayError::Timeout { .. }
            | RelayError::BadResponseBody { .. } => false,
            // Local configuration defects never ban the upstream.
            _ => false,
        }
    }

    fn should_enable(&self, status: ChannelStatus, should_ban: bool) -> bool {
        status == ChannelStatus::AutoDisabled && !should_ban
    }
}
