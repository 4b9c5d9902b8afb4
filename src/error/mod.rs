//! Error types for relaymon.
//!
//! Uses `thiserror` for structured error types with stable codes.
//!
//! ## Error Taxonomy
//!
//! Every probe failure is classified into one of these categories:
//! - **Input**: malformed caller input (missing channel id, empty model name)
//! - **Configuration**: probe context bootstrap failures (group resolution)
//! - **Resolution**: relay-info generation, model mapping, or pricing lookup
//! - **Dispatch**: no translation strategy registered for the channel type
//! - **Conversion**: canonical request variant mismatch or rejected payload
//! - **Network**: the outbound call itself failed (connect, timeout)
//! - **Provider**: the upstream answered, but with an error or unusable body
//! - **Internal**: unexpected errors, bugs, or unclassified issues
//!
//! A probe skip (no test model resolvable) is deliberately *not* an error;
//! it is surfaced as [`crate::core::probe::TestOutcome::Skipped`].

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and ban-policy routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed caller input at the API boundary.
    Input,
    /// Probe context bootstrap failures.
    Configuration,
    /// Endpoint/model/pricing resolution failures.
    Resolution,
    /// No translation strategy for the channel type.
    Dispatch,
    /// Request variant mismatch or rejected conversion.
    Conversion,
    /// Outbound transport failures (connect, DNS, timeout).
    Network,
    /// Upstream provider errors (bad status, missing usage).
    Provider,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Input => "Invalid input",
            Self::Configuration => "Configuration error",
            Self::Resolution => "Resolution error",
            Self::Dispatch => "Dispatch error",
            Self::Conversion => "Conversion error",
            Self::Network => "Network error",
            Self::Provider => "Provider error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Input => "I",
            Self::Configuration => "C",
            Self::Resolution => "R",
            Self::Dispatch => "D",
            Self::Conversion => "V",
            Self::Network => "N",
            Self::Provider => "P",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Error Type
// =============================================================================

/// Main error type for relaymon operations.
///
/// Each variant has a stable error code (e.g., `RM-P001`) and a category
/// used by the ban policy to decide whether a failure should disable the
/// channel that produced it.
#[derive(Error, Debug)]
pub enum RelayError {
    // ==========================================================================
    // Input errors (Category: Input)
    // ==========================================================================
    /// Malformed caller input at the API boundary.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Probe context bootstrap failed (e.g. group resolution).
    #[error("probe context setup failed: {message}")]
    Configuration { message: String },

    // ==========================================================================
    // Resolution errors (Category: Resolution)
    // ==========================================================================
    /// Relay info could not be generated for the resolved endpoint.
    #[error("relay resolution failed: {message}")]
    Resolution { message: String },

    /// The model-alias collaborator rejected the mapping.
    #[error("model mapping failed for {model}: {message}")]
    ModelMapping { model: String, message: String },

    /// Pricing lookup failed for the (channel, model) pair.
    #[error("pricing lookup failed for {model}: {message}")]
    Pricing { model: String, message: String },

    // ==========================================================================
    // Dispatch errors (Category: Dispatch)
    // ==========================================================================
    /// The channel type is excluded from testing entirely.
    #[error("{channel_type} channel test is not supported")]
    UnsupportedChannel { channel_type: String },

    /// No translation strategy is registered for the channel type.
    #[error("no translation strategy for channel type {channel_type}")]
    Dispatch { channel_type: String },

    // ==========================================================================
    // Conversion errors (Category: Conversion)
    // ==========================================================================
    /// The canonical request variant does not match the relay mode, or the
    /// strategy rejected the payload.
    #[error("request conversion failed: {message}")]
    Conversion { message: String },

    /// A stored probe override body could not be decoded into the resolved
    /// request variant.
    #[error("probe override is not valid for the resolved request type: {message}")]
    OverrideParse { message: String },

    // ==========================================================================
    // Network errors (Category: Network)
    // ==========================================================================
    /// The outbound call failed before a response was received.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The outbound call timed out.
    #[error("request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    // ==========================================================================
    // Provider errors (Category: Provider)
    // ==========================================================================
    /// The provider returned a non-success status; the message carries the
    /// classifier's human-readable cause.
    #[error("upstream returned status {status}: {message}")]
    BadResponse { status: u16, message: String },

    /// The provider returned success but omitted usage information.
    #[error("upstream response is missing usage data: {message}")]
    BadResponseBody { message: String },

    // ==========================================================================
    // Internal errors (Category: Internal)
    // ==========================================================================
    /// A fleet sweep is already in flight.
    #[error("channel test already running")]
    SweepAlreadyRunning,

    /// Serialization of an internal value failed.
    #[error("serialization failed: {message}")]
    Serialize { message: String },
}

impl RelayError {
    /// Returns the category for this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidArgument { .. } => ErrorCategory::Input,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Resolution { .. } | Self::ModelMapping { .. } | Self::Pricing { .. } => {
                ErrorCategory::Resolution
            }
            Self::UnsupportedChannel { .. } | Self::Dispatch { .. } => ErrorCategory::Dispatch,
            Self::Conversion { .. } | Self::OverrideParse { .. } => ErrorCategory::Conversion,
            Self::Transport { .. } | Self::Timeout { .. } => ErrorCategory::Network,
            Self::BadResponse { .. } | Self::BadResponseBody { .. } => ErrorCategory::Provider,
            Self::SweepAlreadyRunning | Self::Serialize { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the stable error code (e.g., `RM-P001`).
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "RM-I001",
            Self::Configuration { .. } => "RM-C001",
            Self::Resolution { .. } => "RM-R001",
            Self::ModelMapping { .. } => "RM-R002",
            Self::Pricing { .. } => "RM-R003",
            Self::UnsupportedChannel { .. } => "RM-D001",
            Self::Dispatch { .. } => "RM-D002",
            Self::Conversion { .. } => "RM-V001",
            Self::OverrideParse { .. } => "RM-V002",
            Self::Transport { .. } => "RM-N001",
            Self::Timeout { .. } => "RM-N002",
            Self::BadResponse { .. } => "RM-P001",
            Self::BadResponseBody { .. } => "RM-P002",
            Self::SweepAlreadyRunning => "RM-X001",
            Self::Serialize { .. } => "RM-X002",
        }
    }

    /// Whether re-running the whole probe could plausibly succeed.
    ///
    /// Retries are an orchestration-layer concern; this core never retries.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::BadResponse { .. }
        )
    }

    /// Returns the upstream HTTP status, when this error carries one.
    #[must_use]
    pub const fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::BadResponse { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for relaymon operations.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_and_code_agree_on_prefix() {
        let errors = [
            RelayError::InvalidArgument {
                message: "x".into(),
            },
            RelayError::Configuration {
                message: "x".into(),
            },
            RelayError::Resolution {
                message: "x".into(),
            },
            RelayError::Dispatch {
                channel_type: "x".into(),
            },
            RelayError::Conversion {
                message: "x".into(),
            },
            RelayError::Transport {
                message: "x".into(),
            },
            RelayError::BadResponse {
                status: 503,
                message: "x".into(),
            },
            RelayError::SweepAlreadyRunning,
        ];
        for err in errors {
            let code = err.code();
            let prefix = err.category().code_prefix();
            assert!(
                code.trim_start_matches("RM-").starts_with(prefix),
                "code {code} does not match category prefix {prefix}"
            );
        }
    }

    #[test]
    fn network_errors_are_retryable() {
        assert!(RelayError::Timeout { seconds: 30 }.is_retryable());
        assert!(
            !RelayError::Dispatch {
                channel_type: "midjourney".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn bad_response_carries_status() {
        let err = RelayError::BadResponse {
            status: 503,
            message: "service unavailable".into(),
        };
        assert_eq!(err.upstream_status(), Some(503));
        assert_eq!(RelayError::SweepAlreadyRunning.upstream_status(), None);
    }
}
