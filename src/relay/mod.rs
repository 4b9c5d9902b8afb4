//! Translation strategies.
//!
//! Every provider plugin implements [`TranslationStrategy`]: convert a
//! canonical request into provider wire form, and normalize the provider's
//! response into usage figures. The core selects a plugin purely from the
//! channel's provider type; all per-vendor logic lives inside the plugin.

pub mod claude;
pub mod gemini;
pub mod openai;
pub mod transport;

use serde_json::Value;

use crate::core::channel::ChannelType;
use crate::core::endpoint::{RelayFormat, RelayMode};
use crate::core::request::{
    CanonicalRequest, ChatRequest, EmbeddingRequest, ImageRequest, RerankRequest, ResponsesRequest,
};
use crate::core::usage::NormalizedUsage;
use crate::error::{RelayError, Result};
use crate::relay::transport::{Transport, TransportResponse};

// =============================================================================
// Relay Context
// =============================================================================

/// Per-probe translation context handed to strategies.
#[derive(Debug, Clone)]
pub struct RelayContext {
    /// Channel base URL, without trailing slash semantics enforced here.
    pub base_url: String,
    /// Channel credential, when configured.
    pub api_key: Option<String>,
    /// Model name after upstream alias mapping.
    pub upstream_model: String,
    /// Resolved wire path.
    pub path: &'static str,
    /// Resolved protocol family.
    pub format: RelayFormat,
    /// Resolved relay mode.
    pub mode: RelayMode,
}

impl RelayContext {
    /// Join the base URL with a wire path.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// A converted provider wire payload, ready to issue.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

// =============================================================================
// Strategy Contract
// =============================================================================

/// The contract every provider-specific plugin implements.
///
/// Conversion entry points default to rejecting the mode; a strategy opts
/// into exactly the surfaces its provider has. Unhandled canonical variants
/// are a dispatch-time defect, surfaced by [`convert_request`].
pub trait TranslationStrategy: Send + Sync {
    /// Plugin name, used in logs and conversion errors.
    fn name(&self) -> &'static str;

    /// Convert a chat/completion request to wire form.
    fn convert_chat(&self, request: &ChatRequest, cx: &RelayContext) -> Result<WireRequest>;

    /// Convert an embedding request to wire form.
    fn convert_embedding(
        &self,
        _request: &EmbeddingRequest,
        _cx: &RelayContext,
    ) -> Result<WireRequest> {
        Err(RelayError::Conversion {
            message: format!("{} does not support embedding requests", self.name()),
        })
    }

    /// Convert an image-generation request to wire form.
    fn convert_image(&self, _request: &ImageRequest, _cx: &RelayContext) -> Result<WireRequest> {
        Err(RelayError::Conversion {
            message: format!("{} does not support image requests", self.name()),
        })
    }

    /// Convert a rerank request to wire form.
    fn convert_rerank(&self, _request: &RerankRequest, _cx: &RelayContext) -> Result<WireRequest> {
        Err(RelayError::Conversion {
            message: format!("{} does not support rerank requests", self.name()),
        })
    }

    /// Convert a responses-API request to wire form.
    fn convert_responses(
        &self,
        _request: &ResponsesRequest,
        _cx: &RelayContext,
    ) -> Result<WireRequest> {
        Err(RelayError::Conversion {
            message: format!("{} does not support responses requests", self.name()),
        })
    }

    /// Extract normalized usage from a successful response body.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::BadResponseBody`] when the body omits the usage
    /// information required for billing.
    fn normalize(&self, body: &Value) -> Result<NormalizedUsage>;
}

// =============================================================================
// Dispatch
// =============================================================================

/// Select the conversion entry point for the resolved relay mode, asserting
/// the canonical request carries the matching variant.
pub fn convert_request(
    strategy: &dyn TranslationStrategy,
    request: &CanonicalRequest,
    cx: &RelayContext,
) -> Result<WireRequest> {
    let mismatch = |expected: &str| RelayError::Conversion {
        message: format!("invalid {expected} request type"),
    };

    match cx.mode {
        RelayMode::Embeddings => match request {
            CanonicalRequest::Embedding(r) => strategy.convert_embedding(r, cx),
            _ => Err(mismatch("embedding")),
        },
        RelayMode::ImagesGenerations => match request {
            CanonicalRequest::Image(r) => strategy.convert_image(r, cx),
            _ => Err(mismatch("image")),
        },
        RelayMode::Rerank => match request {
            CanonicalRequest::Rerank(r) => strategy.convert_rerank(r, cx),
            _ => Err(mismatch("rerank")),
        },
        RelayMode::Responses => match request {
            CanonicalRequest::Responses(r) => strategy.convert_responses(r, cx),
            _ => Err(mismatch("responses")),
        },
        RelayMode::ChatCompletions => match request {
            CanonicalRequest::ChatCompletion(r) => strategy.convert_chat(r, cx),
            _ => Err(mismatch("chat")),
        },
    }
}

/// Issue a converted wire request through the transport.
pub async fn issue(wire: &WireRequest, transport: &dyn Transport) -> Result<TransportResponse> {
    transport.post_json(&wire.url, &wire.headers, &wire.body).await
}

// =============================================================================
// Strategy Lookup
// =============================================================================

static OPENAI: openai::OpenAiStrategy = openai::OpenAiStrategy;
static CLAUDE: claude::ClaudeStrategy = claude::ClaudeStrategy;
static GEMINI: gemini::GeminiStrategy = gemini::GeminiStrategy;

/// Select the translation strategy for a channel type.
///
/// This is the single point where the core branches on provider identity;
/// an unmapped type is a fatal dispatch error for the probe.
#[must_use]
pub fn strategy_for(channel_type: ChannelType) -> Option<&'static dyn TranslationStrategy> {
    match channel_type {
        ChannelType::OpenAI | ChannelType::MokaAI | ChannelType::VolcEngine => Some(&OPENAI),
        ChannelType::Anthropic => Some(&CLAUDE),
        ChannelType::Gemini => Some(&GEMINI),
        ChannelType::Midjourney
        | ChannelType::MidjourneyPlus
        | ChannelType::Suno
        | ChannelType::Kling
        | ChannelType::Jimeng
        | ChannelType::DoubaoVideo
        | ChannelType::Vidu => None,
    }
}
