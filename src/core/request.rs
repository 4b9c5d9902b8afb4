//! Canonical request model and probe synthesis.
//!
//! [`CanonicalRequest`] is the gateway's provider-agnostic representation of
//! one outbound call: a closed set of variants, each carrying a model name.
//! The variant tag resolved from an endpoint must match the variant the
//! selected translation strategy expects; a mismatch is a defect, not a
//! runtime fallback.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::endpoint::{RelayFormat, RelayMode};
use crate::error::{RelayError, Result};

// =============================================================================
// Variant Payloads
// =============================================================================

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Chat/completion request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
}

/// Embedding request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub input: Value,
}

/// Image generation request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default = "default_image_count")]
    pub n: u32,
    #[serde(default)]
    pub size: String,
}

const fn default_image_count() -> u32 {
    1
}

/// Rerank request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub documents: Vec<Value>,
    #[serde(default)]
    pub top_n: u32,
}

/// Responses-API request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsesRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub input: Value,
}

// =============================================================================
// Canonical Request
// =============================================================================

/// The unit of translation: one of the five canonical request variants.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalRequest {
    ChatCompletion(ChatRequest),
    Embedding(EmbeddingRequest),
    Image(ImageRequest),
    Rerank(RerankRequest),
    Responses(ResponsesRequest),
}

impl CanonicalRequest {
    /// The model name this request targets.
    #[must_use]
    pub fn model(&self) -> &str {
        match self {
            Self::ChatCompletion(r) => &r.model,
            Self::Embedding(r) => &r.model,
            Self::Image(r) => &r.model,
            Self::Rerank(r) => &r.model,
            Self::Responses(r) => &r.model,
        }
    }

    /// Rewrite the model name after upstream model-name mapping.
    pub fn set_model(&mut self, model: &str) {
        match self {
            Self::ChatCompletion(r) => r.model = model.to_string(),
            Self::Embedding(r) => r.model = model.to_string(),
            Self::Image(r) => r.model = model.to_string(),
            Self::Rerank(r) => r.model = model.to_string(),
            Self::Responses(r) => r.model = model.to_string(),
        }
    }

    /// Stable variant name, as surfaced by the template endpoint.
    #[must_use]
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::ChatCompletion(_) => "chat_completions",
            Self::Embedding(_) => "embeddings",
            Self::Image(_) => "images",
            Self::Rerank(_) => "rerank",
            Self::Responses(_) => "responses",
        }
    }

    /// Pretty-printed wire body of the inner payload.
    pub fn to_pretty_json(&self) -> Result<String> {
        let rendered = match self {
            Self::ChatCompletion(r) => serde_json::to_string_pretty(r),
            Self::Embedding(r) => serde_json::to_string_pretty(r),
            Self::Image(r) => serde_json::to_string_pretty(r),
            Self::Rerank(r) => serde_json::to_string_pretty(r),
            Self::Responses(r) => serde_json::to_string_pretty(r),
        };
        rendered.map_err(|e| RelayError::Serialize {
            message: e.to_string(),
        })
    }
}

// =============================================================================
// Probe Synthesis
// =============================================================================

/// Build a minimal valid probe request for the resolved relay mode.
///
/// Chat probes pick a token-limit field by model-name heuristic: o-series
/// models cap completion tokens at 16; "thinking" models (except claude)
/// cap max tokens at 50; gemini models get 3000; everything else 16.
#[must_use]
pub fn build_probe_request(model: &str, mode: RelayMode) -> CanonicalRequest {
    match mode {
        RelayMode::Embeddings => CanonicalRequest::Embedding(EmbeddingRequest {
            model: model.to_string(),
            input: Value::Array(vec![Value::String("hello world".to_string())]),
        }),
        RelayMode::ImagesGenerations => CanonicalRequest::Image(ImageRequest {
            model: model.to_string(),
            prompt: "a cute cat".to_string(),
            n: 1,
            size: "1024x1024".to_string(),
        }),
        RelayMode::Rerank => CanonicalRequest::Rerank(RerankRequest {
            model: model.to_string(),
            query: "What is Deep Learning?".to_string(),
            documents: vec![
                Value::String("Deep Learning is a subset of machine learning.".to_string()),
                Value::String(
                    "Machine learning is a field of artificial intelligence.".to_string(),
                ),
            ],
            top_n: 2,
        }),
        RelayMode::Responses => CanonicalRequest::Responses(ResponsesRequest {
            model: model.to_string(),
            input: Value::String("hi".to_string()),
        }),
        RelayMode::ChatCompletions => {
            let mut request = ChatRequest {
                model: model.to_string(),
                stream: false,
                messages: vec![Message {
                    role: "user".to_string(),
                    content: "hi".to_string(),
                }],
                max_tokens: None,
                max_completion_tokens: None,
            };

            if model.starts_with('o') {
                request.max_completion_tokens = Some(16);
            } else if model.contains("thinking") {
                if !model.contains("claude") {
                    request.max_tokens = Some(50);
                }
            } else if model.contains("gemini") {
                request.max_tokens = Some(3000);
            } else {
                request.max_tokens = Some(16);
            }

            CanonicalRequest::ChatCompletion(request)
        }
    }
}

// =============================================================================
// Override Decoding
// =============================================================================

/// Decode a stored raw override body into the variant the resolved relay
/// format expects, forcing its model field to the probe's model name.
///
/// # Errors
///
/// Returns [`RelayError::OverrideParse`] when the body is empty or does not
/// decode into the resolved variant. The probe must fail rather than send
/// unvalidated content.
pub fn parse_override(body: &str, model: &str, format: RelayFormat) -> Result<CanonicalRequest> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(RelayError::OverrideParse {
            message: "empty probe override body".to_string(),
        });
    }

    let parse_error = |e: serde_json::Error| RelayError::OverrideParse {
        message: e.to_string(),
    };

    let mut request = match format {
        RelayFormat::OpenAI | RelayFormat::Claude | RelayFormat::Gemini => {
            CanonicalRequest::ChatCompletion(
                serde_json::from_str::<ChatRequest>(trimmed).map_err(parse_error)?,
            )
        }
        RelayFormat::Embedding => CanonicalRequest::Embedding(
            serde_json::from_str::<EmbeddingRequest>(trimmed).map_err(parse_error)?,
        ),
        RelayFormat::OpenAIImage => CanonicalRequest::Image(
            serde_json::from_str::<ImageRequest>(trimmed).map_err(parse_error)?,
        ),
        RelayFormat::Rerank => CanonicalRequest::Rerank(
            serde_json::from_str::<RerankRequest>(trimmed).map_err(parse_error)?,
        ),
        RelayFormat::OpenAIResponses => CanonicalRequest::Responses(
            serde_json::from_str::<ResponsesRequest>(trimmed).map_err(parse_error)?,
        ),
    };
    request.set_model(model);
    Ok(request)
}
