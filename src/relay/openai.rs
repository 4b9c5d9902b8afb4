//! OpenAI-compatible translation strategy.
//!
//! The default plugin: canonical requests already mirror the OpenAI wire
//! format, so conversion is a serialization pass plus auth headers. Also
//! serves OpenAI-compatible channels (MokaAI embeddings, VolcEngine) and
//! all five relay modes.

use serde::Serialize;
use serde_json::Value;

use crate::core::request::{
    ChatRequest, EmbeddingRequest, ImageRequest, RerankRequest, ResponsesRequest,
};
use crate::core::usage::NormalizedUsage;
use crate::error::{RelayError, Result};
use crate::relay::{RelayContext, TranslationStrategy, WireRequest};

/// OpenAI-compatible strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAiStrategy;

impl OpenAiStrategy {
    fn wire<T: Serialize>(request: &T, cx: &RelayContext) -> Result<WireRequest> {
        let body = serde_json::to_value(request).map_err(|e| RelayError::Serialize {
            message: e.to_string(),
        })?;
        Ok(WireRequest {
            url: cx.url_for(cx.path),
            headers: auth_headers(cx),
            body,
        })
    }
}

fn auth_headers(cx: &RelayContext) -> Vec<(String, String)> {
    cx.api_key
        .as_ref()
        .map(|key| vec![("Authorization".to_string(), format!("Bearer {key}"))])
        .unwrap_or_default()
}

impl TranslationStrategy for OpenAiStrategy {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn convert_chat(&self, request: &ChatRequest, cx: &RelayContext) -> Result<WireRequest> {
        Self::wire(request, cx)
    }

    fn convert_embedding(
        &self,
        request: &EmbeddingRequest,
        cx: &RelayContext,
    ) -> Result<WireRequest> {
        Self::wire(request, cx)
    }

    fn convert_image(&self, request: &ImageRequest, cx: &RelayContext) -> Result<WireRequest> {
        Self::wire(request, cx)
    }

    fn convert_rerank(&self, request: &RerankRequest, cx: &RelayContext) -> Result<WireRequest> {
        Self::wire(request, cx)
    }

    fn convert_responses(
        &self,
        request: &ResponsesRequest,
        cx: &RelayContext,
    ) -> Result<WireRequest> {
        Self::wire(request, cx)
    }

    fn normalize(&self, body: &Value) -> Result<NormalizedUsage> {
        let usage = body.get("usage").ok_or_else(|| RelayError::BadResponseBody {
            message: "no usage object in response".to_string(),
        })?;
        if usage.is_null() {
            return Err(RelayError::BadResponseBody {
                message: "usage is null".to_string(),
            });
        }

        // Chat/embeddings report prompt/completion tokens; the responses
        // API reports input/output tokens.
        let prompt = usage
            .get("prompt_tokens")
            .or_else(|| usage.get("input_tokens"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let completion = usage
            .get("completion_tokens")
            .or_else(|| usage.get("output_tokens"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let cached = usage
            .pointer("/prompt_tokens_details/cached_tokens")
            .or_else(|| usage.pointer("/input_tokens_details/cached_tokens"))
            .and_then(Value::as_i64)
            .unwrap_or(0);

        Ok(NormalizedUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            cached_tokens: cached,
        })
    }
}
