//! Gemini generateContent translation strategy.

use serde_json::{Value, json};

use crate::core::request::ChatRequest;
use crate::core::usage::NormalizedUsage;
use crate::error::{RelayError, Result};
use crate::relay::{RelayContext, TranslationStrategy, WireRequest};

/// Gemini generateContent strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeminiStrategy;

impl TranslationStrategy for GeminiStrategy {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn convert_chat(&self, request: &ChatRequest, cx: &RelayContext) -> Result<WireRequest> {
        let contents: Vec<Value> = request
            .messages
            .iter()
            .map(|m| {
                // Gemini has no system/assistant roles on this surface;
                // probe messages are all user turns.
                json!({"role": "user", "parts": [{"text": m.content}]})
            })
            .collect();

        let mut body = json!({"contents": contents});
        if let Some(max_tokens) = request.max_tokens.or(request.max_completion_tokens) {
            body["generationConfig"] = json!({"maxOutputTokens": max_tokens});
        }

        let mut headers = Vec::new();
        if let Some(key) = &cx.api_key {
            headers.push(("x-goog-api-key".to_string(), key.clone()));
        }

        Ok(WireRequest {
            url: cx.url_for(&format!(
                "/v1beta/models/{}:generateContent",
                request.model
            )),
            headers,
            body,
        })
    }

    fn normalize(&self, body: &Value) -> Result<NormalizedUsage> {
        let metadata = body
            .get("usageMetadata")
            .ok_or_else(|| RelayError::BadResponseBody {
                message: "no usageMetadata object in response".to_string(),
            })?;

        let prompt = metadata
            .get("promptTokenCount")
            .and_then(Value::as_i64)
            .ok_or_else(|| RelayError::BadResponseBody {
                message: "usageMetadata is missing promptTokenCount".to_string(),
            })?;
        let completion = metadata
            .get("candidatesTokenCount")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let cached = metadata
            .get("cachedContentTokenCount")
            .and_then(Value::as_i64)
            .unwrap_or(0);

        Ok(NormalizedUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            cached_tokens: cached,
        })
    }
}
