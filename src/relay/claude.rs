//! Anthropic messages translation strategy.
//!
//! Converts chat probes into the Anthropic messages wire form. Anthropic
//! has no embedding/image/rerank surface, so those conversions keep the
//! contract's rejecting defaults.

use serde_json::{Value, json};

use crate::core::endpoint::PATH_MESSAGES;
use crate::core::request::ChatRequest;
use crate::core::usage::NormalizedUsage;
use crate::error::{RelayError, Result};
use crate::relay::{RelayContext, TranslationStrategy, WireRequest};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Token cap used when the canonical request carries none; the messages
/// API requires max_tokens.
const DEFAULT_MAX_TOKENS: u32 = 16;

/// Anthropic messages strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClaudeStrategy;

impl TranslationStrategy for ClaudeStrategy {
    fn name(&self) -> &'static str {
        "claude"
    }

    fn convert_chat(&self, request: &ChatRequest, cx: &RelayContext) -> Result<WireRequest> {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| json!({"role": m.role, "content": m.content}))
            .collect();

        let max_tokens = request
            .max_tokens
            .or(request.max_completion_tokens)
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let body = json!({
            "model": request.model,
            "max_tokens": max_tokens,
            "messages": messages,
            "stream": request.stream,
        });

        let mut headers = vec![(
            "anthropic-version".to_string(),
            ANTHROPIC_VERSION.to_string(),
        )];
        if let Some(key) = &cx.api_key {
            headers.push(("x-api-key".to_string(), key.clone()));
        }

        Ok(WireRequest {
            url: cx.url_for(PATH_MESSAGES),
            headers,
            body,
        })
    }

    fn normalize(&self, body: &Value) -> Result<NormalizedUsage> {
        let usage = body.get("usage").ok_or_else(|| RelayError::BadResponseBody {
            message: "no usage object in response".to_string(),
        })?;

        let prompt = usage.get("input_tokens").and_then(Value::as_i64);
        let completion = usage.get("output_tokens").and_then(Value::as_i64);
        let (Some(prompt), Some(completion)) = (prompt, completion) else {
            return Err(RelayError::BadResponseBody {
                message: "usage is missing input/output token counts".to_string(),
            });
        };
        let cached = usage
            .get("cache_read_input_tokens")
            .and_then(Value::as_i64)
            .unwrap_or(0);

        Ok(NormalizedUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            cached_tokens: cached,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::endpoint::{RelayFormat, RelayMode};
    use crate::core::request::{CanonicalRequest, build_probe_request};

    fn context() -> RelayContext {
        RelayContext {
            base_url: "https://api.anthropic.com".to_string(),
            api_key: Some("sk-ant-test".to_string()),
            upstream_model: "claude-sonnet-4".to_string(),
            path: PATH_MESSAGES,
            format: RelayFormat::Claude,
            mode: RelayMode::ChatCompletions,
        }
    }

    #[test]
    fn chat_converts_to_messages_form_with_required_max_tokens() {
        let CanonicalRequest::ChatCompletion(request) =
            build_probe_request("claude-sonnet-4", RelayMode::ChatCompletions)
        else {
            panic!("expected chat variant");
        };
        let wire = ClaudeStrategy.convert_chat(&request, &context()).unwrap();
        assert_eq!(wire.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(wire.body["max_tokens"], 16);
        assert_eq!(wire.body["messages"][0]["role"], "user");
        assert!(
            wire.headers
                .iter()
                .any(|(name, value)| name == "x-api-key" && value == "sk-ant-test")
        );
        assert!(
            wire.headers
                .iter()
                .any(|(name, _)| name == "anthropic-version")
        );
    }

    #[test]
    fn claude_thinking_probe_defaults_max_tokens() {
        // "thinking" + "claude" skips the 50-token branch; the messages API
        // still needs a cap, so the strategy supplies one.
        let CanonicalRequest::ChatCompletion(request) =
            build_probe_request("claude-3-thinking", RelayMode::ChatCompletions)
        else {
            panic!("expected chat variant");
        };
        assert_eq!(request.max_tokens, None);
        let wire = ClaudeStrategy.convert_chat(&request, &context()).unwrap();
        assert_eq!(wire.body["max_tokens"], 16);
    }

    #[test]
    fn embedding_mode_is_rejected() {
        let request = crate::core::request::EmbeddingRequest {
            model: "claude-sonnet-4".to_string(),
            input: Value::Null,
        };
        let err = ClaudeStrategy
            .convert_embedding(&request, &context())
            .unwrap_err();
        assert!(matches!(err, RelayError::Conversion { .. }));
    }

    #[test]
    fn normalize_reads_anthropic_usage() {
        let body = serde_json::json!({
            "usage": {
                "input_tokens": 12,
                "output_tokens": 4,
                "cache_read_input_tokens": 6
            }
        });
        let usage = ClaudeStrategy.normalize(&body).unwrap();
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.completion_tokens, 4);
        assert_eq!(usage.cached_tokens, 6);
    }

    #[test]
    fn normalize_rejects_partial_usage() {
        let body = serde_json::json!({"usage": {"input_tokens": 12}});
        assert!(matches!(
            ClaudeStrategy.normalize(&body),
            Err(RelayError::BadResponseBody { .. })
        ));
    }
}
