//! Endpoint resolution.
//!
//! Maps an explicit endpoint-type hint, or heuristics over model name and
//! channel type, to a wire path and its relay format/mode. Resolution is a
//! pure function so probe behavior stays reproducible.

use serde::{Deserialize, Serialize};

use crate::core::channel::ChannelType;

// =============================================================================
// Wire Paths
// =============================================================================

/// Chat completion wire path (the default).
pub const PATH_CHAT_COMPLETIONS: &str = "/v1/chat/completions";
/// Embeddings wire path.
pub const PATH_EMBEDDINGS: &str = "/v1/embeddings";
/// Image generation wire path.
pub const PATH_IMAGES_GENERATIONS: &str = "/v1/images/generations";
/// Rerank wire path.
pub const PATH_RERANK: &str = "/v1/rerank";
/// Responses wire path.
pub const PATH_RESPONSES: &str = "/v1/responses";
/// Anthropic messages wire path.
pub const PATH_MESSAGES: &str = "/v1/messages";
/// Gemini generateContent wire path prefix.
pub const PATH_GEMINI_MODELS: &str = "/v1beta/models";

// =============================================================================
// Endpoint Types
// =============================================================================

/// Known endpoint-type hints, mapping 1:1 to a wire path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndpointType {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "openai-response")]
    OpenAIResponses,
    Anthropic,
    Gemini,
    JinaRerank,
    ImageGeneration,
    Embeddings,
}

impl EndpointType {
    /// All known endpoint types with their hint strings.
    pub const ALL: &'static [(Self, &'static str)] = &[
        (Self::OpenAI, "openai"),
        (Self::OpenAIResponses, "openai-response"),
        (Self::Anthropic, "anthropic"),
        (Self::Gemini, "gemini"),
        (Self::JinaRerank, "jina-rerank"),
        (Self::ImageGeneration, "image-generation"),
        (Self::Embeddings, "embeddings"),
    ];

    /// Look up an endpoint type from a hint string.
    #[must_use]
    pub fn from_hint(hint: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .find(|(_, name)| *name == hint)
            .map(|(ty, _)| *ty)
    }

    /// The wire path this endpoint type maps to.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::OpenAI => PATH_CHAT_COMPLETIONS,
            Self::OpenAIResponses => PATH_RESPONSES,
            Self::Anthropic => PATH_MESSAGES,
            Self::Gemini => PATH_GEMINI_MODELS,
            Self::JinaRerank => PATH_RERANK,
            Self::ImageGeneration => PATH_IMAGES_GENERATIONS,
            Self::Embeddings => PATH_EMBEDDINGS,
        }
    }

    /// The relay format this endpoint type resolves to.
    #[must_use]
    pub const fn relay_format(self) -> RelayFormat {
        match self {
            Self::OpenAI => RelayFormat::OpenAI,
            Self::OpenAIResponses => RelayFormat::OpenAIResponses,
            Self::Anthropic => RelayFormat::Claude,
            Self::Gemini => RelayFormat::Gemini,
            Self::JinaRerank => RelayFormat::Rerank,
            Self::ImageGeneration => RelayFormat::OpenAIImage,
            Self::Embeddings => RelayFormat::Embedding,
        }
    }
}

// =============================================================================
// Relay Format / Mode
// =============================================================================

/// Externally-visible protocol family of a resolved endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayFormat {
    OpenAI,
    OpenAIResponses,
    Claude,
    Gemini,
    Embedding,
    OpenAIImage,
    Rerank,
}

impl RelayFormat {
    /// Detect the relay format from a wire path.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        if path == PATH_EMBEDDINGS {
            Self::Embedding
        } else if path == PATH_IMAGES_GENERATIONS {
            Self::OpenAIImage
        } else if path == PATH_MESSAGES {
            Self::Claude
        } else if path.contains(PATH_GEMINI_MODELS) {
            Self::Gemini
        } else if path == PATH_RERANK || path == "/rerank" {
            Self::Rerank
        } else if path == PATH_RESPONSES {
            Self::OpenAIResponses
        } else {
            Self::OpenAI
        }
    }
}

/// Internally-routed mode derived from the wire path; selects which
/// conversion entry point a translation strategy receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayMode {
    ChatCompletions,
    Embeddings,
    ImagesGenerations,
    Rerank,
    Responses,
}

impl RelayMode {
    /// Detect the relay mode from a wire path.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        if path == PATH_EMBEDDINGS {
            Self::Embeddings
        } else if path == PATH_IMAGES_GENERATIONS {
            Self::ImagesGenerations
        } else if path == PATH_RERANK || path == "/rerank" {
            Self::Rerank
        } else if path == PATH_RESPONSES {
            Self::Responses
        } else {
            Self::ChatCompletions
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// A fully resolved probe endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    /// Wire path the probe request targets.
    pub path: &'static str,
    /// Protocol family used for override decoding and conversion.
    pub format: RelayFormat,
    /// Mode selecting the conversion entry point.
    pub mode: RelayMode,
}

/// Resolve the wire path and relay format/mode for a probe.
///
/// When `hint` names a known endpoint type it wins outright; unknown hints
/// fall back to the chat-completion path. With no hint, model-name and
/// channel-type heuristics apply in priority order: embedding cues, the
/// VolcEngine seedream image path, "codex" responses models, then chat.
#[must_use]
pub fn resolve(hint: &str, model: &str, channel_type: ChannelType) -> ResolvedEndpoint {
    if !hint.is_empty() {
        return EndpointType::from_hint(hint).map_or_else(
            || ResolvedEndpoint {
                path: PATH_CHAT_COMPLETIONS,
                format: RelayFormat::OpenAI,
                mode: RelayMode::ChatCompletions,
            },
            |endpoint| ResolvedEndpoint {
                path: endpoint.path(),
                format: endpoint.relay_format(),
                mode: RelayMode::from_path(endpoint.path()),
            },
        );
    }

    let lower = model.to_lowercase();
    let mut path = PATH_CHAT_COMPLETIONS;

    if lower.contains("embedding")
        || model.starts_with("m3e")
        || model.contains("bge-")
        || model.contains("embed")
        || channel_type == ChannelType::MokaAI
    {
        path = PATH_EMBEDDINGS;
    }
    if channel_type == ChannelType::VolcEngine && model.contains("seedream") {
        path = PATH_IMAGES_GENERATIONS;
    }
    if lower.contains("codex") {
        path = PATH_RESPONSES;
    }

    ResolvedEndpoint {
        path,
        format: RelayFormat::from_path(path),
        mode: RelayMode::from_path(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_models_resolve_to_embeddings_path() {
        for model in [
            "text-embedding-3-small",
            "m3e-base",
            "bge-large-zh",
            "voyage-embed-2",
        ] {
            let resolved = resolve("", model, ChannelType::OpenAI);
            assert_eq!(resolved.path, PATH_EMBEDDINGS, "model {model}");
            assert_eq!(resolved.mode, RelayMode::Embeddings);
            assert_eq!(resolved.format, RelayFormat::Embedding);
        }
    }

    #[test]
    fn moka_channel_forces_embeddings() {
        let resolved = resolve("", "some-model", ChannelType::MokaAI);
        assert_eq!(resolved.path, PATH_EMBEDDINGS);
    }

    #[test]
    fn seedream_on_volcengine_resolves_to_images() {
        let resolved = resolve("", "doubao-seedream-3", ChannelType::VolcEngine);
        assert_eq!(resolved.path, PATH_IMAGES_GENERATIONS);
        assert_eq!(resolved.mode, RelayMode::ImagesGenerations);

        // Same model on another channel type stays on chat.
        let resolved = resolve("", "doubao-seedream-3", ChannelType::OpenAI);
        assert_eq!(resolved.path, PATH_CHAT_COMPLETIONS);
    }

    #[test]
    fn codex_models_resolve_to_responses() {
        let resolved = resolve("", "gpt-5-Codex", ChannelType::OpenAI);
        assert_eq!(resolved.path, PATH_RESPONSES);
        assert_eq!(resolved.mode, RelayMode::Responses);
    }

    #[test]
    fn thinking_and_o_series_stay_on_chat_path() {
        assert_eq!(
            resolve("", "claude-3-thinking", ChannelType::Anthropic).path,
            PATH_CHAT_COMPLETIONS
        );
        assert_eq!(
            resolve("", "o1-mini", ChannelType::OpenAI).path,
            PATH_CHAT_COMPLETIONS
        );
    }

    #[test]
    fn known_hint_wins_over_heuristics() {
        let resolved = resolve("jina-rerank", "text-embedding-3-small", ChannelType::OpenAI);
        assert_eq!(resolved.path, PATH_RERANK);
        assert_eq!(resolved.mode, RelayMode::Rerank);
        assert_eq!(resolved.format, RelayFormat::Rerank);
    }

    #[test]
    fn unknown_hint_falls_back_to_chat() {
        let resolved = resolve("not-a-real-endpoint", "o1-mini", ChannelType::OpenAI);
        assert_eq!(resolved.path, PATH_CHAT_COMPLETIONS);
        assert_eq!(resolved.format, RelayFormat::OpenAI);
    }

    #[test]
    fn anthropic_hint_maps_to_claude_format_on_chat_mode() {
        let resolved = resolve("anthropic", "claude-sonnet-4", ChannelType::Anthropic);
        assert_eq!(resolved.path, PATH_MESSAGES);
        assert_eq!(resolved.format, RelayFormat::Claude);
        assert_eq!(resolved.mode, RelayMode::ChatCompletions);
    }
}
