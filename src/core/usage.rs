//! Normalized usage accounting.
//!
//! Every translation strategy's response step produces one
//! [`NormalizedUsage`]: the provider-agnostic unit the pricing engine and
//! audit records reason over.

use serde::{Deserialize, Serialize};

/// Provider-agnostic token accounting for one completed call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedUsage {
    /// Tokens in the prompt, cached reads included.
    pub prompt_tokens: i64,
    /// Tokens generated by the model.
    pub completion_tokens: i64,
    /// Prompt tokens served from the provider's cache.
    pub cached_tokens: i64,
}

impl NormalizedUsage {
    /// Usage with no cache detail.
    #[must_use]
    pub const fn new(prompt_tokens: i64, completion_tokens: i64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            cached_tokens: 0,
        }
    }

    /// Total tokens across prompt and completion.
    #[must_use]
    pub const fn total_tokens(&self) -> i64 {
        self.prompt_tokens + self.completion_tokens
    }
}
