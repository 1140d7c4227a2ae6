//! skillgraph-llm: Language-model access for extraction and intent parsing.
//!
//! The pipeline depends only on the model's input/output contract: a
//! prompt goes in, free-form text comes out. [`LanguageModel`] is that
//! seam; [`AnthropicClient`] is the production implementation and
//! [`ScriptedModel`] replays canned answers. [`retry::complete_validated`]
//! wraps any model with timeout, validation and bounded retries.

pub mod anthropic;
pub mod error;
pub mod retry;
pub mod scripted;

pub use anthropic::AnthropicClient;
pub use error::LlmError;
pub use retry::{complete_validated, AttemptFailure, RetryExhausted, RetryPolicy};
pub use scripted::ScriptedModel;

use async_trait::async_trait;

/// One request to the language-model service.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// A text-in, text-out language-model service.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> error::Result<String>;
}
