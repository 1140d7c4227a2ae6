//! Error types for the skillgraph-llm crate.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("Language model call timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Language model service unavailable (HTTP {status})")]
    Unavailable { status: u16 },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Language model API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response envelope: {0}")]
    InvalidResponse(String),

    #[error("Language model client is not configured: {0}")]
    NotConfigured(String),
}

impl LlmError {
    /// Whether a retry has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::RateLimited | Self::Unavailable { .. } | Self::Request(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
