//! Intent Parser: natural-language question in, validated intent out.
//!
//! An unrecognized or missing intent type is not an error. The payload is
//! downgraded to the generic keyword fallback so every question gets an
//! answer attempt.

use std::sync::Arc;

use skillgraph_core::config::LlmSettings;
use skillgraph_core::schema::parse_intent_payload;
use skillgraph_core::{Intent, SchemaError};
use skillgraph_llm::{complete_validated, CompletionRequest, LanguageModel, RetryPolicy};

use crate::error::{Result, SearchError};
use crate::prompts::{intent_prompt, INTENT_SYSTEM};

const DEFAULT_MAX_TOKENS: u32 = 500;

#[derive(Clone)]
pub struct IntentParser {
    model: Arc<dyn LanguageModel>,
    policy: RetryPolicy,
    max_tokens: u32,
}

impl IntentParser {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            policy: RetryPolicy::default(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn from_settings(model: Arc<dyn LanguageModel>, settings: &LlmSettings) -> Self {
        Self::new(model)
            .with_policy(RetryPolicy::from_settings(settings))
            .with_max_tokens(settings.intent_max_tokens)
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Classify `query`. Empty input fails before the model is called.
    pub async fn parse(&self, query: &str) -> Result<Intent> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let request =
            CompletionRequest::new(intent_prompt(query), self.max_tokens).with_system(INTENT_SYSTEM);

        let payload =
            complete_validated(self.model.as_ref(), &request, &self.policy, parse_intent_payload)
                .await
                .map_err(|exhausted| {
                    tracing::error!(
                        query,
                        attempts = exhausted.attempts,
                        error = %exhausted.last,
                        "Intent parsing failed"
                    );
                    SearchError::IntentParseFailed {
                        query: query.to_string(),
                        attempts: exhausted.attempts,
                        reason: exhausted.last.to_string(),
                        raw_excerpt: exhausted.last.raw_excerpt().map(str::to_string),
                    }
                })?;

        let intent = match payload.classify() {
            Ok(kind) => payload.into_intent(kind),
            Err(SchemaError::UnrecognizedIntent { label }) => {
                tracing::warn!(
                    query,
                    label = label.as_deref().unwrap_or("<missing>"),
                    "Unrecognized intent, falling back to keyword search"
                );
                payload.into_fallback()
            }
            Err(other) => {
                return Err(SearchError::IntentParseFailed {
                    query: query.to_string(),
                    attempts: 1,
                    reason: other.to_string(),
                    raw_excerpt: None,
                })
            }
        };

        tracing::debug!(query, intent = intent.kind.label(), "Intent parsed");
        Ok(intent)
    }
}
