//! Extraction Adapter: document text in, validated extraction out.
//!
//! One logical call to the language model per document, retried on
//! malformed output and transient delivery failures. Skills and
//! technologies are mapped to canonical names before the result leaves.

use std::sync::Arc;

use skillgraph_core::config::LlmSettings;
use skillgraph_core::schema::parse_extraction;
use skillgraph_core::{ExtractionResult, SkillRegistry};
use skillgraph_llm::{complete_validated, CompletionRequest, LanguageModel, RetryPolicy};

use crate::document::Document;
use crate::error::{IngestError, Result};
use crate::prompts::{extraction_prompt, EXTRACTION_SYSTEM};

const DEFAULT_MAX_TOKENS: u32 = 4000;

#[derive(Clone)]
pub struct ExtractionAdapter {
    model: Arc<dyn LanguageModel>,
    policy: RetryPolicy,
    registry: SkillRegistry,
    max_tokens: u32,
}

impl ExtractionAdapter {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            policy: RetryPolicy::default(),
            registry: SkillRegistry::builtin(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn from_settings(model: Arc<dyn LanguageModel>, settings: &LlmSettings) -> Self {
        Self::new(model)
            .with_policy(RetryPolicy::from_settings(settings))
            .with_max_tokens(settings.extraction_max_tokens)
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_registry(mut self, registry: SkillRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Extract people, skills and projects from one document.
    pub async fn extract(&self, document: &Document) -> Result<ExtractionResult> {
        if document.text.trim().is_empty() {
            return Err(IngestError::EmptyDocument {
                document: document.name.clone(),
                fingerprint: document.fingerprint.clone(),
            });
        }

        let request = CompletionRequest::new(extraction_prompt(&document.text), self.max_tokens)
            .with_system(EXTRACTION_SYSTEM);

        let extraction =
            complete_validated(self.model.as_ref(), &request, &self.policy, parse_extraction)
                .await
                .map_err(|exhausted| {
                    tracing::error!(
                        document = %document.name,
                        fingerprint = %document.short_fingerprint(),
                        attempts = exhausted.attempts,
                        error = %exhausted.last,
                        "Extraction failed"
                    );
                    IngestError::ExtractionFailed {
                        document: document.name.clone(),
                        fingerprint: document.fingerprint.clone(),
                        attempts: exhausted.attempts,
                        reason: exhausted.last.to_string(),
                        raw_excerpt: exhausted.last.raw_excerpt().map(str::to_string),
                    }
                })?;

        Ok(self.canonicalize(extraction))
    }

    /// Map every skill and technology to its canonical name, dropping duplicates.
    pub fn canonicalize(&self, mut extraction: ExtractionResult) -> ExtractionResult {
        for person in &mut extraction.people {
            person.hard_skills = self.registry.canonicalize_all(&person.hard_skills);
            person.soft_skills = self.registry.canonicalize_all(&person.soft_skills);
        }
        for project in &mut extraction.projects {
            project.technologies = self.registry.canonicalize_all(&project.technologies);
        }
        extraction
    }
}
