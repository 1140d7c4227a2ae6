//! A `LanguageModel` that replays canned responses.
//!
//! Used by tests across the workspace and for offline runs where the real
//! service is not reachable.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{LlmError, Result};
use crate::{CompletionRequest, LanguageModel};

pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String>>>,
    latency: Mutex<VecDeque<Duration>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            latency: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answer with the same text.
    pub fn repeating(response: &str, times: usize) -> Self {
        Self::new((0..times).map(|_| Ok(response.to_string())).collect())
    }

    /// Per-call delays, consumed in order.
    pub fn with_latency(self, latency: Vec<Duration>) -> Self {
        Self {
            latency: Mutex::new(latency.into()),
            ..self
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().await.push(request.prompt.clone());

        let response = self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Request("script exhausted".to_string())));
        let delay = self.latency.lock().await.pop_front();

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        response
    }
}
