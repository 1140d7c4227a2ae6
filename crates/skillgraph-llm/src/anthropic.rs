//! HTTP client for the Anthropic Messages API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use skillgraph_core::config::LlmSettings;

use crate::error::{LlmError, Result};
use crate::{CompletionRequest, LanguageModel};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Language-model client backed by the Anthropic Messages API.
///
/// Clone is cheap (the inner reqwest client is reference-counted).
#[derive(Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_url: &str, api_key: &str, model: &str) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        if settings.api_key.is_empty() {
            return Err(LlmError::NotConfigured(
                "set llm.api_key or ANTHROPIC_API_KEY".to_string(),
            ));
        }
        Ok(Self::new(
            &settings.api_url,
            &settings.api_key,
            &settings.model,
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            system: request.system.as_deref(),
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        match status.as_u16() {
            200 => {}
            429 => return Err(LlmError::RateLimited),
            500 | 502 | 503 | 504 | 529 => {
                return Err(LlmError::Unavailable {
                    status: status.as_u16(),
                })
            }
            code => {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api { status: code, body });
            }
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            return Err(LlmError::InvalidResponse(
                "response contained no text blocks".to_string(),
            ));
        }

        tracing::debug!(model = %self.model, chars = text.len(), "Language model call complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_omits_missing_system_prompt() {
        let body = MessagesRequest {
            model: "m",
            max_tokens: 10,
            system: None,
            messages: vec![Message {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn from_settings_requires_api_key() {
        let settings = LlmSettings::default();
        assert!(matches!(
            AnthropicClient::from_settings(&settings),
            Err(LlmError::NotConfigured(_))
        ));
    }
}
