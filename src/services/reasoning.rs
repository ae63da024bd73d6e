use crate::config::OptimizerConfig;
use crate::constants::OPENAI_TEMPERATURE;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// A text-completion service that answers a natural-language prompt.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// Returns the raw text of the model's answer.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;

    fn backend_name(&self) -> &'static str;
}

/// Chat-completions client (OpenAI-compatible API).
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        OpenAiClient {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    /// `None` when no credential is configured
    pub fn from_config(config: &OptimizerConfig) -> Option<Self> {
        config.openai_api_key.as_ref().map(|key| {
            OpenAiClient::new(
                key.clone(),
                config.openai_base_url.clone(),
                config.openai_model.clone(),
            )
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ReasoningBackend for OpenAiClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: OPENAI_TEMPERATURE,
        };

        tracing::debug!(
            model = %self.model,
            prompt_chars = prompt.len(),
            "Chat completion request to {}",
            self.completions_url()
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::OptimizerCall(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(
                status = %status,
                "Chat completion HTTP error {}: {}",
                status, error_text
            );
            return Err(AppError::OptimizerCall(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::OptimizerCall(format!("Failed to parse response: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                AppError::MalformedOptimizerResponse("completion has no content".to_string())
            })?;

        tracing::debug!(chars = content.len(), "Chat completion received");
        Ok(content)
    }

    fn backend_name(&self) -> &'static str {
        "openai"
    }
}

// Chat-completions wire types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}
