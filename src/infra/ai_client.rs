use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::ai_provider::{AiProviderPort, Completion, CompletionRequest},
    infra::config::AiConfig,
};

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct ChatCompletionsClient {
    client: Client,
    api_url: Url,
    api_key: SecretString,
}

impl ChatCompletionsClient {
    pub fn new(client: Client, config: &AiConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl AiProviderPort for ChatCompletionsClient {
    #[tracing::instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> AppResult<Completion> {
        let body = ChatRequest::from(&request);

        let response = self
            .client
            .post(self.api_url.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "AI request failed");
                AppError::Provider(format!("AI request failed: {e}"))
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to read AI response: {e}")))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %text, "AI provider error");
            let message = serde_json::from_str::<ChatErrorResponse>(&text)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| format!("AI provider responded with {status}"));
            return Err(AppError::Provider(message));
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            tracing::error!(body = %text, error = %e, "Failed to parse AI response");
            AppError::Provider(format!("Failed to parse AI response: {e}"))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        tracing::debug!(content_len = content.len(), "AI completion received");

        Ok(Completion {
            content,
            usage: parsed.usage,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ratio: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl<'a> From<&'a CompletionRequest> for ChatRequest<'a> {
    fn from(request: &'a CompletionRequest) -> Self {
        Self {
            model: &request.model,
            messages: [ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            stream: false,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            ratio: request.ratio.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatErrorResponse {
    error: ChatError,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    #[serde(default)]
    message: Option<String>,
}
