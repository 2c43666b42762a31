use async_trait::async_trait;

use crate::app_error::AppResult;

/// A single-prompt completion request, provider agnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Aspect ratio hint understood by some image models.
    pub ratio: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    /// Token accounting as reported by the provider, passed through untouched.
    pub usage: Option<serde_json::Value>,
}

#[async_trait]
pub trait AiProviderPort: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> AppResult<Completion>;
}
