//! Scripted AI provider double.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::ai_provider::{AiProviderPort, Completion, CompletionRequest},
};

/// Replies with queued contents in order, repeating the last one once the
/// queue is drained. Every request is recorded.
pub struct ScriptedAiProvider {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedAiProvider {
    pub fn replying<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with an upstream error.
    pub fn failing() -> Self {
        Self::replying(Vec::<String>::new())
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiProviderPort for ScriptedAiProvider {
    async fn complete(&self, request: CompletionRequest) -> AppResult<Completion> {
        self.requests.lock().unwrap().push(request);

        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.replies.lock().unwrap().pop_front() {
            *last = Some(next);
        }
        let content = last
            .clone()
            .ok_or_else(|| AppError::Provider("model overloaded".into()))?;

        Ok(Completion {
            content,
            usage: Some(serde_json::json!({ "total_tokens": 10 })),
        })
    }
}
