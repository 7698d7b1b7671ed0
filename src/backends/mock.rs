use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{BackendError, BackendResult, LlmBackend, LlmResponse};
use crate::conversations::ConversationMessage;

/// Scripted in-memory backend. Replies are dequeued in order; when the
/// script runs dry it echoes the last message it was given. Every context
/// window it receives is recorded for assertions.
pub struct MockBackend {
    replies: Mutex<VecDeque<LlmResponse>>,
    one_shot_replies: Mutex<VecDeque<String>>,
    seen_contexts: Mutex<Vec<Vec<ConversationMessage>>>,
    fail_with_network_error: Mutex<Option<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            one_shot_replies: Mutex::new(VecDeque::new()),
            seen_contexts: Mutex::new(Vec::new()),
            fail_with_network_error: Mutex::new(None),
        }
    }

    pub fn with_reply(self, content: impl Into<String>, total_tokens: u32) -> Self {
        self.replies.lock().unwrap().push_back(LlmResponse {
            content: content.into(),
            total_tokens,
        });
        self
    }

    pub fn with_one_shot_reply(self, content: impl Into<String>) -> Self {
        self.one_shot_replies
            .lock()
            .unwrap()
            .push_back(content.into());
        self
    }

    /// Make every subsequent call fail as a network error.
    pub fn failing(self, message: impl Into<String>) -> Self {
        *self.fail_with_network_error.lock().unwrap() = Some(message.into());
        self
    }

    /// Context windows received so far, in call order.
    pub fn seen_contexts(&self) -> Vec<Vec<ConversationMessage>> {
        self.seen_contexts.lock().unwrap().clone()
    }

    fn check_failure(&self) -> BackendResult<()> {
        if let Some(message) = self.fail_with_network_error.lock().unwrap().as_ref() {
            return Err(BackendError::Network(message.clone()));
        }
        Ok(())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn converse(
        &self,
        messages: &[ConversationMessage],
        _json_mode: bool,
    ) -> BackendResult<LlmResponse> {
        self.seen_contexts.lock().unwrap().push(messages.to_vec());
        self.check_failure()?;

        let scripted = self.replies.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| LlmResponse {
            content: format!(
                "Mock reply to: {}",
                messages.last().map(|m| m.content.as_str()).unwrap_or("")
            ),
            total_tokens: 0,
        }))
    }

    async fn one_shot(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _json_mode: bool,
    ) -> BackendResult<String> {
        self.check_failure()?;

        let scripted = self.one_shot_replies.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| format!("Mock one-shot reply to: {}", user_prompt)))
    }

    fn backend_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
