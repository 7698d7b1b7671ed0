use std::sync::Arc;

use crate::backends::{LlmBackend, MAX_REPLY_TOKENS};
use crate::console::console;
use crate::context_management::ContextStrategy;
use crate::conversations::{Conversation, ConversationError, ConversationMessage, Role};

/// One interactive conversation: owns the full history, builds a bounded
/// context window per turn through the injected strategy, and delegates the
/// actual completion to the injected backend. Single-threaded, one blocking
/// call per turn.
pub struct ConversationSession {
    conversation: Conversation,
    backend: Arc<dyn LlmBackend>,
    strategy: Box<dyn ContextStrategy>,
    hard_token_limit: u32,
}

impl ConversationSession {
    pub fn new(backend: Arc<dyn LlmBackend>, strategy: Box<dyn ContextStrategy>) -> Self {
        Self {
            conversation: Conversation::new(),
            backend,
            strategy,
            hard_token_limit: MAX_REPLY_TOKENS,
        }
    }

    pub fn with_hard_token_limit(mut self, limit: u32) -> Self {
        self.hard_token_limit = limit;
        self
    }

    pub fn history(&self) -> &[ConversationMessage] {
        self.conversation.messages()
    }

    /// Send a user turn and return the assistant reply.
    pub async fn send(&mut self, prompt: &str) -> Result<String, ConversationError> {
        self.send_as(prompt, Role::User).await
    }

    /// Send a turn under an explicit role. The input is committed to the
    /// history before any network interaction; on failure the history keeps
    /// that uncommitted turn with no paired reply, so a caller may retry
    /// the input or abandon the session.
    pub async fn send_as(&mut self, prompt: &str, role: Role) -> Result<String, ConversationError> {
        self.conversation.add_message(role, prompt);

        let window = self.strategy.select(self.conversation.messages()).await?;

        if let Ok(rendered) = serde_json::to_string(&window) {
            console().debug(&format!("Context sent to model: {}", rendered));
        }

        let response = self.backend.converse(&window, false).await?;

        // Post-call invariant: the provider reports what it actually
        // consumed. Overrun discards the computed reply, the turn is not
        // committed.
        if response.total_tokens > self.hard_token_limit {
            return Err(ConversationError::ContextWindowExceeded {
                used: response.total_tokens,
                limit: self.hard_token_limit,
            });
        }

        self.conversation.add_assistant_message(response.content.clone());
        Ok(response.content)
    }
}
