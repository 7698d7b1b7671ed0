use async_trait::async_trait;

use crate::conversations::ConversationMessage;

pub mod error;
pub mod mock;
pub mod openai_compatible;

pub use error::{BackendError, BackendResult};
pub use mock::MockBackend;
pub use openai_compatible::{OpenAICompatibleBackend, OpenAICompatibleConfig};

/// Upper bound on reply size requested from the model, in tokens.
pub const MAX_REPLY_TOKENS: u32 = 4096;

/// Sampling temperature used for every request. Fixed by design intent,
/// not exposed through configuration.
pub const TEMPERATURE: f32 = 0.79;

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    /// Total tokens billed for the request and reply together, as reported
    /// by the provider.
    pub total_tokens: u32,
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Send a context window and return the assistant reply together with
    /// the provider-reported token usage.
    async fn converse(
        &self,
        messages: &[ConversationMessage],
        json_mode: bool,
    ) -> BackendResult<LlmResponse>;

    /// Single system+user exchange outside any conversation history.
    async fn one_shot(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        json_mode: bool,
    ) -> BackendResult<String>;

    fn backend_name(&self) -> &str;

    fn model_name(&self) -> &str;
}
