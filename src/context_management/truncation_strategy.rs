use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context_management::ContextStrategy;
use crate::conversations::{ConversationError, ConversationMessage};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruncationConfig {
    pub window_size: usize,
}

impl Default for TruncationConfig {
    fn default() -> Self {
        Self { window_size: 4 }
    }
}

/// Keep the last `window_size` messages, unconditionally. Primitive and
/// lossy: everything earlier is dropped silently, and nothing here checks
/// the token cost of what remains. A long enough tail can still blow the
/// hard limit, which surfaces as ContextWindowExceeded after the call.
pub struct TruncationStrategy {
    config: TruncationConfig,
}

impl TruncationStrategy {
    pub fn new(config: TruncationConfig) -> Self {
        Self { config }
    }
}

impl Default for TruncationStrategy {
    fn default() -> Self {
        Self::new(TruncationConfig::default())
    }
}

#[async_trait]
impl ContextStrategy for TruncationStrategy {
    async fn select(
        &self,
        history: &[ConversationMessage],
    ) -> Result<Vec<ConversationMessage>, ConversationError> {
        let start = history.len().saturating_sub(self.config.window_size);
        Ok(history[start..].to_vec())
    }
}
