use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::backends::LlmBackend;
use crate::conversations::{ConversationError, ConversationMessage, MessageSummarizer};

mod compaction_strategy;
mod token_counter;
mod truncation_strategy;

pub use compaction_strategy::{CompactionConfig, CompactionStrategy};
pub use token_counter::TokenCounter;
pub use truncation_strategy::{TruncationConfig, TruncationStrategy};

/// Builds the context window to send to the model out of the full history.
/// The history itself is never mutated; the window is a fresh selection
/// (or compacted replacement) per request.
#[async_trait]
pub trait ContextStrategy: Send + Sync {
    async fn select(
        &self,
        history: &[ConversationMessage],
    ) -> Result<Vec<ConversationMessage>, ConversationError>;
}

/// Closed set of window strategies, selected by configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ContextStrategyConfig {
    Truncation(TruncationConfig),
    Compaction(CompactionConfig),
}

impl Default for ContextStrategyConfig {
    fn default() -> Self {
        ContextStrategyConfig::Truncation(TruncationConfig::default())
    }
}

impl ContextStrategyConfig {
    pub fn into_strategy(
        self,
        counter: TokenCounter,
        backend: Arc<dyn LlmBackend>,
    ) -> Box<dyn ContextStrategy> {
        match self {
            ContextStrategyConfig::Truncation(config) => {
                Box::new(TruncationStrategy::new(config))
            }
            ContextStrategyConfig::Compaction(config) => Box::new(CompactionStrategy::new(
                config,
                counter,
                MessageSummarizer::new(backend),
            )),
        }
    }
}
