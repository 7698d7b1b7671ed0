use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backends::MAX_REPLY_TOKENS;
use crate::context_management::{ContextStrategy, TokenCounter};
use crate::conversations::{
    ConversationError, ConversationMessage, MessageSummarizer, Role,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionConfig {
    /// Token budget the window plus the maximum reply must fit into.
    pub compaction_threshold: usize,
    /// Number of trailing messages kept verbatim, newest exchange by default.
    pub preserve_recent: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            compaction_threshold: MAX_REPLY_TOKENS as usize,
            preserve_recent: 2,
        }
    }
}

/// Summarization-based compaction: when the counted history plus the
/// expected reply no longer fits the threshold, everything except the most
/// recent exchange is replaced by a single synthetic system message carrying
/// a model-generated summary. A malformed summary is an error, not a
/// fallback to truncation.
pub struct CompactionStrategy {
    config: CompactionConfig,
    counter: TokenCounter,
    summarizer: MessageSummarizer,
}

impl CompactionStrategy {
    pub fn new(config: CompactionConfig, counter: TokenCounter, summarizer: MessageSummarizer) -> Self {
        Self {
            config,
            counter,
            summarizer,
        }
    }

    fn needs_compaction(&self, history: &[ConversationMessage]) -> bool {
        self.counter.count(history) + MAX_REPLY_TOKENS as usize > self.config.compaction_threshold
    }

    fn render_summary(&self, replaced: usize, summary: &[ConversationMessage]) -> String {
        let transcript = summary
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "[Conversation so far, compacted from {} messages]\n{}",
            replaced, transcript
        )
    }
}

#[async_trait]
impl ContextStrategy for CompactionStrategy {
    async fn select(
        &self,
        history: &[ConversationMessage],
    ) -> Result<Vec<ConversationMessage>, ConversationError> {
        if history.len() <= self.config.preserve_recent || !self.needs_compaction(history) {
            return Ok(history.to_vec());
        }

        let split = history.len() - self.config.preserve_recent;
        let (old, recent) = history.split_at(split);

        let summary = self.summarizer.summarize(old).await?;
        let summary_message =
            ConversationMessage::new(Role::System, self.render_summary(old.len(), &summary));

        let mut window = Vec::with_capacity(recent.len() + 1);
        window.push(summary_message);
        window.extend_from_slice(recent);
        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockBackend;
    use std::sync::Arc;

    fn strategy_with(threshold: usize, backend: Arc<MockBackend>) -> CompactionStrategy {
        let config = CompactionConfig {
            compaction_threshold: threshold,
            preserve_recent: 2,
        };
        CompactionStrategy::new(
            config,
            TokenCounter::new().unwrap(),
            MessageSummarizer::new(backend),
        )
    }

    fn history_of(n: usize) -> Vec<ConversationMessage> {
        (0..n)
            .map(|i| {
                let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                ConversationMessage::new(role, format!("turn number {}", i))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_under_threshold_is_identity() {
        let backend = Arc::new(MockBackend::new());
        // Threshold far above anything the small history could count to.
        let strategy = strategy_with(1_000_000, backend);
        let history = history_of(6);

        let window = strategy.select(&history).await.unwrap();
        assert_eq!(window, history);
    }

    #[tokio::test]
    async fn test_over_threshold_compacts_to_summary_plus_tail() {
        let backend = Arc::new(MockBackend::new().with_one_shot_reply(
            r#"{"summary": [{"role": "assistant", "content": "We exchanged four turns."}]}"#,
        ));
        let strategy = strategy_with(1, Arc::clone(&backend));
        let history = history_of(6);

        let window = strategy.select(&history).await.unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].role, Role::System);
        assert!(window[0].content.contains("compacted from 4 messages"));
        assert!(window[0].content.contains("We exchanged four turns."));
        assert_eq!(window[1..], history[4..]);
    }

    #[tokio::test]
    async fn test_tiny_history_is_never_compacted() {
        let backend = Arc::new(MockBackend::new());
        let strategy = strategy_with(1, backend);
        let history = history_of(2);

        let window = strategy.select(&history).await.unwrap();
        assert_eq!(window, history);
    }

    #[tokio::test]
    async fn test_malformed_summary_surfaces_as_error() {
        let backend = Arc::new(MockBackend::new().with_one_shot_reply("not json at all"));
        let strategy = strategy_with(1, backend);
        let history = history_of(6);

        let err = strategy.select(&history).await.unwrap_err();
        assert!(matches!(err, ConversationError::MalformedSummary { .. }));
    }
}
