use anyhow::{Context, Result};
use std::sync::Arc;
use tiktoken_rs::CoreBPE;

use crate::conversations::ConversationMessage;

// Chat-format framing constants for the gpt-4 family: every message costs
// a fixed overhead for its role/delimiter tokens, a name field costs one
// extra, and every reply is primed with <|start|>assistant<|message|>.
const TOKENS_PER_MESSAGE: usize = 3;
const TOKENS_PER_NAME: usize = 1;
const REPLY_PRIMING_TOKENS: usize = 3;

/// Exact token accounting for a list of chat messages, matching what the
/// provider bills for the request. Under- or over-counting here means
/// rejected requests, so the formula mirrors the provider's published one.
#[derive(Clone)]
pub struct TokenCounter {
    bpe: Arc<CoreBPE>,
}

impl TokenCounter {
    /// Build a counter over the cl100k_base vocabulary (gpt-4 family).
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base().context("Failed to load cl100k_base vocabulary")?;
        Ok(Self { bpe: Arc::new(bpe) })
    }

    /// Number of tokens the provider would bill for this message list.
    /// Pure function of the input and the vocabulary.
    pub fn count(&self, messages: &[ConversationMessage]) -> usize {
        let mut num_tokens = 0;
        for message in messages {
            num_tokens += TOKENS_PER_MESSAGE;
            num_tokens += self.encoded_len(message.role.as_str());
            num_tokens += self.encoded_len(&message.content);
            if let Some(name) = &message.name {
                num_tokens += self.encoded_len(name);
                num_tokens += TOKENS_PER_NAME;
            }
        }
        num_tokens + REPLY_PRIMING_TOKENS
    }

    fn encoded_len(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}
