pub mod backends;
pub mod cli;
pub mod config;
pub mod console;
pub mod context_management;
pub mod conversations;

pub use backends::{
    BackendError, LlmBackend, LlmResponse, MockBackend, OpenAICompatibleBackend,
    OpenAICompatibleConfig, MAX_REPLY_TOKENS,
};
pub use config::{AppConfig, BackendConfig};
pub use console::{console, init_console, Console, VerbosityLevel};
pub use context_management::{
    CompactionConfig, CompactionStrategy, ContextStrategy, ContextStrategyConfig, TokenCounter,
    TruncationConfig, TruncationStrategy,
};
pub use conversations::{
    Conversation, ConversationError, ConversationMessage, ConversationSession, MessageSummarizer,
    Role,
};
