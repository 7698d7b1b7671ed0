mod error;
mod message;
mod session;
mod summarizer;

pub use error::ConversationError;
pub use message::{Conversation, ConversationMessage, Role};
pub use session::ConversationSession;
pub use summarizer::MessageSummarizer;
