use thiserror::Error;

use crate::backends::BackendError;

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("Invalid role '{role}'. Valid roles are 'system', 'user', or 'assistant'")]
    InvalidRole { role: String },

    /// The provider reported more tokens consumed than the hard limit
    /// allows. The reply is discarded; the turn is not committed.
    #[error("Context window exceeded: {used} tokens used against a hard limit of {limit}. Try again with a shorter prompt")]
    ContextWindowExceeded { used: u32, limit: u32 },

    #[error("Malformed summary from model: {detail}")]
    MalformedSummary { detail: String },

    #[error(transparent)]
    Backend(#[from] BackendError),
}
