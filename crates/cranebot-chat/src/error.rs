//! Error types for the conversation engine.

use cranebot_core::error::CraneBotError;

/// Errors from chat sessions and rule table construction.
///
/// Resolving text never fails; these only surface at the session and
/// table-loading edges.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("session is closed: {0}")]
    SessionClosed(uuid::Uuid),
    #[error("invalid rule table: {0}")]
    InvalidRuleTable(String),
    #[error("session state poisoned: {0}")]
    StatePoisoned(String),
}

impl From<ChatError> for CraneBotError {
    fn from(err: ChatError) -> Self {
        CraneBotError::Chat(err.to_string())
    }
}
