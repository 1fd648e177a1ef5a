use serde::{Deserialize, Serialize};
use std::fmt;

/// Who wrote a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    /// Text typed (or quick-replied) by the person using the widget.
    User,
    /// Text produced by the rule-based responder.
    Bot,
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Author::User => write!(f, "user"),
            Author::Bot => write!(f, "bot"),
        }
    }
}
