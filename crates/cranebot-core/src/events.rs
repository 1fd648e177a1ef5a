use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Author;

/// Domain events emitted by a chat session.
///
/// Events are broadcast after the state change they describe has been
/// applied, so a subscriber reacting to `MessageAppended` can already read the
/// message from the session snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum DomainEvent {
    /// A session was created and its reply worker started.
    SessionStarted {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A message was appended to the conversation log.
    MessageAppended {
        session_id: Uuid,
        message_id: u64,
        author: Author,
        has_live_data: bool,
        timestamp: DateTime<Utc>,
    },

    /// The typing timer for a user message started.
    ///
    /// Emitted when the delay actually begins, so for a queued turn this is
    /// after the previous reply was appended. `delay_ms` counts from
    /// `timestamp`.
    ReplyScheduled {
        session_id: Uuid,
        message_id: u64,
        delay_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The widget was expanded or collapsed.
    VisibilityChanged {
        session_id: Uuid,
        visible: bool,
        timestamp: DateTime<Utc>,
    },

    /// The session was torn down; pending replies were dropped.
    SessionClosed {
        session_id: Uuid,
        dropped_replies: usize,
        timestamp: DateTime<Utc>,
    },
}
