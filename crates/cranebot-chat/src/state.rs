//! Per-session conversation state.
//!
//! Turn lifecycle:
//! - Idle -> AwaitingReply (user message accepted)
//! - AwaitingReply -> AwaitingReply (another message queued behind it)
//! - AwaitingReply -> Idle (last pending bot reply appended)
//! - Idle | AwaitingReply -> Closed (session torn down, pending replies dropped)
//!
//! Closed is terminal. The message log is append-only in every phase.

use std::fmt;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use cranebot_core::types::Author;

use crate::error::ChatError;
use crate::types::{ChatMessage, ResolvedResponse};

/// Coarse phase of a session, derived from its counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// No reply is pending.
    Idle,
    /// At least one bot reply is pending.
    AwaitingReply,
    /// The session was torn down.
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "Idle"),
            SessionPhase::AwaitingReply => write!(f, "AwaitingReply"),
            SessionPhase::Closed => write!(f, "Closed"),
        }
    }
}

/// Everything the widget needs to render one conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    session_id: Uuid,
    messages: Vec<ChatMessage>,
    pending_replies: usize,
    unseen_reply_count: u32,
    visible: bool,
    closed: bool,
    next_id: u64,
}

impl ConversationState {
    pub fn new(session_id: Uuid, visible: bool) -> Self {
        Self {
            session_id,
            messages: Vec::new(),
            pending_replies: 0,
            unseen_reply_count: 0,
            visible,
            closed: false,
            next_id: 1,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Messages in chronological order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn message(&self, id: u64) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn is_awaiting_reply(&self) -> bool {
        !self.closed && self.pending_replies > 0
    }

    pub fn pending_replies(&self) -> usize {
        self.pending_replies
    }

    pub fn unseen_reply_count(&self) -> u32 {
        self.unseen_reply_count
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn phase(&self) -> SessionPhase {
        if self.closed {
            SessionPhase::Closed
        } else if self.pending_replies > 0 {
            SessionPhase::AwaitingReply
        } else {
            SessionPhase::Idle
        }
    }

    /// Quick replies to show under the latest bot message.
    ///
    /// Empty while a reply is pending or when the user spoke last.
    pub fn quick_replies(&self) -> Vec<String> {
        if self.is_awaiting_reply() {
            return Vec::new();
        }
        match self.last_message() {
            Some(msg) if msg.is_bot() => msg.quick_replies.clone(),
            _ => Vec::new(),
        }
    }

    /// Append a bot message that does not answer a user turn.
    pub fn post_bot_message(
        &mut self,
        text: &str,
        quick_replies: Vec<String>,
    ) -> Result<&ChatMessage, ChatError> {
        self.ensure_open()?;
        let has_live_data = crate::live::has_live_marker(text);
        Ok(self.append(Author::Bot, text.to_string(), has_live_data, quick_replies))
    }

    /// Record a user message and mark a reply as pending.
    pub fn begin_turn(&mut self, text: &str) -> Result<&ChatMessage, ChatError> {
        self.ensure_open()?;
        self.pending_replies += 1;
        Ok(self.append(Author::User, text.to_string(), false, Vec::new()))
    }

    /// Append the bot reply for the oldest pending turn.
    ///
    /// Counts the reply as unseen while the widget is collapsed.
    pub fn complete_turn(&mut self, response: ResolvedResponse) -> Result<&ChatMessage, ChatError> {
        self.ensure_open()?;
        self.pending_replies = self.pending_replies.saturating_sub(1);
        if !self.visible {
            self.unseen_reply_count += 1;
        }
        Ok(self.append(
            Author::Bot,
            response.text,
            response.has_live_data,
            response.quick_replies,
        ))
    }

    /// Expand or collapse the widget. Expanding clears the unseen count.
    ///
    /// Returns whether visibility changed.
    pub fn set_visible(&mut self, visible: bool) -> bool {
        if visible {
            self.unseen_reply_count = 0;
        }
        let changed = self.visible != visible;
        self.visible = visible;
        changed
    }

    /// Mark the session closed, returning how many replies were dropped.
    ///
    /// Idempotent: a second call drops nothing.
    pub fn close(&mut self) -> usize {
        if self.closed {
            return 0;
        }
        self.closed = true;
        std::mem::take(&mut self.pending_replies)
    }

    fn ensure_open(&self) -> Result<(), ChatError> {
        if self.closed {
            Err(ChatError::SessionClosed(self.session_id))
        } else {
            Ok(())
        }
    }

    fn append(
        &mut self,
        author: Author,
        text: String,
        has_live_data: bool,
        quick_replies: Vec<String>,
    ) -> &ChatMessage {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id,
            text,
            author,
            created_at: Utc::now(),
            has_live_data,
            quick_replies,
        });
        &self.messages[self.messages.len() - 1]
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MatchKind;

    fn response(text: &str, quick_replies: &[&str]) -> ResolvedResponse {
        ResolvedResponse {
            rule_key: "test".to_string(),
            text: text.to_string(),
            quick_replies: quick_replies.iter().map(|r| r.to_string()).collect(),
            has_live_data: crate::live::has_live_marker(text),
            match_kind: MatchKind::Exact,
        }
    }

    fn new_state(visible: bool) -> ConversationState {
        ConversationState::new(Uuid::new_v4(), visible)
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(SessionPhase::Idle.to_string(), "Idle");
        assert_eq!(SessionPhase::AwaitingReply.to_string(), "AwaitingReply");
        assert_eq!(SessionPhase::Closed.to_string(), "Closed");
    }

    #[test]
    fn test_new_state_is_idle_and_empty() {
        let state = new_state(false);
        assert_eq!(state.phase(), SessionPhase::Idle);
        assert!(state.messages().is_empty());
        assert!(!state.is_awaiting_reply());
        assert_eq!(state.unseen_reply_count(), 0);
        assert!(state.quick_replies().is_empty());
    }

    #[test]
    fn test_turn_happy_path() {
        let mut state = new_state(true);
        let user_id = state.begin_turn("hello").unwrap().id;
        assert_eq!(state.phase(), SessionPhase::AwaitingReply);
        assert!(state.is_awaiting_reply());

        let bot = state.complete_turn(response("Hi!", &["a"])).unwrap().clone();
        assert!(bot.id > user_id);
        assert_eq!(bot.author, Author::Bot);
        assert_eq!(state.phase(), SessionPhase::Idle);
        assert_eq!(state.messages().len(), 2);
        assert_eq!(state.messages()[0].author, Author::User);
        assert_eq!(state.messages()[0].text, "hello");
    }

    #[test]
    fn test_ids_strictly_increase() {
        let mut state = new_state(true);
        state.post_bot_message("welcome", vec![]).unwrap();
        for i in 0..5 {
            state.begin_turn(&format!("q{}", i)).unwrap();
            state.complete_turn(response("a", &[])).unwrap();
        }
        let ids: Vec<u64> = state.messages().iter().map(|m| m.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids.len(), 11);
    }

    #[test]
    fn test_queued_turns_stay_awaiting_until_last_reply() {
        let mut state = new_state(true);
        state.begin_turn("one").unwrap();
        state.begin_turn("two").unwrap();
        assert_eq!(state.pending_replies(), 2);

        state.complete_turn(response("r1", &[])).unwrap();
        assert_eq!(state.phase(), SessionPhase::AwaitingReply);
        state.complete_turn(response("r2", &[])).unwrap();
        assert_eq!(state.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_unseen_counts_only_while_hidden() {
        let mut state = new_state(false);
        state.begin_turn("one").unwrap();
        state.complete_turn(response("r1", &[])).unwrap();
        state.begin_turn("two").unwrap();
        state.complete_turn(response("r2", &[])).unwrap();
        assert_eq!(state.unseen_reply_count(), 2);

        assert!(state.set_visible(true));
        assert_eq!(state.unseen_reply_count(), 0);

        state.begin_turn("three").unwrap();
        state.complete_turn(response("r3", &[])).unwrap();
        assert_eq!(state.unseen_reply_count(), 0);
    }

    #[test]
    fn test_set_visible_reports_change() {
        let mut state = new_state(false);
        assert!(!state.set_visible(false));
        assert!(state.set_visible(true));
        assert!(!state.set_visible(true));
        assert!(state.is_visible());
    }

    #[test]
    fn test_greeting_is_not_unseen() {
        let mut state = new_state(false);
        state.post_bot_message("welcome", vec!["x".into()]).unwrap();
        assert_eq!(state.unseen_reply_count(), 0);
        assert_eq!(state.quick_replies(), vec!["x"]);
    }

    #[test]
    fn test_quick_replies_follow_last_bot_message() {
        let mut state = new_state(true);
        state.begin_turn("hello").unwrap();
        // Hidden while a reply is pending.
        assert!(state.quick_replies().is_empty());

        state.complete_turn(response("Hi", &["Show live data"])).unwrap();
        assert_eq!(state.quick_replies(), vec!["Show live data"]);

        state.begin_turn("safety features").unwrap();
        state.complete_turn(response("Safety", &[])).unwrap();
        assert!(state.quick_replies().is_empty());
    }

    #[test]
    fn test_live_marker_on_bot_message() {
        let mut state = new_state(true);
        state.begin_turn("show live data").unwrap();
        let msg = state.complete_turn(response("🔴 LIVE", &[])).unwrap();
        assert!(msg.has_live_data);
    }

    #[test]
    fn test_close_drops_pending_and_blocks_appends() {
        let mut state = new_state(true);
        state.begin_turn("one").unwrap();
        state.begin_turn("two").unwrap();

        assert_eq!(state.close(), 2);
        assert_eq!(state.phase(), SessionPhase::Closed);
        assert!(!state.is_awaiting_reply());
        assert_eq!(state.close(), 0);

        assert!(matches!(
            state.complete_turn(response("late", &[])),
            Err(ChatError::SessionClosed(_))
        ));
        assert!(state.begin_turn("three").is_err());
        assert!(state.post_bot_message("x", vec![]).is_err());
        assert_eq!(state.messages().len(), 2);
    }

    #[test]
    fn test_message_lookup() {
        let mut state = new_state(true);
        let id = state.begin_turn("find me").unwrap().id;
        assert_eq!(state.message(id).unwrap().text, "find me");
        assert!(state.message(999).is_none());
    }
}
