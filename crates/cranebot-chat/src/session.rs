//! Chat session controller.
//!
//! A `ChatSession` owns one conversation. User messages are appended
//! immediately; bot replies are produced by a background worker after a
//! simulated typing delay. Replies are serialized: the worker handles turns
//! one at a time, so bot messages always appear in submission order. A queued
//! turn's delay is sampled, announced and started only once the reply before
//! it has been appended.
//!
//! Closing (or dropping) the session cancels the worker, and pending replies
//! are discarded instead of landing in a dead conversation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use cranebot_core::config::ChatConfig;
use cranebot_core::events::DomainEvent;
use cranebot_core::types::Author;

use crate::error::ChatError;
use crate::resolver::ResponseResolver;
use crate::rules::GREETING;
use crate::state::ConversationState;
use crate::types::ChatMessage;

// =============================================================================
// ReplyDelay
// =============================================================================

/// Uniform typing delay in `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyDelay {
    min: Duration,
    max: Duration,
}

impl ReplyDelay {
    /// Bounds are swapped if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// The same delay every time.
    pub fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay)
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(config.reply_delay_min(), config.reply_delay_max())
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample(&self) -> Duration {
        let min_ms = self.min.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        if min_ms >= max_ms {
            return self.min;
        }
        Duration::from_millis(rand::rng().random_range(min_ms..max_ms))
    }
}

impl Default for ReplyDelay {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}

// =============================================================================
// ChatSession
// =============================================================================

/// A user turn waiting for its bot reply.
#[derive(Debug)]
struct PendingTurn {
    message_id: u64,
    text: String,
}

/// One open conversation with the bot.
pub struct ChatSession {
    id: Uuid,
    state: Arc<Mutex<ConversationState>>,
    turns: mpsc::UnboundedSender<PendingTurn>,
    events: broadcast::Sender<DomainEvent>,
    cancel: CancellationToken,
    max_message_length: usize,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl ChatSession {
    /// Open a session and spawn its reply worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &ChatConfig, resolver: ResponseResolver) -> Self {
        Self::start_with_delay(config, resolver, ReplyDelay::from_config(config))
    }

    /// Like [`ChatSession::start`] with an explicit delay policy.
    pub fn start_with_delay(
        config: &ChatConfig,
        resolver: ResponseResolver,
        delay: ReplyDelay,
    ) -> Self {
        let id = Uuid::new_v4();
        let mut state = ConversationState::new(id, config.start_visible);
        if config.greeting {
            let quick_replies = resolver.rules().default_rule().quick_replies.clone();
            // A fresh state is open, so this cannot fail.
            let _ = state.post_bot_message(GREETING, quick_replies);
        }

        let state = Arc::new(Mutex::new(state));
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        let (turns, turn_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        tokio::spawn(reply_worker(
            id,
            turn_rx,
            Arc::clone(&state),
            resolver,
            delay,
            events.clone(),
            cancel.clone(),
        ));

        tracing::info!(session_id = %id, "Chat session started");
        let _ = events.send(DomainEvent::SessionStarted {
            session_id: id,
            timestamp: Utc::now(),
        });

        Self {
            id,
            state,
            turns,
            events,
            cancel,
            max_message_length: config.max_message_length,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Submit user text.
    ///
    /// Blank text is ignored and returns `Ok(None)`. Otherwise the user message
    /// is appended and its id returned; the bot reply follows after the
    /// typing delay. `ReplyScheduled` is emitted when that delay starts.
    pub fn submit(&self, text: &str) -> Result<Option<u64>, ChatError> {
        if text.trim().is_empty() {
            tracing::debug!(session_id = %self.id, "Ignoring blank submission");
            return Ok(None);
        }
        if text.chars().count() > self.max_message_length {
            return Err(ChatError::MessageTooLong(self.max_message_length));
        }
        // The worker is gone; nothing would ever answer this turn.
        if self.turns.is_closed() {
            return Err(ChatError::SessionClosed(self.id));
        }

        let message_id = {
            let mut state = self.lock_state()?;
            state.begin_turn(text)?.id
        };

        tracing::debug!(session_id = %self.id, message_id, "User message accepted");
        self.emit(DomainEvent::MessageAppended {
            session_id: self.id,
            message_id,
            author: Author::User,
            has_live_data: false,
            timestamp: Utc::now(),
        });

        self.turns
            .send(PendingTurn {
                message_id,
                text: text.to_string(),
            })
            .map_err(|_| ChatError::SessionClosed(self.id))?;

        Ok(Some(message_id))
    }

    /// Quick replies for the latest bot message.
    pub fn quick_replies(&self) -> Result<Vec<String>, ChatError> {
        Ok(self.lock_state()?.quick_replies())
    }

    /// Expand the widget and clear the unseen badge.
    pub fn open(&self) -> Result<(), ChatError> {
        self.set_visible(true)
    }

    /// Collapse the widget; replies from now on count as unseen.
    pub fn collapse(&self) -> Result<(), ChatError> {
        self.set_visible(false)
    }

    pub fn set_visible(&self, visible: bool) -> Result<(), ChatError> {
        let changed = self.lock_state()?.set_visible(visible);
        if changed {
            tracing::debug!(session_id = %self.id, visible, "Chat visibility changed");
            self.emit(DomainEvent::VisibilityChanged {
                session_id: self.id,
                visible,
                timestamp: Utc::now(),
            });
        }
        Ok(())
    }

    /// Tear the session down. Pending replies are cancelled.
    ///
    /// Idempotent.
    pub fn close(&self) -> Result<(), ChatError> {
        let dropped_replies = {
            let mut state = self.lock_state()?;
            if state.is_closed() {
                return Ok(());
            }
            state.close()
        };
        self.cancel.cancel();

        tracing::info!(session_id = %self.id, dropped_replies, "Chat session closed");
        self.emit(DomainEvent::SessionClosed {
            session_id: self.id,
            dropped_replies,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A copy of the current state for rendering.
    pub fn snapshot(&self) -> Result<ConversationState, ChatError> {
        Ok(self.lock_state()?.clone())
    }

    pub fn message(&self, id: u64) -> Result<Option<ChatMessage>, ChatError> {
        Ok(self.lock_state()?.message(id).cloned())
    }

    /// Subscribe to this session's events.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, ConversationState>, ChatError> {
        self.state
            .lock()
            .map_err(|e| ChatError::StatePoisoned(e.to_string()))
    }

    fn emit(&self, event: DomainEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(session_id = %self.id, error = %e, "Failed to close chat session on drop");
            self.cancel.cancel();
        }
    }
}

// =============================================================================
// Reply worker
// =============================================================================

/// Deliver bot replies one turn at a time until cancelled.
///
/// If the worker stops for any other reason it closes the session, so no
/// turn is left waiting for a reply that will never come.
async fn reply_worker(
    session_id: Uuid,
    mut turns: mpsc::UnboundedReceiver<PendingTurn>,
    state: Arc<Mutex<ConversationState>>,
    resolver: ResponseResolver,
    delay: ReplyDelay,
    events: broadcast::Sender<DomainEvent>,
    cancel: CancellationToken,
) {
    loop {
        let turn = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            next = turns.recv() => match next {
                Some(turn) => turn,
                None => break,
            },
        };

        let wait = delay.sample();
        let delay_ms = wait.as_millis() as u64;
        tracing::debug!(session_id = %session_id, message_id = turn.message_id, delay_ms, "Reply scheduled");
        let _ = events.send(DomainEvent::ReplyScheduled {
            session_id,
            message_id: turn.message_id,
            delay_ms,
            timestamp: Utc::now(),
        });

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(session_id = %session_id, message_id = turn.message_id, "Pending reply cancelled");
                break;
            }
            () = tokio::time::sleep(wait) => {}
        }

        let response = resolver.resolve(&turn.text);
        let rule_key = response.rule_key.clone();

        // The closed check happens under the same lock as the append, so a
        // reply can never land after close() returns.
        let appended = match state.lock() {
            Ok(mut guard) => guard
                .complete_turn(response)
                .map(|msg| (msg.id, msg.has_live_data)),
            Err(e) => Err(ChatError::StatePoisoned(e.to_string())),
        };

        match appended {
            Ok((message_id, has_live_data)) => {
                tracing::debug!(
                    session_id = %session_id,
                    message_id,
                    reply_to = turn.message_id,
                    rule_key = %rule_key,
                    "Bot reply appended"
                );
                let _ = events.send(DomainEvent::MessageAppended {
                    session_id,
                    message_id,
                    author: Author::Bot,
                    has_live_data,
                    timestamp: Utc::now(),
                });
            }
            Err(ChatError::SessionClosed(_)) => break,
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Dropping bot reply");
                break;
            }
        }
    }

    let newly_closed = {
        let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_closed() {
            None
        } else {
            Some(guard.close())
        }
    };
    cancel.cancel();
    if let Some(dropped_replies) = newly_closed {
        tracing::warn!(session_id = %session_id, dropped_replies, "Reply worker stopped; session closed");
        let _ = events.send(DomainEvent::SessionClosed {
            session_id,
            dropped_replies,
            timestamp: Utc::now(),
        });
    }
    tracing::debug!(session_id = %session_id, "Reply worker stopped");
}

// =============================================================================
// Tests
// =============================================================================
