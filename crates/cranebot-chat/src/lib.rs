//! Rule-based conversation engine for the CraneBot chat widget.
//!
//! Resolves free text against a static rule table, fills response templates
//! with simulated live crane readings, and runs chat sessions whose bot
//! replies arrive after a cancellable typing delay.

pub mod error;
pub mod live;
pub mod resolver;
pub mod rules;
pub mod session;
pub mod state;
pub mod types;

pub use error::ChatError;
pub use live::{FixedReading, LiveReading, RandomReadings, ReadingSource};
pub use resolver::ResponseResolver;
pub use rules::{KeywordFallback, KeywordRoute, RuleTable};
pub use session::{ChatSession, ReplyDelay};
pub use state::{ConversationState, SessionPhase};
pub use types::{ChatMessage, MatchKind, ResolvedResponse, ResponseRule};

pub use cranebot_core::types::Author;
