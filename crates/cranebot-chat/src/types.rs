//! Core value types for the conversation engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cranebot_core::types::Author;

use crate::live::PLACEHOLDER_VIBRATION;

// =============================================================================
// ResponseRule
// =============================================================================

/// One entry of the static rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRule {
    /// Normalized trigger phrase (lowercase, trimmed).
    pub key: String,
    /// Response text, possibly with `{vibration}`-style placeholders.
    pub template: String,
    /// Suggested follow-up phrases, in display order.
    #[serde(default)]
    pub quick_replies: Vec<String>,
}

impl ResponseRule {
    pub fn new(key: &str, template: &str, quick_replies: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            template: template.to_string(),
            quick_replies: quick_replies.iter().map(|r| r.to_string()).collect(),
        }
    }

    /// Whether resolving this rule needs a fresh live reading.
    pub fn has_live_placeholders(&self) -> bool {
        self.template.contains(PLACEHOLDER_VIBRATION)
    }
}

// =============================================================================
// Resolution output
// =============================================================================

/// Which step of the matching pipeline selected a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Normalized input equals a rule key.
    Exact,
    /// Normalized input contains a rule key.
    Substring,
    /// Normalized input contains a fallback keyword.
    Keyword,
    /// Nothing matched.
    Default,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKind::Exact => write!(f, "exact"),
            MatchKind::Substring => write!(f, "substring"),
            MatchKind::Keyword => write!(f, "keyword"),
            MatchKind::Default => write!(f, "default"),
        }
    }
}

/// A rule copy with its template materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedResponse {
    /// Key of the rule that was selected.
    pub rule_key: String,
    /// Final text with placeholders substituted.
    pub text: String,
    /// Quick replies of the selected rule, unchanged.
    pub quick_replies: Vec<String>,
    /// Whether `text` carries a live-reading marker.
    pub has_live_data: bool,
    /// How the rule was selected.
    pub match_kind: MatchKind,
}

// =============================================================================
// ChatMessage
// =============================================================================

/// An immutable entry in a session's conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Strictly increasing within a session.
    pub id: u64,
    pub text: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    /// Drives the "Live IoT Data" styling in the widget.
    pub has_live_data: bool,
    /// Follow-ups offered under this message. Always empty for user messages.
    #[serde(default)]
    pub quick_replies: Vec<String>,
}

impl ChatMessage {
    pub fn is_bot(&self) -> bool {
        self.author == Author::Bot
    }
}
