//! Text-to-response resolution.
//!
//! Matching runs in strict priority order and the first hit wins:
//! exact key, substring containment in table order, keyword fallback, and
//! finally the default rule. Overlapping keys resolve by declaration order,
//! not by length, so a key that contains another key must be declared first
//! to ever win a substring match.

use std::sync::Arc;

use crate::live::{has_live_marker, RandomReadings, ReadingSource};
use crate::rules::{KeywordFallback, RuleTable, DEFAULT_RULE_KEY};
use crate::types::{MatchKind, ResolvedResponse, ResponseRule};

/// Lowercase and trim raw input.
pub fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Maps user text to a materialized response.
///
/// Cheap to clone; the tables and the reading source are shared.
#[derive(Clone)]
pub struct ResponseResolver {
    rules: Arc<RuleTable>,
    fallback: Arc<KeywordFallback>,
    readings: Arc<dyn ReadingSource>,
}

impl std::fmt::Debug for ResponseResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseResolver")
            .field("rules", &self.rules.len())
            .field("fallback_routes", &self.fallback.routes().len())
            .finish()
    }
}

impl Default for ResponseResolver {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ResponseResolver {
    pub fn new(
        rules: Arc<RuleTable>,
        fallback: Arc<KeywordFallback>,
        readings: Arc<dyn ReadingSource>,
    ) -> Self {
        Self {
            rules,
            fallback,
            readings,
        }
    }

    /// Resolver over the built-in CraneBot content with random readings.
    pub fn builtin() -> Self {
        Self::new(
            RuleTable::builtin(),
            KeywordFallback::builtin(),
            Arc::new(RandomReadings),
        )
    }

    /// Replace the reading source, keeping the tables.
    pub fn with_readings(mut self, readings: Arc<dyn ReadingSource>) -> Self {
        self.readings = readings;
        self
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Pick the rule for `input` without materializing it.
    pub fn select(&self, input: &str) -> (&ResponseRule, MatchKind) {
        let normalized = normalize(input);

        if let Some(rule) = self.rules.get(&normalized) {
            return (rule, MatchKind::Exact);
        }

        if let Some(rule) = self
            .rules
            .iter()
            .filter(|r| r.key != DEFAULT_RULE_KEY)
            .find(|r| normalized.contains(r.key.as_str()))
        {
            return (rule, MatchKind::Substring);
        }

        if let Some(rule) = self
            .fallback
            .route(&normalized)
            .and_then(|target| self.rules.get(target))
        {
            return (rule, MatchKind::Keyword);
        }

        (self.rules.default_rule(), MatchKind::Default)
    }

    /// Resolve `input` to a response, filling live placeholders.
    ///
    /// Never fails: anything unmatched, including empty input, gets the
    /// default rule. A template with `{vibration}` gets one fresh reading for
    /// all four placeholders.
    pub fn resolve(&self, input: &str) -> ResolvedResponse {
        let (rule, match_kind) = self.select(input);

        let text = if rule.has_live_placeholders() {
            self.readings.next_reading().render(&rule.template)
        } else {
            rule.template.clone()
        };

        tracing::debug!(
            rule_key = %rule.key,
            match_kind = %match_kind,
            "Resolved chat input"
        );

        ResolvedResponse {
            rule_key: rule.key.clone(),
            has_live_data: has_live_marker(&text),
            text,
            quick_replies: rule.quick_replies.clone(),
            match_kind,
        }
    }

    /// Quick replies that `input` would produce, recomputed from scratch.
    ///
    /// Sessions store quick replies on each bot message instead; this stays
    /// for callers that only have the triggering text.
    pub fn quick_replies_for(&self, input: &str) -> Vec<String> {
        self.select(input).0.quick_replies.clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
