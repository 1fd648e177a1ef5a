//! The static rule table and keyword fallback routes.
//!
//! Both tables are validated once when built. Table order is significant:
//! substring matching and keyword routing both take the first hit.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use crate::error::ChatError;
use crate::types::ResponseRule;

/// Key of the mandatory fallback rule.
pub const DEFAULT_RULE_KEY: &str = "default";

/// Bot message posted when a session opens.
pub const GREETING: &str =
    "Hello 👋 I'm CraneBot! I can help you explore our Predictive Maintenance System.";

// =============================================================================
// Built-in content
// =============================================================================

static BUILTIN_RULES: LazyLock<Arc<RuleTable>> = LazyLock::new(|| {
    let rules = vec![
        ResponseRule::new(
            "hello",
            "Hello 👋 I'm CraneBot! I can help you explore our Predictive Maintenance System. What would you like to know?",
            &["Show live data", "Explain predictive maintenance", "Compare cranes", "Future vision"],
        ),
        ResponseRule::new(
            "show live data",
            "🔴 LIVE DATA UPDATE:\n📊 Current Crane Status:\n• Vibration: {vibration} Hz\n• Temperature: {temperature}°F\n• Load: {load}%\n• Torque: {torque} Nm\n\n✅ All systems operational!",
            &["Refresh data", "What if values are high?", "Safety thresholds"],
        ),
        ResponseRule::new(
            "show dashboard demo",
            "Great! Our dashboard shows real-time IoT data from industrial cranes. You can see live vibration, torque, temperature, and load metrics with predictive analytics.",
            &["Show live data", "What sensors do you use?", "Safety features"],
        ),
        ResponseRule::new(
            "explain predictive maintenance",
            "Predictive maintenance uses IoT sensors + AI to detect equipment issues before they cause failures. This prevents costly downtime and improves safety by 60%.",
            &["What data do you collect?", "Cost savings?", "Implementation time"],
        ),
        ResponseRule::new(
            "compare cranes",
            "Our comparison tool analyzes different crane models based on performance, safety scores, and operational costs. It helps you choose the best crane for your project!",
            &["Show comparison", "Safety metrics", "Cost analysis"],
        ),
        ResponseRule::new(
            "future vision",
            "🚀 Future features include AR/VR operator training, blockchain equipment tracking, drone-based safety monitoring, and AI-powered route optimization!",
            &["Tell me about drones", "AR training details", "Blockchain benefits"],
        ),
        ResponseRule::new(
            "how does prediction work?",
            "We use machine learning algorithms to analyze vibration patterns, temperature trends, and load data. When anomalies are detected, we alert operators before equipment fails.",
            &[],
        ),
        ResponseRule::new(
            "what sensors do you use?",
            "Our system uses vibration sensors, temperature monitors, load cells, and torque sensors. All data is transmitted via IoT to our cloud analytics platform.",
            &[],
        ),
        ResponseRule::new(
            "safety features",
            "Key safety features: Real-time hazard detection, automated emergency stops, load limit warnings, and predictive failure alerts. Safety is our #1 priority! 🦺",
            &[],
        ),
        ResponseRule::new(
            "tell me about drones",
            "🚁 Our drone system uses LIDAR to monitor lift zones, detect ground hazards, and ensure safe crane operations. Drones provide 360° awareness that traditional sensors can't match.",
            &["Drone specs", "How often do drones patrol?", "Weather limitations"],
        ),
        ResponseRule::new(
            "cost savings?",
            "💰 Predictive maintenance reduces unplanned downtime by 70%, extends equipment life by 25%, and cuts maintenance costs by 30%. ROI typically achieved in 6-12 months!",
            &["Show ROI calculator", "Implementation cost", "Success stories"],
        ),
        ResponseRule::new(
            "refresh data",
            "🔄 Refreshing live data...\n\n📊 Updated Crane Status:\n• Vibration: {vibration} Hz\n• Temperature: {temperature}°F\n• Load: {load}%\n• Torque: {torque} Nm",
            &["Set alert threshold", "Historical trends", "Export data"],
        ),
        ResponseRule::new(
            "what if values are high?",
            "⚠️ When values exceed thresholds:\n• Automated alerts sent to operators\n• Emergency shutdown if critical\n• Maintenance team notified\n• Root cause analysis initiated",
            &["Show alert system", "Emergency procedures", "Maintenance scheduling"],
        ),
        ResponseRule::new(
            "what makes this solution unique?",
            "Unlike traditional sensor-only systems, we combine IoT + AI + drone monitoring for complete situational awareness. Our predictive algorithms are specifically trained for crane operations.",
            &[],
        ),
        ResponseRule::new(
            DEFAULT_RULE_KEY,
            "I'm still learning! 🤖 You can explore more on our Dashboard page or ask me about predictive maintenance, crane safety, or our future vision.",
            &["Show dashboard demo", "Safety features", "Future vision"],
        ),
    ];
    Arc::new(RuleTable::new(rules).expect("built-in rule table is valid"))
});

static BUILTIN_FALLBACK: LazyLock<Arc<KeywordFallback>> = LazyLock::new(|| {
    let routes = vec![
        KeywordRoute::new(&["live", "data", "status"], "show live data"),
        KeywordRoute::new(&["drone"], "tell me about drones"),
        KeywordRoute::new(&["predict", "maintenance"], "explain predictive maintenance"),
        KeywordRoute::new(&["dashboard", "demo"], "show dashboard demo"),
        KeywordRoute::new(&["compare", "crane"], "compare cranes"),
        KeywordRoute::new(&["future", "vision"], "future vision"),
        KeywordRoute::new(&["safety"], "safety features"),
        KeywordRoute::new(&["cost"], "cost savings?"),
        KeywordRoute::new(&["refresh"], "refresh data"),
    ];
    Arc::new(
        KeywordFallback::new(routes, &BUILTIN_RULES).expect("built-in keyword routes are valid"),
    )
});

// =============================================================================
// RuleTable
// =============================================================================

/// Ordered, validated set of response rules.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<ResponseRule>,
    index: HashMap<String, usize>,
    default_index: usize,
}

impl RuleTable {
    /// Build a table, enforcing key invariants.
    ///
    /// Every key must be non-empty, lowercase, trimmed and unique, and exactly
    /// one rule must use [`DEFAULT_RULE_KEY`].
    pub fn new(rules: Vec<ResponseRule>) -> Result<Self, ChatError> {
        let mut index = HashMap::with_capacity(rules.len());
        for (i, rule) in rules.iter().enumerate() {
            if rule.key.is_empty() {
                return Err(ChatError::InvalidRuleTable(format!(
                    "rule {} has an empty key",
                    i
                )));
            }
            if rule.key != rule.key.trim() || rule.key != rule.key.to_lowercase() {
                return Err(ChatError::InvalidRuleTable(format!(
                    "key is not normalized: {:?}",
                    rule.key
                )));
            }
            if index.insert(rule.key.clone(), i).is_some() {
                return Err(ChatError::InvalidRuleTable(format!(
                    "duplicate key: {}",
                    rule.key
                )));
            }
        }

        let default_index = index.get(DEFAULT_RULE_KEY).copied().ok_or_else(|| {
            ChatError::InvalidRuleTable(format!("missing '{}' rule", DEFAULT_RULE_KEY))
        })?;

        Ok(Self {
            rules,
            index,
            default_index,
        })
    }

    /// The shared built-in CraneBot table.
    pub fn builtin() -> Arc<RuleTable> {
        Arc::clone(&BUILTIN_RULES)
    }

    pub fn get(&self, key: &str) -> Option<&ResponseRule> {
        self.index.get(key).map(|&i| &self.rules[i])
    }

    pub fn default_rule(&self) -> &ResponseRule {
        &self.rules[self.default_index]
    }

    /// Rules in declaration order, including the default rule.
    pub fn iter(&self) -> impl Iterator<Item = &ResponseRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// =============================================================================
// KeywordFallback
// =============================================================================

/// Keywords that redirect to a rule when no key matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRoute {
    pub keywords: Vec<String>,
    pub target: String,
}

impl KeywordRoute {
    pub fn new(keywords: &[&str], target: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            target: target.to_string(),
        }
    }
}

/// Ordered keyword routes, checked after exact and substring matching.
#[derive(Debug, Clone)]
pub struct KeywordFallback {
    routes: Vec<KeywordRoute>,
}

impl KeywordFallback {
    /// Build the route list, checking every target exists in `rules`.
    pub fn new(routes: Vec<KeywordRoute>, rules: &RuleTable) -> Result<Self, ChatError> {
        for route in &routes {
            if rules.get(&route.target).is_none() {
                return Err(ChatError::InvalidRuleTable(format!(
                    "keyword route targets unknown rule: {}",
                    route.target
                )));
            }
            if route.keywords.iter().any(|k| k.is_empty()) {
                return Err(ChatError::InvalidRuleTable(format!(
                    "empty keyword in route to {}",
                    route.target
                )));
            }
        }
        Ok(Self { routes })
    }

    /// The shared built-in routes, valid against [`RuleTable::builtin`].
    pub fn builtin() -> Arc<KeywordFallback> {
        Arc::clone(&BUILTIN_FALLBACK)
    }

    /// An empty route list.
    pub fn none() -> Self {
        Self { routes: Vec::new() }
    }

    /// Target key of the first route with a keyword inside `normalized`.
    pub fn route(&self, normalized: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|r| r.keywords.iter().any(|k| normalized.contains(k.as_str())))
            .map(|r| r.target.as_str())
    }

    pub fn routes(&self) -> &[KeywordRoute] {
        &self.routes
    }
}
