//! Chat framing overhead per model snapshot.
//!
//! Chat models wrap each message in delimiter tokens that never appear in
//! the message text. The overhead depends on the snapshot:
//!
//! ```text
//! <|start|>{role or name}\n{content}<|end|>\n     (per message)
//! <|start|>assistant<|message|>                  (once, reply priming)
//! ```

use std::collections::HashMap;

use serde::Serialize;

use super::tables::{DEFAULT_REPLY_PRIMING_TOKENS, DEFAULT_SNAPSHOTS};
use crate::config::FramingConfig;
use crate::error::{Result, TokCountError};

/// Framing constants for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FramingRule {
    /// Tokens added for every message
    pub tokens_per_message: i64,
    /// Adjustment added when a message has a `name` field
    pub tokens_per_name: i64,
}

impl FramingRule {
    /// Create a rule
    pub const fn new(tokens_per_message: i64, tokens_per_name: i64) -> Self {
        Self {
            tokens_per_message,
            tokens_per_name,
        }
    }
}

/// Snapshot -> framing rule table, plus the reply priming constant.
#[derive(Debug, Clone)]
pub struct FramingTable {
    rules: HashMap<String, FramingRule>,
    reply_priming_tokens: i64,
}

impl Default for FramingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FramingTable {
    /// Create a table with the built-in snapshots
    pub fn new() -> Self {
        let rules = DEFAULT_SNAPSHOTS
            .iter()
            .map(|&(name, per_message, per_name)| {
                (name.to_string(), FramingRule::new(per_message, per_name))
            })
            .collect();

        Self {
            rules,
            reply_priming_tokens: DEFAULT_REPLY_PRIMING_TOKENS,
        }
    }

    /// Create a table with the built-in snapshots and configured overrides
    pub fn from_config(config: &FramingConfig) -> Self {
        let mut table = Self::new();
        for snapshot in &config.snapshots {
            table = table.with_rule(
                &snapshot.name,
                FramingRule::new(snapshot.tokens_per_message, snapshot.tokens_per_name),
            );
        }
        if let Some(priming) = config.reply_priming_tokens {
            table = table.with_reply_priming(priming);
        }
        table
    }

    /// Add or replace the rule for `snapshot`
    pub fn with_rule(mut self, snapshot: &str, rule: FramingRule) -> Self {
        self.rules.insert(snapshot.to_string(), rule);
        self
    }

    /// Set the reply priming overhead
    pub fn with_reply_priming(mut self, tokens: i64) -> Self {
        self.reply_priming_tokens = tokens;
        self
    }

    /// Rule for an exact snapshot name
    pub fn rules_for(&self, snapshot: &str) -> Result<FramingRule> {
        self.rules
            .get(snapshot)
            .copied()
            .ok_or_else(|| TokCountError::UnsupportedModel(snapshot.to_string()))
    }

    /// Whether `snapshot` has a rule
    pub fn contains(&self, snapshot: &str) -> bool {
        self.rules.contains_key(snapshot)
    }

    /// Tokens added once per request
    pub fn reply_priming_tokens(&self) -> i64 {
        self.reply_priming_tokens
    }

    /// All snapshots and their rules, sorted by name
    pub fn snapshots(&self) -> Vec<(&str, FramingRule)> {
        let mut all: Vec<_> = self
            .rules
            .iter()
            .map(|(name, rule)| (name.as_str(), *rule))
            .collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all
    }
}
