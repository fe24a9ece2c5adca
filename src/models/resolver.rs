//! Model identifier resolution.
//!
//! A model identifier resolves in two independent directions:
//!
//! - **encoding**: which vocabulary tokenizes its text
//! - **snapshot**: which dated snapshot's framing rules apply
//!
//! Both follow the same ladder: the identifier itself, then its alias, then
//! the first matching family. Every rung is a single table pass, so
//! resolution always terminates.

use std::collections::HashMap;

use serde::Serialize;

use super::framing::{FramingRule, FramingTable};
use super::tables::{
    DEFAULT_ALIASES, DEFAULT_FAMILIES, MODEL_PREFIX_TO_ENCODING, MODEL_TO_ENCODING,
};
use crate::config::Config;
use crate::encoding::definition;
use crate::error::{Result, TokCountError};

/// Family substring and the snapshot its models inherit rules from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyRule {
    /// Substring identifying the family
    pub pattern: String,
    /// Canonical dated snapshot
    pub snapshot: String,
}

impl FamilyRule {
    /// Create a family rule
    pub fn new(pattern: impl Into<String>, snapshot: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            snapshot: snapshot.into(),
        }
    }

    /// Whether `model` belongs to this family (substring match)
    pub fn matches(&self, model: &str) -> bool {
        model.contains(&self.pattern)
    }

    /// The pattern as a glob, e.g. `*gpt-4o*`
    pub fn glob(&self) -> String {
        format!("*{}*", self.pattern)
    }
}

/// Everything needed to count tokens for one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'a> {
    /// Encoding name
    pub encoding: &'a str,
    /// Snapshot the framing rule came from
    pub snapshot: &'a str,
    /// Framing rule
    pub rule: FramingRule,
}

/// Maps model identifiers to encodings and framing snapshots.
///
/// # Example
/// ```
/// use tokcount::models::{FramingTable, ModelResolver};
///
/// let resolver = ModelResolver::new();
/// let framing = FramingTable::new();
///
/// assert_eq!(resolver.encoding_for("gpt-4-0613").unwrap(), "cl100k_base");
/// assert_eq!(resolver.encoding_for("gpt-4o").unwrap(), "o200k_base");
/// assert_eq!(resolver.snapshot_for("gpt-4", &framing).unwrap(), "gpt-4-0613");
/// assert!(resolver.encoding_for("not-a-model").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ModelResolver {
    models: HashMap<String, String>,
    aliases: HashMap<String, String>,
    families: Vec<FamilyRule>,
}

impl Default for ModelResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelResolver {
    /// Create a resolver with the built-in aliases and families
    pub fn new() -> Self {
        Self {
            models: HashMap::new(),
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|&(alias, snapshot)| (alias.to_string(), snapshot.to_string()))
                .collect(),
            families: DEFAULT_FAMILIES
                .iter()
                .map(|&(pattern, snapshot)| FamilyRule::new(pattern, snapshot))
                .collect(),
        }
    }

    /// Create a resolver with the built-in tables and configured additions.
    ///
    /// Configured model mappings must name a known encoding.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut resolver = Self::new();

        for mapping in &config.models {
            definition(&mapping.encoding).map_err(|_| {
                TokCountError::Config(format!(
                    "model {} maps to unknown encoding {}",
                    mapping.model, mapping.encoding
                ))
            })?;
            resolver = resolver.with_model(&mapping.model, &mapping.encoding);
        }

        for alias in &config.framing.aliases {
            resolver = resolver.with_alias(&alias.alias, &alias.snapshot);
        }

        // Configured families take priority, in their configured order.
        let mut families: Vec<FamilyRule> = config
            .framing
            .families
            .iter()
            .map(|f| FamilyRule::new(&f.pattern, &f.snapshot))
            .collect();
        families.append(&mut resolver.families);
        resolver.families = families;

        Ok(resolver)
    }

    /// Map `model` directly to `encoding`
    pub fn with_model(mut self, model: &str, encoding: &str) -> Self {
        self.models.insert(model.to_string(), encoding.to_string());
        self
    }

    /// Treat `alias` as `snapshot`
    pub fn with_alias(mut self, alias: &str, snapshot: &str) -> Self {
        self.aliases.insert(alias.to_string(), snapshot.to_string());
        self
    }

    /// Add a family rule with the lowest priority
    pub fn with_family(mut self, rule: FamilyRule) -> Self {
        self.families.push(rule);
        self
    }

    /// Family rules in priority order
    pub fn families(&self) -> &[FamilyRule] {
        &self.families
    }

    /// Aliases, sorted by alias
    pub fn aliases(&self) -> Vec<(&str, &str)> {
        let mut all: Vec<_> = self
            .aliases
            .iter()
            .map(|(a, s)| (a.as_str(), s.as_str()))
            .collect();
        all.sort_unstable();
        all
    }

    /// Exact or prefix encoding lookup, without alias or family fallback.
    fn direct_encoding(&self, model: &str) -> Option<&str> {
        if let Some(encoding) = self.models.get(model) {
            return Some(encoding.as_str());
        }
        if let Some(encoding) = MODEL_TO_ENCODING.get(model) {
            return Some(*encoding);
        }
        MODEL_PREFIX_TO_ENCODING
            .iter()
            .find(|(prefix, _)| model.starts_with(prefix))
            .map(|&(_, encoding)| encoding)
    }

    /// First family whose pattern occurs in `model`.
    fn family_of(&self, model: &str) -> Option<&FamilyRule> {
        self.families.iter().find(|f| f.matches(model))
    }

    /// Encoding name used by `model`.
    pub fn encoding_for(&self, model: &str) -> Result<&str> {
        if let Some(encoding) = self.direct_encoding(model) {
            return Ok(encoding);
        }

        let fallback = self
            .aliases
            .get(model)
            .map(String::as_str)
            .or_else(|| self.family_of(model).map(|f| f.snapshot.as_str()));

        fallback
            .and_then(|snapshot| self.direct_encoding(snapshot))
            .ok_or_else(|| TokCountError::UnsupportedModel(model.to_string()))
    }

    /// Snapshot whose framing rule applies to `model`.
    pub fn snapshot_for<'a>(&'a self, model: &'a str, framing: &FramingTable) -> Result<&'a str> {
        if framing.contains(model) {
            return Ok(model);
        }

        let snapshot = self
            .aliases
            .get(model)
            .map(String::as_str)
            .or_else(|| self.family_of(model).map(|f| f.snapshot.as_str()))
            .ok_or_else(|| TokCountError::UnsupportedModel(model.to_string()))?;

        if framing.contains(snapshot) {
            Ok(snapshot)
        } else {
            Err(TokCountError::UnsupportedModel(model.to_string()))
        }
    }

    /// Resolve `model` to both an encoding and a framing rule.
    ///
    /// Fails with [`TokCountError::UnsupportedModel`] when either half is
    /// missing.
    pub fn resolve<'a>(&'a self, model: &'a str, framing: &FramingTable) -> Result<Resolution<'a>> {
        let encoding = self.encoding_for(model)?;
        let snapshot = self.snapshot_for(model, framing)?;
        let rule = framing
            .rules_for(snapshot)
            .map_err(|_| TokCountError::UnsupportedModel(model.to_string()))?;

        Ok(Resolution {
            encoding,
            snapshot,
            rule,
        })
    }
}
