//! Chat message token counting.
//!
//! Resolves the model, loads its encoding through the shared store, encodes
//! every message field and adds the framing overhead.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::encoding::{Encoding, EncodingStore};
use crate::error::Result;
use crate::models::{FramingRule, FramingTable, ModelResolver};

/// A chat message.
///
/// Only field values are tokenized; the key names never are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author role (`system`, `user`, `assistant`, ...)
    pub role: String,
    /// Message text
    pub content: String,
    /// Optional participant name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Create a message without a name
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            name: None,
        }
    }

    /// Set the participant name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Present fields as `(key, value)` pairs
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            Some(("role", self.role.as_str())),
            Some(("content", self.content.as_str())),
            self.name.as_deref().map(|name| ("name", name)),
        ]
        .into_iter()
        .flatten()
    }
}

/// Count tokens for `messages` with an already loaded encoding and rule.
///
/// # Example
/// ```
/// use std::collections::HashMap;
/// use tokcount::encoding::{Encoding, CL100K_PATTERN};
/// use tokcount::models::FramingRule;
/// use tokcount::tokenizer::{count_with, Message};
///
/// let ranks: HashMap<Vec<u8>, u32> = (0..=255u8).map(|b| (vec![b], u32::from(b))).collect();
/// let encoding = Encoding::new("bytes", ranks, HashMap::new(), CL100K_PATTERN).unwrap();
///
/// // One byte per token: 3 + len("user") + len("hi") + 3
/// let messages = [Message::new("user", "hi")];
/// let total = count_with(&messages, &encoding, FramingRule::new(3, 1), 3).unwrap();
/// assert_eq!(total, 12);
/// ```
pub fn count_with(
    messages: &[Message],
    encoding: &Encoding,
    rule: FramingRule,
    reply_priming_tokens: i64,
) -> Result<usize> {
    let mut total: i64 = 0;

    for message in messages {
        total += rule.tokens_per_message;
        for (key, value) in message.fields() {
            total += encoding.count(value)? as i64;
            if key == "name" {
                total += rule.tokens_per_name;
            }
        }
    }
    total += reply_priming_tokens;

    // Well-formed input never goes negative.
    Ok(usize::try_from(total).unwrap_or_default())
}

/// Counts chat tokens for any supported model.
///
/// The counter owns the model tables and shares the encoding store, so many
/// counters (or many concurrent requests on one counter) load each encoding
/// only once.
///
/// # Example
/// ```rust,ignore
/// use std::sync::Arc;
/// use tokcount::encoding::{DirectorySource, EncodingStore};
/// use tokcount::tokenizer::{Message, TokenCounter};
///
/// let store = Arc::new(EncodingStore::new(DirectorySource::new("/opt/vocab")));
/// let counter = TokenCounter::new(store);
///
/// let messages = [Message::new("user", "Hello, world!")];
/// let tokens = counter.count_tokens(&messages, "gpt-3.5-turbo-0613").await?;
/// ```
#[derive(Debug)]
pub struct TokenCounter {
    store: Arc<EncodingStore>,
    resolver: ModelResolver,
    framing: FramingTable,
}

impl TokenCounter {
    /// Create a counter with the built-in model tables
    pub fn new(store: Arc<EncodingStore>) -> Self {
        Self {
            store,
            resolver: ModelResolver::new(),
            framing: FramingTable::new(),
        }
    }

    /// Create a counter (and its store) from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(EncodingStore::from_config(&config.vocab)?);
        Ok(Self::new(store)
            .with_resolver(ModelResolver::from_config(config)?)
            .with_framing(FramingTable::from_config(&config.framing)))
    }

    /// Replace the model resolver
    pub fn with_resolver(mut self, resolver: ModelResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the framing table
    pub fn with_framing(mut self, framing: FramingTable) -> Self {
        self.framing = framing;
        self
    }

    /// Shared encoding store
    pub fn store(&self) -> &Arc<EncodingStore> {
        &self.store
    }

    /// Model resolver
    pub fn resolver(&self) -> &ModelResolver {
        &self.resolver
    }

    /// Framing table
    pub fn framing(&self) -> &FramingTable {
        &self.framing
    }

    /// Count the tokens `messages` consume when sent to `model`.
    ///
    /// Fails with [`crate::TokCountError::UnsupportedModel`] unless the model
    /// resolves to both an encoding and a framing rule. Both are resolved
    /// before any vocabulary is loaded.
    pub async fn count_tokens(&self, messages: &[Message], model: &str) -> Result<usize> {
        let resolved = self.resolver.resolve(model, &self.framing)?;
        let encoding = self.store.load(resolved.encoding).await?;

        tracing::debug!(
            model,
            snapshot = resolved.snapshot,
            encoding = resolved.encoding,
            messages = messages.len(),
            "Counting tokens"
        );

        // Encoding is CPU-bound and proportional to the input; keep it off
        // the async workers.
        let messages = messages.to_vec();
        let rule = resolved.rule;
        let priming = self.framing.reply_priming_tokens();
        tokio::task::spawn_blocking(move || count_with(&messages, &encoding, rule, priming))
            .await
            .map_err(std::io::Error::from)?
    }

    /// Count the tokens of plain `text` under `model`'s encoding.
    pub async fn count_text(&self, text: &str, model: &str) -> Result<usize> {
        let encoding = self.encoding_for_model(model).await?;
        let text = text.to_string();
        tokio::task::spawn_blocking(move || encoding.count(&text))
            .await
            .map_err(std::io::Error::from)?
    }

    /// Load the encoding `model` uses.
    pub async fn encoding_for_model(&self, model: &str) -> Result<Arc<Encoding>> {
        let name = self.resolver.encoding_for(model)?;
        self.store.load(name).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::encoding::{write_rank_file, MemorySource, Rank, CL100K_PATTERN};
    use crate::error::TokCountError;

    fn byte_encoding() -> Encoding {
        let ranks = (0..=255u8).map(|b| (vec![b], Rank::from(b))).collect();
        let special = HashMap::from([("<|endoftext|>".to_string(), 100257)]);
        Encoding::new("bytes", ranks, special, CL100K_PATTERN).unwrap()
    }

    fn counter() -> TokenCounter {
        let ranks: HashMap<Vec<u8>, Rank> =
            (0..=255u8).map(|b| (vec![b], Rank::from(b))).collect();
        let source = MemorySource::new().with_file("cl100k_base.tiktoken", write_rank_file(&ranks));
        TokenCounter::new(Arc::new(EncodingStore::new(source)))
    }

    #[test]
    fn test_message_fields() {
        let message = Message::new("user", "hi");
        let fields: Vec<_> = message.fields().collect();
        assert_eq!(fields, vec![("role", "user"), ("content", "hi")]);

        let message = message.with_name("bob");
        assert_eq!(message.fields().last(), Some(("name", "bob")));
    }

    #[test]
    fn test_message_serde() {
        let message: Message =
            serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
        assert_eq!(message, Message::new("user", "hi"));
        assert_eq!(
            serde_json::to_string(&message).unwrap(),
            r#"{"role":"user","content":"hi"}"#
        );

        assert!(serde_json::from_str::<Message>(r#"{"role":"user"}"#).is_err());
    }

    #[test]
    fn test_count_with_name_adjustment() {
        let enc = byte_encoding();
        let messages = [Message::new("system", "").with_name("x")];

        // 4 + len("system") + len("") + len("x") - 1, then reply priming
        let total = count_with(&messages, &enc, FramingRule::new(4, -1), 3).unwrap();
        assert_eq!(total, 4 + 6 + 1 - 1 + 3);
    }

    #[test]
    fn test_count_with_no_messages() {
        let enc = byte_encoding();
        assert_eq!(count_with(&[], &enc, FramingRule::new(3, 1), 3).unwrap(), 3);
    }

    #[test]
    fn test_count_with_rejects_special_tokens() {
        let enc = byte_encoding();
        let messages = [Message::new("user", "<|endoftext|>")];
        assert!(matches!(
            count_with(&messages, &enc, FramingRule::new(3, 1), 3),
            Err(TokCountError::DisallowedSpecialToken(_))
        ));
    }

    #[tokio::test]
    async fn test_count_tokens() {
        let counter = counter();
        let messages = [Message::new("user", "Hello, world!")];

        let total = counter
            .count_tokens(&messages, "gpt-3.5-turbo-0613")
            .await
            .unwrap();
        assert_eq!(total, 3 + 4 + 13 + 3);
    }

    #[tokio::test]
    async fn test_unsupported_model_loads_nothing() {
        let counter = counter();
        let messages = [Message::new("user", "hi")];

        let err = counter.count_tokens(&messages, "not-a-model").await.unwrap_err();
        assert!(matches!(err, TokCountError::UnsupportedModel(m) if m == "not-a-model"));
        assert_eq!(counter.store().load_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_vocabulary_surfaces() {
        let counter = counter();
        let messages = [Message::new("user", "hi")];

        // gpt-4o needs o200k_base, which the memory source lacks.
        let err = counter.count_tokens(&messages, "gpt-4o").await.unwrap_err();
        assert!(matches!(err, TokCountError::VocabularyFetch(_)));
    }

    #[tokio::test]
    async fn test_count_text() {
        let counter = counter();
        assert_eq!(counter.count_text("abc", "gpt-4").await.unwrap(), 3);
        assert!(counter.count_text("abc", "not-a-model").await.is_err());
    }
}
