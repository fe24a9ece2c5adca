//! End-to-end token counting tests.
//!
//! These tests drive the counter through the shared encoding store with a
//! small synthetic vocabulary, checking the counting rule, resolution and
//! load-once behaviour beyond the unit test level.

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;
use tokcount::config::{AliasRule, Config, FamilyRuleConfig, ModelMapping, SnapshotRule};
use tokcount::encoding::{write_rank_file, Encoding, EncodingStore, MemorySource, Rank};
use tokcount::{FramingTable, Message, ModelResolver, TokCountError, TokenCounter};

/// Byte-level ranks plus a handful of merges for "Hello" and " world".
fn ranks() -> HashMap<Vec<u8>, Rank> {
    let mut ranks: HashMap<Vec<u8>, Rank> =
        (0..=255u8).map(|b| (vec![b], Rank::from(b))).collect();
    for (i, token) in ["ll", "He", "llo", "Hello", " w", "or", " wor", "ld", " world"]
        .iter()
        .enumerate()
    {
        ranks.insert(token.as_bytes().to_vec(), 256 + i as Rank);
    }
    ranks
}

fn source() -> MemorySource {
    let file = write_rank_file(&ranks());
    MemorySource::new()
        .with_file("cl100k_base.tiktoken", file.clone())
        .with_file("o200k_base.tiktoken", file)
}

fn counter() -> TokenCounter {
    TokenCounter::new(Arc::new(EncodingStore::new(source())))
}

/// Expected total straight from the counting rule.
fn expected(encoding: &Encoding, messages: &[Message], per_message: i64, per_name: i64) -> usize {
    let mut total = 3;
    for message in messages {
        total += per_message;
        total += encoding.count(&message.role).unwrap() as i64;
        total += encoding.count(&message.content).unwrap() as i64;
        if let Some(name) = &message.name {
            total += encoding.count(name).unwrap() as i64 + per_name;
        }
    }
    total as usize
}

#[tokio::test]
async fn test_merges_apply() {
    let counter = counter();
    let encoding = counter.encoding_for_model("gpt-4").await.unwrap();

    // "Hello" "," " world" "!"
    assert_eq!(encoding.count("Hello, world!").unwrap(), 4);
    assert_eq!(
        encoding.decode_bytes(&encoding.encode("Hello, world!").unwrap()).unwrap(),
        b"Hello, world!"
    );
}

#[tokio::test]
async fn test_hello_world_across_snapshots() {
    let counter = counter();
    let messages = [Message::new("user", "Hello, world!")];

    // 3 framing + "user" (4 bytes) + 4 content tokens + 3 reply priming
    for model in [
        "gpt-3.5-turbo-0613",
        "gpt-35-turbo",
        "gpt-4-0613",
        "gpt-4",
        "gpt-4o",
        "gpt-4o-mini",
        "gpt-4.1-mini",
    ] {
        assert_eq!(
            counter.count_tokens(&messages, model).await.unwrap(),
            3 + 4 + 4 + 3,
            "{model}"
        );
    }
}

#[tokio::test]
async fn test_legacy_snapshot_name_adjustment() {
    let counter = counter();
    let messages = [
        Message::new("system", "Hello"),
        Message::new("user", " world").with_name("example_user"),
    ];

    let legacy = counter
        .count_tokens(&messages, "gpt-3.5-turbo-0301")
        .await
        .unwrap();
    let current = counter
        .count_tokens(&messages, "gpt-3.5-turbo-0613")
        .await
        .unwrap();

    // Two messages at +1 each offset by the name adjustment at -2.
    assert_eq!(legacy, current);

    let encoding = counter.encoding_for_model("gpt-3.5-turbo").await.unwrap();
    assert_eq!(legacy, expected(&encoding, &messages, 4, -1));
    assert_eq!(current, expected(&encoding, &messages, 3, 1));
}

#[tokio::test]
async fn test_count_is_deterministic() {
    let messages = [
        Message::new("system", "Hello"),
        Message::new("user", "Hello, world! Hello, world!").with_name("bob"),
    ];

    let first = counter().count_tokens(&messages, "gpt-4o").await.unwrap();
    let counter = counter();
    for _ in 0..5 {
        assert_eq!(counter.count_tokens(&messages, "gpt-4o").await.unwrap(), first);
    }
}

#[tokio::test]
async fn test_newer_generations_load_o200k() {
    let counter = counter();
    let messages = [Message::new("user", "hi")];

    for model in ["gpt-4.1", "gpt-4.5-preview", "gpt-5-mini"] {
        counter.count_tokens(&messages, model).await.unwrap();
    }
    assert_eq!(counter.store().cached(), vec!["o200k_base"]);
}

#[tokio::test]
async fn test_long_whitespace_message() {
    let counter = counter();
    let messages = [Message::new("user", format!("a{}a", " ".repeat(200_000)))];

    let started = std::time::Instant::now();
    let total = counter.count_tokens(&messages, "gpt-4").await.unwrap();
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    assert!(total > 3 + 4 + 3);
}

#[tokio::test]
async fn test_empty_message_list() {
    let counter = counter();
    assert_eq!(counter.count_tokens(&[], "gpt-4").await.unwrap(), 3);
}

#[tokio::test]
async fn test_empty_fields_still_framed() {
    let counter = counter();
    let messages = [Message::new("", "")];
    assert_eq!(counter.count_tokens(&messages, "gpt-4").await.unwrap(), 3 + 3);
}

#[tokio::test]
async fn test_special_token_text_rejected() {
    let counter = counter();
    let messages = [Message::new("user", "stop <|endoftext|> here")];

    let err = counter.count_tokens(&messages, "gpt-4").await.unwrap_err();
    assert!(matches!(err, TokCountError::DisallowedSpecialToken(t) if t == "<|endoftext|>"));
}

#[tokio::test]
async fn test_unsupported_models() {
    let counter = counter();
    let messages = [Message::new("user", "hi")];

    for model in ["", "llama-3", "claude-3-opus", "text-davinci-003"] {
        let err = counter.count_tokens(&messages, model).await.unwrap_err();
        assert!(
            matches!(err, TokCountError::UnsupportedModel(_)),
            "{model}: {err}"
        );
    }
    assert_eq!(counter.store().load_count(), 0);
}

#[tokio::test]
async fn test_configured_overrides() {
    let mut config = Config::default();
    config.models.push(ModelMapping {
        model: "acme-chat".to_string(),
        encoding: "cl100k_base".to_string(),
    });
    config.framing.snapshots.push(SnapshotRule {
        name: "acme-chat-v1".to_string(),
        tokens_per_message: 5,
        tokens_per_name: 2,
    });
    config.framing.aliases.push(AliasRule {
        alias: "acme-chat".to_string(),
        snapshot: "acme-chat-v1".to_string(),
    });
    config.framing.families.push(FamilyRuleConfig {
        pattern: "acme-".to_string(),
        snapshot: "acme-chat-v1".to_string(),
    });
    config.framing.reply_priming_tokens = Some(0);

    let counter = counter()
        .with_resolver(ModelResolver::from_config(&config).unwrap())
        .with_framing(FramingTable::from_config(&config.framing));

    let messages = [Message::new("user", "hi").with_name("x")];
    let total = counter.count_tokens(&messages, "acme-chat").await.unwrap();
    assert_eq!(total, 5 + 4 + 2 + 1 + 2);

    // Built-in models keep working next to the overrides, but priming is now 0.
    let total = counter
        .count_tokens(&[Message::new("user", "hi")], "gpt-4")
        .await
        .unwrap();
    assert_eq!(total, 3 + 4 + 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_loads_once() {
    let counter = Arc::new(counter());
    let messages = Arc::new(vec![Message::new("user", "Hello, world!")]);

    let tasks = (0..32).map(|i| {
        let counter = Arc::clone(&counter);
        let messages = Arc::clone(&messages);
        let model = if i % 2 == 0 { "gpt-4" } else { "gpt-3.5-turbo" };
        tokio::spawn(async move { counter.count_tokens(&messages, model).await })
    });

    for result in futures::future::join_all(tasks).await {
        assert_eq!(result.unwrap().unwrap(), 14);
    }

    // Both models share cl100k_base.
    assert_eq!(counter.store().load_count(), 1);
    assert_eq!(counter.store().cached(), vec!["cl100k_base"]);
}

#[tokio::test]
async fn test_counters_share_a_store() {
    let store = Arc::new(EncodingStore::new(source()));
    let a = TokenCounter::new(Arc::clone(&store));
    let b = TokenCounter::new(Arc::clone(&store));
    let messages = [Message::new("user", "hi")];

    a.count_tokens(&messages, "gpt-4o").await.unwrap();
    b.count_tokens(&messages, "gpt-4o-2024-08-06").await.unwrap();
    assert_eq!(store.load_count(), 1);
}

#[tokio::test]
async fn test_directory_vocabulary() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("cl100k_base.tiktoken"),
        write_rank_file(&ranks()),
    )
    .unwrap();

    let mut config = Config::default();
    config.vocab.dir = Some(dir.path().to_path_buf());
    config.vocab.cache_dir = None;
    config.vocab.offline = true;

    let counter = TokenCounter::from_config(&config).unwrap();
    let messages = [Message::new("user", "Hello, world!")];
    assert_eq!(counter.count_tokens(&messages, "gpt-4").await.unwrap(), 14);

    // o200k_base is absent and offline mode never downloads.
    assert!(counter.count_tokens(&messages, "gpt-4o").await.is_err());
}

fn message_strategy() -> impl Strategy<Value = Message> {
    (
        "[a-z]{0,12}",
        "[ -~]{0,64}",
        proptest::option::of("[a-z_]{1,10}"),
    )
        .prop_map(|(role, content, name)| Message {
            role,
            content: content.replace("<|", "< |"),
            name,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_count_matches_rule(messages in proptest::collection::vec(message_strategy(), 0..6)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let counter = counter();

        let total = runtime.block_on(counter.count_tokens(&messages, "gpt-4-0613")).unwrap();
        let encoding = runtime.block_on(counter.encoding_for_model("gpt-4")).unwrap();
        prop_assert_eq!(total, expected(&encoding, &messages, 3, 1));
    }

    #[test]
    fn prop_appending_a_message_adds_framing(
        messages in proptest::collection::vec(message_strategy(), 0..4),
        extra in message_strategy(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let counter = counter();

        let before = runtime.block_on(counter.count_tokens(&messages, "gpt-4")).unwrap();
        let mut longer = messages.clone();
        longer.push(extra);
        let after = runtime.block_on(counter.count_tokens(&longer, "gpt-4")).unwrap();
        prop_assert!(after >= before + 3);
    }

    #[test]
    fn prop_encoding_roundtrips(text in "\\PC{0,80}") {
        let text = text.replace("<|", "< |");
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let encoding = runtime.block_on(counter().encoding_for_model("gpt-4")).unwrap();

        let tokens = encoding.encode_ordinary(&text).unwrap();
        prop_assert!(tokens.len() <= text.len());
        prop_assert_eq!(encoding.decode_bytes(&tokens).unwrap(), text.as_bytes());
    }
}
