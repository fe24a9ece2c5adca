//! Built-in model tables.
//!
//! These are the defaults; configuration can add to or override them.

use phf::phf_map;

/// Exact model -> encoding
pub static MODEL_TO_ENCODING: phf::Map<&'static str, &'static str> = phf_map! {
    // Reasoning
    "o1" => "o200k_base",
    "o3" => "o200k_base",
    "o4" => "o200k_base",
    // Chat
    "gpt-5" => "o200k_base",
    "gpt-4.5" => "o200k_base",
    "gpt-4.1" => "o200k_base",
    "gpt-4o" => "o200k_base",
    "chatgpt-4o-latest" => "o200k_base",
    "gpt-4" => "cl100k_base",
    "gpt-3.5-turbo" => "cl100k_base",
    "gpt-3.5" => "cl100k_base",
    "gpt-35-turbo" => "cl100k_base",
    // Base
    "davinci-002" => "cl100k_base",
    "babbage-002" => "cl100k_base",
    // Embeddings
    "text-embedding-ada-002" => "cl100k_base",
    "text-embedding-3-small" => "cl100k_base",
    "text-embedding-3-large" => "cl100k_base",
    // Legacy completions
    "text-davinci-003" => "p50k_base",
    "text-davinci-002" => "p50k_base",
    "text-davinci-001" => "r50k_base",
    "text-curie-001" => "r50k_base",
    "text-babbage-001" => "r50k_base",
    "text-ada-001" => "r50k_base",
    "davinci" => "r50k_base",
    "curie" => "r50k_base",
    "babbage" => "r50k_base",
    "ada" => "r50k_base",
    // Code
    "code-davinci-002" => "p50k_base",
    "code-davinci-001" => "p50k_base",
    "code-cushman-002" => "p50k_base",
    "code-cushman-001" => "p50k_base",
    "davinci-codex" => "p50k_base",
    "cushman-codex" => "p50k_base",
    // Edit
    "text-davinci-edit-001" => "p50k_edit",
    "code-davinci-edit-001" => "p50k_edit",
    // Legacy embeddings
    "text-similarity-davinci-001" => "r50k_base",
    "text-similarity-curie-001" => "r50k_base",
    "text-similarity-babbage-001" => "r50k_base",
    "text-similarity-ada-001" => "r50k_base",
    "text-search-davinci-doc-001" => "r50k_base",
    "text-search-curie-doc-001" => "r50k_base",
    "text-search-babbage-doc-001" => "r50k_base",
    "text-search-ada-doc-001" => "r50k_base",
    "code-search-babbage-code-001" => "r50k_base",
    "code-search-ada-code-001" => "r50k_base",
};

/// Model prefix -> encoding, checked in order.
///
/// Where one prefix extends another (`ft:gpt-4o` / `ft:gpt-4`) the longer
/// one comes first. Dotted generations (`gpt-4.1-`) need their own entries:
/// they do not start with `gpt-4-`, and would otherwise land on the `gpt-4`
/// family's cl100k_base.
pub static MODEL_PREFIX_TO_ENCODING: &[(&str, &str)] = &[
    ("ft:gpt-4o", "o200k_base"),
    ("ft:gpt-4", "cl100k_base"),
    ("ft:gpt-3.5-turbo", "cl100k_base"),
    ("ft:davinci-002", "cl100k_base"),
    ("ft:babbage-002", "cl100k_base"),
    ("gpt-5-", "o200k_base"),
    ("gpt-4.5-", "o200k_base"),
    ("gpt-4.1-", "o200k_base"),
    ("chatgpt-4o-", "o200k_base"),
    ("gpt-4o-", "o200k_base"),
    ("gpt-4-", "cl100k_base"),
    ("gpt-3.5-turbo-", "cl100k_base"),
    ("gpt-35-turbo-", "cl100k_base"),
    ("o1-", "o200k_base"),
    ("o3-", "o200k_base"),
    ("o4-", "o200k_base"),
];

/// Snapshot -> (tokens_per_message, tokens_per_name)
pub static DEFAULT_SNAPSHOTS: &[(&str, i64, i64)] = &[
    // <|start|>{role/name}\n{content}<|end|>\n, name replaces role
    ("gpt-3.5-turbo-0301", 4, -1),
    ("gpt-3.5-turbo-0613", 3, 1),
    ("gpt-3.5-turbo-16k-0613", 3, 1),
    ("gpt-4-0314", 3, 1),
    ("gpt-4-32k-0314", 3, 1),
    ("gpt-4-0613", 3, 1),
    ("gpt-4-32k-0613", 3, 1),
    ("gpt-4o-2024-08-06", 3, 1),
    ("gpt-4o-mini-2024-07-18", 3, 1),
];

/// Every reply is primed with `<|start|>assistant<|message|>`.
pub const DEFAULT_REPLY_PRIMING_TOKENS: i64 = 3;

/// Versionless alias -> canonical snapshot
pub static DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("gpt-3.5-turbo", "gpt-3.5-turbo-0613"),
    ("gpt-3.5-turbo-16k", "gpt-3.5-turbo-16k-0613"),
    ("gpt-4", "gpt-4-0613"),
    ("gpt-4-32k", "gpt-4-32k-0613"),
    ("gpt-4o", "gpt-4o-2024-08-06"),
    ("gpt-4o-mini", "gpt-4o-mini-2024-07-18"),
];

/// Family substring -> canonical snapshot, checked in order.
///
/// More specific families come first: `gpt-4o-mini` also contains `gpt-4o`,
/// which also contains `gpt-4`.
pub static DEFAULT_FAMILIES: &[(&str, &str)] = &[
    ("gpt-4o-mini", "gpt-4o-mini-2024-07-18"),
    ("gpt-4o", "gpt-4o-2024-08-06"),
    ("gpt-4-32k", "gpt-4-32k-0613"),
    ("gpt-4", "gpt-4-0613"),
    ("gpt-3.5-turbo-16k", "gpt-3.5-turbo-16k-0613"),
    ("gpt-3.5-turbo", "gpt-3.5-turbo-0613"),
    // Azure deployment names drop the dot.
    ("gpt-35-turbo", "gpt-3.5-turbo-0613"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::definition;

    #[test]
    fn test_tables_reference_known_encodings() {
        for encoding in MODEL_TO_ENCODING.values() {
            assert!(definition(encoding).is_ok(), "{encoding}");
        }
        for (_, encoding) in MODEL_PREFIX_TO_ENCODING {
            assert!(definition(encoding).is_ok(), "{encoding}");
        }
    }

    #[test]
    fn test_aliases_and_families_point_at_snapshots() {
        let known = |name: &str| DEFAULT_SNAPSHOTS.iter().any(|(s, _, _)| *s == name);
        for (alias, snapshot) in DEFAULT_ALIASES {
            assert!(known(snapshot), "{alias} -> {snapshot}");
        }
        for (pattern, snapshot) in DEFAULT_FAMILIES {
            assert!(known(snapshot), "{pattern} -> {snapshot}");
        }
    }

    #[test]
    fn test_longer_prefixes_first() {
        for (i, (earlier, _)) in MODEL_PREFIX_TO_ENCODING.iter().enumerate() {
            for (later, _) in &MODEL_PREFIX_TO_ENCODING[i + 1..] {
                assert!(
                    !later.starts_with(earlier),
                    "{later} is shadowed by {earlier}"
                );
            }
        }
    }

    #[test]
    fn test_specific_families_first() {
        for (i, (earlier, _)) in DEFAULT_FAMILIES.iter().enumerate() {
            for (later, _) in &DEFAULT_FAMILIES[i + 1..] {
                assert!(!later.contains(earlier), "{later} is shadowed by {earlier}");
            }
        }
    }
}
