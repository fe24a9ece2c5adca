//! Canonical encoding definitions.
//!
//! Each definition names the rank file holding the mergeable ranks, the
//! pre-tokenization pattern and the special tokens. Rank files are the
//! `.tiktoken` files published alongside OpenAI's tokenizers.

use crate::error::{Result, TokCountError};

/// Token identifier (and merge priority) within an encoding.
pub type Rank = u32;

/// `<|endoftext|>`
pub const ENDOFTEXT: &str = "<|endoftext|>";
/// `<|fim_prefix|>`
pub const FIM_PREFIX: &str = "<|fim_prefix|>";
/// `<|fim_middle|>`
pub const FIM_MIDDLE: &str = "<|fim_middle|>";
/// `<|fim_suffix|>`
pub const FIM_SUFFIX: &str = "<|fim_suffix|>";
/// `<|endofprompt|>`
pub const ENDOFPROMPT: &str = "<|endofprompt|>";

/// GPT-2 style split (r50k_base, p50k_base, p50k_edit).
pub const R50K_PATTERN: &str =
    r"'s|'t|'re|'ve|'m|'ll|'d| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";

/// cl100k_base split.
pub const CL100K_PATTERN: &str = r"(?i:'s|'t|'re|'ve|'m|'ll|'d)|[^\r\n\p{L}\p{N}]?\p{L}+|\p{N}{1,3}| ?[^\s\p{L}\p{N}]+[\r\n]*|\s*[\r\n]+|\s+(?!\S)|\s+";

/// o200k_base split.
pub const O200K_PATTERN: &str = concat!(
    r"[^\r\n\p{L}\p{N}]?[\p{Lu}\p{Lt}\p{Lm}\p{Lo}\p{M}]*[\p{Ll}\p{Lm}\p{Lo}\p{M}]+",
    r"(?i:'s|'t|'re|'ve|'m|'ll|'d)?",
    r"|[^\r\n\p{L}\p{N}]?[\p{Lu}\p{Lt}\p{Lm}\p{Lo}\p{M}]+[\p{Ll}\p{Lm}\p{Lo}\p{M}]*",
    r"(?i:'s|'t|'re|'ve|'m|'ll|'d)?",
    r"|\p{N}{1,3}",
    r"| ?[^\s\p{L}\p{N}]+[\r\n/]*",
    r"|\s*[\r\n]+",
    r"|\s+(?!\S)",
    r"|\s+",
);

/// Static description of an encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingDefinition {
    /// Encoding name (e.g. `cl100k_base`)
    pub name: &'static str,
    /// Rank file name, relative to a vocabulary source
    pub rank_file: &'static str,
    /// Pre-tokenization pattern
    pub pattern: &'static str,
    /// Special tokens and their ranks
    pub special_tokens: &'static [(&'static str, Rank)],
    /// Expected number of mergeable ranks plus special tokens, when published
    pub explicit_n_vocab: Option<usize>,
}

/// All encodings this crate can load.
pub static ENCODINGS: &[EncodingDefinition] = &[
    EncodingDefinition {
        name: "r50k_base",
        rank_file: "r50k_base.tiktoken",
        pattern: R50K_PATTERN,
        special_tokens: &[(ENDOFTEXT, 50256)],
        explicit_n_vocab: Some(50257),
    },
    EncodingDefinition {
        name: "p50k_base",
        rank_file: "p50k_base.tiktoken",
        pattern: R50K_PATTERN,
        special_tokens: &[(ENDOFTEXT, 50256)],
        explicit_n_vocab: Some(50281),
    },
    EncodingDefinition {
        name: "p50k_edit",
        rank_file: "p50k_base.tiktoken",
        pattern: R50K_PATTERN,
        special_tokens: &[
            (ENDOFTEXT, 50256),
            (FIM_PREFIX, 50281),
            (FIM_MIDDLE, 50282),
            (FIM_SUFFIX, 50283),
        ],
        explicit_n_vocab: None,
    },
    EncodingDefinition {
        name: "cl100k_base",
        rank_file: "cl100k_base.tiktoken",
        pattern: CL100K_PATTERN,
        special_tokens: &[
            (ENDOFTEXT, 100257),
            (FIM_PREFIX, 100258),
            (FIM_MIDDLE, 100259),
            (FIM_SUFFIX, 100260),
            (ENDOFPROMPT, 100276),
        ],
        explicit_n_vocab: None,
    },
    EncodingDefinition {
        name: "o200k_base",
        rank_file: "o200k_base.tiktoken",
        pattern: O200K_PATTERN,
        special_tokens: &[(ENDOFTEXT, 199999), (ENDOFPROMPT, 200018)],
        explicit_n_vocab: None,
    },
];

/// Look up an encoding definition by name.
///
/// # Example
/// ```
/// use tokcount::encoding::definition;
///
/// let def = definition("cl100k_base").unwrap();
/// assert_eq!(def.rank_file, "cl100k_base.tiktoken");
/// assert!(definition("nope_base").is_err());
/// ```
pub fn definition(name: &str) -> Result<&'static EncodingDefinition> {
    ENCODINGS
        .iter()
        .find(|def| def.name == name)
        .ok_or_else(|| TokCountError::UnknownEncoding(name.to_string()))
}

/// Names of all known encodings.
pub fn encoding_names() -> impl Iterator<Item = &'static str> {
    ENCODINGS.iter().map(|def| def.name)
}
