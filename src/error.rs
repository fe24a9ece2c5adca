//! Token counting error types.
//!
//! The core never recovers from these: it returns them to the caller, and the
//! transport layer decides how to log and format them.
//!
//! - [`TokCountError::UnsupportedModel`] is a client input error.
//! - [`TokCountError::UnknownEncoding`] and [`TokCountError::InvalidVocabulary`]
//!   point at an inconsistency in the tables or the vocabulary files.

use thiserror::Error;

/// Token counting errors.
#[derive(Error, Debug)]
pub enum TokCountError {
    /// Model cannot be resolved to both an encoding and a framing rule.
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    /// Encoding name has no vocabulary definition.
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    /// Text contains a special token that plain encoding does not allow.
    #[error("Encountered text corresponding to disallowed special token {0:?}")]
    DisallowedSpecialToken(String),

    /// Token id is not part of the encoding.
    #[error("Unknown token id: {0}")]
    UnknownToken(u32),

    /// Pre-tokenization failed on the input text.
    #[error("Pre-tokenization error: {0}")]
    Pattern(String),

    /// Rank file could not be parsed or is incomplete.
    #[error("Invalid vocabulary: {0}")]
    InvalidVocabulary(String),

    /// Rank file could not be fetched from its source.
    #[error("Vocabulary fetch error: {0}")]
    VocabularyFetch(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Server-side error.
    #[error("Server error: {0}")]
    Server(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for token counting operations
pub type Result<T> = std::result::Result<T, TokCountError>;

impl From<reqwest::Error> for TokCountError {
    fn from(err: reqwest::Error) -> Self {
        TokCountError::VocabularyFetch(err.to_string())
    }
}

impl From<toml::de::Error> for TokCountError {
    fn from(err: toml::de::Error) -> Self {
        TokCountError::Config(err.to_string())
    }
}

impl From<base64::DecodeError> for TokCountError {
    fn from(err: base64::DecodeError) -> Self {
        TokCountError::InvalidVocabulary(format!("Base64 decode error: {err}"))
    }
}

impl From<fancy_regex::Error> for TokCountError {
    fn from(err: fancy_regex::Error) -> Self {
        TokCountError::Pattern(err.to_string())
    }
}

impl From<regex::Error> for TokCountError {
    fn from(err: regex::Error) -> Self {
        TokCountError::InvalidVocabulary(format!("Special token pattern error: {err}"))
    }
}

impl TokCountError {
    /// Whether the error was caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TokCountError::UnsupportedModel(_) | TokCountError::DisallowedSpecialToken(_)
        )
    }
}
