//! # tokcount - Chat Token Counting for OpenAI Models
//!
//! Counts the tokens a list of chat messages consumes when sent to an OpenAI
//! chat model, matching the model's real byte-level BPE tokenizer and chat
//! framing overhead.
//!
//! ## Features
//!
//! - **Byte-level BPE**: `r50k_base`, `p50k_base`, `p50k_edit`, `cl100k_base`, `o200k_base`
//! - **Model resolution**: exact names, fine-tune and snapshot prefixes, aliases, families
//! - **Chat framing**: per-snapshot message and name overhead plus reply priming
//! - **Shared vocabulary cache**: each encoding is fetched and built once per process
//! - **HTTP API**: `POST /tokenizer/:model` (Axum-based)
//!
//! ## Counting Rule
//!
//! ```text
//! total = reply_priming
//!       + sum over messages of (
//!             tokens_per_message
//!           + tokens(role) + tokens(content) + tokens(name)
//!           + (tokens_per_name if name is present)
//!         )
//! ```
//!
//! | Snapshot               | tokens_per_message | tokens_per_name |
//! |------------------------|--------------------|-----------------|
//! | gpt-3.5-turbo-0301     | 4                  | -1              |
//! | every other snapshot   | 3                  | 1               |
//!
//! Reply priming is 3 tokens for every model.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tokcount::{Config, Message, TokenCounter};
//!
//! let counter = TokenCounter::from_config(&Config::from_env())?;
//!
//! let messages = vec![
//!     Message::new("system", "You are a helpful assistant."),
//!     Message::new("user", "Hello, world!"),
//! ];
//! let total = counter.count_tokens(&messages, "gpt-4").await?;
//! ```
//!
//! ## Modules
//!
//! - [`encoding`]: BPE encodings, vocabulary sources and the shared store
//! - [`models`]: Model-to-encoding tables, framing rules and resolution
//! - [`tokenizer`]: Chat message counting
//! - [`server`]: HTTP API server
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod config;
pub mod encoding;
pub mod error;
pub mod models;
pub mod server;
pub mod tokenizer;

// Re-exports for convenience
pub use config::Config;
pub use encoding::{Encoding, EncodingStore, VocabularySource};
pub use error::{Result, TokCountError};
pub use models::{FramingRule, FramingTable, ModelResolver};
pub use server::{AppState, ServerConfig};
pub use tokenizer::{count_with, Message, TokenCounter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
