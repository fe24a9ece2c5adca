//! Chat message token counting.
//!
//! Counts follow the chat format used by the reference tokenizer: every
//! field value is encoded, each message adds a fixed framing overhead, a
//! `name` field adds a per-model adjustment, and the reply priming is added
//! once per request.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokcount::{Config, Message, TokenCounter};
//!
//! let counter = TokenCounter::from_config(&Config::from_env())?;
//!
//! let messages = vec![
//!     Message::new("system", "You are a helpful assistant."),
//!     Message::new("user", "Hello!").with_name("alice"),
//! ];
//! let tokens = counter.count_tokens(&messages, "gpt-4").await?;
//! println!("Token count: {}", tokens);
//! ```

mod counter;

pub use counter::{count_with, Message, TokenCounter};
