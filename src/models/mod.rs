//! Model resolution and chat framing rules.
//!
//! This module answers two questions about a model identifier:
//! - which encoding tokenizes its text ([`ModelResolver::encoding_for`])
//! - how many framing tokens its chat format adds ([`FramingTable`])
//!
//! # Example
//!
//! ```
//! use tokcount::models::{FramingRule, FramingTable, ModelResolver};
//!
//! let resolver = ModelResolver::new();
//! let framing = FramingTable::new();
//!
//! let resolved = resolver.resolve("gpt-3.5-turbo-0301", &framing).unwrap();
//! assert_eq!(resolved.encoding, "cl100k_base");
//! assert_eq!(resolved.rule, FramingRule::new(4, -1));
//!
//! // Versionless names fall back to their family's dated snapshot.
//! let resolved = resolver.resolve("gpt-4", &framing).unwrap();
//! assert_eq!(resolved.snapshot, "gpt-4-0613");
//! ```

mod framing;
mod resolver;
mod tables;

pub use framing::{FramingRule, FramingTable};
pub use resolver::{FamilyRule, ModelResolver, Resolution};
pub use tables::{
    DEFAULT_ALIASES, DEFAULT_FAMILIES, DEFAULT_REPLY_PRIMING_TOKENS, DEFAULT_SNAPSHOTS,
    MODEL_PREFIX_TO_ENCODING, MODEL_TO_ENCODING,
};
