//! Byte-pair encodings and their vocabulary store.
//!
//! # Supported Encodings
//!
//! - **r50k_base**: GPT-3 (davinci, curie, babbage, ada)
//! - **p50k_base** / **p50k_edit**: Codex and text-davinci-002/003
//! - **cl100k_base**: GPT-3.5-turbo, GPT-4, embeddings
//! - **o200k_base**: GPT-4o, o1, o3
//!
//! Vocabularies are not bundled. The [`EncodingStore`] fetches the rank
//! files through a [`VocabularySource`] the first time an encoding is needed
//! and keeps the built [`Encoding`] for the lifetime of the store.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use tokcount::encoding::{Encoding, CL100K_PATTERN};
//!
//! let ranks: HashMap<Vec<u8>, u32> = (0..=255u8).map(|b| (vec![b], u32::from(b))).collect();
//! let encoding = Encoding::new("bytes", ranks, HashMap::new(), CL100K_PATTERN).unwrap();
//!
//! let tokens = encoding.encode("hi").unwrap();
//! assert_eq!(tokens, vec![u32::from(b'h'), u32::from(b'i')]);
//! assert_eq!(encoding.decode_bytes(&tokens).unwrap(), b"hi");
//! ```

mod bpe;
mod definition;
mod source;
mod store;
mod vocab;

pub use bpe::{byte_pair_encode, Encoding};
pub use definition::{
    definition, encoding_names, EncodingDefinition, Rank, CL100K_PATTERN, ENCODINGS, ENDOFPROMPT,
    ENDOFTEXT, FIM_MIDDLE, FIM_PREFIX, FIM_SUFFIX, O200K_PATTERN, R50K_PATTERN,
};
pub use source::{
    DirectorySource, FetchFuture, LayeredSource, MemorySource, RemoteSource, VocabularySource,
    DEFAULT_BASE_URL,
};
pub use store::EncodingStore;
pub use vocab::{parse_rank_file, write_rank_file};
