//! Byte-level BPE encoder.
//!
//! Text is first split into pieces with the encoding's pre-tokenization
//! pattern. Each piece is then encoded independently: starting from single
//! bytes, the adjacent pair whose concatenation has the lowest rank is merged
//! until no adjacent pair forms a known token. Ties go to the leftmost pair.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use super::definition::{EncodingDefinition, Rank};
use crate::error::{Result, TokCountError};

/// Compute the part boundaries left after merging `piece`.
///
/// Returns the start offset of every part followed by `piece.len()`.
///
/// Parts form a linked list indexed by their start offset. Candidate pairs
/// sit in a min-heap keyed on `(rank, start)`, so the lowest rank wins and
/// the leftmost pair wins a tie. An entry also records where its pair ended
/// when it was pushed: parts only ever grow, so an entry whose left part is
/// gone or whose pair now ends elsewhere is stale and skipped.
fn byte_pair_merge(ranks: &HashMap<Vec<u8>, Rank>, piece: &[u8]) -> Vec<usize> {
    let len = piece.len();
    let mut next: Vec<usize> = (1..=len).collect();
    let mut prev: Vec<usize> = (0..len).map(|i| i.wrapping_sub(1)).collect();
    let mut alive = vec![true; len];
    let mut heap = BinaryHeap::with_capacity(len);

    // End of the pair starting at `start`, if it has a right neighbour.
    let pair_end = |next: &[usize], start: usize| -> Option<usize> {
        let mid = next[start];
        (mid < len).then(|| next[mid])
    };

    for start in 0..len - 1 {
        if let Some(&rank) = ranks.get(&piece[start..start + 2]) {
            heap.push(Reverse((rank, start, start + 2)));
        }
    }

    while let Some(Reverse((_, start, end))) = heap.pop() {
        if !alive[start] || pair_end(&next, start) != Some(end) {
            continue;
        }

        // Absorb the right neighbour.
        let right = next[start];
        alive[right] = false;
        next[start] = end;
        if end < len {
            prev[end] = start;
        }

        if let Some(end) = pair_end(&next, start) {
            if let Some(&rank) = ranks.get(&piece[start..end]) {
                heap.push(Reverse((rank, start, end)));
            }
        }
        let left = prev[start];
        if left != usize::MAX {
            if let Some(&rank) = ranks.get(&piece[left..end]) {
                heap.push(Reverse((rank, left, end)));
            }
        }
    }

    let mut bounds = Vec::with_capacity(len + 1);
    let mut start = 0;
    while start < len {
        bounds.push(start);
        start = next[start];
    }
    bounds.push(len);
    bounds
}

/// Encode a single pre-tokenized piece.
///
/// `ranks` must contain every single byte, otherwise unmergeable bytes have
/// no token to map to.
///
/// # Example
/// ```
/// use std::collections::HashMap;
/// use tokcount::encoding::byte_pair_encode;
///
/// let mut ranks: HashMap<Vec<u8>, u32> = (0..=255u8).map(|b| (vec![b], u32::from(b))).collect();
/// ranks.insert(b"ab".to_vec(), 256);
///
/// assert_eq!(byte_pair_encode(b"abc", &ranks), vec![256, u32::from(b'c')]);
/// ```
pub fn byte_pair_encode(piece: &[u8], ranks: &HashMap<Vec<u8>, Rank>) -> Vec<Rank> {
    match piece.len() {
        0 => Vec::new(),
        1 => vec![ranks[piece]],
        _ => byte_pair_merge(ranks, piece)
            .windows(2)
            .map(|w| ranks[&piece[w[0]..w[1]]])
            .collect(),
    }
}

/// A loaded, immutable encoding: vocabulary, merge ranks, split pattern and
/// special tokens.
#[derive(Debug)]
pub struct Encoding {
    name: String,
    encoder: HashMap<Vec<u8>, Rank>,
    decoder: HashMap<Rank, Vec<u8>>,
    special_encoder: HashMap<String, Rank>,
    special_decoder: HashMap<Rank, Vec<u8>>,
    pattern: fancy_regex::Regex,
    special_pattern: Option<regex::Regex>,
}

impl Encoding {
    /// Build an encoding from mergeable ranks, special tokens and a split pattern.
    ///
    /// Fails with [`TokCountError::InvalidVocabulary`] if a single byte is
    /// missing from `encoder`, or if a special token reuses a mergeable rank.
    pub fn new(
        name: impl Into<String>,
        encoder: HashMap<Vec<u8>, Rank>,
        special_tokens: HashMap<String, Rank>,
        pattern: &str,
    ) -> Result<Self> {
        let name = name.into();

        if let Some(missing) = (0..=255u8).find(|b| !encoder.contains_key(&[*b][..])) {
            return Err(TokCountError::InvalidVocabulary(format!(
                "{name}: missing single-byte token 0x{missing:02x}"
            )));
        }

        let decoder: HashMap<Rank, Vec<u8>> = encoder
            .iter()
            .map(|(token, &rank)| (rank, token.clone()))
            .collect();
        if decoder.len() != encoder.len() {
            return Err(TokCountError::InvalidVocabulary(format!(
                "{name}: duplicate ranks in vocabulary"
            )));
        }

        if let Some((token, _)) = special_tokens
            .iter()
            .find(|(_, rank)| decoder.contains_key(rank))
        {
            return Err(TokCountError::InvalidVocabulary(format!(
                "{name}: special token {token} collides with a mergeable rank"
            )));
        }

        let special_decoder = special_tokens
            .iter()
            .map(|(token, &rank)| (rank, token.as_bytes().to_vec()))
            .collect();

        let special_pattern = if special_tokens.is_empty() {
            None
        } else {
            // Longest first, so a token never shadows a longer one it prefixes.
            let mut tokens: Vec<&str> = special_tokens.keys().map(String::as_str).collect();
            tokens.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
            let alternation = tokens
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            Some(regex::Regex::new(&alternation)?)
        };

        Ok(Self {
            name,
            encoder,
            decoder,
            special_encoder: special_tokens,
            special_decoder,
            pattern: fancy_regex::Regex::new(pattern)?,
            special_pattern,
        })
    }

    /// Build an encoding from its canonical definition and parsed ranks.
    pub fn from_definition(def: &EncodingDefinition, ranks: HashMap<Vec<u8>, Rank>) -> Result<Self> {
        if let Some(expected) = def.explicit_n_vocab {
            let actual = ranks.len() + def.special_tokens.len();
            if actual != expected {
                return Err(TokCountError::InvalidVocabulary(format!(
                    "{}: expected {expected} tokens, found {actual}",
                    def.name
                )));
            }
        }

        let special_tokens = def
            .special_tokens
            .iter()
            .map(|&(token, rank)| (token.to_string(), rank))
            .collect();

        Self::new(def.name, ranks, special_tokens, def.pattern)
    }

    /// Encoding name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of tokens, mergeable and special
    pub fn n_vocab(&self) -> usize {
        self.encoder.len() + self.special_encoder.len()
    }

    /// Special tokens and their ranks
    pub fn special_tokens(&self) -> &HashMap<String, Rank> {
        &self.special_encoder
    }

    /// Encode text, treating special token text as ordinary text.
    pub fn encode_ordinary(&self, text: &str) -> Result<Vec<Rank>> {
        let mut tokens = Vec::new();
        for mat in self.pattern.find_iter(text) {
            let piece = mat?.as_str().as_bytes();
            match self.encoder.get(piece) {
                Some(&rank) => tokens.push(rank),
                None => tokens.extend(byte_pair_encode(piece, &self.encoder)),
            }
        }
        Ok(tokens)
    }

    /// Encode text, rejecting any special token it contains.
    ///
    /// This is the strict mode used for counting: text such as
    /// `<|endoftext|>` fails with [`TokCountError::DisallowedSpecialToken`].
    pub fn encode(&self, text: &str) -> Result<Vec<Rank>> {
        if let Some(found) = self.special_pattern.as_ref().and_then(|p| p.find(text)) {
            return Err(TokCountError::DisallowedSpecialToken(
                found.as_str().to_string(),
            ));
        }
        self.encode_ordinary(text)
    }

    /// Encode text, mapping special token text to the special token ranks.
    pub fn encode_with_special_tokens(&self, text: &str) -> Result<Vec<Rank>> {
        let Some(special_pattern) = &self.special_pattern else {
            return self.encode_ordinary(text);
        };

        let mut tokens = Vec::new();
        let mut start = 0;
        for found in special_pattern.find_iter(text) {
            tokens.extend(self.encode_ordinary(&text[start..found.start()])?);
            tokens.push(self.special_encoder[found.as_str()]);
            start = found.end();
        }
        tokens.extend(self.encode_ordinary(&text[start..])?);
        Ok(tokens)
    }

    /// Number of tokens `encode` produces for `text`.
    pub fn count(&self, text: &str) -> Result<usize> {
        self.encode(text).map(|tokens| tokens.len())
    }

    /// Map tokens back to the bytes they stand for.
    pub fn decode_bytes(&self, tokens: &[Rank]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(tokens.len() * 2);
        for &token in tokens {
            let bytes = self
                .decoder
                .get(&token)
                .or_else(|| self.special_decoder.get(&token))
                .ok_or(TokCountError::UnknownToken(token))?;
            out.extend_from_slice(bytes);
        }
        Ok(out)
    }
}
