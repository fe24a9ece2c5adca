//! Rank file parsing.
//!
//! A rank file has one mergeable token per line: the token bytes in
//! standard base64, a single space, then the decimal rank.
//!
//! ```text
//! IQ== 0
//! Ig== 1
//! ```

use std::collections::{HashMap, HashSet};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use super::definition::Rank;
use crate::error::{Result, TokCountError};

/// Parse rank file contents into a token -> rank map.
///
/// Blank lines are ignored. Duplicate tokens and duplicate ranks are rejected,
/// since either would make decoding ambiguous.
pub fn parse_rank_file(contents: &[u8]) -> Result<HashMap<Vec<u8>, Rank>> {
    let mut ranks = HashMap::new();
    let mut seen = HashSet::new();

    for (lineno, line) in contents.split(|&b| b == b'\n').enumerate() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split(|&b| b == b' ');
        let (Some(token), Some(rank), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(TokCountError::InvalidVocabulary(format!(
                "line {}: expected `<base64> <rank>`",
                lineno + 1
            )));
        };

        let token = BASE64.decode(token)?;
        let rank: Rank = std::str::from_utf8(rank)
            .ok()
            .and_then(|r| r.parse().ok())
            .ok_or_else(|| {
                TokCountError::InvalidVocabulary(format!("line {}: invalid rank", lineno + 1))
            })?;

        if !seen.insert(rank) {
            return Err(TokCountError::InvalidVocabulary(format!(
                "line {}: duplicate rank {rank}",
                lineno + 1
            )));
        }
        if ranks.insert(token, rank).is_some() {
            return Err(TokCountError::InvalidVocabulary(format!(
                "line {}: duplicate token",
                lineno + 1
            )));
        }
    }

    if ranks.is_empty() {
        return Err(TokCountError::InvalidVocabulary(
            "rank file is empty".to_string(),
        ));
    }

    Ok(ranks)
}

/// Serialize a token -> rank map in rank file format, ordered by rank.
pub fn write_rank_file(ranks: &HashMap<Vec<u8>, Rank>) -> String {
    let mut entries: Vec<_> = ranks.iter().collect();
    entries.sort_by_key(|(_, &rank)| rank);

    let mut out = String::with_capacity(entries.len() * 12);
    for (token, rank) in entries {
        out.push_str(&BASE64.encode(token));
        out.push(' ');
        out.push_str(&rank.to_string());
        out.push('\n');
    }
    out
}
