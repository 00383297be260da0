//! Greedy whitespace chunker with token-tail overlap.
//!
//! Accumulates whitespace-delimited tokens until the next token would push
//! the chunk past its character budget, then seeds the following chunk with
//! the trailing `overlap / 10` tokens of the one just emitted. The word-count
//! heuristic approximates character overlap without re-scanning raw text.

/// An ordered slice of the source text, prior to metadata attachment.
///
/// `start_offset` is the byte offset of the chunk's first token in the
/// original text (overlap tokens included), used to locate the nearest
/// topic boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDraft {
    pub text: String,
    pub start_offset: usize,
}

/// Split `text` into ordered, overlapping chunks of at most `target_size`
/// characters (a single oversized token may exceed the budget).
///
/// Pure and deterministic. Malformed input degrades instead of erroring:
/// empty or whitespace-only text yields an empty sequence, `target_size == 0`
/// yields an empty sequence, and `overlap` is clamped below `target_size`.
/// The final partial accumulation, however short, is always flushed.
pub fn split(text: &str, target_size: usize, overlap: usize) -> Vec<ChunkDraft> {
    if target_size == 0 {
        return Vec::new();
    }
    let overlap = overlap.min(target_size.saturating_sub(1));
    let overlap_tokens = overlap / 10;

    let tokens = tokens_with_offsets(text);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    // Current accumulation: (byte offset, token) pairs plus the joined length.
    let mut current: Vec<(usize, &str)> = Vec::new();
    let mut current_len = 0usize;

    for (offset, token) in tokens {
        let added = if current.is_empty() {
            token.len()
        } else {
            token.len() + 1
        };
        if !current.is_empty() && current_len + added > target_size {
            // Seed strictly fewer tokens than the emitted chunk so every
            // chunk consumes fresh input; otherwise a near-budget overlap
            // would re-absorb the whole chunk and grow without bound.
            let seed_from = current.len().saturating_sub(overlap_tokens).max(1);
            let seed: Vec<(usize, &str)> = current[seed_from..].to_vec();
            chunks.push(flush(&current));
            current = seed;
            current_len = joined_len(&current);
        }
        if current.is_empty() {
            current_len = token.len();
        } else {
            current_len += token.len() + 1;
        }
        current.push((offset, token));
    }
    if !current.is_empty() {
        chunks.push(flush(&current));
    }
    chunks
}

fn flush(tokens: &[(usize, &str)]) -> ChunkDraft {
    let text = tokens
        .iter()
        .map(|(_, t)| *t)
        .collect::<Vec<_>>()
        .join(" ");
    ChunkDraft {
        text,
        start_offset: tokens[0].0,
    }
}

fn joined_len(tokens: &[(usize, &str)]) -> usize {
    if tokens.is_empty() {
        return 0;
    }
    tokens.iter().map(|(_, t)| t.len()).sum::<usize>() + tokens.len() - 1
}

/// Whitespace tokenization that keeps each token's byte offset.
fn tokens_with_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (i, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                tokens.push((s, &text[s..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push((s, &text[s..]));
    }
    tokens
}
