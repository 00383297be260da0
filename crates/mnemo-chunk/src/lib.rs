#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod builder;
pub mod topics;

pub use builder::{split, ChunkDraft};
pub use topics::{locate, TopicLabel};

/// Deterministic chunk identity: the same `(source, chunk_index, text)`
/// always hashes to the same id, so re-ingestion of unchanged content is an
/// overwrite, never a duplicate.
pub fn chunk_id(text: &str, source: &str, chunk_index: usize) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(source.as_bytes());
    hasher.update(b"\0");
    hasher.update(chunk_index.to_le_bytes().as_slice());
    hasher.update(b"\0");
    hasher.update(text.as_bytes());
    hasher.finalize().to_hex().to_string()
}
