//! Domain types shared between the chunking, embedding, and index crates.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Provenance carried by every chunk.
///
/// `source` is the originating document name as supplied by the text
/// extraction collaborator; `topic`/`subtopic` come from the topic
/// classification collaborator (or are synthetic defaults).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub topic: String,
    pub subtopic: String,
    pub file_type: String,
}

/// The unit of embedding and retrieval.
///
/// `id` is a deterministic hash of `(source, chunk_index, text)`, so
/// re-ingesting unchanged content overwrites rather than duplicates.
/// Chunks are immutable; an edited source re-upserts under the same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Topic boundary supplied by the upstream classifier.
///
/// `start_offset` is a byte offset into the normalized document text and is
/// assumed inexact. The list may be empty; the engine degrades to a
/// synthetic "General" topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    #[serde(default)]
    pub subtopics: Vec<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
    pub start_offset: usize,
}

/// One ranked retrieval result.
///
/// `distance` is cosine distance (`1 - cosine similarity`); lower is more
/// similar. Relevance thresholding is the caller's policy, never applied
/// inside the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub distance: f32,
}
