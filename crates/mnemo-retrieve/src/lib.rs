#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! Ingestion and retrieval pipelines over the chunker, embedding backend,
//! and vector index.
//!
//! Ingestion: text -> chunks -> topic labels -> embeddings -> upsert.
//! Retrieval: query -> embedding -> nearest neighbors -> affinity reorder.
//!
//! Bulk ingestion into one collection must be externally serialized
//! (single-writer discipline); queries are read-only and safely concurrent.

use tracing::{debug, info, warn};

use mnemo_chunk::{chunk_id, locate, split};
use mnemo_core::config::EngineConfig;
use mnemo_core::types::{Chunk, ChunkMetadata, RetrievedChunk, Topic};
use mnemo_core::Result;
use mnemo_embed::{select_backend, Backend};
use mnemo_vector::VectorIndex;

pub struct RetrievalEngine {
    backend: Backend,
    index: VectorIndex,
    config: EngineConfig,
}

impl RetrievalEngine {
    /// Validate the configuration, select the embedding backend, and open
    /// the collection. An unavailable backend does not fail the open:
    /// `count`/`clear` keep working and embedding calls surface
    /// `Error::Configuration`, so callers can present a degraded-mode
    /// message instead of crashing.
    pub async fn open(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let backend = select_backend(&config);
        if let Backend::Unavailable { reason } = &backend {
            warn!(%reason, "engine opened without a usable embedding backend");
        }
        let index = VectorIndex::open(&config.db_path(), &config.collection, backend.dim()).await?;
        info!(backend = backend.id(), collection = %config.collection, "retrieval engine ready");
        Ok(Self {
            backend,
            index,
            config,
        })
    }

    /// Chunk, label, embed, and upsert one document. Returns the number of
    /// chunks written; empty or whitespace-only text writes nothing.
    /// Re-ingesting unchanged text is a no-op overwrite by construction of
    /// the chunk ids.
    pub async fn ingest(
        &self,
        text: &str,
        source: &str,
        file_type: &str,
        topics: &[Topic],
    ) -> Result<usize> {
        let drafts = split(text, self.config.chunk_size, self.config.chunk_overlap);
        if drafts.is_empty() {
            debug!(source, "nothing to ingest");
            return Ok(0);
        }
        let total_chunks = drafts.len();
        let chunks: Vec<Chunk> = drafts
            .into_iter()
            .enumerate()
            .map(|(chunk_index, draft)| {
                let label = locate(draft.start_offset, topics);
                Chunk {
                    id: chunk_id(&draft.text, source, chunk_index),
                    metadata: ChunkMetadata {
                        source: source.to_string(),
                        chunk_index,
                        total_chunks,
                        topic: label.topic,
                        subtopic: label.subtopic,
                        file_type: file_type.to_string(),
                    },
                    text: draft.text,
                }
            })
            .collect();

        for batch in chunks.chunks(self.config.embed_batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.backend.embed_batch(&texts).await?;
            self.index.upsert(batch, &vectors).await?;
        }
        info!(source, chunks = total_chunks, "document ingested");
        Ok(total_chunks)
    }

    /// Embed the query and return the `k` most relevant chunks, optionally
    /// biased toward `affinity_source`. With a bias in play the index is
    /// asked for `2k` raw results so the reorder step has material to
    /// promote; ranking within each partition is untouched.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        affinity_source: Option<&str>,
    ) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut query_vectors = self.backend.embed_batch(&[query.to_string()]).await?;
        if query_vectors.is_empty() {
            return Err(mnemo_core::Error::BackendUnavailable(
                "backend returned no vector for the query".to_string(),
            ));
        }
        let query_vector = query_vectors.remove(0);
        let fetch_k = if affinity_source.is_some() { k * 2 } else { k };
        let raw = self.index.query(&query_vector, fetch_k).await?;
        Ok(reorder(raw, affinity_source, k))
    }

    pub async fn count(&self) -> Result<usize> {
        self.index.count().await
    }

    /// Destructive. Serialize against in-flight ingests and queries.
    pub async fn clear(&self) -> Result<()> {
        self.index.clear().await
    }

    pub fn backend_id(&self) -> &str {
        self.backend.id()
    }

    pub fn backend_available(&self) -> bool {
        self.backend.is_available()
    }
}

/// Bias ranked results toward `affinity_source` without disturbing
/// within-partition relevance order: stable-partition into matching and
/// other, concatenate, truncate to `k`. Identity (plus truncation) when no
/// affinity source is given.
pub fn reorder(
    results: Vec<RetrievedChunk>,
    affinity_source: Option<&str>,
    k: usize,
) -> Vec<RetrievedChunk> {
    let mut out = match affinity_source {
        None => results,
        Some(source) => {
            let (matching, other): (Vec<_>, Vec<_>) = results
                .into_iter()
                .partition(|r| r.metadata.source == source);
            matching.into_iter().chain(other).collect()
        }
    };
    out.truncate(k);
    out
}
