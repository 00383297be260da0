use async_trait::async_trait;

use crate::Result;

/// Converts batches of text into fixed-dimension vectors.
///
/// Implementations are immutable once constructed: dimensionality is not
/// renegotiated for the lifetime of the index they feed. Batch calls are
/// blocking from the caller's perspective; no timeout or retry is built in.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the backing model (e.g. `local:bge-m3:d1024`).
    fn id(&self) -> &str;

    /// Embedding dimensionality.
    fn dim(&self) -> usize;

    /// Embed a batch of texts. Returns one vector per input, each of
    /// length `dim()`.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
