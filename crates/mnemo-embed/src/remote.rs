//! Remote embedding over an OpenAI-compatible `/embeddings` endpoint.
//!
//! Call-time failures (network, HTTP status, malformed payloads) map to
//! `Error::BackendUnavailable` and are never retried here.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use mnemo_core::traits::Embedder;
use mnemo_core::{Error, Result};

pub struct RemoteEmbedder {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    dim: usize,
    id: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

impl RemoteEmbedder {
    pub fn new(api_base: &str, api_key: &str, model: &str, dim: usize) -> Self {
        let id = format!("remote:{model}:d{dim}");
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            dim,
            id,
        }
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.api_base);
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::BackendUnavailable(format!("embeddings request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::BackendUnavailable(format!(
                "embeddings request failed with {status}: {detail}"
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::BackendUnavailable(format!("embeddings response: {e}")))?;
        if parsed.data.len() != texts.len() {
            return Err(Error::BackendUnavailable(format!(
                "embeddings response had {} rows for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        // Providers may reorder rows; `index` restores input order.
        let mut rows = parsed.data;
        rows.sort_by_key(|r| r.index);
        let mut vectors = Vec::with_capacity(rows.len());
        for row in rows {
            if row.embedding.len() != self.dim {
                return Err(Error::BackendUnavailable(format!(
                    "provider returned {}-dim vector, configured for {}",
                    row.embedding.len(),
                    self.dim
                )));
            }
            vectors.push(row.embedding);
        }
        debug!(batch = texts.len(), "remote embedding batch complete");
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }
}
