//! In-process embedding via a candle XLM-RoBERTa model (BGE-M3 family).
//!
//! The model directory must hold `tokenizer.json`, `config.json`, and
//! `pytorch_model.bin`. Initialization failures (missing files, unsupported
//! device, weight-load errors) surface to the selection policy, which may
//! degrade to the remote backend.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::debug;

use mnemo_core::traits::Embedder;
use mnemo_core::Error;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

const MAX_LEN: usize = 256;

pub struct LocalEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    id: String,
}

impl LocalEmbedder {
    pub fn new(model_dir: &Path) -> Result<Self> {
        let device = select_device();

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("load tokenizer {}: {e}", tokenizer_path.display()))?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)
            .with_context(|| format!("read {}", config_path.display()))?;
        let config: XLMRobertaConfig = serde_json::from_str(&raw_config)?;
        let dim = embedding_dim(&raw_config)?;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)
            .with_context(|| format!("read weights {}", weights_path.display()))?;
        let weights_map: std::collections::HashMap<String, Tensor> =
            weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        debug!(model_dir = %model_dir.display(), dim, "local embedding model loaded");

        let id = format!("local:{}:d{dim}", model_dir.display());
        Ok(Self {
            model,
            tokenizer,
            device,
            dim,
            id,
        })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let (input_ids, attention_mask) =
            tokenize_on_device(&self.tokenizer, text, MAX_LEN, &self.device)?;
        let token_type_ids = Tensor::zeros((1, MAX_LEN), DType::I64, &self.device)?;
        let hidden = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let vector: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if vector.len() != self.dim {
            return Err(anyhow!(
                "model produced {}-dim vector, expected {}",
                vector.len(),
                self.dim
            ));
        }
        Ok(vector)
    }

    fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> mnemo_core::Result<Vec<Vec<f32>>> {
        self.embed_all(texts)
            .map_err(|e| Error::BackendUnavailable(format!("local model: {e:#}")))
    }
}

/// The hidden size from the raw model config; the arrow schema and the
/// persisted collection dimensionality both derive from it.
fn embedding_dim(raw_config: &str) -> Result<usize> {
    let value: serde_json::Value = serde_json::from_str(raw_config)?;
    value
        .get("hidden_size")
        .and_then(serde_json::Value::as_u64)
        .map(|v| v as usize)
        .ok_or_else(|| anyhow!("model config has no hidden_size"))
}
