//! Typed engine configuration.
//!
//! Uses Figment to merge `mnemo.toml` + `MNEMO_*` env vars over built-in
//! defaults into a validated `EngineConfig`. Backend choice is an explicit
//! configuration value consumed once at construction; there is no runtime
//! or env-driven backend switching after that.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Which embedding backend the engine constructs.
///
/// `Auto` attempts the local model first and degrades to the remote
/// provider when local initialization fails. `Hashed` is the deterministic
/// token-hash embedder for tests and offline development.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    Auto,
    Local,
    Remote,
    Hashed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the LanceDB collection.
    pub data_dir: String,
    /// Named collection; one logical application instance per collection.
    pub collection: String,
    pub backend: BackendMode,
    /// Local model directory (tokenizer.json, config.json, pytorch_model.bin).
    pub model_dir: Option<String>,
    /// Base URL of an OpenAI-compatible embeddings API.
    pub api_base: String,
    /// Credential for the remote backend. Absent means remote is unusable.
    pub api_key: Option<String>,
    pub remote_model: String,
    pub remote_dim: usize,
    pub hashed_dim: usize,
    /// Chunk budget in characters.
    pub chunk_size: usize,
    /// Overlap budget in characters; the chunker seeds `chunk_overlap / 10`
    /// trailing tokens into the next chunk.
    pub chunk_overlap: usize,
    /// Texts per `embed_batch` call; bounds memory and network payload.
    pub embed_batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data/mnemo".to_string(),
            collection: "study_chunks".to_string(),
            backend: BackendMode::Auto,
            model_dir: None,
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            remote_model: "text-embedding-3-small".to_string(),
            remote_dim: 1536,
            hashed_dim: 256,
            chunk_size: 1000,
            chunk_overlap: 200,
            embed_batch_size: 32,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `mnemo.toml` and `MNEMO_*` env vars.
    pub fn load() -> anyhow::Result<Self> {
        let config: EngineConfig = Figment::new()
            .merge(Serialized::defaults(EngineConfig::default()))
            .merge(Toml::file("mnemo.toml"))
            .merge(Env::prefixed("MNEMO_"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Check the cross-field invariants the chunker and embedder rely on.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be > 0".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be < chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.embed_batch_size == 0 {
            return Err(Error::InvalidConfig(
                "embed_batch_size must be > 0".to_string(),
            ));
        }
        if self.hashed_dim == 0 || self.remote_dim == 0 {
            return Err(Error::InvalidConfig(
                "embedding dimensionality must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Expanded location of the vector store.
    pub fn db_path(&self) -> PathBuf {
        expand_path(&self.data_dir)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after
/// expansion. Absolute paths are returned as-is.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
