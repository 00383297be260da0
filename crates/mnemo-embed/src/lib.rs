#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! Embedding backends and the constructor-time selection policy.
//!
//! Selection runs exactly once; the returned [`Backend`] handle is
//! immutable for the lifetime of the index it feeds, because
//! dimensionality is not renegotiated after first write.

pub mod device;
mod hashed;
mod local;
mod pool;
mod remote;
mod tokenize;

pub use hashed::HashedEmbedder;
pub use local::LocalEmbedder;
pub use remote::RemoteEmbedder;

use tracing::warn;

use mnemo_core::config::{BackendMode, EngineConfig};
use mnemo_core::traits::Embedder;
use mnemo_core::{Error, Result};

/// The selected embedding backend.
///
/// `Unavailable` is a valid terminal state: the engine still opens (so
/// `count`/`clear` keep working), but every `embed_batch` call fails with
/// `Error::Configuration` carrying the recorded reason.
pub enum Backend {
    Local(LocalEmbedder),
    Remote(RemoteEmbedder),
    Hashed(HashedEmbedder),
    Unavailable { reason: String },
}

impl Backend {
    fn as_embedder(&self) -> Option<&dyn Embedder> {
        match self {
            Backend::Local(e) => Some(e),
            Backend::Remote(e) => Some(e),
            Backend::Hashed(e) => Some(e),
            Backend::Unavailable { .. } => None,
        }
    }

    /// Dimensionality of the active backend; `None` when unavailable.
    pub fn dim(&self) -> Option<usize> {
        self.as_embedder().map(Embedder::dim)
    }

    /// Stable backend/model identifier.
    pub fn id(&self) -> &str {
        match self.as_embedder() {
            Some(e) => e.id(),
            None => "unavailable",
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Backend::Unavailable { .. })
    }

    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self {
            Backend::Local(e) => e.embed_batch(texts).await,
            Backend::Remote(e) => e.embed_batch(texts).await,
            Backend::Hashed(e) => e.embed_batch(texts).await,
            Backend::Unavailable { reason } => Err(Error::Configuration(reason.clone())),
        }
    }
}

/// Construct the backend the configuration asks for.
///
/// 1. A forced mode (`local`/`remote`/`hashed`) is used exclusively; if it
///    cannot initialize, the handle is `Unavailable`.
/// 2. `auto` attempts the local model first and degrades to the remote
///    provider when local initialization fails and a credential exists.
/// 3. When nothing is usable the handle is `Unavailable`.
pub fn select_backend(config: &EngineConfig) -> Backend {
    match config.backend {
        BackendMode::Hashed => Backend::Hashed(HashedEmbedder::new(config.hashed_dim)),
        BackendMode::Local => match build_local(config) {
            Ok(local) => Backend::Local(local),
            Err(reason) => {
                warn!(%reason, "forced local backend failed to initialize");
                Backend::Unavailable { reason }
            }
        },
        BackendMode::Remote => match build_remote(config) {
            Ok(remote) => Backend::Remote(remote),
            Err(reason) => {
                warn!(%reason, "forced remote backend is not usable");
                Backend::Unavailable { reason }
            }
        },
        BackendMode::Auto => match build_local(config) {
            Ok(local) => Backend::Local(local),
            Err(local_reason) => match build_remote(config) {
                Ok(remote) => {
                    warn!(%local_reason, "local backend failed; degrading to remote");
                    Backend::Remote(remote)
                }
                Err(remote_reason) => Backend::Unavailable {
                    reason: format!("local: {local_reason}; remote: {remote_reason}"),
                },
            },
        },
    }
}

fn build_local(config: &EngineConfig) -> std::result::Result<LocalEmbedder, String> {
    let model_dir = config
        .model_dir
        .as_deref()
        .ok_or_else(|| "model_dir is not configured".to_string())?;
    let path = mnemo_core::config::expand_path(model_dir);
    LocalEmbedder::new(&path).map_err(|e| format!("{e:#}"))
}

fn build_remote(config: &EngineConfig) -> std::result::Result<RemoteEmbedder, String> {
    let api_key = config
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| "api_key is not configured".to_string())?;
    Ok(RemoteEmbedder::new(
        &config.api_base,
        api_key,
        &config.remote_model,
        config.remote_dim,
    ))
}
