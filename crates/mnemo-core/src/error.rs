//! Failure taxonomy shared by every engine crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No usable embedding backend could be constructed.
    #[error("no usable embedding backend: {0}")]
    Configuration(String),

    /// A previously working backend failed at call time. Not retried
    /// internally; retry policy belongs to the caller.
    #[error("embedding backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A vector's length disagrees with the collection's recorded
    /// dimensionality. Mixing dimensionalities corrupts similarity geometry,
    /// so this is always a hard failure.
    #[error("embedding dimension mismatch: collection has {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl Error {
    /// Wrap an arbitrary storage-layer error.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Error::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
