//! Error types for nyaya-rag

use thiserror::Error;

/// Errors produced by the generator, the artifact loader and the query server.
#[derive(Debug, Error)]
pub enum Error {
    /// The input dataset is unusable (e.g. the `text` column is missing).
    /// Raised by the generator before anything is written.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A request was rejected before any work was done.
    #[error("{0}")]
    Validation(String),

    /// Artifacts are missing, unreadable or do not belong together.
    /// The server must not start serving after one of these.
    #[error("Startup error: {0}")]
    Startup(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Model files could not be fetched or parsed
    #[error("Model error: {0}")]
    Model(String),

    /// Tokenization or inference failed for a given input
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Tensor error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn startup(msg: impl Into<String>) -> Self {
        Self::Startup(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }
}

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, Error>;
