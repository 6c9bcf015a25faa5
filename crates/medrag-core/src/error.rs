//! Error types for medrag.

use std::time::Duration;
use thiserror::Error;

/// Top-level error, wrapping each stage's error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("page extraction: {0}")]
    Extraction(#[from] ExtractError),

    #[error("chunk pipeline: {0}")]
    Chunking(#[from] ChunkError),

    #[error("embedder: {0}")]
    Embedding(#[from] EmbedError),

    #[error("search index: {0}")]
    Search(#[from] SearchError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Chunk files, index snapshots and search responses
    #[error("json: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    /// File extension with no registered extractor
    #[error("no extractor for .{0} files")]
    UnsupportedType(String),

    #[error("unreadable document: {0}")]
    Parse(String),

    #[error("reading document: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Failed(String),
}

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("{0}")]
    Failed(String),

    /// Bad size band or footer regex
    #[error("bad chunking settings: {0}")]
    InvalidConfig(String),
}

/// Embedding errors.
#[derive(Error, Debug)]
pub enum EmbedError {
    /// Missing credentials, unknown provider, bad model settings
    #[error("embedding provider misconfigured: {0}")]
    Config(String),

    #[error("embedding request failed: {0}")]
    Request(String),

    /// Provider answered but the payload is unusable
    #[error("embedding response rejected: {0}")]
    Inference(String),

    #[error("embedding timed out after {0:?}")]
    Timeout(Duration),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Search index errors.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search backend misconfigured: {0}")]
    Config(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("index not found: {0}")]
    IndexNotFound(String),
}

/// Result type alias for medrag operations.
pub type Result<T> = std::result::Result<T, Error>;
