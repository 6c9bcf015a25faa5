//! Zero-vector embedder for offline runs and tests.

use async_trait::async_trait;
use medrag_core::{EmbedError, Embedder, EmbeddingOutput};

/// Default dimension, matching `text-embedding-3-small`.
pub const NOOP_DIMENSION: usize = 1536;

/// Embedder that returns zero vectors without any network access.
///
/// Keyword search keeps working when indexing with it; kNN results carry no
/// signal.
pub struct NoopEmbedder {
    dimension: usize,
}

impl NoopEmbedder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_dimension(NOOP_DIMENSION)
    }

    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for NoopEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for NoopEmbedder {
    fn model_name(&self) -> &str {
        "noop"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        Ok(texts
            .iter()
            .map(|_| EmbeddingOutput::from(vec![0.0; self.dimension]))
            .collect())
    }
}
