//! Concurrency-limited embedding with per-call timeouts.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use medrag_core::{EmbedError, Embedder, EmbeddingOutput};
use tokio::sync::Semaphore;
use tracing::debug;

/// Pool of in-flight embedding requests against a single embedder.
pub struct EmbedderPool {
    embedder: Arc<dyn Embedder>,
    semaphore: Semaphore,
    max_concurrent: usize,
    batch_size: usize,
    timeout: Duration,
}

impl EmbedderPool {
    /// Create a pool allowing `max_concurrent` requests at once.
    pub fn new(embedder: Arc<dyn Embedder>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            embedder,
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
            batch_size: 64,
            timeout: Duration::from_secs(30),
        }
    }

    /// Split large inputs into requests of at most `batch_size` texts.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Bound each request by `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    /// Embed texts, preserving input order.
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(
            count = texts.len(),
            batch_size = self.batch_size,
            "embedding batch"
        );

        let batches: Vec<Vec<EmbeddingOutput>> = stream::iter(texts.chunks(self.batch_size))
            .map(|batch| self.embed_limited(batch))
            .buffered(self.max_concurrent)
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }

    /// Embed a single search query.
    pub async fn embed_query(&self, query: &str) -> Result<EmbeddingOutput, EmbedError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| EmbedError::Inference(format!("semaphore error: {e}")))?;

        tokio::time::timeout(self.timeout, self.embedder.embed_query(query))
            .await
            .map_err(|_| EmbedError::Timeout(self.timeout))?
    }

    async fn embed_limited(&self, batch: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| EmbedError::Inference(format!("semaphore error: {e}")))?;

        let outputs = tokio::time::timeout(self.timeout, self.embedder.embed_text(batch))
            .await
            .map_err(|_| EmbedError::Timeout(self.timeout))??;

        if outputs.len() != batch.len() {
            return Err(EmbedError::Inference(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                outputs.len()
            )));
        }
        Ok(outputs)
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEST_DIM: usize = 8;

    /// Encodes text length into the first component and counts requests.
    struct MockEmbedder {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl MockEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
            }
        }
    }

    #[async_trait]
    impl Embedder for MockEmbedder {
        fn model_name(&self) -> &str {
            "mock-embedder"
        }

        fn dimension(&self) -> usize {
            TEST_DIM
        }

        async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(texts
                .iter()
                .map(|text| {
                    let mut v = vec![0.0; TEST_DIM];
                    v[0] = text.len() as f32;
                    EmbeddingOutput::from(v)
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_pool_creation() {
        let pool = EmbedderPool::new(Arc::new(MockEmbedder::new()), 4);

        assert_eq!(pool.dimension(), TEST_DIM);
        assert_eq!(pool.model_name(), "mock-embedder");
        assert_eq!(pool.max_concurrent(), 4);
        assert_eq!(pool.available_permits(), 4);
    }

    #[tokio::test]
    async fn test_embed_batch_preserves_order_across_batches() {
        let embedder = Arc::new(MockEmbedder::new());
        let pool = EmbedderPool::new(embedder.clone(), 2).with_batch_size(2);

        let texts = ["a", "bb", "ccc", "dddd", "eeeee"];
        let results = pool.embed_batch(&texts).await.unwrap();

        let lengths: Vec<f32> = results.iter().map(|r| r.embedding[0]).collect();
        assert_eq!(lengths, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
        assert_eq!(pool.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_embed_query() {
        let pool = EmbedderPool::new(Arc::new(MockEmbedder::new()), 1);
        let result = pool.embed_query("rối loạn").await.unwrap();
        assert_eq!(result.embedding.len(), TEST_DIM);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let embedder = Arc::new(MockEmbedder::new());
        let pool = EmbedderPool::new(embedder.clone(), 4);

        assert!(pool.embed_batch(&[]).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout() {
        let pool = EmbedderPool::new(Arc::new(MockEmbedder::slow(Duration::from_millis(200))), 1)
            .with_timeout(Duration::from_millis(10));

        let result = pool.embed_query("slow").await;
        assert!(matches!(result, Err(EmbedError::Timeout(_))));
        assert_eq!(pool.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_zero_concurrency_clamped() {
        let pool = EmbedderPool::new(Arc::new(MockEmbedder::new()), 0);
        assert_eq!(pool.max_concurrent(), 1);
        assert_eq!(pool.embed_batch(&["x"]).await.unwrap().len(), 1);
    }
}
