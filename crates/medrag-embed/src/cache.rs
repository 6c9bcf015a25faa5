//! Content-hash cache in front of an embedder.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use medrag_core::{EmbedError, Embedder, EmbeddingOutput};
use tokio::sync::RwLock;
use tracing::debug;

/// Maximum number of entries in the cache.
pub const DEFAULT_CACHE_SIZE: usize = 10_000;

#[derive(Clone)]
struct CacheEntry {
    output: EmbeddingOutput,
    last_access: u64,
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Embedder decorator that reuses embeddings for identical text.
///
/// Keys hash the model name together with the text, so two caches over
/// different models never collide. Eviction drops the least recently used
/// tenth when full.
pub struct EmbeddingCache {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<HashMap<blake3::Hash, CacheEntry>>,
    counters: RwLock<Counters>,
    clock: AtomicU64,
    max_size: usize,
}

impl EmbeddingCache {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self::with_capacity(embedder, DEFAULT_CACHE_SIZE)
    }

    pub fn with_capacity(embedder: Arc<dyn Embedder>, max_size: usize) -> Self {
        Self {
            embedder,
            entries: RwLock::new(HashMap::new()),
            counters: RwLock::new(Counters::default()),
            clock: AtomicU64::new(0),
            max_size: max_size.max(1),
        }
    }

    fn key(&self, text: &str) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.embedder.model_name().as_bytes());
        hasher.update(&[0]);
        hasher.update(text.as_bytes());
        hasher.finalize()
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn evict_if_full(&self, entries: &mut HashMap<blake3::Hash, CacheEntry>) -> u64 {
        if entries.len() < self.max_size {
            return 0;
        }

        let evict_count = (self.max_size / 10).max(1);
        let mut by_age: Vec<_> = entries
            .iter()
            .map(|(key, entry)| (*key, entry.last_access))
            .collect();
        by_age.sort_by_key(|(_, last_access)| *last_access);

        for (key, _) in by_age.iter().take(evict_count) {
            entries.remove(key);
        }
        evict_count.min(by_age.len()) as u64
    }

    pub async fn stats(&self) -> CacheStats {
        let counters = self.counters.read().await;
        CacheStats {
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            entries: self.entries.read().await.len(),
        }
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl Embedder for EmbeddingCache {
    fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        let keys: Vec<blake3::Hash> = texts.iter().map(|text| self.key(text)).collect();
        let mut results: Vec<Option<EmbeddingOutput>> = Vec::with_capacity(texts.len());
        let mut missing = Vec::new();

        {
            let mut entries = self.entries.write().await;
            for (i, key) in keys.iter().enumerate() {
                match entries.get_mut(key) {
                    Some(entry) => {
                        entry.last_access = self.tick();
                        results.push(Some(entry.output.clone()));
                    }
                    None => {
                        missing.push(i);
                        results.push(None);
                    }
                }
            }
        }
        {
            let mut counters = self.counters.write().await;
            counters.hits += (texts.len() - missing.len()) as u64;
            counters.misses += missing.len() as u64;
        }

        if !missing.is_empty() {
            debug!(count = missing.len(), "embedding cache miss");
            let uncached: Vec<&str> = missing.iter().map(|&i| texts[i]).collect();
            let fresh = self.embedder.embed_text(&uncached).await?;
            if fresh.len() != uncached.len() {
                return Err(EmbedError::Inference(format!(
                    "expected {} embeddings, got {}",
                    uncached.len(),
                    fresh.len()
                )));
            }

            let mut evicted = 0;
            let mut entries = self.entries.write().await;
            for (&i, output) in missing.iter().zip(fresh) {
                evicted += self.evict_if_full(&mut entries);
                entries.insert(
                    keys[i],
                    CacheEntry {
                        output: output.clone(),
                        last_access: self.tick(),
                    },
                );
                results[i] = Some(output);
            }
            drop(entries);
            self.counters.write().await.evictions += evicted;
        }

        results
            .into_iter()
            .map(|r| r.ok_or_else(|| EmbedError::Inference("missing cached embedding".to_string())))
            .collect()
    }

    async fn embed_query(&self, query: &str) -> Result<EmbeddingOutput, EmbedError> {
        self.embed_text(&[query])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Inference("empty embedding result".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const TEST_DIM: usize = 4;

    struct CountingEmbedder {
        texts_seen: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                texts_seen: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }

        fn dimension(&self) -> usize {
            TEST_DIM
        }

        async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
            self.texts_seen.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| EmbeddingOutput::from(vec![t.len() as f32; TEST_DIM]))
                .collect())
        }
    }

    // ==================== Cache Hit Tests ====================

    #[tokio::test]
    async fn test_second_call_hits_cache() {
        let inner = Arc::new(CountingEmbedder::new());
        let cache = EmbeddingCache::new(inner.clone());

        cache.embed_text(&["hoảng sợ"]).await.unwrap();
        let again = cache.embed_text(&["hoảng sợ"]).await.unwrap();

        assert_eq!(inner.texts_seen.load(Ordering::SeqCst), 1);
        assert_eq!(again[0].embedding[0], "hoảng sợ".len() as f32);
        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_mixed_batch_keeps_order() {
        let inner = Arc::new(CountingEmbedder::new());
        let cache = EmbeddingCache::new(inner.clone());

        cache.embed_text(&["bb"]).await.unwrap();
        let out = cache.embed_text(&["a", "bb", "ccc"]).await.unwrap();

        let firsts: Vec<f32> = out.iter().map(|o| o.embedding[0]).collect();
        assert_eq!(firsts, vec![1.0, 2.0, 3.0]);
        assert_eq!(inner.texts_seen.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_query_uses_cache() {
        let inner = Arc::new(CountingEmbedder::new());
        let cache = EmbeddingCache::new(inner.clone());

        cache.embed_query("q").await.unwrap();
        cache.embed_query("q").await.unwrap();
        assert_eq!(inner.texts_seen.load(Ordering::SeqCst), 1);
    }

    // ==================== Eviction Tests ====================

    #[tokio::test]
    async fn test_eviction_when_full() {
        let inner = Arc::new(CountingEmbedder::new());
        let cache = EmbeddingCache::with_capacity(inner.clone(), 3);

        cache.embed_text(&["a", "b", "c"]).await.unwrap();
        cache.embed_text(&["d"]).await.unwrap();

        let stats = cache.stats().await;
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.entries, 3);

        // "a" was the oldest entry
        cache.embed_text(&["a"]).await.unwrap();
        assert_eq!(inner.texts_seen.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = EmbeddingCache::new(Arc::new(CountingEmbedder::new()));
        cache.embed_text(&["x"]).await.unwrap();
        cache.clear().await;
        assert_eq!(cache.stats().await.entries, 0);
    }

    #[test]
    fn test_dimension_passthrough() {
        let cache = EmbeddingCache::new(Arc::new(CountingEmbedder::new()));
        assert_eq!(cache.dimension(), TEST_DIM);
        assert_eq!(cache.model_name(), "counting");
    }
}
