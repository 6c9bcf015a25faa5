//! Integration tests for the full medrag pipeline.
//!
//! Tests the complete flow: extract → chunk → embed → index → hybrid search.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use medrag_chunker::{ChunkPipeline, ChunkStats};
use medrag_core::{Chunk, ChunkConfig, EmbedError, Embedder, EmbeddingOutput, SearchIndex};
use medrag_embed::EmbedderPool;
use medrag_extract::ExtractorRegistry;
use medrag_index::{DocumentIndexer, IndexerConfig};
use medrag_query::{format_context_for_llm, HybridRetriever, HybridSearchParams};
use medrag_store::MemoryIndex;

const TEST_DIM: usize = 32;

const MANUAL: &str = "1 Rối loạn trầm cảm
Nhóm rối loạn khí sắc với biểu hiện buồn bã kéo dài.
1.1 Rối loạn trầm cảm chủ yếu
Tiêu chí chẩn đoán gồm khí sắc trầm cảm hầu hết thời gian trong ngày.
\x0c1.2 Rối loạn khí sắc dai dẳng
Khí sắc trầm kéo dài ít nhất hai năm ở người trưởng thành.
2 Rối loạn lo âu
Lo âu và sợ hãi quá mức kèm rối loạn hành vi liên quan.
";

/// Mock embedder for testing (avoids provider calls).
struct MockEmbedder {
    dimension: usize,
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn model_name(&self) -> &str {
        "mock-embedder"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        // Deterministic embeddings derived from the text hash
        Ok(texts
            .iter()
            .map(|text| {
                let hash = blake3::hash(text.as_bytes());
                let bytes = hash.as_bytes();
                let embedding: Vec<f32> = (0..self.dimension)
                    .map(|i| (f32::from(bytes[i % 32]) / 255.0) - 0.5)
                    .collect();
                EmbeddingOutput::from(embedding)
            })
            .collect())
    }
}

async fn chunk_manual() -> Vec<Chunk> {
    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    file.write_all(MANUAL.as_bytes()).unwrap();

    let pages = ExtractorRegistry::with_defaults()
        .extract(file.path())
        .await
        .unwrap();
    assert_eq!(pages.len(), 2);

    let config = ChunkConfig {
        min_chunk_size: 20,
        ..ChunkConfig::default()
    };
    ChunkPipeline::new(config)
        .unwrap()
        .process_pages(&pages, "dsm5.txt")
}

async fn indexed_retriever() -> (HybridRetriever, Arc<MemoryIndex>) {
    let chunks = chunk_manual().await;
    let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder { dimension: TEST_DIM });
    let index = Arc::new(MemoryIndex::new("dsm5"));

    let indexer = DocumentIndexer::new(
        index.clone(),
        Arc::new(EmbedderPool::new(embedder.clone(), 2).with_batch_size(3)),
        IndexerConfig {
            batch_size: 3,
            recreate: true,
        },
    );
    indexer.prepare_index().await.unwrap();
    let report = indexer.index_chunks(&chunks).await.unwrap();
    assert_eq!(report.indexed, 4);
    assert_eq!(report.failed, 0);
    assert_eq!(report.batches, 2);

    (HybridRetriever::new(embedder, index.clone()), index)
}

// ==================== Chunking Tests ====================

#[tokio::test]
async fn test_chunking_builds_hierarchy() {
    let chunks = chunk_manual().await;

    let ids: Vec<&str> = chunks.iter().map(|c| c.section_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "1.1", "1.2", "2"]);
    assert_eq!(
        chunks.iter().map(|c| c.index).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );

    let child = &chunks[2];
    assert_eq!(child.title, "Rối loạn khí sắc dai dẳng");
    assert_eq!(child.parent_id.as_deref(), Some("1"));
    assert_eq!(child.parent_title.as_deref(), Some("Rối loạn trầm cảm"));
    assert_eq!(child.page_start, 2);
    assert!(child.content.contains("Khí sắc trầm kéo dài"));

    assert!(chunks[0].parent_id.is_none());
    assert!(chunks[3].parent_id.is_none());

    let stats = ChunkStats::compute(&chunks, 1500);
    assert_eq!(stats.total, 4);
    assert_eq!(stats.split, 0);
    assert_eq!(stats.merged, 0);
}

// ==================== Retrieval Tests ====================

#[tokio::test]
async fn test_hybrid_search_end_to_end() {
    let (retriever, index) = indexed_retriever().await;
    assert_eq!(index.count().await.unwrap(), 4);

    let params = HybridSearchParams {
        top_k: 3,
        ..HybridSearchParams::default()
    };
    let results = retriever.hybrid_search("lo âu", &params).await.unwrap();

    assert_eq!(results.len(), 3);
    let top = &results[0];
    assert_eq!(top.section_id.as_deref(), Some("2"));
    assert_eq!(top.title, "Rối loạn lo âu");
    assert_eq!(top.scores.keyword_rank, Some(1));
    assert!(top.scores.vector_rank.is_some());
    // only the anxiety section matches the keywords
    assert!(results[1..].iter().all(|r| r.scores.keyword_rank.is_none()));
    assert!(results.windows(2).all(|w| w[0].scores.rrf >= w[1].scores.rrf));
    assert!(results.iter().all(|r| r.related_sections.is_empty()));
}

#[tokio::test]
async fn test_hybrid_search_with_context() {
    let (retriever, _index) = indexed_retriever().await;

    let params = HybridSearchParams {
        top_k: 4,
        include_context: true,
        ..HybridSearchParams::default()
    };
    let results = retriever.hybrid_search("trầm cảm", &params).await.unwrap();
    assert_eq!(results.len(), 4);

    let find = |id: &str| {
        results
            .iter()
            .find(|r| r.section_id.as_deref() == Some(id))
            .unwrap()
    };

    let related: Vec<_> = find("1.2")
        .related_sections
        .iter()
        .map(|s| s.section_id.as_deref().unwrap())
        .collect();
    assert_eq!(related, vec!["1", "1.1"]);

    let related: Vec<_> = find("1.1")
        .related_sections
        .iter()
        .map(|s| s.section_id.as_deref().unwrap())
        .collect();
    assert_eq!(related, vec!["1"]);

    // top-level sections have no parent to expand
    assert!(find("1").related_sections.is_empty());
    assert!(find("2").related_sections.is_empty());
}

#[tokio::test]
async fn test_search_by_criteria_end_to_end() {
    let (retriever, _index) = indexed_retriever().await;

    let matches = retriever
        .search_by_criteria("Rối loạn lo âu", None)
        .await
        .unwrap();
    assert!(!matches.is_empty());
    assert_eq!(matches[0].section_id.as_deref(), Some("2"));

    assert!(retriever
        .search_by_criteria("   ", Some("A"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_llm_context_from_results() {
    let (retriever, _index) = indexed_retriever().await;

    let params = HybridSearchParams {
        top_k: 2,
        ..HybridSearchParams::default()
    };
    let results = retriever.hybrid_search("lo âu", &params).await.unwrap();
    let context = format_context_for_llm(&results, 8000);

    assert!(context.starts_with("[Section 2] Rối loạn lo âu"));
    assert!(context.contains("Lo âu và sợ hãi"));
    assert!(context.chars().count() <= 8000);

    let tiny = format_context_for_llm(&results, 40);
    assert!(tiny.chars().count() <= 40);
}

#[tokio::test]
async fn test_empty_query_returns_nothing() {
    let (retriever, _index) = indexed_retriever().await;
    let results = retriever
        .hybrid_search("  ", &HybridSearchParams::default())
        .await
        .unwrap();
    assert!(results.is_empty());
}
