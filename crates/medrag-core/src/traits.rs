//! Core traits for medrag components.
//!
//! - [`PageExtractor`]: Turn a source document into page text
//! - [`Embedder`]: Generate dense embeddings
//! - [`SearchIndex`]: Execute typed search requests and manage the index
//!
//! Implementations are injected as `Arc<dyn Trait>` so backends can be swapped
//! (and mocked in tests) without touching the retrieval code.

use async_trait::async_trait;
use std::path::Path;

use crate::error::{EmbedError, ExtractError, SearchError};
use crate::types::{
    BulkReport, CriteriaRequest, EmbeddingOutput, IndexedDocument, KeywordRequest, PageText,
    SearchHit, SectionLookup, VectorRequest,
};

// ============================================================================
// Page Extraction
// ============================================================================

/// Trait for extracting per-page text from documents.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    /// Extractor name for logging.
    fn name(&self) -> &str;

    /// Lowercase file extensions this extractor handles.
    fn supported_extensions(&self) -> &[&str];

    /// Check if this extractor can handle the given file.
    fn can_extract(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.supported_extensions().contains(&ext.as_str())
            })
            .unwrap_or(false)
    }

    /// Extract the pages of a document in order.
    async fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, ExtractError>;
}

// ============================================================================
// Embedding
// ============================================================================

/// Trait for generating embeddings.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model name/identifier.
    fn model_name(&self) -> &str;

    /// Embedding dimension.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, one output per input in order.
    async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError>;

    /// Embed a single query.
    async fn embed_query(&self, query: &str) -> Result<EmbeddingOutput, EmbedError> {
        let results = self.embed_text(&[query]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Inference("empty embedding result".to_string()))
    }
}

// ============================================================================
// Search Index
// ============================================================================

/// Trait for a keyword + vector search index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Index name.
    fn name(&self) -> &str;

    /// Lexical search.
    async fn keyword_search(&self, request: &KeywordRequest) -> Result<Vec<SearchHit>, SearchError>;

    /// Nearest-neighbour search over document embeddings.
    async fn vector_search(&self, request: &VectorRequest) -> Result<Vec<SearchHit>, SearchError>;

    /// Fetch sections by parent or own section id.
    async fn lookup_sections(&self, request: &SectionLookup)
        -> Result<Vec<SearchHit>, SearchError>;

    /// Phrase-anchored disorder search.
    async fn criteria_search(&self, request: &CriteriaRequest)
        -> Result<Vec<SearchHit>, SearchError>;

    /// Create the index for embeddings of `dimension`. Returns false if it already existed.
    async fn create_index(&self, dimension: usize) -> Result<bool, SearchError>;

    /// Delete the index. Returns false if it did not exist.
    async fn delete_index(&self) -> Result<bool, SearchError>;

    /// Insert or replace documents by id.
    async fn upsert_documents(
        &self,
        documents: &[(String, IndexedDocument)],
    ) -> Result<BulkReport, SearchError>;

    /// Number of stored documents.
    async fn count(&self) -> Result<u64, SearchError>;
}
