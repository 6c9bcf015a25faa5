//! # medrag-query
//!
//! Hybrid retrieval over an indexed chunk set.
//!
//! 1. Embed the query
//! 2. Run keyword and kNN search concurrently
//! 3. Fuse the two ranked lists with weighted reciprocal rank fusion
//! 4. Optionally attach sibling and parent sections
//!
//! ```rust,ignore
//! use medrag_query::{format_context_for_llm, HybridRetriever, HybridSearchParams};
//!
//! let retriever = HybridRetriever::new(embedder, index);
//! let results = retriever
//!     .hybrid_search("Tiêu chí chẩn đoán trầm cảm", &HybridSearchParams::default())
//!     .await?;
//! let context = format_context_for_llm(&results, 8000);
//! ```

pub mod format;
pub mod fusion;
pub mod request;
pub mod retriever;

pub use format::{format_context_for_llm, DEFAULT_MAX_CHARS};
pub use fusion::{reciprocal_rank_fusion, FusedHit, FusionWeights};
pub use retriever::{BlockingRetriever, HybridRetriever, HybridSearchParams, RetrieverTimeouts};
