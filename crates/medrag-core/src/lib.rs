//! # medrag-core
//!
//! Core types and traits for medrag, a hierarchical chunking and hybrid
//! retrieval engine for the DSM-5 manual.
//!
//! ## Architecture
//!
//! ```text
//! Document → PageExtractor → SectionParser → ChunkPipeline → chunks.json
//!                                                               ↓
//!                                         Embedder → SearchIndex (bulk upsert)
//!                                                               ↓
//! query → Embedder ─┬─ VectorRequest ──┐
//!                   └─ KeywordRequest ─┴→ RRF → RetrievalResult
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SectionRecord`] | A numbered section with its parent linkage |
//! | [`Chunk`] | A size-bounded retrieval unit |
//! | [`IndexedDocument`] | The stored form of a chunk |
//! | [`KeywordRequest`] / [`VectorRequest`] | Typed search requests |
//! | [`RetrievalResult`] | A fused hybrid-search result |
//!
//! ## Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`PageExtractor`] | Extract per-page text from documents |
//! | [`Embedder`] | Generate dense embeddings |
//! | [`SearchIndex`] | Run typed searches and manage the index |
//!
//! ## Related Crates
//!
//! - `medrag-extract`: PDF and text page extraction
//! - `medrag-chunker`: Section parsing and size-bounded re-chunking
//! - `medrag-embed`: Embedding providers, pool and cache
//! - `medrag-store`: Elasticsearch and in-memory search backends
//! - `medrag-index`: Bulk indexing of chunk files
//! - `medrag-query`: Hybrid retrieval and rank fusion

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ChunkError, EmbedError, Error, ExtractError, Result, SearchError};
pub use traits::*;
pub use types::*;
