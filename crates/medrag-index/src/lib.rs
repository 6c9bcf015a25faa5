//! # medrag-index
//!
//! Uploads a chunk set to a search index: embed `content` in batches, build
//! [`IndexedDocument`](medrag_core::IndexedDocument)s keyed by chunk index,
//! bulk upsert.
//!
//! ```rust,ignore
//! use medrag_index::{load_chunks, DocumentIndexer, IndexerConfig};
//!
//! let indexer = DocumentIndexer::new(index, pool, IndexerConfig::default());
//! indexer.prepare_index().await?;
//! let report = indexer.index_chunks(&load_chunks(path).await?).await?;
//! ```

pub mod indexer;

pub use indexer::{load_chunks, DocumentIndexer, IndexReport, IndexUpdate, IndexerConfig};
