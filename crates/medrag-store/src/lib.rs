//! # medrag-store
//!
//! [`SearchIndex`](medrag_core::SearchIndex) backends.
//!
//! - [`ElasticIndex`]: Elasticsearch over REST; typed requests are translated
//!   by the pure functions in [`dsl`]
//! - [`MemoryIndex`]: in-process evaluation of the same requests, with JSON
//!   snapshots for offline use
//!
//! ```rust,ignore
//! use medrag_store::{ElasticConfig, ElasticIndex};
//! use medrag_core::SearchIndex;
//!
//! let index = ElasticIndex::new(&ElasticConfig::default())?;
//! index.create_index(1536).await?;
//! ```

pub mod dsl;
pub mod elastic;
pub mod memory;
pub mod schema;

pub use elastic::{ElasticConfig, ElasticIndex};
pub use memory::MemoryIndex;
pub use schema::index_mapping;
