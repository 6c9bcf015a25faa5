//! # medrag-embed
//!
//! Dense embeddings for chunk content and search queries.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`OpenAiEmbedder`] | OpenAI-compatible `/embeddings` endpoint |
//! | [`GoogleEmbedder`] | Gemini `batchEmbedContents` |
//! | [`HfApiEmbedder`] | Self-hosted `{"texts": [...]}` service |
//! | [`NoopEmbedder`] | Zero vectors, no network |
//! | [`EmbeddingCache`] | Content-hash cache decorator |
//! | [`EmbedderPool`] | Semaphore-bounded batching with timeouts |
//!
//! Providers are selected from [`EmbedderSettings`] by [`build_embedder`]:
//!
//! ```rust,ignore
//! use medrag_embed::{build_embedder, EmbedderKind, EmbedderPool, EmbedderSettings};
//!
//! let settings = EmbedderSettings {
//!     provider: EmbedderKind::Openai,
//!     api_key: std::env::var("OPENAI_API_KEY").ok(),
//!     ..Default::default()
//! };
//! let pool = EmbedderPool::new(build_embedder(&settings)?, 4);
//! let vectors = pool.embed_batch(&["Tiêu chí chẩn đoán"]).await?;
//! ```

mod http;

pub mod cache;
pub mod google;
pub mod hf;
pub mod noop;
pub mod openai;
pub mod pool;
pub mod registry;

pub use cache::{CacheStats, EmbeddingCache};
pub use google::GoogleEmbedder;
pub use hf::HfApiEmbedder;
pub use noop::NoopEmbedder;
pub use openai::OpenAiEmbedder;
pub use pool::EmbedderPool;
pub use registry::{build_embedder, EmbedderKind, EmbedderSettings};
