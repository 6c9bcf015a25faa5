//! # medrag-chunker
//!
//! Hierarchical chunking of the DSM-5 manual.
//!
//! | Stage | Type |
//! |-------|------|
//! | Header/footer detection | [`SectionParser`] |
//! | Parent resolution | [`HierarchyTracker`] |
//! | Context headers | [`SectionTree`] |
//! | Paragraph joining, cleaning | [`TextNormalizer`] |
//! | Oversized sections | [`SectionSplitter`] |
//! | Undersized chunks | [`merge_short_chunks`] |
//! | Orchestration | [`ChunkPipeline`] |

pub mod hierarchy;
pub mod merge;
pub mod normalize;
pub mod parser;
pub mod patterns;
pub mod pipeline;
pub mod split;
pub mod stats;

pub use hierarchy::{HierarchyTracker, SectionTree};
pub use merge::merge_short_chunks;
pub use normalize::TextNormalizer;
pub use parser::{ParsedDocument, SectionParser};
pub use pipeline::{load_chunks, save_chunks, ChunkPipeline};
pub use split::{SectionSplitter, SubChunk};
pub use stats::ChunkStats;
