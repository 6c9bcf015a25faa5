//! Summary statistics over a chunk set.

use medrag_core::Chunk;
use serde::Serialize;

/// Counts and size distribution of a chunk set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChunkStats {
    pub total: usize,
    pub split: usize,
    pub short: usize,
    pub merged: usize,
    /// Chunks above the maximum size (unsplittable sentences)
    pub oversized: usize,
    pub min_chars: usize,
    pub max_chars: usize,
    pub avg_chars: f64,
}

impl ChunkStats {
    pub fn compute(chunks: &[Chunk], max_chunk_size: usize) -> Self {
        if chunks.is_empty() {
            return Self::default();
        }

        let sizes = chunks.iter().map(|c| c.char_count);
        let total_chars: usize = sizes.clone().sum();

        Self {
            total: chunks.len(),
            split: chunks.iter().filter(|c| c.is_split).count(),
            short: chunks.iter().filter(|c| c.is_short).count(),
            merged: chunks.iter().filter(|c| c.merged_from.is_some()).count(),
            oversized: chunks
                .iter()
                .filter(|c| c.char_count > max_chunk_size)
                .count(),
            min_chars: sizes.clone().min().unwrap_or(0),
            max_chars: sizes.max().unwrap_or(0),
            avg_chars: total_chars as f64 / chunks.len() as f64,
        }
    }
}
