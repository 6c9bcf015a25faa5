//! End-to-end chunking: lines → sections → size-bounded chunks.

use std::path::Path;

use medrag_core::{Chunk, ChunkConfig, ChunkError, Error, PageText, SectionRecord};
use tracing::{debug, info};

use crate::hierarchy::SectionTree;
use crate::merge::merge_short_chunks;
use crate::normalize::{char_len, TextNormalizer};
use crate::parser::SectionParser;
use crate::split::{SectionSplitter, SubChunk};

/// Chunking pipeline for one document at a time.
///
/// Holds only compiled patterns and configuration, so one instance can be
/// reused for any number of documents.
#[derive(Debug, Clone)]
pub struct ChunkPipeline {
    config: ChunkConfig,
    parser: SectionParser,
    normalizer: TextNormalizer,
    splitter: SectionSplitter,
}

impl ChunkPipeline {
    /// Create a pipeline, validating the size band and footer pattern.
    pub fn new(config: ChunkConfig) -> Result<Self, ChunkError> {
        if config.max_chunk_size == 0 {
            return Err(ChunkError::InvalidConfig(
                "max_chunk_size must be positive".to_string(),
            ));
        }
        if config.min_chunk_size >= config.max_chunk_size {
            return Err(ChunkError::InvalidConfig(format!(
                "min_chunk_size ({}) must be below max_chunk_size ({})",
                config.min_chunk_size, config.max_chunk_size
            )));
        }
        if config.context_title_max_chars == 0 {
            return Err(ChunkError::InvalidConfig(
                "context_title_max_chars must be positive".to_string(),
            ));
        }

        Ok(Self {
            parser: SectionParser::new(&config.footer_pattern)?,
            normalizer: TextNormalizer::new()?,
            splitter: SectionSplitter::new()?,
            config,
        })
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    pub fn parser(&self) -> &SectionParser {
        &self.parser
    }

    /// Chunk extracted pages.
    pub fn process_pages(&self, pages: &[PageText], source: &str) -> Vec<Chunk> {
        let parsed = self.parser.parse_pages(pages);
        self.chunk_sections(&parsed.sections, source)
    }

    /// Chunk `(page_number, line)` pairs.
    pub fn process_lines<I, S>(&self, lines: I, source: &str) -> Vec<Chunk>
    where
        I: IntoIterator<Item = (u32, S)>,
        S: AsRef<str>,
    {
        let parsed = self.parser.parse(lines);
        self.chunk_sections(&parsed.sections, source)
    }

    /// Turn parsed sections into merged, re-indexed chunks.
    pub fn chunk_sections(&self, sections: &[SectionRecord], source: &str) -> Vec<Chunk> {
        let tree = SectionTree::new(sections);

        let chunks: Vec<Chunk> = sections
            .iter()
            .flat_map(|section| self.chunk_section(&tree, section, source))
            .collect();
        let before_merge = chunks.len();

        let mut chunks = merge_short_chunks(
            chunks,
            self.config.min_chunk_size,
            self.config.max_chunk_size,
        );
        for (i, chunk) in chunks.iter_mut().enumerate() {
            chunk.index = (i + 1) as u32;
        }

        info!(
            source,
            sections = sections.len(),
            chunks = chunks.len(),
            merged = before_merge - chunks.len(),
            "chunked document"
        );
        chunks
    }

    fn chunk_section(
        &self,
        tree: &SectionTree<'_>,
        section: &SectionRecord,
        source: &str,
    ) -> Vec<Chunk> {
        let header = tree.context_header(section, self.config.context_title_max_chars);
        let body = self.normalizer.smart_join_lines(&section.raw_lines);
        let max = self.config.max_chunk_size;

        let whole = self.normalizer.clean_text(&format!("{header}\n{body}"));
        let parts = if char_len(&whole) <= max {
            vec![SubChunk {
                text: body,
                sub_id: None,
                sub_title: None,
            }]
        } else {
            // leave room for the header and its newline in every piece
            let budget = max.saturating_sub(char_len(&header) + 1).max(1);
            let parts = self.splitter.split(&body, budget);
            debug!(
                section = %section.section_id,
                chars = char_len(&whole),
                parts = parts.len(),
                "split oversized section"
            );
            parts
        };

        let is_split = parts.len() > 1;
        let parent = tree.parent_of(section);

        parts
            .into_iter()
            .map(|part| {
                let content = self
                    .normalizer
                    .clean_text(&format!("{header}\n{}", part.text));
                let char_count = char_len(&content);
                Chunk {
                    index: 0,
                    section_id: section.section_id.clone(),
                    section_unique_id: section.unique_id.clone(),
                    sub_id: part.sub_id,
                    level: section.level,
                    parent_id: parent.map(|p| p.section_id.clone()),
                    parent_unique_id: section.parent_unique_id.clone(),
                    parent_title: parent.map(|p| p.title.clone()),
                    title: section.title.clone(),
                    sub_title: part.sub_title,
                    context_header: header.clone(),
                    content,
                    content_raw: part.text,
                    char_count,
                    is_split,
                    is_short: char_count < self.config.min_chunk_size,
                    merged_from: None,
                    page_start: section.page_start,
                    source: source.to_string(),
                }
            })
            .collect()
    }
}

/// Write chunks as a pretty-printed JSON array.
pub fn save_chunks(path: &Path, chunks: &[Chunk]) -> Result<(), Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(chunks)?;
    std::fs::write(path, json)?;
    debug!(path = %path.display(), chunks = chunks.len(), "saved chunks");
    Ok(())
}

/// Read a chunk file written by [`save_chunks`].
pub fn load_chunks(path: &Path) -> Result<Vec<Chunk>, Error> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
