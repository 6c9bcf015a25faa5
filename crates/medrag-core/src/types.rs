//! Core types for medrag.
//!
//! ## Documents
//! - [`PageText`]: Text of one source page
//! - [`SectionRecord`]: A numbered section recovered from the page stream
//!
//! ## Chunks
//! - [`Chunk`]: A size-bounded retrieval unit (the persisted hand-off artifact)
//! - [`ChunkConfig`]: Size band and footer settings for the chunking pipeline
//!
//! ## Index
//! - [`IndexedDocument`]: Document shape stored in the search index
//! - [`KeywordRequest`], [`VectorRequest`], [`SectionLookup`], [`CriteriaRequest`]:
//!   Typed search requests translated by each backend
//! - [`SearchHit`]: One hit returned by a backend
//!
//! ## Retrieval
//! - [`RetrievalResult`]: A fused hybrid-search result
//! - [`CriteriaMatch`]: A criteria-anchored search result

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Documents
// ============================================================================

/// Text extracted from a single page of a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// Page number (1-indexed)
    pub page: u32,
    /// Raw page text with line breaks preserved
    pub text: String,
}

impl PageText {
    pub fn new(page: u32, text: impl Into<String>) -> Self {
        Self {
            page,
            text: text.into(),
        }
    }

    /// Non-empty, trimmed lines paired with this page's number.
    pub fn lines(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(move |line| (self.page, line))
    }
}

/// One hierarchy node recovered from the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    /// Identifier unique within one parse pass (`section_{n}`)
    pub unique_id: String,
    /// Dotted number as printed ("1.2.3"); may repeat across the document
    pub section_id: String,
    /// Number of dot-separated components in `section_id`
    pub level: usize,
    /// Most recently opened section at a shallower level, if any
    pub parent_unique_id: Option<String>,
    /// Header text after the number
    pub title: String,
    /// Body lines in document order, footers removed
    pub raw_lines: Vec<String>,
    /// Page on which the header appears
    pub page_start: u32,
}

impl SectionRecord {
    /// Dotted number of the enclosing section ("1.2" for "1.2.3").
    pub fn parent_section_id(&self) -> Option<&str> {
        parent_section_id(&self.section_id)
    }
}

/// Truncate a dotted section number at its last separator.
pub fn parent_section_id(section_id: &str) -> Option<&str> {
    section_id.rsplit_once('.').map(|(parent, _)| parent)
}

// ============================================================================
// Chunks
// ============================================================================

/// Configuration for the chunking pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// Chunks below this many characters are merge candidates
    pub min_chunk_size: usize,
    /// Sections above this many characters are split
    pub max_chunk_size: usize,
    /// Ancestor titles are truncated to this many characters in context headers
    pub context_title_max_chars: usize,
    /// Regex matching page footer lines to discard
    pub footer_pattern: String,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            min_chunk_size: 200,
            max_chunk_size: 1500,
            context_title_max_chars: 60,
            footer_pattern: r"^\d+\s+[Cc]hỉ sử dụng tài liệu.*$".to_string(),
        }
    }
}

/// A size-bounded retrieval unit produced by the chunking pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in the final chunk list (1-indexed)
    pub index: u32,
    pub section_id: String,
    pub section_unique_id: String,
    /// Set when the section was split (`criteria_A`, `item_2`, `part_1`, ...)
    pub sub_id: Option<String>,
    pub level: usize,
    /// Dotted number of the parent section
    pub parent_id: Option<String>,
    pub parent_unique_id: Option<String>,
    pub parent_title: Option<String>,
    pub title: String,
    pub sub_title: Option<String>,
    /// Ancestor path, e.g. `[Root > Mid > Leaf]`
    pub context_header: String,
    /// Cleaned text, prefixed with the context header
    pub content: String,
    /// Body text before cleaning, without the context header
    pub content_raw: String,
    /// Characters in `content`
    pub char_count: usize,
    pub is_split: bool,
    pub is_short: bool,
    /// Section ids of the two chunks folded into this one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_from: Option<Vec<String>>,
    pub page_start: u32,
    /// Name of the source document
    pub source: String,
}

// ============================================================================
// Embedding
// ============================================================================

/// Output from embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingOutput {
    /// The embedding vector
    pub embedding: Vec<f32>,
}

impl From<Vec<f32>> for EmbeddingOutput {
    fn from(embedding: Vec<f32>) -> Self {
        Self { embedding }
    }
}

// ============================================================================
// Index Documents
// ============================================================================

/// Document stored in the search index.
///
/// Every field is optional on the wire because search responses carry only
/// the requested `_source` fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_title: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_section_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_section_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_headers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl IndexedDocument {
    /// Build the index document for a chunk and its content embedding.
    pub fn from_chunk(chunk: &Chunk, embedding: Vec<f32>) -> Self {
        Self {
            index: Some(chunk.index),
            title: chunk.title.clone(),
            sub_title: chunk.sub_title.clone(),
            content: chunk.content.clone(),
            section_id: Some(chunk.section_id.clone()),
            parent_section_id: chunk.parent_id.clone(),
            parent_section_title: chunk.parent_title.clone(),
            context_headers: Some(chunk.context_header.clone()),
            page_start: Some(chunk.page_start),
            merged_from: chunk.merged_from.as_ref().map(|ids| ids.join(", ")),
            embedding: Some(embedding),
        }
    }

    /// Document id used for a chunk (its final index).
    pub fn id_for(chunk: &Chunk) -> String {
        chunk.index.to_string()
    }
}

/// Outcome of a bulk upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReport {
    pub indexed: usize,
    pub failed: usize,
    /// First few per-document failure reasons
    pub errors: Vec<String>,
}

/// Index statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub index_name: String,
    pub document_count: u64,
    pub checked_at: DateTime<Utc>,
}

// ============================================================================
// Search Requests
// ============================================================================

/// Searchable document fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocField {
    Title,
    SubTitle,
    ContextHeaders,
    Content,
    ParentSectionTitle,
    SectionId,
    ParentSectionId,
    PageStart,
}

impl DocField {
    /// Field name in the index mapping.
    pub fn as_str(self) -> &'static str {
        match self {
            DocField::Title => "title",
            DocField::SubTitle => "sub_title",
            DocField::ContextHeaders => "context_headers",
            DocField::Content => "content",
            DocField::ParentSectionTitle => "parent_section_title",
            DocField::SectionId => "section_id",
            DocField::ParentSectionId => "parent_section_id",
            DocField::PageStart => "page_start",
        }
    }

    /// Text value of this field on a document; `None` for non-text fields.
    pub fn value_of(self, doc: &IndexedDocument) -> Option<&str> {
        match self {
            DocField::Title => Some(doc.title.as_str()),
            DocField::SubTitle => doc.sub_title.as_deref(),
            DocField::ContextHeaders => doc.context_headers.as_deref(),
            DocField::Content => Some(doc.content.as_str()),
            DocField::ParentSectionTitle => doc.parent_section_title.as_deref(),
            DocField::SectionId => doc.section_id.as_deref(),
            DocField::ParentSectionId => doc.parent_section_id.as_deref(),
            DocField::PageStart => None,
        }
    }
}

/// A field with a relevance boost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldBoost {
    pub field: DocField,
    pub boost: f32,
}

impl FieldBoost {
    pub fn new(field: DocField, boost: f32) -> Self {
        Self { field, boost }
    }

    /// `field^boost` notation; the suffix is omitted for a boost of 1.
    pub fn to_field_spec(&self) -> String {
        if (self.boost - 1.0).abs() < f32::EPSILON {
            self.field.as_str().to_string()
        } else {
            format!("{}^{}", self.field.as_str(), self.boost)
        }
    }
}

/// Lexical request: any of best-fields match, phrase match, parent-title match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRequest {
    pub text: String,
    /// Best-fields multi-match fields
    pub match_fields: Vec<FieldBoost>,
    /// Share of query terms that must match within one field (0-100)
    pub minimum_should_match_pct: u8,
    /// Phrase multi-match fields
    pub phrase_fields: Vec<FieldBoost>,
    pub phrase_slop: u32,
    /// Boost for the match on `parent_section_title`
    pub parent_title_boost: f32,
    pub size: usize,
    /// `_source` fields to return
    pub source_fields: Vec<DocField>,
}

/// Approximate nearest-neighbour request over the `embedding` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRequest {
    pub vector: Vec<f32>,
    pub k: usize,
    pub num_candidates: usize,
    pub source_fields: Vec<DocField>,
}

/// Lookup of every document whose parent or own section id is in `section_ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionLookup {
    pub section_ids: Vec<String>,
    pub size: usize,
}

/// Phrase-anchored disorder search, optionally favouring one criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaRequest {
    pub disorder: String,
    pub phrase_fields: Vec<FieldBoost>,
    pub phrase_slop: u32,
    /// Sub-title to favour, e.g. `Tiêu chí A`
    pub sub_title: Option<String>,
    pub sub_title_boost: f32,
    pub size: usize,
}

/// One hit returned by a search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub document: IndexedDocument,
}

// ============================================================================
// Retrieval Results
// ============================================================================

/// Fusion scores of a hybrid search result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalScores {
    pub rrf: f64,
    /// 1-based rank in the keyword list
    pub keyword_rank: Option<usize>,
    /// 1-based rank in the vector list
    pub vector_rank: Option<usize>,
}

/// A sibling or parent section attached by context expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedSection {
    pub title: String,
    pub section_id: Option<String>,
    pub content: String,
}

/// A fused hybrid-search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub id: String,
    pub title: String,
    pub sub_title: Option<String>,
    pub content: String,
    pub section_id: Option<String>,
    pub parent_section_title: Option<String>,
    pub context_headers: Option<String>,
    pub page_start: Option<u32>,
    pub scores: RetrievalScores,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_sections: Vec<RelatedSection>,
}

impl RetrievalResult {
    pub fn from_document(id: String, document: IndexedDocument, scores: RetrievalScores) -> Self {
        Self {
            id,
            title: document.title,
            sub_title: document.sub_title,
            content: document.content,
            section_id: document.section_id,
            parent_section_title: document.parent_section_title,
            context_headers: document.context_headers,
            page_start: document.page_start,
            scores,
            related_sections: Vec::new(),
        }
    }
}

/// A result of the criteria-anchored search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaMatch {
    pub id: String,
    pub score: f32,
    pub title: String,
    pub sub_title: Option<String>,
    pub content: String,
    pub section_id: Option<String>,
    pub parent_section_title: Option<String>,
    pub context_headers: Option<String>,
}

impl From<SearchHit> for CriteriaMatch {
    fn from(hit: SearchHit) -> Self {
        let doc = hit.document;
        Self {
            id: hit.id,
            score: hit.score,
            title: doc.title,
            sub_title: doc.sub_title,
            content: doc.content,
            section_id: doc.section_id,
            parent_section_title: doc.parent_section_title,
            context_headers: doc.context_headers,
        }
    }
}
