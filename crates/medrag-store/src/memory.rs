//! In-memory search index for tests and offline use.
//!
//! [`MemoryIndex`] evaluates the same typed requests as the Elasticsearch
//! backend with simple term scoring:
//! - best-fields: boosted count of matched query terms, best field wins,
//!   subject to the minimum-should-match share
//! - phrase: query terms in order within `slop` extra positions
//! - kNN: brute-force cosine similarity
//!
//! Scores are not comparable with BM25, only the ranking shape is.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use medrag_core::{
    BulkReport, CriteriaRequest, DocField, EmbedError, Error, FieldBoost, IndexedDocument,
    KeywordRequest, SearchError, SearchHit, SearchIndex, SectionLookup, VectorRequest,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::dsl::{CRITERIA_SOURCE, LOOKUP_SOURCE};

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexState {
    /// `None` until the index is created
    dimension: Option<usize>,
    documents: BTreeMap<String, IndexedDocument>,
}

/// Search index held entirely in memory.
pub struct MemoryIndex {
    name: String,
    state: RwLock<IndexState>,
}

impl MemoryIndex {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(IndexState::default()),
        }
    }

    /// Restore an index written by [`MemoryIndex::save_snapshot`].
    pub async fn load_snapshot(name: impl Into<String>, path: &Path) -> Result<Self, Error> {
        let bytes = tokio::fs::read(path).await?;
        let state: IndexState = serde_json::from_slice(&bytes)?;
        debug!(path = %path.display(), documents = state.documents.len(), "loaded index snapshot");
        Ok(Self {
            name: name.into(),
            state: RwLock::new(state),
        })
    }

    /// Write every document (embeddings included) as JSON.
    pub async fn save_snapshot(&self, path: &Path) -> Result<(), Error> {
        let json = {
            let state = self.state.read().await;
            serde_json::to_vec(&*state)?
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    async fn rank<F>(&self, size: usize, fields: &[DocField], score: F) -> Vec<SearchHit>
    where
        F: Fn(&IndexedDocument) -> Option<f32>,
    {
        let state = self.state.read().await;
        let mut hits: Vec<SearchHit> = state
            .documents
            .iter()
            .filter_map(|(id, doc)| {
                score(doc).map(|score| SearchHit {
                    id: id.clone(),
                    score,
                    document: project(doc, fields),
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(size);
        hits
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Number of distinct query terms present in `text`.
fn matched_terms(query: &[String], text: &str) -> usize {
    let tokens: HashSet<String> = tokenize(text).into_iter().collect();
    query
        .iter()
        .collect::<HashSet<_>>()
        .into_iter()
        .filter(|term| tokens.contains(*term))
        .count()
}

/// Whether `query` occurs in order in `text` with at most `slop` extra positions.
fn phrase_matches(query: &[String], text: &str, slop: u32) -> bool {
    let Some(first) = query.first() else {
        return false;
    };
    let tokens = tokenize(text);
    let allowed = query.len() - 1 + slop as usize;

    tokens
        .iter()
        .enumerate()
        .filter(|(_, token)| *token == first)
        .any(|(start, _)| {
            let mut pos = start;
            for term in &query[1..] {
                match tokens[pos + 1..].iter().position(|t| t == term) {
                    Some(offset) => pos += offset + 1,
                    None => return false,
                }
            }
            pos - start <= allowed
        })
}

fn best_fields_score(
    query: &[String],
    doc: &IndexedDocument,
    fields: &[FieldBoost],
    required: usize,
) -> f32 {
    fields
        .iter()
        .filter_map(|fb| {
            let matched = matched_terms(query, fb.field.value_of(doc)?);
            (matched >= required).then_some(fb.boost * matched as f32)
        })
        .fold(0.0, f32::max)
}

fn phrase_score(query: &[String], doc: &IndexedDocument, fields: &[FieldBoost], slop: u32) -> f32 {
    fields
        .iter()
        .filter_map(|fb| fb.field.value_of(doc).map(|text| (fb.boost, text)))
        .filter(|(_, text)| phrase_matches(query, text, slop))
        .map(|(boost, _)| boost * query.len() as f32)
        .fold(0.0, f32::max)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Copy of `doc` holding only `fields`.
fn project(doc: &IndexedDocument, fields: &[DocField]) -> IndexedDocument {
    let keep = |field: DocField| fields.contains(&field);
    IndexedDocument {
        index: None,
        title: if keep(DocField::Title) { doc.title.clone() } else { String::new() },
        sub_title: doc.sub_title.clone().filter(|_| keep(DocField::SubTitle)),
        content: if keep(DocField::Content) { doc.content.clone() } else { String::new() },
        section_id: doc.section_id.clone().filter(|_| keep(DocField::SectionId)),
        parent_section_id: doc
            .parent_section_id
            .clone()
            .filter(|_| keep(DocField::ParentSectionId)),
        parent_section_title: doc
            .parent_section_title
            .clone()
            .filter(|_| keep(DocField::ParentSectionTitle)),
        context_headers: doc.context_headers.clone().filter(|_| keep(DocField::ContextHeaders)),
        page_start: doc.page_start.filter(|_| keep(DocField::PageStart)),
        merged_from: None,
        embedding: None,
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn keyword_search(
        &self,
        request: &KeywordRequest,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let query = tokenize(&request.text);
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let required = (query.len() * usize::from(request.minimum_should_match_pct) / 100).max(1);
        let parent_title = [FieldBoost::new(
            DocField::ParentSectionTitle,
            request.parent_title_boost,
        )];

        Ok(self
            .rank(request.size, &request.source_fields, |doc| {
                let score = best_fields_score(&query, doc, &request.match_fields, required)
                    + phrase_score(&query, doc, &request.phrase_fields, request.phrase_slop)
                    + best_fields_score(&query, doc, &parent_title, 1);
                (score > 0.0).then_some(score)
            })
            .await)
    }

    async fn vector_search(&self, request: &VectorRequest) -> Result<Vec<SearchHit>, SearchError> {
        Ok(self
            .rank(request.k, &request.source_fields, |doc| {
                doc.embedding
                    .as_deref()
                    .map(|embedding| cosine_similarity(&request.vector, embedding))
            })
            .await)
    }

    async fn lookup_sections(
        &self,
        request: &SectionLookup,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let ids: HashSet<&str> = request.section_ids.iter().map(String::as_str).collect();
        Ok(self
            .rank(request.size, &LOOKUP_SOURCE, |doc| {
                let listed = |id: &Option<String>| id.as_deref().is_some_and(|id| ids.contains(id));
                (listed(&doc.parent_section_id) || listed(&doc.section_id)).then_some(1.0)
            })
            .await)
    }

    async fn criteria_search(
        &self,
        request: &CriteriaRequest,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let disorder = tokenize(&request.disorder);
        if disorder.is_empty() {
            return Ok(Vec::new());
        }
        let sub_title = request
            .sub_title
            .as_deref()
            .map(tokenize)
            .unwrap_or_default();
        let sub_title_field = [FieldBoost::new(DocField::SubTitle, request.sub_title_boost)];

        Ok(self
            .rank(request.size, &CRITERIA_SOURCE, |doc| {
                let must =
                    phrase_score(&disorder, doc, &request.phrase_fields, request.phrase_slop);
                (must > 0.0).then(|| must + best_fields_score(&sub_title, doc, &sub_title_field, 1))
            })
            .await)
    }

    async fn create_index(&self, dimension: usize) -> Result<bool, SearchError> {
        let mut state = self.state.write().await;
        if state.dimension.is_some() {
            return Ok(false);
        }
        state.dimension = Some(dimension);
        Ok(true)
    }

    async fn delete_index(&self) -> Result<bool, SearchError> {
        let mut state = self.state.write().await;
        let existed = state.dimension.is_some() || !state.documents.is_empty();
        *state = IndexState::default();
        Ok(existed)
    }

    async fn upsert_documents(
        &self,
        documents: &[(String, IndexedDocument)],
    ) -> Result<BulkReport, SearchError> {
        let mut state = self.state.write().await;
        let mut report = BulkReport::default();

        for (id, document) in documents {
            let actual = document.embedding.as_ref().map(Vec::len);
            match (state.dimension, actual) {
                (Some(expected), Some(actual)) if expected != actual => {
                    report.failed += 1;
                    let err = EmbedError::DimensionMismatch { expected, actual };
                    report.errors.push(format!("{id}: {err}"));
                    continue;
                }
                (None, Some(actual)) => state.dimension = Some(actual),
                _ => {}
            }
            state.documents.insert(id.clone(), document.clone());
            report.indexed += 1;
        }
        debug!(
            index = %self.name,
            indexed = report.indexed,
            failed = report.failed,
            "upserted documents"
        );
        Ok(report)
    }

    async fn count(&self) -> Result<u64, SearchError> {
        Ok(self.state.read().await.documents.len() as u64)
    }
}
