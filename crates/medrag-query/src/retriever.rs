//! Hybrid keyword + vector retrieval.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use medrag_core::{
    CriteriaMatch, EmbedError, Embedder, Error, RelatedSection, Result, RetrievalResult,
    SearchError, SearchHit, SearchIndex,
};
use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::fusion::{reciprocal_rank_fusion, FusionWeights};
use crate::request::{
    criteria_request, fetch_size, keyword_request, lookup_request, parent_of, vector_request,
};

/// Related sections attached to each result at most.
const MAX_RELATED: usize = 3;

/// Per-call hybrid search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridSearchParams {
    pub top_k: usize,
    pub rrf_k: u32,
    pub keyword_weight: f64,
    pub vector_weight: f64,
    /// Multiplier for documents found by both searches
    pub overlap_bonus: f64,
    pub include_context: bool,
    pub num_candidates: usize,
    pub max_siblings: usize,
}

impl Default for HybridSearchParams {
    fn default() -> Self {
        Self {
            top_k: 10,
            rrf_k: 60,
            keyword_weight: 1.0,
            vector_weight: 1.2,
            overlap_bonus: 1.2,
            include_context: false,
            num_candidates: 100,
            max_siblings: 2,
        }
    }
}

impl HybridSearchParams {
    pub fn weights(&self) -> FusionWeights {
        FusionWeights {
            rrf_k: f64::from(self.rrf_k),
            keyword: self.keyword_weight,
            vector: self.vector_weight,
            overlap_bonus: self.overlap_bonus,
        }
    }
}

/// Upper bounds for each backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrieverTimeouts {
    pub embed: Duration,
    pub search: Duration,
    pub context: Duration,
}

impl Default for RetrieverTimeouts {
    fn default() -> Self {
        Self {
            embed: Duration::from_secs(30),
            search: Duration::from_secs(10),
            context: Duration::from_secs(5),
        }
    }
}

async fn within<T, F>(
    operation: &'static str,
    after: Duration,
    fut: F,
) -> std::result::Result<T, SearchError>
where
    F: Future<Output = std::result::Result<T, SearchError>>,
{
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| SearchError::Timeout { operation, after })?
}

/// Fuses lexical and semantic search over one index.
#[derive(Clone)]
pub struct HybridRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn SearchIndex>,
    timeouts: RetrieverTimeouts,
}

impl HybridRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn SearchIndex>) -> Self {
        Self {
            embedder,
            index,
            timeouts: RetrieverTimeouts::default(),
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: RetrieverTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn index_name(&self) -> &str {
        self.index.name()
    }

    /// Top `params.top_k` documents by weighted reciprocal rank fusion of
    /// keyword and kNN results.
    pub async fn hybrid_search(
        &self,
        query: &str,
        params: &HybridSearchParams,
    ) -> Result<Vec<RetrievalResult>> {
        let span = info_span!(
            "hybrid_search",
            trace_id = %Uuid::new_v4(),
            index = self.index.name(),
            top_k = params.top_k,
        );
        self.run_hybrid(query, params).instrument(span).await
    }

    async fn run_hybrid(
        &self,
        query: &str,
        params: &HybridSearchParams,
    ) -> Result<Vec<RetrievalResult>> {
        let query = query.trim();
        if query.is_empty() || params.top_k == 0 {
            debug!("empty query or top_k, nothing to search");
            return Ok(Vec::new());
        }

        let vector = self.embed_query(query).await?;
        let size = fetch_size(params.top_k);
        let keyword = keyword_request(query, size);
        let semantic = vector_request(vector, size, params.num_candidates);

        let (keyword_hits, vector_hits) = tokio::try_join!(
            within("keyword search", self.timeouts.search, self.index.keyword_search(&keyword)),
            within("vector search", self.timeouts.search, self.index.vector_search(&semantic)),
        )
        .map_err(|e| {
            error!(error = %e, "search failed");
            e
        })?;
        info!(
            keyword_hits = keyword_hits.len(),
            vector_hits = vector_hits.len(),
            "search lists retrieved"
        );

        let mut results: Vec<RetrievalResult> =
            reciprocal_rank_fusion(keyword_hits, vector_hits, &params.weights())
                .into_iter()
                .take(params.top_k)
                .map(|hit| RetrievalResult::from_document(hit.id, hit.document, hit.scores))
                .collect();

        if params.include_context {
            self.expand_context(&mut results, params.max_siblings).await;
        }
        Ok(results)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let after = self.timeouts.embed;
        let output = tokio::time::timeout(after, self.embedder.embed_query(query))
            .await
            .map_err(|_| EmbedError::Timeout(after))
            .and_then(|r| r)
            .map_err(|e| {
                error!(error = %e, "query embedding failed");
                Error::from(e)
            })?;
        Ok(output.embedding)
    }

    /// Attach up to three sibling or parent sections to each result.
    ///
    /// Lookup failures leave the results unexpanded.
    async fn expand_context(&self, results: &mut [RetrievalResult], max_siblings: usize) {
        let parent_ids: BTreeSet<String> = results
            .iter()
            .filter_map(|r| r.section_id.as_deref().and_then(parent_of))
            .map(str::to_string)
            .collect();
        if parent_ids.is_empty() || max_siblings == 0 {
            return;
        }

        let lookup = lookup_request(parent_ids.into_iter().collect(), max_siblings);
        let hits = match within(
            "context lookup",
            self.timeouts.context,
            self.index.lookup_sections(&lookup),
        )
        .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "context lookup failed, returning results without context");
                return;
            }
        };
        debug!(related = hits.len(), "context sections fetched");

        for result in results.iter_mut() {
            result.related_sections = related_for(result, &hits);
        }
    }

    /// Documents of `disorder`, favouring criterion `criterion` (e.g. `"A"`).
    pub async fn search_by_criteria(
        &self,
        disorder: &str,
        criterion: Option<&str>,
    ) -> Result<Vec<CriteriaMatch>> {
        let disorder = disorder.trim();
        if disorder.is_empty() {
            return Ok(Vec::new());
        }
        let span = info_span!("search_by_criteria", trace_id = %Uuid::new_v4(), disorder);
        let request = criteria_request(disorder, criterion);

        let hits = within(
            "criteria search",
            self.timeouts.search,
            self.index.criteria_search(&request),
        )
        .instrument(span)
        .await
        .map_err(|e| {
            error!(error = %e, "criteria search failed");
            e
        })?;
        Ok(hits.into_iter().map(CriteriaMatch::from).collect())
    }
}

fn related_for(result: &RetrievalResult, hits: &[SearchHit]) -> Vec<RelatedSection> {
    let Some(parent) = result.section_id.as_deref().and_then(parent_of) else {
        return Vec::new();
    };
    hits.iter()
        .filter(|hit| hit.document.section_id != result.section_id)
        .filter(|hit| {
            hit.document.parent_section_id.as_deref() == Some(parent)
                || hit.document.section_id.as_deref() == Some(parent)
        })
        .take(MAX_RELATED)
        .map(|hit| RelatedSection {
            title: hit.document.title.clone(),
            section_id: hit.document.section_id.clone(),
            content: hit.document.content.clone(),
        })
        .collect()
}

/// Synchronous facade owning its own runtime.
pub struct BlockingRetriever {
    runtime: Runtime,
    inner: HybridRetriever,
}

impl BlockingRetriever {
    pub fn new(inner: HybridRetriever) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(Self { runtime, inner })
    }

    pub fn hybrid_search(
        &self,
        query: &str,
        params: &HybridSearchParams,
    ) -> Result<Vec<RetrievalResult>> {
        self.runtime.block_on(self.inner.hybrid_search(query, params))
    }

    pub fn search_by_criteria(
        &self,
        disorder: &str,
        criterion: Option<&str>,
    ) -> Result<Vec<CriteriaMatch>> {
        self.runtime
            .block_on(self.inner.search_by_criteria(disorder, criterion))
    }
}
