//! Self-hosted embedding service speaking `{"texts": [...]}`.

use std::time::Duration;

use async_trait::async_trait;
use medrag_core::{EmbedError, Embedder, EmbeddingOutput};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{check_count, check_dimensions, JsonClient};

/// Embedder backed by an HTTP service returning `{"embeddings": [[...]]}`.
pub struct HfApiEmbedder {
    http: JsonClient,
    url: String,
    model: String,
    dimension: usize,
}

impl HfApiEmbedder {
    pub fn new(
        url: &str,
        model: &str,
        token: Option<&str>,
        dimension: usize,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self, EmbedError> {
        if url.trim().is_empty() {
            return Err(EmbedError::Config(
                "missing embedding service URL".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            let auth = format!("Bearer {}", token.trim());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth).map_err(|_| {
                    EmbedError::Config("invalid embedding service token".to_string())
                })?,
            );
        }

        Ok(Self {
            http: JsonClient::new("hf-api", headers, timeout, max_retries)?,
            url: url.trim().to_string(),
            model: model.to_string(),
            dimension,
        })
    }
}

#[async_trait]
impl Embedder for HfApiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(url = %self.url, count = texts.len(), "requesting embeddings");

        let response: EmbedResponse = self
            .http
            .post_json(&self.url, &EmbedRequest { texts })
            .await?;

        check_count("hf-api", response.embeddings.len(), texts.len())?;
        check_dimensions(&response.embeddings, self.dimension)?;
        Ok(response
            .embeddings
            .into_iter()
            .map(EmbeddingOutput::from)
            .collect())
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}
