//! OpenAI embeddings endpoint.

use std::time::Duration;

use async_trait::async_trait;
use medrag_core::{EmbedError, Embedder, EmbeddingOutput};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{check_count, check_dimensions, JsonClient};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    http: JsonClient,
    endpoint: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedder {
    /// Builds a new OpenAI embeddings client.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        dimension: usize,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self, EmbedError> {
        if api_key.trim().is_empty() {
            return Err(EmbedError::Config("missing OpenAI API key".to_string()));
        }
        if model.trim().is_empty() {
            return Err(EmbedError::Config("missing OpenAI model name".to_string()));
        }

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| EmbedError::Config("invalid OpenAI API key".to_string()))?,
        );

        Ok(Self {
            http: JsonClient::new("openai", headers, timeout, max_retries)?,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dimension,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
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
        debug!(model = %self.model, count = texts.len(), "requesting OpenAI embeddings");

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: Some(self.dimension),
        };
        let response: EmbeddingResponse = self.http.post_json(&self.endpoint, &request).await?;
        let vectors = response.into_vectors();

        check_count("openai", vectors.len(), texts.len())?;
        check_dimensions(&vectors, self.dimension)?;
        Ok(vectors.into_iter().map(EmbeddingOutput::from).collect())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl EmbeddingResponse {
    /// Vectors in input order.
    fn into_vectors(mut self) -> Vec<Vec<f32>> {
        self.data.sort_by_key(|entry| entry.index);
        self.data.into_iter().map(|entry| entry.embedding).collect()
    }
}
