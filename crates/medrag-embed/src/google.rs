//! Google Gemini embeddings (`batchEmbedContents`).

use std::time::Duration;

use async_trait::async_trait;
use medrag_core::{EmbedError, Embedder, EmbeddingOutput};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{check_count, check_dimensions, JsonClient};

pub const DEFAULT_GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GOOGLE_MODEL: &str = "models/gemini-embedding-001";

/// Gemini task hint for an embedding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

/// Embedder backed by the Gemini embedding API.
pub struct GoogleEmbedder {
    http: JsonClient,
    endpoint: String,
    model: String,
    dimension: usize,
}

impl GoogleEmbedder {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        dimension: usize,
        timeout: Duration,
        max_retries: usize,
    ) -> Result<Self, EmbedError> {
        if api_key.trim().is_empty() {
            return Err(EmbedError::Config("missing Google API key".to_string()));
        }

        let model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| EmbedError::Config("invalid Google API key".to_string()))?,
        );

        Ok(Self {
            http: JsonClient::new("google", headers, timeout, max_retries)?,
            endpoint: format!(
                "{}/{model}:batchEmbedContents",
                base_url.trim_end_matches('/')
            ),
            model,
            dimension,
        })
    }

    fn build_request<'a>(&'a self, texts: &[&'a str], task_type: TaskType) -> BatchRequest<'a> {
        BatchRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: &self.model,
                    content: Content {
                        parts: vec![Part { text }],
                    },
                    task_type,
                    output_dimensionality: self.dimension,
                })
                .collect(),
        }
    }

    async fn embed_with_task(
        &self,
        texts: &[&str],
        task_type: TaskType,
    ) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(
            model = %self.model,
            count = texts.len(),
            ?task_type,
            "requesting Gemini embeddings"
        );

        let request = self.build_request(texts, task_type);
        let response: BatchResponse = self.http.post_json(&self.endpoint, &request).await?;
        let vectors: Vec<Vec<f32>> = response.embeddings.into_iter().map(|e| e.values).collect();

        check_count("google", vectors.len(), texts.len())?;
        check_dimensions(&vectors, self.dimension)?;
        Ok(vectors.into_iter().map(EmbeddingOutput::from).collect())
    }
}

#[async_trait]
impl Embedder for GoogleEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        self.embed_with_task(texts, TaskType::RetrievalDocument).await
    }

    async fn embed_query(&self, query: &str) -> Result<EmbeddingOutput, EmbedError> {
        self.embed_with_task(&[query], TaskType::RetrievalQuery)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Inference("empty embedding result".to_string()))
    }
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
    output_dimensionality: usize,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedder(model: &str) -> GoogleEmbedder {
        GoogleEmbedder::new(
            "key",
            DEFAULT_GOOGLE_BASE_URL,
            model,
            768,
            Duration::from_secs(5),
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_model_prefix_added() {
        let e = embedder("gemini-embedding-001");
        assert_eq!(e.model_name(), "models/gemini-embedding-001");
        assert_eq!(
            e.endpoint,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-embedding-001:batchEmbedContents"
        );
    }

    #[test]
    fn test_request_body() {
        let e = embedder(DEFAULT_GOOGLE_MODEL);
        let json = serde_json::to_value(e.build_request(&["ám ảnh"], TaskType::RetrievalQuery))
            .unwrap();
        let first = &json["requests"][0];
        assert_eq!(first["model"], "models/gemini-embedding-001");
        assert_eq!(first["content"]["parts"][0]["text"], "ám ảnh");
        assert_eq!(first["taskType"], "RETRIEVAL_QUERY");
        assert_eq!(first["outputDimensionality"], 768);
    }

    #[test]
    fn test_response_parsing() {
        let response: BatchResponse =
            serde_json::from_str(r#"{"embeddings":[{"values":[0.1,0.2]},{"values":[0.3,0.4]}]}"#)
                .unwrap();
        assert_eq!(response.embeddings.len(), 2);
        assert_eq!(response.embeddings[1].values, vec![0.3, 0.4]);
    }

    #[test]
    fn test_missing_api_key() {
        let result = GoogleEmbedder::new(
            "",
            DEFAULT_GOOGLE_BASE_URL,
            DEFAULT_GOOGLE_MODEL,
            768,
            Duration::from_secs(5),
            1,
        );
        assert!(matches!(result, Err(EmbedError::Config(_))));
    }
}
