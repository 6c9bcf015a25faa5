//! Elasticsearch REST backend.

use std::time::Duration;

use async_trait::async_trait;
use medrag_core::{
    BulkReport, CriteriaRequest, IndexedDocument, KeywordRequest, SearchError, SearchHit,
    SearchIndex, SectionLookup, VectorRequest,
};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::dsl;
use crate::schema::index_mapping;

/// Connection settings for an Elasticsearch cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticConfig {
    pub host: String,
    pub index_name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:9200".to_string(),
            index_name: "dsm5".to_string(),
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// [`SearchIndex`] backed by one Elasticsearch index.
pub struct ElasticIndex {
    client: Client,
    base_url: String,
    index_name: String,
    username: Option<String>,
    password: Option<String>,
    timeout: Duration,
}

impl ElasticIndex {
    pub fn new(config: &ElasticConfig) -> Result<Self, SearchError> {
        if config.host.trim().is_empty() {
            return Err(SearchError::Config("missing Elasticsearch host".to_string()));
        }
        if config.index_name.trim().is_empty() {
            return Err(SearchError::Config("missing index name".to_string()));
        }
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.host.trim().trim_end_matches('/').to_string(),
            index_name: config.index_name.clone(),
            username: config.username.clone().filter(|u| !u.is_empty()),
            password: config.password.clone(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        if path.is_empty() {
            format!("{}/{}", self.base_url, self.index_name)
        } else {
            format!("{}/{}/{path}", self.base_url, self.index_name)
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.username {
            Some(username) => builder.basic_auth(username, self.password.as_deref()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, SearchError> {
        builder.send().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::Timeout {
                    operation: "elasticsearch request",
                    after: self.timeout,
                }
            } else {
                SearchError::Request(e.to_string())
            }
        })
    }

    /// Body of a successful response, or the matching error.
    async fn read_body(&self, response: Response) -> Result<Vec<u8>, SearchError> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))?;
        if status.is_success() {
            return Ok(body.to_vec());
        }
        if status == StatusCode::NOT_FOUND {
            return Err(SearchError::IndexNotFound(self.index_name.clone()));
        }
        let body = String::from_utf8_lossy(&body).into_owned();
        error!(status = status.as_u16(), index = %self.index_name, "elasticsearch error");
        Err(SearchError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn search(&self, body: &Value) -> Result<Vec<SearchHit>, SearchError> {
        let response = self.send(self.request(Method::POST, "_search").json(body)).await?;
        let bytes = self.read_body(response).await?;
        let hits = dsl::parse_hits(&bytes)?;
        debug!(index = %self.index_name, hits = hits.len(), "search completed");
        Ok(hits)
    }

    /// Whether the index exists.
    pub async fn exists(&self) -> Result<bool, SearchError> {
        let response = self.send(self.request(Method::HEAD, "")).await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(SearchError::Status {
                status: s.as_u16(),
                body: String::new(),
            }),
        }
    }
}

#[async_trait]
impl SearchIndex for ElasticIndex {
    fn name(&self) -> &str {
        &self.index_name
    }

    async fn keyword_search(
        &self,
        request: &KeywordRequest,
    ) -> Result<Vec<SearchHit>, SearchError> {
        self.search(&dsl::keyword_query(request)).await
    }

    async fn vector_search(&self, request: &VectorRequest) -> Result<Vec<SearchHit>, SearchError> {
        self.search(&dsl::vector_query(request)).await
    }

    async fn lookup_sections(
        &self,
        request: &SectionLookup,
    ) -> Result<Vec<SearchHit>, SearchError> {
        if request.section_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.search(&dsl::lookup_query(request)).await
    }

    async fn criteria_search(
        &self,
        request: &CriteriaRequest,
    ) -> Result<Vec<SearchHit>, SearchError> {
        self.search(&dsl::criteria_query(request)).await
    }

    async fn create_index(&self, dimension: usize) -> Result<bool, SearchError> {
        if self.exists().await? {
            info!(index = %self.index_name, "index already exists");
            return Ok(false);
        }
        let response = self
            .send(self.request(Method::PUT, "").json(&index_mapping(dimension)))
            .await?;
        self.read_body(response).await?;
        info!(index = %self.index_name, dimension, "index created");
        Ok(true)
    }

    async fn delete_index(&self) -> Result<bool, SearchError> {
        let response = self.send(self.request(Method::DELETE, "")).await?;
        match self.read_body(response).await {
            Ok(_) => {
                info!(index = %self.index_name, "index deleted");
                Ok(true)
            }
            Err(SearchError::IndexNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn upsert_documents(
        &self,
        documents: &[(String, IndexedDocument)],
    ) -> Result<BulkReport, SearchError> {
        if documents.is_empty() {
            return Ok(BulkReport::default());
        }
        let body = dsl::bulk_body(&self.index_name, documents)?;
        let request = self
            .request(Method::POST, "_bulk")
            .header(CONTENT_TYPE, HeaderValue::from_static("application/x-ndjson"))
            .body(body);
        let response = self.send(request).await?;
        let bytes = self.read_body(response).await?;
        let report = dsl::parse_bulk(&bytes)?;
        debug!(
            index = %self.index_name,
            indexed = report.indexed,
            failed = report.failed,
            "bulk upsert completed"
        );
        Ok(report)
    }

    async fn count(&self) -> Result<u64, SearchError> {
        let response = self.send(self.request(Method::GET, "_count")).await?;
        let bytes = self.read_body(response).await?;
        dsl::parse_count(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let index = ElasticIndex::new(&ElasticConfig {
            host: "http://es:9200/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(index.url(""), "http://es:9200/dsm5");
        assert_eq!(index.url("_search"), "http://es:9200/dsm5/_search");
        assert_eq!(index.name(), "dsm5");
    }

    #[test]
    fn test_missing_host_rejected() {
        let result = ElasticIndex::new(&ElasticConfig {
            host: " ".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(SearchError::Config(_))));
    }

    #[test]
    fn test_empty_username_means_no_auth() {
        let index = ElasticIndex::new(&ElasticConfig {
            username: Some(String::new()),
            password: Some("pw".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert!(index.username.is_none());
    }

    #[test]
    fn test_password_not_serialized() {
        let config = ElasticConfig {
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_lookup_with_no_ids_skips_request() {
        let index = ElasticIndex::new(&ElasticConfig {
            host: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        })
        .unwrap();
        let hits = index
            .lookup_sections(&SectionLookup {
                section_ids: Vec::new(),
                size: 0,
            })
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
