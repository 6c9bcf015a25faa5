//! Configuration file, environment overrides and data directories.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use medrag_core::ChunkConfig;
use medrag_embed::{EmbedderKind, EmbedderSettings};
use medrag_query::{HybridSearchParams, RetrieverTimeouts, DEFAULT_MAX_CHARS};
use medrag_store::ElasticConfig;
use serde::{Deserialize, Serialize};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub chunking: ChunkConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which [`SearchIndex`](medrag_core::SearchIndex) implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    #[default]
    Elasticsearch,
    /// In-process index persisted as a JSON snapshot
    Memory,
}

/// Search backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub backend: SearchBackend,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_index_name")]
    pub index_name: String,

    #[serde(default)]
    pub username: Option<String>,

    /// Taken from `ES_PASSWORD`, never written back
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,

    /// Snapshot file for the memory backend (default: `<data dir>/index.json`)
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
}

fn default_host() -> String {
    "http://localhost:9200".to_string()
}

fn default_index_name() -> String {
    "dsm5".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: SearchBackend::default(),
            host: default_host(),
            index_name: default_index_name(),
            username: None,
            password: None,
            timeout_secs: default_request_timeout_secs(),
            snapshot: None,
        }
    }
}

impl SearchConfig {
    pub fn elastic(&self) -> ElasticConfig {
        ElasticConfig {
            host: self.host.clone(),
            index_name: self.index_name.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            timeout_secs: self.timeout_secs,
        }
    }

    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.snapshot
            .clone()
            .or_else(|| data_dir().map(|dir| dir.join("index.json")))
    }
}

/// Embedding provider plus batching limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(flatten)]
    pub provider: EmbedderSettings,

    /// Texts per provider request during indexing
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Max concurrent provider requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_batch_size() -> usize {
    64
}

fn default_max_concurrent() -> usize {
    4
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbedderSettings::default(),
            batch_size: default_batch_size(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Hybrid search defaults and timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(flatten)]
    pub params: HybridSearchParams,

    #[serde(default = "default_embed_timeout_secs")]
    pub embed_timeout_secs: u64,

    #[serde(default = "default_search_timeout_secs")]
    pub search_timeout_secs: u64,

    #[serde(default = "default_context_timeout_secs")]
    pub context_timeout_secs: u64,

    /// Budget for `--context` output
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

fn default_embed_timeout_secs() -> u64 {
    30
}

fn default_search_timeout_secs() -> u64 {
    10
}

fn default_context_timeout_secs() -> u64 {
    5
}

fn default_max_context_chars() -> usize {
    DEFAULT_MAX_CHARS
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            params: HybridSearchParams::default(),
            embed_timeout_secs: default_embed_timeout_secs(),
            search_timeout_secs: default_search_timeout_secs(),
            context_timeout_secs: default_context_timeout_secs(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

impl RetrievalConfig {
    pub fn timeouts(&self) -> RetrieverTimeouts {
        RetrieverTimeouts {
            embed: Duration::from_secs(self.embed_timeout_secs),
            search: Duration::from_secs(self.search_timeout_secs),
            context: Duration::from_secs(self.context_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `medrag_query=debug`
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Log file path (optional, default stderr)
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

impl Config {
    /// Load `.env`, the default config file if present, then environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Like [`Config::load`] with an explicit file. A missing default file is
    /// not an error; a missing explicit file is.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = match path {
            Some(path) if path.exists() => Self::read(&path)?,
            Some(path) if Some(&path) != Self::config_path().as_ref() => {
                anyhow::bail!("config file not found: {}", path.display())
            }
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config in {}", path.display()))
    }

    /// Fill secrets and endpoints from environment variables.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let provider = &mut self.embedding.provider;
        let key_var = match provider.provider {
            EmbedderKind::Openai => Some("OPENAI_API_KEY"),
            EmbedderKind::Google => Some("GOOGLE_API_KEY"),
            EmbedderKind::HfApi | EmbedderKind::Noop => None,
        };
        if let Some(key) = key_var.and_then(|name| var(name)) {
            provider.api_key = Some(key);
        }
        if provider.provider == EmbedderKind::HfApi && provider.base_url.is_none() {
            provider.base_url = var("HF_EMBEDDING_API");
        }

        if let Some(host) = var("ES_HOST") {
            self.search.host = host;
        }
        if let Some(username) = var("ES_USERNAME") {
            self.search.username = Some(username);
        }
        if let Some(password) = var("ES_PASSWORD") {
            self.search.password = Some(password);
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn sample_toml() -> &'static str {
        SAMPLE_CONFIG
    }
}

const SAMPLE_CONFIG: &str = r#"# medrag configuration
#
# Secrets come from the environment (or a .env file):
#   OPENAI_API_KEY, GOOGLE_API_KEY, HF_EMBEDDING_API,
#   ES_HOST, ES_USERNAME, ES_PASSWORD

[search]
# "elasticsearch" or "memory"
backend = "elasticsearch"
host = "http://localhost:9200"
index_name = "dsm5"
timeout_secs = 30
# snapshot = "/path/to/index.json"   # memory backend only

[embedding]
# "openai", "google", "hf-api" or "noop"
provider = "openai"
model = "text-embedding-3-small"
dimension = 1536
timeout_secs = 30
max_retries = 3
cache_size = 1000
batch_size = 64
max_concurrent = 4

[chunking]
min_chunk_size = 200
max_chunk_size = 1500
context_title_max_chars = 60

[retrieval]
top_k = 10
rrf_k = 60
keyword_weight = 1.0
vector_weight = 1.2
overlap_bonus = 1.2
include_context = false
num_candidates = 100
max_siblings = 2
embed_timeout_secs = 30
search_timeout_secs = 10
context_timeout_secs = 5
max_context_chars = 8000

[logging]
level = "info"
# "text" or "json"
format = "text"
# file = "/var/log/medrag.log"
"#;

/// Data directory (`MEDRAG_DATA_DIR` overrides the platform default).
pub fn data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("MEDRAG_DATA_DIR") {
        return Some(PathBuf::from(dir));
    }
    ProjectDirs::from("", "", "medrag").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Config directory (`MEDRAG_CONFIG_DIR` overrides the platform default).
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("MEDRAG_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }
    ProjectDirs::from("", "", "medrag").map(|dirs| dirs.config_dir().to_path_buf())
}
