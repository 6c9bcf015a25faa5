//! Provider selection from configuration.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use medrag_core::{EmbedError, Embedder};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::EmbeddingCache;
use crate::google::{GoogleEmbedder, DEFAULT_GOOGLE_BASE_URL, DEFAULT_GOOGLE_MODEL};
use crate::hf::HfApiEmbedder;
use crate::noop::NoopEmbedder;
use crate::openai::{OpenAiEmbedder, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};

/// Supported embedding providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbedderKind {
    #[default]
    Openai,
    Google,
    HfApi,
    Noop,
}

impl EmbedderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Google => "google",
            Self::HfApi => "hf-api",
            Self::Noop => "noop",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            Self::Openai => DEFAULT_OPENAI_MODEL,
            Self::Google => DEFAULT_GOOGLE_MODEL,
            Self::HfApi => "hf-api",
            Self::Noop => "noop",
        }
    }
}

impl fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbedderKind {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::Openai),
            "google" | "gemini" => Ok(Self::Google),
            "hf-api" | "hf" => Ok(Self::HfApi),
            "noop" => Ok(Self::Noop),
            other => Err(EmbedError::Config(format!(
                "unknown embedding provider: {other}"
            ))),
        }
    }
}

/// Provider-independent embedder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedderSettings {
    #[serde(default)]
    pub provider: EmbedderKind,

    /// Model name; provider default when empty
    #[serde(default)]
    pub model: String,

    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// API base URL (OpenAI, Google) or full endpoint URL (HF API)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Never written back to disk
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Query-embedding cache entries; 0 disables the cache
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

fn default_dimension() -> usize {
    1536
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> usize {
    3
}

fn default_cache_size() -> usize {
    1_000
}

impl Default for EmbedderSettings {
    fn default() -> Self {
        Self {
            provider: EmbedderKind::default(),
            model: String::new(),
            dimension: default_dimension(),
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            cache_size: default_cache_size(),
        }
    }
}

impl EmbedderSettings {
    /// Configured model or the provider's default.
    pub fn model_or_default(&self) -> &str {
        if self.model.trim().is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn require_api_key(&self) -> Result<&str, EmbedError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                EmbedError::Config(format!("{} provider requires an API key", self.provider))
            })
    }
}

/// Build the configured embedder, wrapped in a cache when enabled.
pub fn build_embedder(settings: &EmbedderSettings) -> Result<Arc<dyn Embedder>, EmbedError> {
    if settings.dimension == 0 {
        return Err(EmbedError::Config(
            "embedding dimension must be positive".to_string(),
        ));
    }
    let model = settings.model_or_default();
    let timeout = settings.timeout();

    let embedder: Arc<dyn Embedder> = match settings.provider {
        EmbedderKind::Openai => Arc::new(OpenAiEmbedder::new(
            settings.require_api_key()?,
            settings.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_BASE_URL),
            model,
            settings.dimension,
            timeout,
            settings.max_retries,
        )?),
        EmbedderKind::Google => Arc::new(GoogleEmbedder::new(
            settings.require_api_key()?,
            settings.base_url.as_deref().unwrap_or(DEFAULT_GOOGLE_BASE_URL),
            model,
            settings.dimension,
            timeout,
            settings.max_retries,
        )?),
        EmbedderKind::HfApi => {
            let url = settings.base_url.as_deref().ok_or_else(|| {
                EmbedError::Config("hf-api provider requires base_url".to_string())
            })?;
            Arc::new(HfApiEmbedder::new(
                url,
                model,
                settings.api_key.as_deref(),
                settings.dimension,
                timeout,
                settings.max_retries,
            )?)
        }
        EmbedderKind::Noop => Arc::new(NoopEmbedder::with_dimension(settings.dimension)),
    };

    info!(
        provider = %settings.provider,
        model = embedder.model_name(),
        dimension = embedder.dimension(),
        cache_size = settings.cache_size,
        "embedder ready"
    );

    if settings.cache_size > 0 {
        Ok(Arc::new(EmbeddingCache::with_capacity(
            embedder,
            settings.cache_size,
        )))
    } else {
        Ok(embedder)
    }
}
