

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::cache::{CacheStats, EmbeddingCache};
use crate::core::config::ExplorerConfig;


#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty text")]
    EmptyText,

    #[error("Provider error: {0}")]
    Provider(String),
}

/// Turns chunk text into a fixed-length vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;


    fn model_name(&self) -> &str;
}


#[async_trait]
impl EmbeddingProvider for Arc<dyn EmbeddingProvider> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed(text).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    Ollama,
    OpenAi,
}


#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OpenAIEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding provider backed by an Ollama or OpenAI-compatible HTTP endpoint.
pub struct HttpEmbeddingProvider {
    backend: EmbeddingBackend,
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpEmbeddingProvider {

    pub fn new(
        backend: EmbeddingBackend,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, EmbeddingError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        let backend_name: &'static str = backend.into();

        info!(
            "HttpEmbeddingProvider initialized: backend={}, model={}, url={}",
            backend_name, model, base_url
        );

        Ok(Self {
            backend,
            base_url,
            model,
            api_key,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()?,
        })
    }


    pub fn from_config(config: &ExplorerConfig) -> Result<Self, EmbeddingError> {
        Self::new(
            config.embedding_provider,
            config.embedding_url.clone(),
            config.embedding_model.clone(),
            config.embedding_api_key.clone(),
            config.embedding_timeout_secs,
        )
    }

    async fn embed_ollama(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<OllamaEmbeddingResponse>()
            .await?;

        Ok(response.embedding)
    }

    async fn embed_openai(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| EmbeddingError::Provider("API key required for openai backend".to_string()))?;

        let request = OpenAIEmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<OpenAIEmbeddingResponse>()
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        let embedding = match self.backend {
            EmbeddingBackend::Ollama => self.embed_ollama(text).await?,
            EmbeddingBackend::OpenAi => self.embed_openai(text).await?,
        };

        if embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse("Empty embedding vector".to_string()));
        }
        Ok(embedding)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Memoizes another provider so a paper's chunks are embedded once per
/// process no matter how many pairs it takes part in.
pub struct CachedEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    cache: EmbeddingCache,
}

impl CachedEmbedder {

    pub fn new(inner: Arc<dyn EmbeddingProvider>, cache_size: usize, cache_ttl_secs: u64) -> Self {
        Self {
            inner,
            cache: EmbeddingCache::new(cache_size, cache_ttl_secs),
        }
    }


    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let key = EmbeddingCache::make_key(self.inner.model_name(), text);
        if let Some(cached) = self.cache.get(&key) {
            debug!("Embedding cache HIT for: {}...", crate::safe_truncate(text, 50));
            return Ok(cached);
        }

        let embedding = self.inner.embed(text).await?;
        self.cache.set(&key, embedding.clone());
        Ok(embedding)
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
