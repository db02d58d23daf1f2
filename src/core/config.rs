

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

use crate::core::error::{ExploreError, Result};
use crate::explorer::TraversalOrder;
use crate::llm::embeddings::EmbeddingBackend;

/// What the traversal does when an external collaborator fails while a
/// single paper is being expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the failure on the stream and continue with the next candidate.
    #[default]
    IsolateBranch,
    /// Report the failure once and end the session.
    AbortSession,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {

    pub max_depth: u32,
    pub upward_max_depth: u32,
    pub threshold: f64,
    pub alpha: f64,
    pub title_match_threshold: f64,
    pub traversal_order: TraversalOrder,


    pub session_timeout_ms: u64,
    pub failure_policy: FailurePolicy,


    pub embedding_provider: EmbeddingBackend,
    pub embedding_model: String,
    pub embedding_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_timeout_secs: u64,


    pub embedding_cache_size: usize,
    pub embedding_cache_ttl_secs: u64,
}

impl ExplorerConfig {

    pub fn new() -> Self {
        Self {
            max_depth: crate::DEFAULT_MAX_DEPTH,
            upward_max_depth: crate::DEFAULT_UPWARD_MAX_DEPTH,
            threshold: crate::DEFAULT_THRESHOLD,
            alpha: crate::DEFAULT_ALPHA,
            title_match_threshold: crate::DEFAULT_TITLE_MATCH_THRESHOLD,
            traversal_order: TraversalOrder::Fifo,

            session_timeout_ms: 300_000,
            failure_policy: FailurePolicy::IsolateBranch,

            embedding_provider: EmbeddingBackend::Ollama,
            embedding_model: crate::DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_url: crate::DEFAULT_OLLAMA_URL.to_string(),
            embedding_api_key: None,
            embedding_timeout_secs: 30,

            embedding_cache_size: crate::DEFAULT_CACHE_SIZE,
            embedding_cache_ttl_secs: crate::DEFAULT_CACHE_TTL,
        }
    }

    /// Layers defaults, an optional TOML/JSON/YAML file and `CITEGRAPH_*`
    /// environment variables, in that order of precedence.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("CITEGRAPH").try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }


    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Some(depth) = env_parse("CITEGRAPH_MAX_DEPTH") {
            config.max_depth = depth;
        }
        if let Some(depth) = env_parse("CITEGRAPH_UPWARD_MAX_DEPTH") {
            config.upward_max_depth = depth;
        }
        if let Some(threshold) = env_parse("CITEGRAPH_THRESHOLD") {
            config.threshold = threshold;
        }
        if let Some(alpha) = env_parse("CITEGRAPH_ALPHA") {
            config.alpha = alpha;
        }
        if let Some(order) = env_parse("CITEGRAPH_TRAVERSAL_ORDER") {
            config.traversal_order = order;
        }
        if let Some(policy) = env_parse("CITEGRAPH_FAILURE_POLICY") {
            config.failure_policy = policy;
        }
        if let Some(timeout) = env_parse("CITEGRAPH_SESSION_TIMEOUT_MS") {
            config.session_timeout_ms = timeout;
        }
        if let Some(provider) = env_parse("CITEGRAPH_EMBEDDING_PROVIDER") {
            config.embedding_provider = provider;
        }
        if let Ok(model) = std::env::var("CITEGRAPH_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Ok(url) = std::env::var("CITEGRAPH_EMBEDDING_URL") {
            config.embedding_url = url;
        }
        if let Ok(key) = std::env::var("CITEGRAPH_EMBEDDING_API_KEY") {
            config.embedding_api_key = Some(key);
        }

        config
    }


    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ExploreError::Config(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(ExploreError::Config(format!(
                "alpha must be within [0, 1], got {}",
                self.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.title_match_threshold) {
            return Err(ExploreError::Config(format!(
                "title_match_threshold must be within [0, 1], got {}",
                self.title_match_threshold
            )));
        }
        url::Url::parse(&self.embedding_url).map_err(|e| {
            ExploreError::Config(format!("invalid embedding_url '{}': {}", self.embedding_url, e))
        })?;
        Ok(())
    }

    /// `None` when the session is unbounded (`session_timeout_ms == 0`).
    pub fn session_timeout(&self) -> Option<Duration> {
        (self.session_timeout_ms > 0).then(|| Duration::from_millis(self.session_timeout_ms))
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
