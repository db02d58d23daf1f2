

use thiserror::Error;

use crate::core::events::SinkError;
use crate::explorer::frontier::EmptyFrontier;
use crate::llm::embeddings::EmbeddingError;
use crate::store::StoreError;


#[derive(Error, Debug)]
pub enum ExploreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Paper not found: {0}")]
    NotFound(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Transport error: {0}")]
    Transport(#[from] SinkError),

    #[error("Pop from an empty frontier")]
    EmptyFrontier,

    #[error("Exploration cancelled")]
    Cancelled,

    #[error("Exploration timed out after {0}ms")]
    Timeout(u64),
}

impl ExploreError {
    /// Whether the error ends the whole session regardless of failure policy.
    ///
    /// `NotFound` and `ExternalService` are scoped to the branch that raised
    /// them; everything else means the session cannot make progress.
    pub fn is_session_fatal(&self) -> bool {
        !matches!(self, Self::NotFound(_) | Self::ExternalService(_))
    }
}

impl From<StoreError> for ExploreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::ExternalService(other.to_string()),
        }
    }
}

impl From<EmbeddingError> for ExploreError {
    fn from(err: EmbeddingError) -> Self {
        Self::ExternalService(format!("embedding: {}", err))
    }
}

impl From<EmptyFrontier> for ExploreError {
    fn from(_: EmptyFrontier) -> Self {
        Self::EmptyFrontier
    }
}

impl From<config::ConfigError> for ExploreError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}


pub type Result<T> = std::result::Result<T, ExploreError>;
