//! Persistence collaborators.
//!
//! The exploration engine only talks to papers and relations through the two
//! traits below; records are validated at this boundary so the traversal
//! works with typed [`Paper`] and [`Relation`] values throughout.

pub mod corpus;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::models::{Paper, Relation, RelationshipType};

pub use corpus::{Corpus, CorpusPaper};
pub use memory::{InMemoryPaperStore, InMemoryRelationStore};


#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Invalid record: {0}")]
    Invalid(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}


pub type StoreResult<T> = Result<T, StoreError>;

/// Read access to stored papers and the citation structure between them.
#[async_trait]
pub trait PaperStore: Send + Sync {

    async fn get_paper(&self, id: &str) -> StoreResult<Option<Paper>>;

    /// Raw titles from the paper's reference list, in document order.
    async fn outgoing_reference_titles(&self, id: &str) -> StoreResult<Vec<String>>;

    /// Best stored paper whose title matches with at least `min_similarity`.
    async fn resolve_title_to_id(&self, title: &str, min_similarity: f64) -> StoreResult<Option<String>>;

    /// Ids of stored papers that cite `id`.
    async fn incoming_citers(&self, id: &str) -> StoreResult<Vec<String>>;
}

/// Cached pairwise relevance, keyed by ordered `(source, target)`.
#[async_trait]
pub trait RelationStore: Send + Sync {

    async fn get(&self, source_id: &str, target_id: &str) -> StoreResult<Option<Relation>>;


    async fn upsert(
        &self,
        source_id: &str,
        target_id: &str,
        score: f64,
        relationship_type: RelationshipType,
        remarks: Option<String>,
    ) -> StoreResult<()>;
}


#[async_trait]
impl PaperStore for Arc<dyn PaperStore> {
    async fn get_paper(&self, id: &str) -> StoreResult<Option<Paper>> {
        (**self).get_paper(id).await
    }

    async fn outgoing_reference_titles(&self, id: &str) -> StoreResult<Vec<String>> {
        (**self).outgoing_reference_titles(id).await
    }

    async fn resolve_title_to_id(&self, title: &str, min_similarity: f64) -> StoreResult<Option<String>> {
        (**self).resolve_title_to_id(title, min_similarity).await
    }

    async fn incoming_citers(&self, id: &str) -> StoreResult<Vec<String>> {
        (**self).incoming_citers(id).await
    }
}
