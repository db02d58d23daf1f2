//! Citation-graph exploration.
//!
//! Starting from a seed paper, the engine walks outgoing references
//! (downward) and then incoming citations of the qualifying discoveries
//! (upward), scoring every candidate against the root paper by chunk
//! embedding similarity and streaming partial graphs to a [`StreamSink`]
//! as they are found.

pub mod core;
pub mod explorer;
pub mod llm;
pub mod store;
pub mod utils;

pub use utils::{normalize_title, safe_truncate, safe_truncate_ellipsis, title_similarity};

pub use core::config::{ExplorerConfig, FailurePolicy};
pub use core::error::{ExploreError, Result};
pub use core::events::{Phase, StreamMessage, StreamSink};
pub use core::models::{Chunk, FrontierEntry, GraphLink, GraphNode, Paper, Relation, RelationshipType};
pub use explorer::{
    CancelHandle, ExplorationOutcome, ExplorationSession, ExplorerContext, RelevanceScorer,
    ScoreCache, TraversalOrder,
};
pub use llm::embeddings::{CachedEmbedder, EmbeddingProvider, HttpEmbeddingProvider};
pub use store::{PaperStore, RelationStore};


pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";


pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";


pub const DEFAULT_THRESHOLD: f64 = 0.88;


pub const DEFAULT_ALPHA: f64 = 0.6;


pub const DEFAULT_TITLE_MATCH_THRESHOLD: f64 = 0.5;


pub const DEFAULT_MAX_DEPTH: u32 = 2;


pub const DEFAULT_UPWARD_MAX_DEPTH: u32 = 1;


pub const DEFAULT_CACHE_SIZE: usize = 1000;


pub const DEFAULT_CACHE_TTL: u64 = 3600;
