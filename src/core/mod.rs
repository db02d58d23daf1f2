

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use cache::{CacheStats, EmbeddingCache};
pub use config::{ExplorerConfig, FailurePolicy};
pub use error::{ExploreError, Result};
pub use events::{Phase, SinkError, StreamMessage, StreamSink};
pub use models::{Chunk, FrontierEntry, GraphLink, GraphNode, Paper, Relation, RelationshipType};
