

pub mod embeddings;

pub use embeddings::{
    CachedEmbedder, EmbeddingBackend, EmbeddingError, EmbeddingProvider, HttpEmbeddingProvider,
};
