
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use super::score_cache::{ScoreCache, ScoredPair};
use super::scoring::RelevanceScorer;
use crate::core::config::FailurePolicy;
use crate::core::error::{ExploreError, Result};
use crate::core::events::{StreamMessage, StreamSink};
use crate::core::models::{Paper, RelationshipType};
use crate::llm::embeddings::EmbeddingProvider;
use crate::store::PaperStore;

/// Lets the transport stop a running session from another task.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The paper every candidate is scored against. `paper` is `None` when the
/// root is not in the store; scoring then fails per pair with `NotFound`.
#[derive(Debug, Clone)]
pub struct RootPaper {
    pub id: String,
    pub paper: Option<Paper>,
}

impl RootPaper {
    pub async fn fetch(papers: &dyn PaperStore, id: &str) -> Result<Self> {
        Ok(Self {
            id: id.to_string(),
            paper: papers.get_paper(id).await?,
        })
    }
}

/// Collaborators shared by both exploration phases of one session.
#[derive(Clone)]
pub struct ExplorerContext {
    pub papers: Arc<dyn PaperStore>,
    pub scores: Arc<ScoreCache>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub scorer: RelevanceScorer,
    pub sink: Arc<dyn StreamSink>,
    pub cancel: CancelHandle,
    pub title_match_threshold: f64,
    pub failure_policy: FailurePolicy,
}

impl ExplorerContext {
    pub fn new(
        papers: Arc<dyn PaperStore>,
        scores: Arc<ScoreCache>,
        embedder: Arc<dyn EmbeddingProvider>,
        sink: Arc<dyn StreamSink>,
    ) -> Self {
        Self {
            papers,
            scores,
            embedder,
            scorer: RelevanceScorer::default(),
            sink,
            cancel: CancelHandle::new(),
            title_match_threshold: crate::DEFAULT_TITLE_MATCH_THRESHOLD,
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Fails with `Cancelled` once the caller cancelled or the sink closed.
    pub fn ensure_live(&self) -> Result<()> {
        if self.cancel.is_cancelled() || self.sink.is_closed() {
            return Err(ExploreError::Cancelled);
        }
        Ok(())
    }

    pub async fn emit(&self, message: StreamMessage) -> Result<()> {
        self.sink.send(message).await?;
        Ok(())
    }

    /// Chunk embeddings for `paper`. Stored vectors are used as is; chunks
    /// without one are embedded now, and chunks with blank text are skipped.
    pub async fn paper_embeddings(&self, paper: &Paper) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(paper.chunks.len());
        for chunk in &paper.chunks {
            match &chunk.embedding {
                Some(embedding) if !embedding.is_empty() => embeddings.push(embedding.clone()),
                _ if chunk.text.trim().is_empty() => continue,
                _ => {
                    self.ensure_live()?;
                    embeddings.push(self.embedder.embed(&chunk.text).await?);
                }
            }
        }
        Ok(embeddings)
    }

    /// Relevance of `target` to the root, computed at most once per pair.
    pub async fn relevance(&self, root: &RootPaper, target: &Paper) -> Result<ScoredPair> {
        self.ensure_live()?;
        self.scores
            .get_or_compute(&root.id, &target.id, RelationshipType::Citation, move || async move {
                let root_paper = root
                    .paper
                    .as_ref()
                    .ok_or_else(|| ExploreError::NotFound(root.id.clone()))?;
                let root_embeddings = self.paper_embeddings(root_paper).await?;
                let target_embeddings = self.paper_embeddings(target).await?;
                debug!(
                    "Scoring {} chunks against {} chunks",
                    root_embeddings.len(),
                    target_embeddings.len()
                );
                Ok(self.scorer.score(&root_embeddings, &target_embeddings))
            })
            .await
    }
}
