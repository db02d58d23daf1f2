
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use super::context::{CancelHandle, ExplorerContext, RootPaper};
use super::frontier::TraversalOrder;
use super::phases::{DownwardExplorer, ExploredSet, PhaseBounds, PhaseState, PhaseStats, UpwardExplorer};
use super::score_cache::ScoreCache;
use super::scoring::RelevanceScorer;
use crate::core::config::ExplorerConfig;
use crate::core::error::{ExploreError, Result};
use crate::core::events::{StreamMessage, StreamSink};
use crate::llm::embeddings::EmbeddingProvider;
use crate::store::PaperStore;

/// How long the final error status may wait on a backpressured stream.
const ERROR_REPORT_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExplorationStats {
    pub downward: PhaseStats,
    pub upward: PhaseStats,
    pub duration_ms: u64,
}

/// What one session found. Sets are ordered so the outcome prints stably.
#[derive(Debug, Clone, Serialize)]
pub struct ExplorationOutcome {
    pub session_id: Uuid,
    pub downward_discovered: BTreeSet<String>,
    pub upward_discovered: BTreeSet<String>,
    /// Downward discoveries at or above the threshold, best first.
    pub qualified: Vec<String>,
    pub stats: ExplorationStats,
}

/// Downward then upward exploration around one root paper.
///
/// Explored sets and frontiers live only as long as one `run`; the score
/// cache is the only state shared with other sessions.
pub struct ExplorationSession {
    id: Uuid,
    config: ExplorerConfig,
    ctx: ExplorerContext,
}

impl ExplorationSession {
    pub fn new(
        config: ExplorerConfig,
        papers: Arc<dyn PaperStore>,
        scores: Arc<ScoreCache>,
        embedder: Arc<dyn EmbeddingProvider>,
        sink: Arc<dyn StreamSink>,
    ) -> Self {
        let mut ctx = ExplorerContext::new(papers, scores, embedder, sink);
        ctx.scorer = RelevanceScorer::new(config.alpha);
        ctx.title_match_threshold = config.title_match_threshold;
        ctx.failure_policy = config.failure_policy;

        Self {
            id: Uuid::new_v4(),
            config,
            ctx,
        }
    }

    /// Shares an existing cancel handle, e.g. one owned by the transport.
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.ctx.cancel = cancel;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.ctx.cancel.clone()
    }

    /// Runs with depth, threshold and order from the session config.
    /// `start_id` defaults to the root.
    pub async fn run_with_defaults(&self, root_id: &str, start_id: Option<&str>) -> Result<ExplorationOutcome> {
        self.run(
            root_id,
            start_id.unwrap_or(root_id),
            self.config.max_depth,
            self.config.threshold,
            self.config.traversal_order,
        )
        .await
    }

    /// Explores downward from `start_id`, then upward from every qualified
    /// discovery. Any error that ends the session is reported once on the
    /// stream as an error status, unless the stream itself is what failed.
    pub async fn run(
        &self,
        root_id: &str,
        start_id: &str,
        max_depth: u32,
        threshold: f64,
        order: TraversalOrder,
    ) -> Result<ExplorationOutcome> {
        let span = info_span!("exploration", session = %self.id, root = %crate::safe_truncate(root_id, 24));
        let started = Instant::now();

        let work = self
            .explore(root_id, start_id, max_depth, threshold, order, started)
            .instrument(span);
        let result = match self.config.session_timeout() {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(result) => result,
                Err(_) => Err(ExploreError::Timeout(limit.as_millis() as u64)),
            },
            None => work.await,
        };

        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(
                    "Exploration {} failed after {}ms: {}",
                    self.id,
                    started.elapsed().as_millis(),
                    e
                );
                if !matches!(e, ExploreError::Transport(_) | ExploreError::Cancelled) {
                    let report = self.ctx.sink.send(StreamMessage::error(e.to_string()));
                    match tokio::time::timeout(ERROR_REPORT_GRACE, report).await {
                        Ok(Ok(())) => {}
                        Ok(Err(send_err)) => error!("Could not report failure to client: {}", send_err),
                        Err(_) => warn!("Client not reading; dropped failure report for {}", self.id),
                    }
                }
                Err(e)
            }
        }
    }

    async fn explore(
        &self,
        root_id: &str,
        start_id: &str,
        max_depth: u32,
        threshold: f64,
        order: TraversalOrder,
        started: Instant,
    ) -> Result<ExplorationOutcome> {
        let ctx = &self.ctx;
        ctx.ensure_live()?;
        info!(
            "Starting exploration root={} start={} max_depth={} threshold={} order={}",
            crate::safe_truncate(root_id, 24),
            crate::safe_truncate(start_id, 24),
            max_depth,
            threshold,
            <&'static str>::from(order)
        );

        let root = RootPaper::fetch(ctx.papers.as_ref(), root_id).await?;

        let mut downward = PhaseState::new(order.new_frontier());
        let downward_discovered = DownwardExplorer::new()
            .explore(ctx, &root, start_id, &mut downward, PhaseBounds { max_depth, threshold }, 0)
            .await?;

        let qualified = self.qualified(root_id, &downward_discovered, threshold).await?;
        info!(
            "{} of {} downward discoveries qualify for upward exploration",
            qualified.len(),
            downward_discovered.len()
        );

        let qualified_ids: HashSet<&str> = qualified.iter().map(|(id, _)| id.as_str()).collect();
        let seed: ExploredSet = downward_discovered
            .iter()
            .filter(|id| !qualified_ids.contains(id.as_str()))
            .cloned()
            .collect();

        let mut upward = PhaseState::seeded(order.new_frontier(), seed);
        let upward_bounds = PhaseBounds {
            max_depth: self.config.upward_max_depth,
            threshold,
        };
        let mut upward_discovered = HashSet::new();
        for (id, score) in &qualified {
            ctx.ensure_live()?;
            let found = UpwardExplorer::new()
                .explore(ctx, &root, id, *score, &mut upward, upward_bounds)
                .await?;
            upward_discovered.extend(found);
        }

        let stats = ExplorationStats {
            downward: downward.stats,
            upward: upward.stats,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "Exploration completed in {}ms: {} downward, {} upward, {} scores computed, {} cache hits",
            stats.duration_ms,
            downward_discovered.len(),
            upward_discovered.len(),
            stats.downward.scores_computed + stats.upward.scores_computed,
            stats.downward.cache_hits + stats.upward.cache_hits
        );

        Ok(ExplorationOutcome {
            session_id: self.id,
            downward_discovered: downward_discovered.into_iter().collect(),
            upward_discovered: upward_discovered.into_iter().collect(),
            qualified: qualified.into_iter().map(|(id, _)| id).collect(),
            stats,
        })
    }

    /// Non-root discoveries whose cached score reaches `threshold`, best first.
    async fn qualified(
        &self,
        root_id: &str,
        discovered: &HashSet<String>,
        threshold: f64,
    ) -> Result<Vec<(String, f64)>> {
        let mut qualified = Vec::new();
        for id in discovered {
            if id == root_id {
                continue;
            }
            if let Some(score) = self.ctx.scores.lookup(root_id, id).await? {
                if score >= threshold {
                    qualified.push((id.clone(), score));
                }
            }
        }
        qualified.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(qualified)
    }
}
