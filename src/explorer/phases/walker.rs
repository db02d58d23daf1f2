
use std::collections::HashSet;

use tracing::{debug, error, warn};

use super::{NeighborSource, PhaseBounds, PhaseState};
use crate::core::config::FailurePolicy;
use crate::core::error::{ExploreError, Result};
use crate::core::events::StreamMessage;
use crate::core::models::{FrontierEntry, GraphNode, Paper};
use crate::explorer::context::{ExplorerContext, RootPaper};
use crate::explorer::score_cache::ScoredPair;

/// Work-list traversal shared by both phases.
///
/// A paper is expanded at most once per phase: it enters the explored set
/// before its neighbors are fetched. Neighbors scoring below the threshold
/// are marked explored as soon as they are scored, so they show up in one
/// batch and are never expanded.
pub struct Walker<'a> {
    source: &'a dyn NeighborSource,
    ctx: &'a ExplorerContext,
    root: &'a RootPaper,
    bounds: PhaseBounds,
}

impl<'a> Walker<'a> {
    pub fn new(
        source: &'a dyn NeighborSource,
        ctx: &'a ExplorerContext,
        root: &'a RootPaper,
        bounds: PhaseBounds,
    ) -> Self {
        Self {
            source,
            ctx,
            root,
            bounds,
        }
    }

    /// Expands `start_id` at `depth`, then drains the frontier. Returns every
    /// id discovered along the way, `start_id` included when it was expanded.
    pub async fn run(
        &self,
        state: &mut PhaseState,
        start_id: &str,
        start_score: f64,
        depth: u32,
    ) -> Result<HashSet<String>> {
        let mut discovered = HashSet::new();

        if depth > self.bounds.max_depth {
            self.depth_cutoff(state).await?;
            return Ok(discovered);
        }
        if state.explored.contains(start_id) {
            debug!("{} already explored", crate::safe_truncate(start_id, 24));
            return Ok(discovered);
        }

        self.expand(state, start_id, start_score, depth, &mut discovered).await?;

        while !state.frontier.is_empty() {
            self.ctx.ensure_live()?;
            let entry = state.frontier.pop()?;
            if state.explored.contains(&entry.id) {
                continue;
            }
            if entry.depth > self.bounds.max_depth {
                self.depth_cutoff(state).await?;
                continue;
            }
            debug!(
                "Popped {} (score {:.3}, depth {})",
                crate::safe_truncate(&entry.id, 24),
                entry.score,
                entry.depth
            );
            self.expand(state, &entry.id, entry.score, entry.depth, &mut discovered).await?;
        }

        Ok(discovered)
    }

    async fn expand(
        &self,
        state: &mut PhaseState,
        paper_id: &str,
        score: f64,
        depth: u32,
        discovered: &mut HashSet<String>,
    ) -> Result<()> {
        state.explored.insert(paper_id.to_string());
        self.ctx.ensure_live()?;

        let paper = match self.ctx.papers.get_paper(paper_id).await {
            Ok(Some(paper)) => paper,
            Ok(None) => {
                warn!("Paper {} not found, skipping", crate::safe_truncate(paper_id, 24));
                state.stats.missing_papers += 1;
                return Ok(());
            }
            Err(e) => return self.recover(state, e.into()).await,
        };

        let neighbors = match self.source.neighbors(self.ctx, paper_id, &mut state.stats).await {
            Ok(neighbors) => neighbors,
            Err(e) => return self.recover(state, e).await,
        };

        state.stats.expanded += 1;
        discovered.insert(paper_id.to_string());

        let mut nodes = vec![GraphNode {
            id: paper.id.clone(),
            title: paper.title.clone(),
            score,
        }];
        let mut links = Vec::new();
        let mut children = Vec::new();

        for neighbor_id in neighbors {
            if neighbor_id == self.root.id || neighbor_id == paper_id || state.explored.contains(&neighbor_id) {
                continue;
            }
            let Some((target, scored)) = self.score_neighbor(state, &neighbor_id).await? else {
                continue;
            };

            if scored.cached {
                state.stats.cache_hits += 1;
            } else {
                state.stats.scores_computed += 1;
            }
            if scored.score < self.bounds.threshold {
                state.explored.insert(neighbor_id.clone());
            }

            links.push(self.source.link(paper_id, &neighbor_id));
            nodes.push(GraphNode {
                id: neighbor_id.clone(),
                title: target.title.clone(),
                score: scored.score,
            });
            children.push(FrontierEntry {
                id: neighbor_id.clone(),
                title: target.title,
                score: scored.score,
                depth: depth + 1,
            });
            discovered.insert(neighbor_id);
        }

        debug!(
            "{} batch for {}: {} nodes, {} links",
            self.source.phase(),
            crate::safe_truncate(paper_id, 24),
            nodes.len(),
            links.len()
        );
        self.ctx
            .emit(StreamMessage::batch(self.source.phase(), nodes, links))
            .await?;

        for child in children {
            state.frontier.insert(child);
        }
        Ok(())
    }

    async fn score_neighbor(
        &self,
        state: &mut PhaseState,
        neighbor_id: &str,
    ) -> Result<Option<(Paper, ScoredPair)>> {
        self.ctx.ensure_live()?;
        let target = match self.ctx.papers.get_paper(neighbor_id).await {
            Ok(Some(target)) => target,
            Ok(None) => {
                warn!("Neighbor {} not found, skipping", crate::safe_truncate(neighbor_id, 24));
                state.stats.missing_papers += 1;
                return Ok(None);
            }
            Err(e) => return self.recover(state, e.into()).await.map(|_| None),
        };

        match self.ctx.relevance(self.root, &target).await {
            Ok(scored) => Ok(Some((target, scored))),
            Err(e) => self.recover(state, e).await.map(|_| None),
        }
    }

    /// Decides whether a failure stays local to the current branch.
    async fn recover(&self, state: &mut PhaseState, err: ExploreError) -> Result<()> {
        match err {
            ExploreError::NotFound(id) => {
                warn!("{} not found, skipping", crate::safe_truncate(&id, 24));
                state.stats.missing_papers += 1;
                Ok(())
            }
            err if err.is_session_fatal() => Err(err),
            err => match self.ctx.failure_policy {
                FailurePolicy::AbortSession => Err(err),
                FailurePolicy::IsolateBranch => {
                    error!("{} exploration branch failed: {}", self.source.phase(), err);
                    state.stats.isolated_failures += 1;
                    self.ctx.emit(StreamMessage::error(err.to_string())).await
                }
            },
        }
    }

    async fn depth_cutoff(&self, state: &mut PhaseState) -> Result<()> {
        state.stats.depth_cutoffs += 1;
        self.ctx.emit(StreamMessage::max_depth_reached()).await
    }
}
