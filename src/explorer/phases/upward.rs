
use std::collections::HashSet;

use async_trait::async_trait;
use tracing::info;

use super::walker::Walker;
use super::{NeighborSource, PhaseBounds, PhaseState, PhaseStats, dedup_in_order};
use crate::core::error::Result;
use crate::core::events::Phase;
use crate::core::models::GraphLink;
use crate::explorer::context::{ExplorerContext, RootPaper};

/// Walks incoming citations: who cites the expanded paper.
#[derive(Debug, Default, Clone, Copy)]
pub struct UpwardExplorer;

impl UpwardExplorer {
    pub fn new() -> Self {
        Self
    }

    /// `start_score` is the qualified node's relevance to the root.
    pub async fn explore(
        &self,
        ctx: &ExplorerContext,
        root: &RootPaper,
        start_id: &str,
        start_score: f64,
        state: &mut PhaseState,
        bounds: PhaseBounds,
    ) -> Result<HashSet<String>> {
        info!(
            "Upward exploration from {} (max_depth={})",
            crate::safe_truncate(start_id, 24),
            bounds.max_depth
        );
        let discovered = Walker::new(self, ctx, root, bounds)
            .run(state, start_id, start_score, 0)
            .await?;
        info!(
            "Upward exploration from {} done: {} discovered",
            crate::safe_truncate(start_id, 24),
            discovered.len()
        );
        Ok(discovered)
    }
}

#[async_trait]
impl NeighborSource for UpwardExplorer {
    fn phase(&self) -> Phase {
        Phase::Upward
    }

    async fn neighbors(
        &self,
        ctx: &ExplorerContext,
        paper_id: &str,
        _stats: &mut PhaseStats,
    ) -> Result<Vec<String>> {
        ctx.ensure_live()?;
        let citers = ctx.papers.incoming_citers(paper_id).await?;
        Ok(dedup_in_order(citers))
    }

    /// Expanded paper points at the paper that cites it.
    fn link(&self, expanded_id: &str, neighbor_id: &str) -> GraphLink {
        GraphLink::new(expanded_id, neighbor_id)
    }
}
