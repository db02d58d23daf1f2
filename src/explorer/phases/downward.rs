
use std::collections::HashSet;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info};

use super::walker::Walker;
use super::{NeighborSource, PhaseBounds, PhaseState, PhaseStats, dedup_in_order};
use crate::core::error::Result;
use crate::core::events::Phase;
use crate::core::models::GraphLink;
use crate::explorer::context::{ExplorerContext, RootPaper};

/// Walks outgoing references: what the expanded paper cites.
///
/// Reference lists hold raw titles; each is resolved to a stored paper by
/// fuzzy title match and dropped when nothing matches.
#[derive(Debug, Default, Clone, Copy)]
pub struct DownwardExplorer;

impl DownwardExplorer {
    pub fn new() -> Self {
        Self
    }

    pub async fn explore(
        &self,
        ctx: &ExplorerContext,
        root: &RootPaper,
        start_id: &str,
        state: &mut PhaseState,
        bounds: PhaseBounds,
        depth: u32,
    ) -> Result<HashSet<String>> {
        info!(
            "Downward exploration from {} (max_depth={}, threshold={})",
            crate::safe_truncate(start_id, 24),
            bounds.max_depth,
            bounds.threshold
        );
        let start_score = if start_id == root.id {
            1.0
        } else {
            ctx.scores.lookup(&root.id, start_id).await?.unwrap_or(0.0)
        };

        let discovered = Walker::new(self, ctx, root, bounds)
            .run(state, start_id, start_score, depth)
            .await?;
        info!(
            "Downward exploration done: {} discovered, {} expanded",
            discovered.len(),
            state.stats.expanded
        );
        Ok(discovered)
    }
}

#[async_trait]
impl NeighborSource for DownwardExplorer {
    fn phase(&self) -> Phase {
        Phase::Downward
    }

    async fn neighbors(
        &self,
        ctx: &ExplorerContext,
        paper_id: &str,
        stats: &mut PhaseStats,
    ) -> Result<Vec<String>> {
        ctx.ensure_live()?;
        let titles = ctx.papers.outgoing_reference_titles(paper_id).await?;

        ctx.ensure_live()?;
        let lookups = titles
            .iter()
            .map(|title| ctx.papers.resolve_title_to_id(title, ctx.title_match_threshold));
        let results = join_all(lookups).await;

        let mut resolved = Vec::with_capacity(titles.len());
        for (title, result) in titles.iter().zip(results) {
            match result? {
                Some(id) => resolved.push(id),
                None => {
                    debug!("Unresolved reference: {}", crate::safe_truncate_ellipsis(title, 60));
                    stats.unresolved_references += 1;
                }
            }
        }
        debug!(
            "{} of {} references resolved for {}",
            resolved.len(),
            titles.len(),
            crate::safe_truncate(paper_id, 24)
        );
        Ok(dedup_in_order(resolved))
    }

    /// Cited paper points back at the one that cites it.
    fn link(&self, expanded_id: &str, neighbor_id: &str) -> GraphLink {
        GraphLink::new(neighbor_id, expanded_id)
    }
}
