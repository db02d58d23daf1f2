//! Downward and upward citation walks.
//!
//! Both phases share one work-list driver ([`walker::walk`]); they differ
//! only in where neighbors come from and which way links point.

pub mod downward;
pub mod upward;
pub mod walker;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Serialize;

use super::context::ExplorerContext;
use super::frontier::Frontier;
use crate::core::error::Result;
use crate::core::events::Phase;
use crate::core::models::GraphLink;

pub use downward::DownwardExplorer;
pub use upward::UpwardExplorer;


pub type ExploredSet = HashSet<String>;


#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseStats {
    pub expanded: u64,
    pub scores_computed: u64,
    pub cache_hits: u64,
    pub unresolved_references: u64,
    pub missing_papers: u64,
    pub isolated_failures: u64,
    pub depth_cutoffs: u64,
}

/// Explored set, frontier and counters owned by one phase of one session.
pub struct PhaseState {
    pub explored: ExploredSet,
    pub frontier: Box<dyn Frontier>,
    pub stats: PhaseStats,
}

impl PhaseState {
    pub fn new(frontier: Box<dyn Frontier>) -> Self {
        Self::seeded(frontier, ExploredSet::new())
    }

    pub fn seeded(frontier: Box<dyn Frontier>, explored: ExploredSet) -> Self {
        Self {
            explored,
            frontier,
            stats: PhaseStats::default(),
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseBounds {
    pub max_depth: u32,
    pub threshold: f64,
}

/// Where a phase finds the neighbors of an expanded paper.
#[async_trait]
pub trait NeighborSource: Send + Sync {
    fn phase(&self) -> Phase;

    /// Stored ids adjacent to `paper_id`, deduplicated, in store order.
    async fn neighbors(
        &self,
        ctx: &ExplorerContext,
        paper_id: &str,
        stats: &mut PhaseStats,
    ) -> Result<Vec<String>>;

    fn link(&self, expanded_id: &str, neighbor_id: &str) -> GraphLink;
}

pub(crate) fn dedup_in_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
