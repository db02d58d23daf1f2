//! Citation exploration engine.

pub mod context;
pub mod frontier;
pub mod phases;
pub mod score_cache;
pub mod scoring;
pub mod session;

pub use context::{CancelHandle, ExplorerContext, RootPaper};
pub use frontier::{BestScoreFrontier, EmptyFrontier, FifoFrontier, Frontier, LifoFrontier, TraversalOrder};
pub use phases::{DownwardExplorer, ExploredSet, PhaseBounds, PhaseState, PhaseStats, UpwardExplorer};
pub use score_cache::{ScoreCache, ScoreCacheStats, ScoredPair};
pub use scoring::{RelevanceScorer, clamp_score, cosine_similarity};
pub use session::{ExplorationOutcome, ExplorationSession, ExplorationStats};
