
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use thiserror::Error;

use crate::core::models::FrontierEntry;


#[derive(Debug, Error, PartialEq, Eq)]
#[error("Pop from an empty frontier")]
pub struct EmptyFrontier;

/// Decides which discovered-but-unexpanded paper is processed next.
///
/// Callers must check [`Frontier::is_empty`] before popping; the traversal
/// loop terminates on it.
pub trait Frontier: Send {
    fn insert(&mut self, entry: FrontierEntry);

    fn pop(&mut self) -> Result<FrontierEntry, EmptyFrontier>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TraversalOrder {
    /// Breadth-first: oldest entry first.
    #[default]
    #[serde(alias = "bfs")]
    #[strum(to_string = "fifo", serialize = "bfs")]
    Fifo,
    /// Depth-first: newest entry first.
    #[serde(alias = "dfs")]
    #[strum(to_string = "lifo", serialize = "dfs")]
    Lifo,
    /// Highest score first, ties in insertion order.
    #[serde(alias = "best_score_first")]
    #[strum(to_string = "best_first", serialize = "best_score_first")]
    BestFirst,
}

impl TraversalOrder {
    pub fn new_frontier(self) -> Box<dyn Frontier> {
        match self {
            Self::Fifo => Box::new(FifoFrontier::default()),
            Self::Lifo => Box::new(LifoFrontier::default()),
            Self::BestFirst => Box::new(BestScoreFrontier::default()),
        }
    }
}


#[derive(Debug, Default)]
pub struct FifoFrontier {
    queue: VecDeque<FrontierEntry>,
}

impl Frontier for FifoFrontier {
    fn insert(&mut self, entry: FrontierEntry) {
        self.queue.push_back(entry);
    }

    fn pop(&mut self) -> Result<FrontierEntry, EmptyFrontier> {
        self.queue.pop_front().ok_or(EmptyFrontier)
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}


#[derive(Debug, Default)]
pub struct LifoFrontier {
    stack: Vec<FrontierEntry>,
}

impl Frontier for LifoFrontier {
    fn insert(&mut self, entry: FrontierEntry) {
        self.stack.push(entry);
    }

    fn pop(&mut self) -> Result<FrontierEntry, EmptyFrontier> {
        self.stack.pop().ok_or(EmptyFrontier)
    }

    fn len(&self) -> usize {
        self.stack.len()
    }
}

#[derive(Debug)]
struct Ranked {
    seq: u64,
    entry: FrontierEntry,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    // Max-heap: higher score wins, then the earlier insertion.
    fn cmp(&self, other: &Self) -> Ordering {
        self.entry
            .score
            .total_cmp(&other.entry.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}


#[derive(Debug, Default)]
pub struct BestScoreFrontier {
    heap: BinaryHeap<Ranked>,
    next_seq: u64,
}

impl Frontier for BestScoreFrontier {
    fn insert(&mut self, entry: FrontierEntry) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Ranked { seq, entry });
    }

    fn pop(&mut self) -> Result<FrontierEntry, EmptyFrontier> {
        self.heap.pop().map(|ranked| ranked.entry).ok_or(EmptyFrontier)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, score: f64) -> FrontierEntry {
        FrontierEntry {
            id: id.to_string(),
            title: format!("Paper {}", id),
            score,
            depth: 1,
        }
    }

    fn drain(frontier: &mut dyn Frontier) -> Vec<String> {
        let mut ids = Vec::new();
        while !frontier.is_empty() {
            ids.push(frontier.pop().unwrap().id);
        }
        ids
    }

    fn fill(order: TraversalOrder) -> Box<dyn Frontier> {
        let mut frontier = order.new_frontier();
        frontier.insert(entry("a", 0.2));
        frontier.insert(entry("b", 0.9));
        frontier.insert(entry("c", 0.5));
        frontier.insert(entry("d", 0.9));
        frontier
    }

    #[test]
    fn test_fifo_order() {
        let mut frontier = fill(TraversalOrder::Fifo);
        assert_eq!(frontier.len(), 4);
        assert_eq!(drain(frontier.as_mut()), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_lifo_order() {
        let mut frontier = fill(TraversalOrder::Lifo);
        assert_eq!(drain(frontier.as_mut()), vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn test_best_first_order_is_stable_on_ties() {
        let mut frontier = fill(TraversalOrder::BestFirst);
        assert_eq!(drain(frontier.as_mut()), vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn test_best_first_interleaved_inserts() {
        let mut frontier = BestScoreFrontier::default();
        frontier.insert(entry("x", 0.4));
        frontier.insert(entry("y", 0.4));
        assert_eq!(frontier.pop().unwrap().id, "x");
        frontier.insert(entry("z", 0.4));
        frontier.insert(entry("w", 0.8));
        assert_eq!(drain(&mut frontier), vec!["w", "y", "z"]);
    }

    #[test]
    fn test_pop_empty_is_an_error() {
        for order in [TraversalOrder::Fifo, TraversalOrder::Lifo, TraversalOrder::BestFirst] {
            let mut frontier = order.new_frontier();
            assert!(frontier.is_empty());
            assert_eq!(frontier.pop(), Err(EmptyFrontier));
        }
    }

    #[test]
    fn test_order_parsing() {
        assert_eq!("fifo".parse::<TraversalOrder>().unwrap(), TraversalOrder::Fifo);
        assert_eq!("dfs".parse::<TraversalOrder>().unwrap(), TraversalOrder::Lifo);
        assert_eq!("best_first".parse::<TraversalOrder>().unwrap(), TraversalOrder::BestFirst);
        assert!("random".parse::<TraversalOrder>().is_err());

        let name: &'static str = TraversalOrder::BestFirst.into();
        assert_eq!(name, "best_first");
        assert_eq!(
            serde_json::from_str::<TraversalOrder>("\"bfs\"").unwrap(),
            TraversalOrder::Fifo
        );
    }
}
