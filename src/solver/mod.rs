//! Strategies distributing identifiers over a fixed number of filters.
//!
//! [`ExactSolver`] scores every partition and is optimal but only feasible
//! while S(n, k) stays small. [`SimulatedAnnealing`] explores the same space
//! with random moves and returns the best partition it met, which is not
//! guaranteed to be optimal.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use serde::Serialize;

use crate::config::IdentifierSet;
use crate::errors::Result;
use crate::filter::{Filter, FilterBank};

pub mod annealing;
pub mod exact;

pub use annealing::SimulatedAnnealing;
pub use exact::ExactSolver;

pub trait FilterSolver {
    fn name(&self) -> &str;

    /// Distributes `ids` over `filter_count` filters.
    fn solve(&mut self, ids: &IdentifierSet, filter_count: usize) -> Result<Solution>;
}

/// Cooperative cancellation flag shared between a running solver and its
/// caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// The search ran its whole course.
    Completed,
    /// The search was cancelled; the solution is the best one seen so far.
    Interrupted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Partitions (exact) or neighbours (annealing) scored.
    pub evaluated: u64,
    /// Times the best solution was replaced.
    pub improvements: u64,
}

/// Best partition found by a solver together with its filters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    width: u32,
    groups: Vec<Vec<u32>>,
    filters: Vec<Filter>,
    pass_counts: Vec<u64>,
    cost: u64,
    status: SearchStatus,
    stats: SearchStats,
}

impl Solution {
    pub fn from_groups(
        width: u32,
        groups: Vec<Vec<u32>>,
        status: SearchStatus,
        stats: SearchStats,
    ) -> Self {
        let (filters, pass_counts, cost) = FilterBank::synthesize(&groups).into_parts();
        Self {
            width,
            groups,
            filters,
            pass_counts,
            cost,
            status,
            stats,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn groups(&self) -> &[Vec<u32>] {
        &self.groups
    }
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }
    pub fn pass_counts(&self) -> &[u64] {
        &self.pass_counts
    }
    /// Sum of the pass-through counts of all filters.
    pub fn cost(&self) -> u64 {
        self.cost
    }
    pub fn status(&self) -> SearchStatus {
        self.status
    }
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    pub fn filter_patterns(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.pattern(self.width)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn solution_synthesizes_filters() {
        let solution = Solution::from_groups(
            11,
            vec![vec![0x3F, 0x15], vec![0x2]],
            SearchStatus::Completed,
            SearchStats::default(),
        );
        assert_eq!(solution.cost(), 6);
        assert_eq!(solution.pass_counts(), &[6, 0]);
        assert_eq!(solution.filter_patterns(), vec!["00000X1X1X1", "00000000010"]);
    }
}
