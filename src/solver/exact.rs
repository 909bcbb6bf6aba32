use log::{debug, info, warn};

use crate::config::IdentifierSet;
use crate::errors::{FilterCalcError, Result};
use crate::filter::{pass_count, Filter};
use crate::partition::{materialize, SetPartitions};

use super::{CancelToken, FilterSolver, SearchStats, SearchStatus, Solution};

/// Exhaustive search over every partition of the identifiers.
///
/// The first partition reaching the minimal cost wins, so repeated runs on
/// the same input return the same solution.
#[derive(Debug, Clone, Default)]
pub struct ExactSolver {
    cancel: CancelToken,
}

impl ExactSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(cancel: CancelToken) -> Self {
        Self { cancel }
    }
}

// per group AND / OR reductions of one assignment, reused between partitions
struct GroupAccumulator {
    and: Vec<u32>,
    or: Vec<u32>,
    len: Vec<usize>,
}

impl GroupAccumulator {
    fn new(k: usize) -> Self {
        Self {
            and: vec![u32::MAX; k],
            or: vec![0; k],
            len: vec![0; k],
        }
    }

    fn cost(&mut self, ids: &[u32], assignment: &[usize]) -> u64 {
        self.and.fill(u32::MAX);
        self.or.fill(0);
        self.len.fill(0);
        for (&id, &group) in ids.iter().zip(assignment) {
            self.and[group] &= id;
            self.or[group] |= id;
            self.len[group] += 1;
        }
        (0..self.len.len())
            .map(|g| {
                let filter = Filter::new(self.or[g] ^ self.and[g], self.and[g]);
                pass_count(&filter, self.len[g])
            })
            .sum()
    }
}

impl FilterSolver for ExactSolver {
    fn name(&self) -> &str {
        "exact"
    }

    fn solve(&mut self, ids: &IdentifierSet, filter_count: usize) -> Result<Solution> {
        ids.check_filter_count(filter_count)?;
        let mut partitions = SetPartitions::new(ids.ids().to_vec(), filter_count)?;
        info!(
            "exact search: {} identifiers, {} filters, {} bit, {} partitions",
            ids.len(),
            filter_count,
            ids.width(),
            partitions.count_total()
        );

        let mut accumulator = GroupAccumulator::new(filter_count);
        let mut best_cost = ids.max_cost(filter_count);
        let mut best_assignment: Option<Vec<usize>> = None;
        let mut stats = SearchStats::default();
        let mut status = SearchStatus::Completed;

        while let Some(assignment) = partitions.next_assignment() {
            let cost = accumulator.cost(ids.ids(), assignment);
            stats.evaluated += 1;
            if cost < best_cost {
                debug!("partition {} improves cost {best_cost} -> {cost}", stats.evaluated);
                best_cost = cost;
                best_assignment = Some(assignment.to_vec());
                stats.improvements += 1;
            }
            if self.cancel.is_cancelled() {
                warn!("exact search interrupted after {} partitions", stats.evaluated);
                status = SearchStatus::Interrupted;
                break;
            }
        }

        let assignment = best_assignment.ok_or_else(|| {
            FilterCalcError::invalid_argument("no partition of the identifiers was evaluated")
        })?;
        let groups = materialize(ids.ids(), &assignment, filter_count);
        let solution = Solution::from_groups(ids.width(), groups, status, stats);
        info!(
            "exact search finished: cost {} after {} partitions",
            solution.cost(),
            stats.evaluated
        );
        Ok(solution)
    }
}
