//! Simulated annealing over partitions of the identifier set.
//!
//! The search starts from the sorted identifiers dealt into contiguous chunks
//! and moves one identifier at a time between two groups. Worse neighbours
//! are accepted with probability
//! `exp(-(delta / max_cost) / temperature / temperature)`; the temperature
//! enters squared, which makes the search settle considerably faster than the
//! textbook Metropolis rule. Results are best-effort: nothing guarantees the
//! optimum is reached within the iteration budget.

use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::config::{AnnealingSchedule, IdentifierSet};
use crate::errors::Result;
use crate::filter::{synthesize, synthesize_from};

use super::{CancelToken, FilterSolver, SearchStats, SearchStatus, Solution};

/// Moves the identifier at `index` of group `source` to group `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Move {
    source: usize,
    target: usize,
    index: usize,
}

/// Scored outcome of a move, before it is applied.
#[derive(Debug, Clone, Copy)]
struct Neighbour {
    mv: Move,
    source_pass: u64,
    target_pass: u64,
    cost: u64,
}

/// Mutable state of one annealing run.
#[derive(Debug, Clone)]
struct AnnealingState {
    groups: Vec<Vec<u32>>,
    pass_counts: Vec<u64>,
    cost: u64,
    temperature: f64,
}

impl AnnealingState {
    fn new(groups: Vec<Vec<u32>>, temperature: f64) -> Self {
        let pass_counts: Vec<u64> = groups.iter().map(|g| synthesize(g).1).collect();
        let cost = pass_counts.iter().sum();
        Self {
            groups,
            pass_counts,
            cost,
            temperature,
        }
    }

    /// Picks a random move that leaves no group empty.
    fn propose<R: Rng>(&self, rng: &mut R) -> Move {
        let k = self.groups.len();
        let source = loop {
            let candidate = rng.gen_range(0..k);
            if self.groups[candidate].len() >= 2 {
                break candidate;
            }
        };
        let target = loop {
            let candidate = rng.gen_range(0..k);
            if candidate != source {
                break candidate;
            }
        };
        let index = rng.gen_range(0..self.groups[source].len());
        Move {
            source,
            target,
            index,
        }
    }

    fn evaluate(&self, mv: Move) -> Neighbour {
        let moved = self.groups[mv.source][mv.index];
        let (_, source_pass) = synthesize_from(
            self.groups[mv.source]
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != mv.index)
                .map(|(_, &id)| id),
        );
        let (_, target_pass) = synthesize_from(
            self.groups[mv.target]
                .iter()
                .copied()
                .chain(std::iter::once(moved)),
        );
        let cost = self.cost - self.pass_counts[mv.source] - self.pass_counts[mv.target]
            + source_pass
            + target_pass;
        Neighbour {
            mv,
            source_pass,
            target_pass,
            cost,
        }
    }

    fn accepts<R: Rng>(&self, neighbour: &Neighbour, max_cost: f64, rng: &mut R) -> bool {
        if neighbour.cost <= self.cost {
            return true;
        }
        let delta = (neighbour.cost - self.cost) as f64 / max_cost;
        let probability = (-delta / self.temperature / self.temperature).exp();
        rng.gen::<f64>() < probability
    }

    fn apply(&mut self, neighbour: Neighbour) {
        let Move {
            source,
            target,
            index,
        } = neighbour.mv;
        let id = self.groups[source].remove(index);
        self.groups[target].push(id);
        self.pass_counts[source] = neighbour.source_pass;
        self.pass_counts[target] = neighbour.target_pass;
        self.cost = neighbour.cost;
    }
}

/// Sorts the identifiers and deals them into `k` contiguous chunks of
/// `ceil(n / k)`, leaving the remainder to the last chunks. A chunk is cut
/// short only where the full size would leave a later chunk empty.
fn initial_groups(ids: &[u32], k: usize) -> Vec<Vec<u32>> {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    let chunk_len = sorted.len().div_ceil(k);
    let mut rest = sorted.as_slice();
    (0..k)
        .map(|g| {
            let len = chunk_len.min(rest.len() - (k - g - 1));
            let (chunk, tail) = rest.split_at(len);
            rest = tail;
            chunk.to_vec()
        })
        .collect()
}

/// Cheapest partition seen so far.
#[derive(Debug, Clone)]
struct Incumbent {
    groups: Vec<Vec<u32>>,
    cost: u64,
}

/// Best-effort search for a cheap partition, see the module documentation.
#[derive(Debug, Clone)]
pub struct SimulatedAnnealing<R> {
    schedule: AnnealingSchedule,
    rng: R,
    cancel: CancelToken,
}

impl<R: Rng> SimulatedAnnealing<R> {
    pub fn new(schedule: AnnealingSchedule, rng: R) -> Self {
        Self {
            schedule,
            rng,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs one epoch from `start` and returns its final state, or `None`
    /// once the search is cancelled. The temperature is multiplied by the
    /// cooling factor after every `steps_per_cooling` steps.
    fn run_epoch(
        &mut self,
        epoch: u64,
        start: &AnnealingState,
        max_cost: f64,
        best: &mut Incumbent,
        stats: &mut SearchStats,
    ) -> Option<AnnealingState> {
        let schedule = self.schedule;
        let mut state = start.clone();
        for step in 0..schedule.iterations_per_epoch() {
            if self.cancel.is_cancelled() {
                return None;
            }
            let mv = state.propose(&mut self.rng);
            let neighbour = state.evaluate(mv);
            stats.evaluated += 1;
            if state.accepts(&neighbour, max_cost, &mut self.rng) {
                state.apply(neighbour);
            }
            if neighbour.cost < best.cost {
                // accepted unconditionally, so `state` holds the neighbour
                debug!("epoch {epoch} step {step}: cost {} -> {}", best.cost, neighbour.cost);
                best.cost = neighbour.cost;
                best.groups = state.groups.clone();
                stats.improvements += 1;
            }
            if (step + 1) % schedule.steps_per_cooling() == 0 {
                state.temperature *= schedule.cooling_factor();
            }
        }
        Some(state)
    }
}

impl SimulatedAnnealing<Xoshiro256PlusPlus> {
    /// Annealing driven by a deterministic generator seeded with `seed`.
    pub fn seeded(schedule: AnnealingSchedule, seed: u64) -> Self {
        Self::new(schedule, Xoshiro256PlusPlus::seed_from_u64(seed))
    }
}

impl<R: Rng> FilterSolver for SimulatedAnnealing<R> {
    fn name(&self) -> &str {
        "simulated-annealing"
    }

    fn solve(&mut self, ids: &IdentifierSet, filter_count: usize) -> Result<Solution> {
        ids.check_filter_count(filter_count)?;
        self.schedule.validate()?;
        let schedule = self.schedule;
        info!(
            "simulated annealing: {} identifiers, {} filters, {} bit, {} epochs of {} iterations ({} moves)",
            ids.len(),
            filter_count,
            ids.width(),
            schedule.epochs(),
            schedule.iterations_per_epoch(),
            schedule.total_iterations()
        );

        let start = AnnealingState::new(
            initial_groups(ids.ids(), filter_count),
            schedule.initial_temperature(),
        );
        let mut best = Incumbent {
            groups: start.groups.clone(),
            cost: start.cost,
        };
        let mut stats = SearchStats::default();
        let mut status = SearchStatus::Completed;

        // a single group or only singletons leave no move to make
        if filter_count == 1 || filter_count == ids.len() {
            debug!("no neighbouring partitions, keeping the initial one");
            return Ok(Solution::from_groups(ids.width(), best.groups, status, stats));
        }

        let max_cost = ids.max_cost(filter_count) as f64;
        for epoch in 0..schedule.epochs() {
            if self
                .run_epoch(epoch, &start, max_cost, &mut best, &mut stats)
                .is_none()
            {
                warn!("simulated annealing interrupted in epoch {epoch}");
                status = SearchStatus::Interrupted;
                break;
            }
        }

        let solution = Solution::from_groups(ids.width(), best.groups, status, stats);
        info!(
            "simulated annealing finished: cost {} after {} moves",
            solution.cost(),
            stats.evaluated
        );
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::mock::StepRng;

    use super::*;
    use crate::solver::ExactSolver;

    fn quick_schedule() -> AnnealingSchedule {
        AnnealingSchedule::new(1.0, 0.9, 500, 4)
    }

    /// Generator whose every `gen::<f64>()` yields `draw`.
    fn fixed_draw(draw: f64) -> StepRng {
        StepRng::new(((draw * (1u64 << 53) as f64) as u64) << 11, 0)
    }

    #[test]
    fn initial_groups_are_sorted_chunks() {
        assert_eq!(
            initial_groups(&[9, 1, 5, 3, 7, 2, 8, 4, 6], 4),
            vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8], vec![9]]
        );
        let ten: Vec<u32> = (1..=10).collect();
        let sizes: Vec<usize> = initial_groups(&ten, 4).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);
        let sizes: Vec<usize> = initial_groups(&ten, 3).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(
            initial_groups(&[4, 3, 2, 1], 2),
            vec![vec![1, 2], vec![3, 4]]
        );
        assert_eq!(initial_groups(&[3, 1, 2], 3), vec![vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn moves_never_empty_a_group() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut state = AnnealingState::new(vec![vec![1], vec![2, 3, 4], vec![5]], 1.0);
        for _ in 0..1000 {
            let mv = state.propose(&mut rng);
            assert!(state.groups[mv.source].len() >= 2);
            assert_ne!(mv.source, mv.target);
            let neighbour = state.evaluate(mv);
            state.apply(neighbour);
            assert!(state.groups.iter().all(|g| !g.is_empty()));
            let recomputed: u64 = state.groups.iter().map(|g| synthesize(g).1).sum();
            assert_eq!(state.cost, recomputed);
        }
        assert_eq!(state.groups.iter().map(Vec::len).sum::<usize>(), 5);
    }

    #[test]
    fn never_accepts_worse_when_frozen() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let mut state = AnnealingState::new(vec![vec![0x3F, 0x15], vec![0x2]], 1.0);
        state.temperature = 1e-200;
        let mv = Move {
            source: 0,
            target: 1,
            index: 1,
        };
        let worse = state.evaluate(mv);
        assert!(worse.cost > state.cost);
        assert!(!state.accepts(&worse, 4096.0, &mut rng));
    }

    #[test]
    fn acceptance_squares_the_temperature() {
        let mut state = AnnealingState::new(vec![vec![0x3F, 0x15], vec![0x2]], 0.05);
        let worse = state.evaluate(Move {
            source: 0,
            target: 1,
            index: 1,
        });
        assert_eq!((state.cost, worse.cost), (6, 14));

        // delta 8 / 4096 at T = 0.05: exp(-d / T) ~ 0.962, exp(-d / T^2) ~ 0.458
        let mut draw = fixed_draw(0.7);
        assert!((draw.gen::<f64>() - 0.7).abs() < 1e-12);
        assert!(!state.accepts(&worse, 4096.0, &mut fixed_draw(0.7)));
        assert!(state.accepts(&worse, 4096.0, &mut fixed_draw(0.4)));

        // above T = 1 squaring makes worse moves more likely instead
        // exp(-d / 2) ~ 0.99902, exp(-d / 4) ~ 0.99951
        state.temperature = 2.0;
        assert!(state.accepts(&worse, 4096.0, &mut fixed_draw(0.9993)));
        assert!(!state.accepts(&worse, 4096.0, &mut fixed_draw(0.9996)));
    }

    #[test]
    fn temperature_cools_per_window_and_resets_each_epoch() {
        let ids = [0x3F, 0x15, 0x2, 0x100, 0x101];
        for (iterations, expected) in [(9, 2.0), (10, 1.0), (25, 0.5), (30, 0.25)] {
            let schedule = AnnealingSchedule::new(2.0, 0.5, iterations, 2);
            let mut solver = SimulatedAnnealing::seeded(schedule, 5);
            let start = AnnealingState::new(initial_groups(&ids, 2), 2.0);
            let mut best = Incumbent {
                groups: start.groups.clone(),
                cost: start.cost,
            };
            let mut stats = SearchStats::default();
            for epoch in 0..2 {
                let Some(end) = solver.run_epoch(epoch, &start, 4096.0, &mut best, &mut stats)
                else {
                    panic!("epoch {epoch} was interrupted");
                };
                assert_eq!(end.temperature, expected);
            }
            assert_eq!(start.temperature, 2.0);
            assert_eq!(stats.evaluated, 2 * iterations);
        }
    }

    #[test]
    fn finds_known_optimum() {
        let ids = IdentifierSet::standard(vec![0x3F, 0x15, 0x2]).unwrap();
        let solution = SimulatedAnnealing::seeded(quick_schedule(), 42)
            .solve(&ids, 2)
            .unwrap();
        assert_eq!(solution.cost(), 6);
    }

    #[test]
    fn same_seed_same_result() {
        let ids =
            IdentifierSet::standard(vec![0x100, 0x101, 0x230, 0x231, 0x7F0, 0x012, 0x013, 0x555])
                .unwrap();
        let a = SimulatedAnnealing::seeded(quick_schedule(), 3).solve(&ids, 3).unwrap();
        let b = SimulatedAnnealing::seeded(quick_schedule(), 3).solve(&ids, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn never_beats_exact_search() {
        let ids = IdentifierSet::standard(vec![
            0x1A0, 0x1A1, 0x1A4, 0x300, 0x301, 0x0F0, 0x0F8, 0x6B1, 0x6B3, 0x045,
        ])
        .unwrap();
        for k in 2..=4 {
            let exact = ExactSolver::new().solve(&ids, k).unwrap();
            let heuristic = SimulatedAnnealing::seeded(quick_schedule(), k as u64)
                .solve(&ids, k)
                .unwrap();
            assert!(exact.cost() <= heuristic.cost());
            assert_eq!(heuristic.groups().len(), k);
        }
    }

    #[test]
    fn degenerate_filter_counts_skip_search() {
        let ids = IdentifierSet::standard(vec![0x7, 0x1, 0x4]).unwrap();
        let singletons = SimulatedAnnealing::seeded(quick_schedule(), 0)
            .solve(&ids, 3)
            .unwrap();
        assert_eq!(singletons.cost(), 0);
        assert_eq!(singletons.stats().evaluated, 0);

        let single = SimulatedAnnealing::seeded(quick_schedule(), 0)
            .solve(&ids, 1)
            .unwrap();
        assert_eq!(single.groups(), &[vec![0x1, 0x4, 0x7]]);
    }

    #[test]
    fn rejects_invalid_input() {
        let ids = IdentifierSet::standard(vec![1, 2, 3]).unwrap();
        let mut solver = SimulatedAnnealing::seeded(quick_schedule(), 0);
        assert!(solver.solve(&ids, 0).unwrap_err().is_invalid_argument());
        assert!(solver.solve(&ids, 4).unwrap_err().is_invalid_argument());

        let mut bad = SimulatedAnnealing::seeded(AnnealingSchedule::new(1.0, 1.5, 10, 1), 0);
        assert!(bad.solve(&ids, 2).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn cancelled_search_returns_start_partition() {
        let ids = IdentifierSet::standard(vec![0x3F, 0x15, 0x2, 0x100]).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let solution = SimulatedAnnealing::seeded(quick_schedule(), 9)
            .with_cancel_token(cancel)
            .solve(&ids, 2)
            .unwrap();
        assert_eq!(solution.status(), SearchStatus::Interrupted);
        assert_eq!(solution.stats().evaluated, 0);
        assert_eq!(solution.groups(), &[vec![0x2, 0x15], vec![0x3F, 0x100]]);
    }
}
