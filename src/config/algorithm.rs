use std::{fmt::Display, str::FromStr};

use crate::errors::FilterCalcError;
use crate::partition::stirling2;

/// Largest number of partitions `Algorithm::Auto` still searches exhaustively.
pub const EXACT_PARTITION_LIMIT: u128 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Exact,
    Annealing,
    Auto,
}

impl Algorithm {
    /// Resolves `Auto` by the size of the partition space.
    pub fn resolve(self, id_count: usize, filter_count: usize) -> Algorithm {
        match self {
            Algorithm::Auto => {
                let partitions = stirling2(id_count, filter_count);
                if partitions <= EXACT_PARTITION_LIMIT {
                    Algorithm::Exact
                } else {
                    log::warn!(
                        "{partitions} partitions exceed the exhaustive search limit, \
                         falling back to simulated annealing"
                    );
                    Algorithm::Annealing
                }
            }
            algorithm => algorithm,
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Exact => write!(f, "exact"),
            Algorithm::Annealing => write!(f, "simulated-annealing"),
            Algorithm::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = FilterCalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" | "opt" => Ok(Algorithm::Exact),
            "sa" | "annealing" | "simulated-annealing" => Ok(Algorithm::Annealing),
            "auto" => Ok(Algorithm::Auto),
            other => Err(FilterCalcError::invalid_argument(format!(
                "unknown algorithm `{other}`, expected exact, sa or auto"
            ))),
        }
    }
}
