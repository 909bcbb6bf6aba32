use crate::errors::{FilterCalcError, Result};

/// Cooling schedule of the simulated annealing search.
///
/// Every epoch restarts from the initial partition at `initial_temperature`
/// and runs `iterations_per_epoch` moves. The temperature is multiplied by
/// `cooling_factor` once every `steps_per_cooling` moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnealingSchedule {
    initial_temperature: f64,
    cooling_factor: f64,
    iterations_per_epoch: u64,
    epochs: u64,
    steps_per_cooling: u64,
}

impl AnnealingSchedule {
    pub const DEFAULT_STEPS_PER_COOLING: u64 = 10;

    pub fn new(
        initial_temperature: f64,
        cooling_factor: f64,
        iterations_per_epoch: u64,
        epochs: u64,
    ) -> Self {
        Self {
            initial_temperature,
            cooling_factor,
            iterations_per_epoch,
            epochs,
            steps_per_cooling: Self::DEFAULT_STEPS_PER_COOLING,
        }
    }

    pub fn with_steps_per_cooling(mut self, steps_per_cooling: u64) -> Self {
        self.steps_per_cooling = steps_per_cooling;
        self
    }

    pub fn initial_temperature(&self) -> f64 {
        self.initial_temperature
    }
    pub fn cooling_factor(&self) -> f64 {
        self.cooling_factor
    }
    pub fn iterations_per_epoch(&self) -> u64 {
        self.iterations_per_epoch
    }
    pub fn epochs(&self) -> u64 {
        self.epochs
    }
    pub fn steps_per_cooling(&self) -> u64 {
        self.steps_per_cooling
    }

    /// Total number of moves over all epochs.
    pub fn total_iterations(&self) -> u64 {
        self.iterations_per_epoch.saturating_mul(self.epochs)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.initial_temperature.is_finite() && self.initial_temperature > 0.0) {
            return Err(FilterCalcError::invalid_argument(format!(
                "initial temperature must be positive, got {}",
                self.initial_temperature
            )));
        }
        if !(self.cooling_factor > 0.0 && self.cooling_factor < 1.0) {
            return Err(FilterCalcError::invalid_argument(format!(
                "cooling factor must be within (0, 1), got {}",
                self.cooling_factor
            )));
        }
        if self.iterations_per_epoch == 0 {
            return Err(FilterCalcError::invalid_argument(
                "iterations per epoch must be positive",
            ));
        }
        if self.epochs == 0 {
            return Err(FilterCalcError::invalid_argument(
                "number of epochs must be positive",
            ));
        }
        if self.steps_per_cooling == 0 {
            return Err(FilterCalcError::invalid_argument(
                "steps per cooling must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for AnnealingSchedule {
    fn default() -> Self {
        Self::new(1.0, 0.95, 2000, 10)
    }
}
