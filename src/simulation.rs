//! Bootstrap Monte Carlo projection of portfolio value.
//!
//! Each trial draws `horizon_days` returns uniformly with replacement from the
//! historical portfolio series and compounds them from the starting value.
//! This is an i.i.d. bootstrap: autocorrelation and regime structure in the
//! history are ignored.

use crate::config::{DEFAULT_HORIZON_DAYS, DEFAULT_INITIAL_VALUE, DEFAULT_TRIALS};
use crate::error::{Result, RiskError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

/// Parameters of one simulation run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    pub trials: usize,
    pub horizon_days: usize,
    pub initial_value: f64,
    /// Master seed. `None` draws a fresh one per run.
    pub seed: Option<u64>,
    /// Floor terminal values at 0.0. Off by default: values are reported as compounded.
    pub clamp_at_zero: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            horizon_days: DEFAULT_HORIZON_DAYS,
            initial_value: DEFAULT_INITIAL_VALUE,
            seed: None,
            clamp_at_zero: false,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.trials < 1 {
            return Err(RiskError::InvalidParameter {
                name: "trials",
                value: self.trials.to_string(),
            });
        }
        if self.horizon_days < 1 {
            return Err(RiskError::InvalidParameter {
                name: "horizon_days",
                value: self.horizon_days.to_string(),
            });
        }
        if !self.initial_value.is_finite() || self.initial_value <= 0.0 {
            return Err(RiskError::InvalidParameter {
                name: "initial_value",
                value: self.initial_value.to_string(),
            });
        }
        Ok(())
    }
}

/// Terminal portfolio values, one per trial, in trial order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationResult {
    pub seed: u64,
    pub terminal_values: Vec<f64>,
}

impl SimulationResult {
    pub fn values(&self) -> &[f64] {
        &self.terminal_values
    }

    pub fn len(&self) -> usize {
        self.terminal_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terminal_values.is_empty()
    }
}

/// Seed for trial `index`, derived from the master seed so that results do not
/// depend on how trials are scheduled across threads.
fn trial_seed(master_seed: u64, index: usize) -> u64 {
    let mut z = master_seed.wrapping_add((index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn simulate_trial(pool: &[f64], horizon_days: usize, initial_value: f64, seed: u64) -> f64 {
    let mut rng = StdRng::seed_from_u64(seed);
    let growth: f64 = (0..horizon_days)
        .map(|_| 1.0 + pool[rng.gen_range(0..pool.len())])
        .product();
    initial_value * growth
}

/// Runs `config.trials` independent bootstrap trials over `pool` in parallel.
pub fn run_simulation(pool: &[f64], config: &SimulationConfig) -> Result<SimulationResult> {
    if pool.is_empty() {
        return Err(RiskError::EmptyPool);
    }
    config.validate()?;

    let seed = config.seed.unwrap_or_else(rand::random::<u64>);
    debug!(
        "Bootstrap simulation: trials={}, horizon={}d, initial_value={:.2}, pool={}, seed={}",
        config.trials,
        config.horizon_days,
        config.initial_value,
        pool.len(),
        seed
    );

    let terminal_values: Vec<f64> = (0..config.trials)
        .into_par_iter()
        .map(|i| {
            let value = simulate_trial(pool, config.horizon_days, config.initial_value, trial_seed(seed, i));
            if config.clamp_at_zero { value.max(0.0) } else { value }
        })
        .collect();

    Ok(SimulationResult {
        seed,
        terminal_values,
    })
}
