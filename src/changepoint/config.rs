//! Sampler and prior configuration.

use crate::error::{ChangePointError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the MCMC run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Draws retained per chain.
    pub num_samples: usize,
    /// Independent chains, each with its own derived random stream.
    pub num_chains: usize,
    /// Burn-in iterations discarded per chain.
    pub tuning_steps: usize,
    /// Base seed; the full run is deterministic given seed, data and chain count.
    pub random_seed: u64,
    /// Iterations between progress events sent to the observer.
    pub progress_interval: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            num_samples: 1000,
            num_chains: 2,
            tuning_steps: 1000,
            random_seed: 42,
            progress_interval: 100,
        }
    }
}

impl SamplerConfig {
    /// Set the number of retained draws per chain.
    pub fn num_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = num_samples;
        self
    }

    /// Set the number of chains.
    pub fn num_chains(mut self, num_chains: usize) -> Self {
        self.num_chains = num_chains;
        self
    }

    /// Set the number of discarded tuning iterations per chain.
    pub fn tuning_steps(mut self, tuning_steps: usize) -> Self {
        self.tuning_steps = tuning_steps;
        self
    }

    /// Set the base random seed.
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Set the progress cadence (0 disables progress events).
    pub fn progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Iterations each chain runs, tuning included.
    pub fn total_iterations(&self) -> usize {
        self.tuning_steps + self.num_samples
    }

    /// Reject configurations that cannot produce any draws.
    pub fn validate(&self) -> Result<()> {
        if self.num_samples == 0 {
            return Err(ChangePointError::InvalidConfig(
                "num_samples must be positive".to_string(),
            ));
        }
        if self.num_chains == 0 {
            return Err(ChangePointError::InvalidConfig(
                "num_chains must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Prior scales of the single change-point model.
///
/// Both regime means get `Normal(mean(values), mu_sd)` priors and the noise
/// scale gets `HalfNormal(sigma_scale)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPriors {
    pub mu_sd: f64,
    pub sigma_scale: f64,
}

impl Default for ModelPriors {
    fn default() -> Self {
        Self {
            mu_sd: 100.0,
            sigma_scale: 10.0,
        }
    }
}

impl ModelPriors {
    pub fn validate(&self) -> Result<()> {
        if !(self.mu_sd.is_finite() && self.mu_sd > 0.0) {
            return Err(ChangePointError::InvalidConfig(format!(
                "mu_sd must be positive and finite, got {}",
                self.mu_sd
            )));
        }
        if !(self.sigma_scale.is_finite() && self.sigma_scale > 0.0) {
            return Err(ChangePointError::InvalidConfig(format!(
                "sigma_scale must be positive and finite, got {}",
                self.sigma_scale
            )));
        }
        Ok(())
    }
}
