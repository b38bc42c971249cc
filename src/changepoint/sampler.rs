//! Metropolis-within-Gibbs sampler for one chain.
//!
//! Each iteration updates, in order:
//! 1. `tau | mu_pre, mu_post, sigma` - exact categorical draw over `[0, n-1]`
//! 2. `mu_pre | tau, sigma` and `mu_post | tau, sigma` - conjugate Normals
//! 3. `sigma | tau, mu_pre, mu_post` - random-walk Metropolis on `log(sigma)`
//!
//! The random-walk scale is adapted during tuning only, so retained draws
//! come from a fixed Markov kernel.

use super::config::SamplerConfig;
use super::model::Posterior;
use super::observer::{CancellationToken, FitEvent, FitObserver, ProgressInfo};
use super::trace::ChainTrace;
use crate::error::{ChangePointError, Result};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::SeedableRng;
use rand_distr::{Normal, StandardNormal};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Iterations between proposal-scale adjustments during tuning.
const TUNE_INTERVAL: usize = 100;

/// Initial random-walk scale on log(sigma).
const INITIAL_LOG_SIGMA_STEP: f64 = 0.1;

/// Smallest sigma a chain is allowed to start from.
const MIN_INITIAL_SIGMA: f64 = 1e-3;

/// Random stream for `chain`: the base seed advanced by `chain` jumps of
/// 2^128 draws, so streams never overlap.
pub(crate) fn chain_rng(seed: u64, chain: usize) -> Xoshiro256PlusPlus {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    for _ in 0..chain {
        rng.jump();
    }
    rng
}

/// Scale factor for the random-walk step given the acceptance rate of the
/// last tuning window.
fn tune_factor(acceptance_rate: f64) -> f64 {
    if acceptance_rate < 0.001 {
        0.1
    } else if acceptance_rate < 0.05 {
        0.5
    } else if acceptance_rate < 0.2 {
        0.9
    } else if acceptance_rate > 0.95 {
        10.0
    } else if acceptance_rate > 0.75 {
        2.0
    } else if acceptance_rate > 0.5 {
        1.1
    } else {
        1.0
    }
}

#[derive(Debug, Clone, Copy)]
struct State {
    tau: usize,
    mu_pre: f64,
    mu_post: f64,
    sigma: f64,
}

pub(crate) struct ChainSampler<'p, 'a> {
    posterior: &'p Posterior<'a>,
    config: &'p SamplerConfig,
    chain: usize,
    rng: Xoshiro256PlusPlus,
    state: State,
    log_sigma_step: f64,
    weights: Vec<f64>,
    numerical_failures: usize,
}

impl<'p, 'a> ChainSampler<'p, 'a> {
    /// Create a sampler whose starting point is drawn from the chain's own
    /// stream, overdispersed around the data.
    pub(crate) fn new(posterior: &'p Posterior<'a>, config: &'p SamplerConfig, chain: usize) -> Self {
        let mut rng = chain_rng(config.random_seed, chain);
        let n = posterior.len();
        let scale = posterior.data_scale();

        let tau = rng.gen_range(0..n);
        let z_pre: f64 = rng.sample(StandardNormal);
        let z_post: f64 = rng.sample(StandardNormal);
        let log_jitter: f64 = rng.gen_range(-0.5..0.5);
        let state = State {
            tau,
            mu_pre: posterior.prior_mean() + scale * z_pre,
            mu_post: posterior.prior_mean() + scale * z_post,
            sigma: (scale * log_jitter.exp()).max(MIN_INITIAL_SIGMA),
        };

        Self {
            posterior,
            config,
            chain,
            rng,
            state,
            log_sigma_step: INITIAL_LOG_SIGMA_STEP,
            weights: Vec::with_capacity(n),
            numerical_failures: 0,
        }
    }

    /// Run tuning plus sampling, returning the retained draws.
    pub(crate) fn run(
        mut self,
        observer: &dyn FitObserver,
        cancel: &CancellationToken,
    ) -> Result<ChainTrace> {
        let tuning = self.config.tuning_steps;
        let total = self.config.total_iterations();
        let progress_interval = self.config.progress_interval;

        let mut trace = ChainTrace::with_capacity(self.chain, self.config.num_samples);
        let mut window_accepted = 0usize;
        let mut window_proposed = 0usize;
        let mut kept_accepted = 0usize;
        let mut total_accepted = 0usize;

        for iteration in 0..total {
            if cancel.is_cancelled() {
                tracing::debug!(chain = self.chain, iteration, "chain cancelled");
                return Err(ChangePointError::Cancelled);
            }

            self.update_tau();
            self.update_means();
            let accepted = self.update_sigma();

            if accepted {
                total_accepted += 1;
            }

            if iteration < tuning {
                window_proposed += 1;
                if accepted {
                    window_accepted += 1;
                }
                if window_proposed == TUNE_INTERVAL {
                    let rate = window_accepted as f64 / window_proposed as f64;
                    self.log_sigma_step *= tune_factor(rate);
                    window_accepted = 0;
                    window_proposed = 0;
                }
            } else {
                if accepted {
                    kept_accepted += 1;
                }
                let s = self.state;
                trace.push(s.tau, s.mu_pre, s.mu_post, s.sigma);
            }

            let done = iteration + 1;
            if progress_interval > 0 && (done % progress_interval == 0 || done == total) {
                observer.on_event(&FitEvent::Progress(ProgressInfo {
                    chain: self.chain,
                    iteration: done,
                    total,
                    tuning: done <= tuning,
                    sigma_acceptance_rate: total_accepted as f64 / done as f64,
                }));
            }
        }

        trace.sigma_acceptance_rate = kept_accepted as f64 / self.config.num_samples as f64;
        trace.sigma_step = self.log_sigma_step;
        trace.numerical_failures = self.numerical_failures;

        observer.on_event(&FitEvent::ChainFinished {
            chain: self.chain,
            sigma_acceptance_rate: trace.sigma_acceptance_rate,
            numerical_failures: trace.numerical_failures,
        });

        Ok(trace)
    }

    /// Exact draw from the discrete full conditional of `tau`.
    fn update_tau(&mut self) {
        let State {
            mu_pre,
            mu_post,
            sigma,
            ..
        } = self.state;
        self.posterior
            .tau_log_weights(mu_pre, mu_post, sigma, &mut self.weights);

        let max = self.weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            self.numerical_failures += 1;
            return;
        }
        for w in self.weights.iter_mut() {
            *w = (*w - max).exp();
        }

        match WeightedIndex::new(&self.weights) {
            Ok(dist) => self.state.tau = dist.sample(&mut self.rng),
            Err(_) => self.numerical_failures += 1,
        }
    }

    /// Conjugate Gibbs draws of both regime means.
    fn update_means(&mut self) {
        let n = self.posterior.len();
        let State { tau, sigma, .. } = self.state;

        if let Some(mu) = self.draw_mean(0, tau, sigma) {
            self.state.mu_pre = mu;
        }
        if let Some(mu) = self.draw_mean(tau, n, sigma) {
            self.state.mu_post = mu;
        }
    }

    fn draw_mean(&mut self, start: usize, end: usize, sigma: f64) -> Option<f64> {
        let (mean, sd) = self.posterior.mu_conditional(start, end, sigma);
        match Normal::new(mean, sd) {
            Ok(dist) if mean.is_finite() => Some(dist.sample(&mut self.rng)),
            _ => {
                self.numerical_failures += 1;
                None
            }
        }
    }

    /// Random-walk Metropolis step on `log(sigma)`. Returns whether the
    /// proposal was accepted.
    fn update_sigma(&mut self) -> bool {
        let State {
            tau,
            mu_pre,
            mu_post,
            sigma,
        } = self.state;
        let sse = self.posterior.sse(tau, mu_pre, mu_post);

        let current = sigma.ln();
        let z: f64 = self.rng.sample(StandardNormal);
        let proposed = current + self.log_sigma_step * z;

        let current_lp = self.posterior.log_sigma_density(current, sse);
        let proposed_lp = self.posterior.log_sigma_density(proposed, sse);
        if !proposed_lp.is_finite() {
            self.numerical_failures += 1;
            return false;
        }

        let u: f64 = self.rng.gen();
        if u.ln() < proposed_lp - current_lp {
            self.state.sigma = proposed.exp();
            true
        } else {
            false
        }
    }
}
