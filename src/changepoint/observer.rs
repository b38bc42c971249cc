//! Progress reporting and cooperative cancellation for a fit.
//!
//! The model never configures logging itself. Callers pass a [`FitObserver`]
//! that receives [`FitEvent`]s; [`TracingObserver`] forwards them to
//! `tracing`, whose subscriber is owned by the application.

use super::diagnostics::SamplerWarning;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Information about sampling progress of one chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressInfo {
    /// Chain index.
    pub chain: usize,
    /// Completed iterations (tuning included).
    pub iteration: usize,
    /// Total iterations for the chain.
    pub total: usize,
    /// Whether the chain is still in its tuning phase.
    pub tuning: bool,
    /// Acceptance rate of sigma proposals so far.
    pub sigma_acceptance_rate: f64,
}

/// Events emitted while fitting.
#[derive(Debug, Clone, PartialEq)]
pub enum FitEvent {
    Started {
        series_len: usize,
        num_chains: usize,
        num_samples: usize,
        tuning_steps: usize,
        random_seed: u64,
    },
    Progress(ProgressInfo),
    ChainFinished {
        chain: usize,
        sigma_acceptance_rate: f64,
        numerical_failures: usize,
    },
    Warning(SamplerWarning),
    Finished {
        draws: usize,
        elapsed: Duration,
    },
}

/// Receiver of fit events. Called concurrently from chain threads.
pub trait FitObserver: Send + Sync {
    fn on_event(&self, event: &FitEvent);
}

impl<F> FitObserver for F
where
    F: Fn(&FitEvent) + Send + Sync,
{
    fn on_event(&self, event: &FitEvent) {
        self(event)
    }
}

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl FitObserver for NoopObserver {
    fn on_event(&self, _event: &FitEvent) {}
}

/// Observer that forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl FitObserver for TracingObserver {
    fn on_event(&self, event: &FitEvent) {
        match event {
            FitEvent::Started {
                series_len,
                num_chains,
                num_samples,
                tuning_steps,
                random_seed,
            } => tracing::info!(
                series_len,
                num_chains,
                num_samples,
                tuning_steps,
                random_seed,
                "starting Bayesian change-point fit"
            ),
            FitEvent::Progress(info) => tracing::debug!(
                chain = info.chain,
                iteration = info.iteration,
                total = info.total,
                tuning = info.tuning,
                acceptance = info.sigma_acceptance_rate,
                "sampling"
            ),
            FitEvent::ChainFinished {
                chain,
                sigma_acceptance_rate,
                numerical_failures,
            } => tracing::info!(
                chain,
                acceptance = sigma_acceptance_rate,
                numerical_failures,
                "chain finished"
            ),
            FitEvent::Warning(warning) => tracing::warn!("{warning}"),
            FitEvent::Finished { draws, elapsed } => tracing::info!(
                draws,
                elapsed_ms = elapsed.as_millis() as u64,
                "model fitting complete"
            ),
        }
    }
}

/// Shared flag checked by every chain between draws.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; running chains stop at their next draw.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
