//! Bayesian single change-point model.
//!
//! ```text
//! tau     ~ DiscreteUniform(0, n-1)
//! mu_pre  ~ Normal(mean(y), mu_sd)
//! mu_post ~ Normal(mean(y), mu_sd)
//! sigma   ~ HalfNormal(sigma_scale)
//! y_t     ~ Normal(t < tau ? mu_pre : mu_post, sigma)
//! ```
//!
//! Indices `t < tau` belong to the pre-change regime, `t >= tau` to the
//! post-change regime.

use super::config::{ModelPriors, SamplerConfig};
use super::diagnostics::Diagnostics;
use super::observer::{CancellationToken, FitEvent, FitObserver, TracingObserver};
use super::sampler::ChainSampler;
use super::trace::{ChainTrace, InferenceResult, RunMetadata};
use crate::core::TimeSeries;
use crate::error::{ChangePointError, Result};
use rayon::prelude::*;
use statrs::distribution::{Continuous, Normal};
use std::time::Instant;

/// Log-posterior pieces of the model for one fixed series.
///
/// Segment sums come from prefix sums so every conditional needs O(1) work
/// per candidate split.
#[derive(Debug)]
pub(crate) struct Posterior<'a> {
    values: &'a [f64],
    cum_sum: Vec<f64>,
    cum_sum_sq: Vec<f64>,
    prior_mean: f64,
    mu_sd: f64,
    sigma_prior: Normal,
}

impl<'a> Posterior<'a> {
    pub(crate) fn new(values: &'a [f64], priors: &ModelPriors) -> Result<Self> {
        let cum_sum: Vec<f64> = std::iter::once(0.0)
            .chain(values.iter().scan(0.0, |acc, &x| {
                *acc += x;
                Some(*acc)
            }))
            .collect();

        let cum_sum_sq: Vec<f64> = std::iter::once(0.0)
            .chain(values.iter().scan(0.0, |acc, &x| {
                *acc += x * x;
                Some(*acc)
            }))
            .collect();

        let prior_mean = crate::utils::stats::mean(values);
        let sigma_prior = Normal::new(0.0, priors.sigma_scale)
            .map_err(|e| ChangePointError::InvalidConfig(format!("sigma prior: {e}")))?;

        Ok(Self {
            values,
            cum_sum,
            cum_sum_sq,
            prior_mean,
            mu_sd: priors.mu_sd,
            sigma_prior,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn prior_mean(&self) -> f64 {
        self.prior_mean
    }

    /// Standard deviation of the data, used to scale chain initialisation.
    pub(crate) fn data_scale(&self) -> f64 {
        let sd = crate::utils::stats::std_dev(self.values);
        if sd.is_finite() && sd > 0.0 {
            sd
        } else {
            1.0
        }
    }

    /// `(count, sum)` of `values[start..end]`.
    pub(crate) fn segment(&self, start: usize, end: usize) -> (usize, f64) {
        (end - start, self.cum_sum[end] - self.cum_sum[start])
    }

    /// `Σ (y_t - mu)²` over `values[start..end]`.
    fn segment_sse(&self, start: usize, end: usize, mu: f64) -> f64 {
        let n = (end - start) as f64;
        let sum = self.cum_sum[end] - self.cum_sum[start];
        let sum_sq = self.cum_sum_sq[end] - self.cum_sum_sq[start];
        (sum_sq - 2.0 * mu * sum + n * mu * mu).max(0.0)
    }

    /// Residual sum of squares for a full parameter set.
    pub(crate) fn sse(&self, tau: usize, mu_pre: f64, mu_post: f64) -> f64 {
        self.segment_sse(0, tau, mu_pre) + self.segment_sse(tau, self.len(), mu_post)
    }

    /// Unnormalised log full conditional of `tau` for every index.
    ///
    /// The uniform prior is constant and dropped.
    pub(crate) fn tau_log_weights(&self, mu_pre: f64, mu_post: f64, sigma: f64, out: &mut Vec<f64>) {
        let scale = -0.5 / (sigma * sigma);
        out.clear();
        out.extend((0..self.len()).map(|k| scale * self.sse(k, mu_pre, mu_post)));
    }

    /// Mean and standard deviation of the conjugate Normal full conditional
    /// of a regime mean covering `values[start..end]`.
    pub(crate) fn mu_conditional(&self, start: usize, end: usize, sigma: f64) -> (f64, f64) {
        let (count, sum) = self.segment(start, end);
        let prior_precision = 1.0 / (self.mu_sd * self.mu_sd);
        let data_precision = count as f64 / (sigma * sigma);
        let precision = prior_precision + data_precision;
        let mean = (self.prior_mean * prior_precision + sum / (sigma * sigma)) / precision;
        (mean, precision.sqrt().recip())
    }

    /// Log density of `log(sigma)` given the residual sum of squares,
    /// including the Jacobian of the log transform.
    pub(crate) fn log_sigma_density(&self, log_sigma: f64, sse: f64) -> f64 {
        let sigma = log_sigma.exp();
        if !(sigma.is_finite() && sigma > 0.0) {
            return f64::NEG_INFINITY;
        }
        let half_normal = std::f64::consts::LN_2 + self.sigma_prior.ln_pdf(sigma);
        let likelihood = -(self.len() as f64) * log_sigma - sse / (2.0 * sigma * sigma);
        half_normal + likelihood + log_sigma
    }
}

/// Single change-point model with configurable prior scales.
#[derive(Debug, Clone, Default)]
pub struct ChangePointModel {
    priors: ModelPriors,
}

impl ChangePointModel {
    pub fn new(priors: ModelPriors) -> Self {
        Self { priors }
    }

    pub fn priors(&self) -> &ModelPriors {
        &self.priors
    }

    /// Sample the posterior, reporting progress through `tracing`.
    pub fn fit(&self, series: &TimeSeries, config: &SamplerConfig) -> Result<InferenceResult> {
        self.fit_with(series, config, &TracingObserver, &CancellationToken::new())
    }

    /// Sample the posterior with an explicit observer and cancellation token.
    ///
    /// Validation happens before any sampling. Chains run in parallel, each
    /// with its own random stream, and are collected in chain order so the
    /// result only depends on the seed, the data and the chain count.
    pub fn fit_with(
        &self,
        series: &TimeSeries,
        config: &SamplerConfig,
        observer: &dyn FitObserver,
        cancel: &CancellationToken,
    ) -> Result<InferenceResult> {
        config.validate()?;
        self.priors.validate()?;
        if series.len() < 2 {
            return Err(ChangePointError::InsufficientData {
                needed: 2,
                got: series.len(),
            });
        }

        let posterior = Posterior::new(series.values(), &self.priors)?;

        observer.on_event(&FitEvent::Started {
            series_len: series.len(),
            num_chains: config.num_chains,
            num_samples: config.num_samples,
            tuning_steps: config.tuning_steps,
            random_seed: config.random_seed,
        });
        let started = Instant::now();

        let chains: Vec<ChainTrace> = (0..config.num_chains)
            .into_par_iter()
            .map(|chain| ChainSampler::new(&posterior, config, chain).run(observer, cancel))
            .collect::<Result<Vec<_>>>()?;

        let (first_date, last_date) = match series.span() {
            Some((first, last)) => (Some(first), Some(last)),
            None => (None, None),
        };
        let metadata = RunMetadata {
            num_chains: config.num_chains,
            num_samples: config.num_samples,
            tuning_steps: config.tuning_steps,
            random_seed: config.random_seed,
            series_len: series.len(),
            first_date,
            last_date,
            prior_mean: posterior.prior_mean(),
            priors: self.priors,
        };
        let result = InferenceResult::from_parts(metadata, chains)?;

        report_warnings(result.diagnostics(), observer);
        observer.on_event(&FitEvent::Finished {
            draws: result.num_draws(),
            elapsed: started.elapsed(),
        });

        Ok(result)
    }
}

fn report_warnings(diagnostics: &Diagnostics, observer: &dyn FitObserver) {
    for warning in &diagnostics.warnings {
        observer.on_event(&FitEvent::Warning(warning.clone()));
    }
}

/// Fit the default model.
///
/// # Example
///
/// ```
/// use brent_changepoint::changepoint::{fit_changepoint, summarize, SamplerConfig};
/// use brent_changepoint::core::TimeSeries;
/// use chrono::NaiveDate;
///
/// let mut values = vec![10.0, 10.5, 9.5, 10.2, 9.8, 10.1, 9.9, 10.3];
/// values.extend([50.0, 50.4, 49.6, 50.2, 49.8, 50.1, 49.9, 50.3]);
/// let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
/// let series = TimeSeries::monthly(start, values).unwrap();
///
/// let config = SamplerConfig::default().num_samples(200).tuning_steps(200);
/// let result = fit_changepoint(&series, &config).unwrap();
/// let estimate = summarize(&result, &series).unwrap();
/// assert_eq!(estimate.most_probable_tau, 8);
/// ```
pub fn fit_changepoint(series: &TimeSeries, config: &SamplerConfig) -> Result<InferenceResult> {
    ChangePointModel::default().fit(series, config)
}
