//! Reduction of posterior draws into a change-point estimate.

use super::trace::{InferenceResult, Parameter};
use crate::core::TimeSeries;
use crate::error::{ChangePointError, Result};
use crate::utils::stats::{equal_tailed_interval, highest_density_interval, mean, median, std_dev};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for posterior summaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Probability mass of credible intervals and HDIs.
    pub credible_mass: f64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            credible_mass: 0.95,
        }
    }
}

impl SummaryConfig {
    /// Set the credible mass.
    pub fn credible_mass(mut self, mass: f64) -> Self {
        self.credible_mass = mass;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.credible_mass > 0.0 && self.credible_mass < 1.0) {
            return Err(ChangePointError::InvalidConfig(format!(
                "credible_mass must lie in (0, 1), got {}",
                self.credible_mass
            )));
        }
        Ok(())
    }
}

/// Descriptive statistics of one parameter's draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSummary {
    pub mean: f64,
    pub sd: f64,
    /// Equal-tailed credible interval.
    pub ci_lower: f64,
    pub ci_upper: f64,
    /// Highest-density interval at the same mass.
    pub hdi_lower: f64,
    pub hdi_upper: f64,
}

impl ParameterSummary {
    pub fn from_draws(draws: &[f64], credible_mass: f64) -> Self {
        let (ci_lower, ci_upper) = equal_tailed_interval(draws, credible_mass);
        let (hdi_lower, hdi_upper) = highest_density_interval(draws, credible_mass);
        Self {
            mean: mean(draws),
            sd: std_dev(draws),
            ci_lower,
            ci_upper,
            hdi_lower,
            hdi_upper,
        }
    }
}

/// Posterior mass at one change-point index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TauBin {
    pub index: usize,
    pub date: NaiveDate,
    pub count: usize,
    pub probability: f64,
}

/// Credible interval over the change-point index, in indices and dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TauInterval {
    pub lower_index: usize,
    pub upper_index: usize,
    pub lower_date: NaiveDate,
    pub upper_date: NaiveDate,
}

/// Summarized change point: point estimate plus uncertainty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePointEstimate {
    /// Median of retained `tau` draws, floored.
    pub most_probable_tau: usize,
    pub change_point_date: NaiveDate,
    pub credible_mass: f64,
    pub tau_interval: TauInterval,
    /// Indices with non-zero posterior mass, ascending.
    pub tau_histogram: Vec<TauBin>,
    pub tau: ParameterSummary,
    pub mu_pre: ParameterSummary,
    pub mu_post: ParameterSummary,
    pub sigma: ParameterSummary,
    /// `mu_post - mu_pre` per draw.
    pub shift: ParameterSummary,
    /// False when the run raised sampler warnings.
    pub converged: bool,
}

/// Reduces an [`InferenceResult`] into a [`ChangePointEstimate`].
///
/// Pure: the same result and series always give the same estimate.
#[derive(Debug, Clone, Default)]
pub struct PosteriorSummarizer {
    config: SummaryConfig,
}

impl PosteriorSummarizer {
    pub fn new(config: SummaryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    pub fn summarize(
        &self,
        result: &InferenceResult,
        series: &TimeSeries,
    ) -> Result<ChangePointEstimate> {
        result.check_series(series)?;
        let n = series.len();
        let mass = self.config.credible_mass;

        let tau_draws = result.parameter_draws(Parameter::Tau);
        let most_probable_tau = median(&tau_draws).floor() as usize;
        if most_probable_tau >= n {
            return Err(ChangePointError::OutOfRangeEstimate {
                index: most_probable_tau,
                size: n,
            });
        }
        let change_point_date = series.date(most_probable_tau)?;

        let (lo, hi) = equal_tailed_interval(&tau_draws, mass);
        let lower_index = lo.floor() as usize;
        let upper_index = hi.ceil() as usize;
        let tau_interval = TauInterval {
            lower_index,
            upper_index,
            lower_date: series.date(lower_index)?,
            upper_date: series.date(upper_index)?,
        };

        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for tau in result.tau_draws() {
            *counts.entry(tau).or_insert(0) += 1;
        }
        let total = tau_draws.len() as f64;
        let tau_histogram = counts
            .into_iter()
            .map(|(index, count)| {
                Ok(TauBin {
                    index,
                    date: series.date(index)?,
                    count,
                    probability: count as f64 / total,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mu_pre = result.parameter_draws(Parameter::MuPre);
        let mu_post = result.parameter_draws(Parameter::MuPost);
        let shift: Vec<f64> = mu_pre.iter().zip(&mu_post).map(|(a, b)| b - a).collect();

        Ok(ChangePointEstimate {
            most_probable_tau,
            change_point_date,
            credible_mass: mass,
            tau_interval,
            tau_histogram,
            tau: ParameterSummary::from_draws(&tau_draws, mass),
            mu_pre: ParameterSummary::from_draws(&mu_pre, mass),
            mu_post: ParameterSummary::from_draws(&mu_post, mass),
            sigma: ParameterSummary::from_draws(&result.parameter_draws(Parameter::Sigma), mass),
            shift: ParameterSummary::from_draws(&shift, mass),
            converged: result.diagnostics().is_converged(),
        })
    }
}

/// Summarize with the default 95% credible mass.
pub fn summarize(result: &InferenceResult, series: &TimeSeries) -> Result<ChangePointEstimate> {
    PosteriorSummarizer::default().summarize(result, series)
}
