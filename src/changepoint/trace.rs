//! Posterior draws and run metadata.
//!
//! An [`InferenceResult`] keeps every retained draw, grouped per chain with
//! one column per parameter, so it can be persisted and re-summarized
//! without loss.

use super::config::ModelPriors;
use super::diagnostics::Diagnostics;
use super::summary::ParameterSummary;
use crate::core::TimeSeries;
use crate::error::{ChangePointError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Latent parameters of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Tau,
    MuPre,
    MuPost,
    Sigma,
}

impl Parameter {
    pub const ALL: [Parameter; 4] = [
        Parameter::Tau,
        Parameter::MuPre,
        Parameter::MuPost,
        Parameter::Sigma,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Parameter::Tau => "tau",
            Parameter::MuPre => "mu_pre",
            Parameter::MuPost => "mu_post",
            Parameter::Sigma => "sigma",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One joint draw of the model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSample {
    pub tau: usize,
    pub mu_pre: f64,
    pub mu_post: f64,
    pub sigma: f64,
}

/// Retained draws of a single chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainTrace {
    pub chain: usize,
    pub tau: Vec<usize>,
    pub mu_pre: Vec<f64>,
    pub mu_post: Vec<f64>,
    pub sigma: Vec<f64>,
    /// Fraction of accepted sigma proposals after tuning.
    pub sigma_acceptance_rate: f64,
    /// Final random-walk scale on log(sigma).
    pub sigma_step: f64,
    pub numerical_failures: usize,
}

impl ChainTrace {
    pub fn with_capacity(chain: usize, capacity: usize) -> Self {
        Self {
            chain,
            tau: Vec::with_capacity(capacity),
            mu_pre: Vec::with_capacity(capacity),
            mu_post: Vec::with_capacity(capacity),
            sigma: Vec::with_capacity(capacity),
            sigma_acceptance_rate: 0.0,
            sigma_step: 0.0,
            numerical_failures: 0,
        }
    }

    pub fn push(&mut self, tau: usize, mu_pre: f64, mu_post: f64, sigma: f64) {
        self.tau.push(tau);
        self.mu_pre.push(mu_pre);
        self.mu_post.push(mu_post);
        self.sigma.push(sigma);
    }

    pub fn len(&self) -> usize {
        self.tau.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tau.is_empty()
    }

    /// Draw number `index` of this chain.
    pub fn draw(&self, index: usize) -> Option<PosteriorSample> {
        Some(PosteriorSample {
            tau: *self.tau.get(index)?,
            mu_pre: *self.mu_pre.get(index)?,
            mu_post: *self.mu_post.get(index)?,
            sigma: *self.sigma.get(index)?,
        })
    }

    /// Draws of one parameter as reals.
    pub fn column(&self, parameter: Parameter) -> Vec<f64> {
        match parameter {
            Parameter::Tau => self.tau.iter().map(|&t| t as f64).collect(),
            Parameter::MuPre => self.mu_pre.clone(),
            Parameter::MuPost => self.mu_post.clone(),
            Parameter::Sigma => self.sigma.clone(),
        }
    }

    fn is_consistent(&self) -> bool {
        let n = self.tau.len();
        self.mu_pre.len() == n && self.mu_post.len() == n && self.sigma.len() == n
    }

    /// First draw outside the model's support: `tau < series_len`, finite
    /// means, finite positive `sigma`.
    fn find_invalid_draw(&self, series_len: usize) -> Option<String> {
        (0..self.len()).find_map(|i| {
            let tau = self.tau[i];
            let (mu_pre, mu_post, sigma) = (self.mu_pre[i], self.mu_post[i], self.sigma[i]);
            if tau >= series_len {
                Some(format!(
                    "chain {} draw {i}: tau {tau} outside series of length {series_len}",
                    self.chain
                ))
            } else if !(mu_pre.is_finite() && mu_post.is_finite()) {
                Some(format!(
                    "chain {} draw {i}: non-finite regime mean ({mu_pre}, {mu_post})",
                    self.chain
                ))
            } else if !(sigma.is_finite() && sigma > 0.0) {
                Some(format!("chain {} draw {i}: sigma {sigma} is not positive", self.chain))
            } else {
                None
            }
        })
    }
}

/// Settings and data identity of the run that produced a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub num_chains: usize,
    pub num_samples: usize,
    pub tuning_steps: usize,
    pub random_seed: u64,
    pub series_len: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Centre of the regime-mean priors (the series mean).
    pub prior_mean: f64,
    pub priors: ModelPriors,
}

impl RunMetadata {
    /// Same format as [`TimeSeries::fingerprint`].
    pub fn series_fingerprint(&self) -> String {
        match (self.first_date, self.last_date) {
            (Some(first), Some(last)) => {
                format!("{} points {}..{}", self.series_len, first, last)
            }
            _ => format!("{} points", self.series_len),
        }
    }
}

/// All retained draws of a fit plus metadata and diagnostics.
///
/// Diagnostics are written out for readers of the JSON but recomputed from
/// the draws when a result is loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceResult {
    metadata: RunMetadata,
    chains: Vec<ChainTrace>,
    diagnostics: Diagnostics,
}

#[derive(Deserialize)]
struct StoredResult {
    metadata: RunMetadata,
    chains: Vec<ChainTrace>,
}

impl InferenceResult {
    /// Assemble a result from chain traces, recomputing diagnostics.
    ///
    /// Every chain must hold exactly `metadata.num_samples` draws and there
    /// must be `metadata.num_chains` chains. Every draw must index the
    /// series and carry finite means and a positive `sigma`.
    pub fn from_parts(metadata: RunMetadata, chains: Vec<ChainTrace>) -> Result<Self> {
        if metadata.num_samples == 0 || metadata.num_chains == 0 {
            return Err(ChangePointError::InvalidConfig(
                "an inference result needs at least one draw".to_string(),
            ));
        }
        if chains.len() != metadata.num_chains {
            return Err(ChangePointError::DimensionMismatch {
                expected: metadata.num_chains,
                got: chains.len(),
            });
        }
        for chain in &chains {
            if !chain.is_consistent() || chain.len() != metadata.num_samples {
                return Err(ChangePointError::DimensionMismatch {
                    expected: metadata.num_samples,
                    got: chain.len(),
                });
            }
            if let Some(problem) = chain.find_invalid_draw(metadata.series_len) {
                return Err(ChangePointError::CorruptTrace(problem));
            }
        }
        let diagnostics = Diagnostics::from_chains(&chains);
        Ok(Self {
            metadata,
            chains,
            diagnostics,
        })
    }

    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    pub fn chains(&self) -> &[ChainTrace] {
        &self.chains
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Total retained draws across chains.
    pub fn num_draws(&self) -> usize {
        self.chains.iter().map(|c| c.len()).sum()
    }

    /// Draw `draw` of chain `chain`.
    pub fn draw(&self, chain: usize, draw: usize) -> Option<PosteriorSample> {
        self.chains.get(chain)?.draw(draw)
    }

    /// All draws flattened chain by chain.
    pub fn samples(&self) -> impl Iterator<Item = PosteriorSample> + '_ {
        self.chains
            .iter()
            .flat_map(|c| (0..c.len()).filter_map(move |i| c.draw(i)))
    }

    /// Every retained change-point index.
    pub fn tau_draws(&self) -> Vec<usize> {
        self.chains.iter().flat_map(|c| c.tau.iter().copied()).collect()
    }

    /// Every retained draw of `parameter`, flattened across chains.
    pub fn parameter_draws(&self, parameter: Parameter) -> Vec<f64> {
        self.chains.iter().flat_map(|c| c.column(parameter)).collect()
    }

    /// Fail unless `series` is the series this result was inferred from.
    pub fn check_series(&self, series: &TimeSeries) -> Result<()> {
        let (first, last) = match series.span() {
            Some((first, last)) => (Some(first), Some(last)),
            None => (None, None),
        };
        let matches = self.metadata.series_len == series.len()
            && self.metadata.first_date == first
            && self.metadata.last_date == last;
        if matches {
            Ok(())
        } else {
            Err(ChangePointError::SeriesMismatch {
                expected: self.metadata.series_fingerprint(),
                got: series.fingerprint(),
            })
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON, re-validating chain shapes.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: StoredResult = serde_json::from_str(json)?;
        Self::from_parts(raw.metadata, raw.chains)
    }

    /// Persist as JSON at `path`.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Load a result previously written with [`InferenceResult::write_json`].
    pub fn read_json(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let raw: StoredResult = serde_json::from_reader(BufReader::new(file))?;
        Self::from_parts(raw.metadata, raw.chains)
    }

    /// Text table of per-parameter summaries and diagnostics.
    pub fn summary_table(&self, credible_mass: f64) -> String {
        let pct = (credible_mass * 100.0).round();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<8} {:>10} {:>10} {:>10} {:>10} {:>9} {:>7}",
            "",
            "mean",
            "sd",
            format!("hdi_{}%-", pct),
            format!("hdi_{}%+", pct),
            "ess",
            "r_hat"
        );
        for parameter in Parameter::ALL {
            let s = ParameterSummary::from_draws(&self.parameter_draws(parameter), credible_mass);
            let (ess, r_hat) = self
                .diagnostics
                .get(parameter)
                .map(|d| (d.ess, d.r_hat))
                .unwrap_or((f64::NAN, f64::NAN));
            let _ = writeln!(
                out,
                "{:<8} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>9.0} {:>7.3}",
                parameter.name(),
                s.mean,
                s.sd,
                s.hdi_lower,
                s.hdi_upper,
                ess,
                r_hat
            );
        }
        for warning in &self.diagnostics.warnings {
            let _ = writeln!(out, "warning: {warning}");
        }
        out
    }
}
