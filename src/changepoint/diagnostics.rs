//! Convergence diagnostics for a set of chains.
//!
//! Numerical trouble never aborts a fit. It is recorded here as
//! [`SamplerWarning`]s so the caller can decide whether a low-confidence
//! estimate is acceptable.

use super::trace::{ChainTrace, Parameter};
use crate::utils::stats::{effective_sample_size, split_r_hat};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Split R-hat above this value flags non-convergence.
pub const R_HAT_THRESHOLD: f64 = 1.01;

/// Minimum bulk ESS per chain before a parameter is flagged.
pub const MIN_ESS_PER_CHAIN: f64 = 100.0;

/// Acceptable range for the sigma proposal acceptance rate.
pub const ACCEPTANCE_RANGE: (f64, f64) = (0.1, 0.9);

/// Non-fatal sampler conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SamplerWarning {
    /// Proposals or conditional draws produced non-finite densities.
    NumericalFailures { chain: usize, count: usize },
    /// Chains disagree about a parameter.
    HighRHat { parameter: Parameter, r_hat: f64 },
    /// Too few effectively independent draws.
    LowEffectiveSampleSize { parameter: Parameter, ess: f64 },
    /// Sigma random walk is badly scaled.
    SigmaAcceptance { chain: usize, rate: f64 },
}

impl fmt::Display for SamplerWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplerWarning::NumericalFailures { chain, count } => write!(
                f,
                "chain {chain}: {count} numerically unstable steps were rejected"
            ),
            SamplerWarning::HighRHat { parameter, r_hat } => write!(
                f,
                "r_hat for {parameter} is {r_hat:.3} (> {R_HAT_THRESHOLD}); chains have not converged"
            ),
            SamplerWarning::LowEffectiveSampleSize { parameter, ess } => write!(
                f,
                "effective sample size for {parameter} is only {ess:.0}"
            ),
            SamplerWarning::SigmaAcceptance { chain, rate } => write!(
                f,
                "chain {chain}: sigma acceptance rate {rate:.3} is outside [{}, {}]",
                ACCEPTANCE_RANGE.0, ACCEPTANCE_RANGE.1
            ),
        }
    }
}

/// ESS and R-hat for one parameter across all chains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDiagnostics {
    pub parameter: Parameter,
    pub ess: f64,
    pub r_hat: f64,
}

/// Run-level diagnostics attached to an inference result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub parameters: Vec<ParameterDiagnostics>,
    pub numerical_failures: usize,
    /// Mean sigma acceptance rate over chains.
    pub sigma_acceptance_rate: f64,
    pub warnings: Vec<SamplerWarning>,
}

impl Diagnostics {
    /// Compute diagnostics from retained draws.
    pub fn from_chains(chains: &[ChainTrace]) -> Self {
        let mut warnings = Vec::new();

        for chain in chains {
            if chain.numerical_failures > 0 {
                warnings.push(SamplerWarning::NumericalFailures {
                    chain: chain.chain,
                    count: chain.numerical_failures,
                });
            }
            let rate = chain.sigma_acceptance_rate;
            if rate < ACCEPTANCE_RANGE.0 || rate > ACCEPTANCE_RANGE.1 {
                warnings.push(SamplerWarning::SigmaAcceptance {
                    chain: chain.chain,
                    rate,
                });
            }
        }

        let min_ess = MIN_ESS_PER_CHAIN * chains.len() as f64;
        let parameters: Vec<ParameterDiagnostics> = Parameter::ALL
            .iter()
            .map(|&parameter| {
                let columns: Vec<Vec<f64>> = chains.iter().map(|c| c.column(parameter)).collect();
                let ess = columns.iter().map(|c| effective_sample_size(c)).sum::<f64>();
                let r_hat = split_r_hat(&columns);

                // NaN (too few draws to split) never warns
                if r_hat > R_HAT_THRESHOLD {
                    warnings.push(SamplerWarning::HighRHat { parameter, r_hat });
                }
                if ess < min_ess {
                    warnings.push(SamplerWarning::LowEffectiveSampleSize { parameter, ess });
                }

                ParameterDiagnostics {
                    parameter,
                    ess,
                    r_hat,
                }
            })
            .collect();

        let numerical_failures = chains.iter().map(|c| c.numerical_failures).sum();
        let sigma_acceptance_rate = if chains.is_empty() {
            f64::NAN
        } else {
            chains.iter().map(|c| c.sigma_acceptance_rate).sum::<f64>() / chains.len() as f64
        };

        Self {
            parameters,
            numerical_failures,
            sigma_acceptance_rate,
            warnings,
        }
    }

    /// Diagnostics for one parameter.
    pub fn get(&self, parameter: Parameter) -> Option<&ParameterDiagnostics> {
        self.parameters.iter().find(|p| p.parameter == parameter)
    }

    /// True when no warning was raised.
    pub fn is_converged(&self) -> bool {
        self.warnings.is_empty()
    }
}
