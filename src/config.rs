//! Project layout and run configuration.

use crate::changepoint::{ModelPriors, SamplerConfig, SummaryConfig};
use crate::error::{ChangePointError, Result};
use crate::report::DEFAULT_EVENT_WINDOW_MONTHS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File locations relative to a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub raw_prices: PathBuf,
    pub events: PathBuf,
    pub processed: PathBuf,
    pub trace: PathBuf,
    pub reports: PathBuf,
    pub logs: PathBuf,
}

impl ProjectPaths {
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let data = root.join("data");
        Self {
            raw_prices: data.join("raw").join("brent_oil_prices.csv"),
            events: data.join("events").join("key_events.csv"),
            processed: data.join("processed").join("processed_data.csv"),
            trace: data.join("processed").join("trace.json"),
            reports: root.join("reports"),
            logs: root.join("logs"),
            root,
        }
    }

    /// Default log file for model runs.
    pub fn modeling_log(&self) -> PathBuf {
        self.logs.join("modeling.log")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Events within this many months of the change point are reported.
    pub event_window_months: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            event_window_months: DEFAULT_EVENT_WINDOW_MONTHS,
        }
    }
}

/// Everything a run can be tuned with, loadable from TOML.
///
/// ```toml
/// [sampler]
/// num_samples = 2000
/// random_seed = 7
///
/// [summary]
/// credible_mass = 0.9
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub sampler: SamplerConfig,
    pub priors: ModelPriors,
    pub summary: SummaryConfig,
    pub report: ReportConfig,
}

impl RunConfig {
    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ChangePointError::Serialization(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.sampler.validate()?;
        self.priors.validate()?;
        self.summary.validate()
    }
}
