//! Bayesian single change-point detection.
//!
//! Fits a model with one abrupt shift in the mean of a series and reduces
//! the posterior to a dated estimate with credible intervals.
//!
//! # Components
//!
//! - [`ChangePointModel`]: priors plus a Metropolis-within-Gibbs sampler run
//!   over several seeded chains
//! - [`InferenceResult`]: retained draws, run metadata and diagnostics
//! - [`PosteriorSummarizer`]: median change point, its date, intervals and
//!   the posterior histogram of the change-point index
//!
//! # Example
//!
//! ```
//! use brent_changepoint::changepoint::{ChangePointModel, PosteriorSummarizer, SamplerConfig};
//! use brent_changepoint::core::TimeSeries;
//! use chrono::NaiveDate;
//!
//! let values: Vec<f64> = (0..24)
//!     .map(|i| {
//!         let level = if i < 12 { 20.0 } else { 80.0 };
//!         level + ((i * 5) % 7) as f64 * 0.3
//!     })
//!     .collect();
//! let start = NaiveDate::from_ymd_opt(2004, 1, 1).unwrap();
//! let series = TimeSeries::monthly(start, values).unwrap();
//!
//! let config = SamplerConfig::default()
//!     .num_samples(200)
//!     .tuning_steps(200)
//!     .random_seed(7);
//! let result = ChangePointModel::default().fit(&series, &config).unwrap();
//! let estimate = PosteriorSummarizer::default().summarize(&result, &series).unwrap();
//!
//! assert_eq!(estimate.most_probable_tau, 12);
//! assert_eq!(estimate.change_point_date, NaiveDate::from_ymd_opt(2005, 1, 1).unwrap());
//! ```

pub mod config;
pub mod diagnostics;
pub mod model;
pub mod observer;
mod sampler;
pub mod summary;
pub mod trace;

pub use config::{ModelPriors, SamplerConfig};
pub use diagnostics::{Diagnostics, ParameterDiagnostics, SamplerWarning};
pub use model::{fit_changepoint, ChangePointModel};
pub use observer::{
    CancellationToken, FitEvent, FitObserver, NoopObserver, ProgressInfo, TracingObserver,
};
pub use summary::{
    summarize, ChangePointEstimate, ParameterSummary, PosteriorSummarizer, SummaryConfig,
    TauBin, TauInterval,
};
pub use trace::{ChainTrace, InferenceResult, Parameter, PosteriorSample, RunMetadata};
