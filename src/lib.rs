//! # brent-changepoint
//!
//! Bayesian single change-point detection for monthly Brent crude prices.
//!
//! The crate prepares the raw daily price file into a contiguous monthly
//! series, samples the posterior of a model with one shift in the mean,
//! and summarizes where that shift most probably happened, dated and set
//! against a list of key events.
//!
//! ```
//! use brent_changepoint::prelude::*;
//! use chrono::NaiveDate;
//!
//! let values: Vec<f64> = (0..30)
//!     .map(|i| {
//!         let level = if i < 18 { 60.0 } else { 100.0 };
//!         level + (i % 4) as f64
//!     })
//!     .collect();
//! let series = TimeSeries::monthly(NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(), values).unwrap();
//!
//! let config = SamplerConfig::default().num_samples(300).tuning_steps(300);
//! let result = ChangePointModel::default().fit(&series, &config).unwrap();
//! let estimate = summarize(&result, &series).unwrap();
//! assert_eq!(estimate.change_point_date, NaiveDate::from_ymd_opt(2011, 7, 1).unwrap());
//! ```

pub mod changepoint;
pub mod config;
pub mod core;
pub mod error;
pub mod ingest;
pub mod report;
pub mod utils;

pub use error::{ChangePointError, Result};

pub mod prelude {
    pub use crate::changepoint::{
        fit_changepoint, summarize, ChangePointEstimate, ChangePointModel, InferenceResult,
        ModelPriors, PosteriorSummarizer, SamplerConfig, SummaryConfig,
    };
    pub use crate::config::{ProjectPaths, RunConfig};
    pub use crate::core::TimeSeries;
    pub use crate::error::{ChangePointError, Result};
}
