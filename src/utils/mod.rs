//! Numeric utilities shared by the sampler and the summarizer.

pub mod stats;

pub use stats::{
    effective_sample_size, equal_tailed_interval, highest_density_interval, mean, median,
    split_r_hat, std_dev,
};
