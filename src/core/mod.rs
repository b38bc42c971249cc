//! Core data structures for dated observation series.

mod time_series;

pub use time_series::TimeSeries;
