//! Loading and preparing the raw Brent price and event files.
//!
//! The raw file holds daily prices with mixed date layouts; preparation
//! turns it into a contiguous monthly [`TimeSeries`] suitable for the
//! change-point model.

mod events;
mod prices;
mod resample;

pub use events::{load_key_events, read_key_events, KeyEvent};
pub use prices::{
    load_price_records, load_processed_csv, parse_price_date, read_price_records,
    read_processed, write_processed, write_processed_csv, PriceRecord, ISO_DATE_FORMAT,
    PRICE_DATE_FORMATS,
};
pub use resample::resample_monthly;

use crate::core::TimeSeries;
use crate::error::Result;
use std::path::Path;

/// Load raw prices and events, returning the monthly series and sorted events.
pub fn prepare_data(raw_prices: &Path, events: &Path) -> Result<(TimeSeries, Vec<KeyEvent>)> {
    let records = load_price_records(raw_prices)?;
    let series = resample_monthly(&records)?;
    let events = load_key_events(events)?;
    if let Some((first, last)) = series.span() {
        tracing::info!(months = series.len(), %first, %last, "prepared monthly series");
    }
    Ok((series, events))
}
