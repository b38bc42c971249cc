//! Raw daily price files and the processed monthly CSV.

use crate::core::TimeSeries;
use crate::error::{ChangePointError, Result};
use chrono::{Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

/// Date layouts found in raw price files.
pub const PRICE_DATE_FORMATS: [&str; 4] = ["%d-%b-%y", "%b %d, %Y", "%Y-%m-%d", "%m/%d/%Y"];

/// Format of dates in processed files and report payloads.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// One observation of the raw daily series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
struct RawPriceRow {
    #[serde(rename = "Date")]
    date: String,
    /// Blank cells read as `None`.
    #[serde(rename = "Price")]
    price: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ProcessedRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Price")]
    price: f64,
}

/// Parse a raw price date in any known layout.
///
/// Two-digit years can land in the future (`20-May-68` reads as 2068);
/// such dates are moved back one century relative to `reference_year`.
pub fn parse_price_date(raw: &str, reference_year: i32) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date = PRICE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())?;
    if date.year() > reference_year {
        date.checked_sub_months(Months::new(1200))
    } else {
        Some(date)
    }
}

/// Read `Date,Price` rows. A blank price becomes NaN and is dropped by
/// resampling.
pub fn read_price_records<R: Read>(reader: R, reference_year: i32) -> Result<Vec<PriceRecord>> {
    let mut csv = ::csv::ReaderBuilder::new()
        .trim(::csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in csv.deserialize::<RawPriceRow>() {
        let row = row?;
        let date = parse_price_date(&row.date, reference_year).ok_or_else(|| {
            ChangePointError::Parse {
                // Header is line 1
                line: records.len() + 2,
                message: format!("unrecognised date '{}'", row.date),
            }
        })?;
        records.push(PriceRecord {
            date,
            price: row.price.unwrap_or(f64::NAN),
        });
    }
    Ok(records)
}

/// Load the raw price file, fixing two-digit years against the current year.
pub fn load_price_records(path: &Path) -> Result<Vec<PriceRecord>> {
    let file = std::fs::File::open(path)?;
    let records = read_price_records(file, Utc::now().year())?;
    tracing::info!(path = %path.display(), rows = records.len(), "loaded price records");
    Ok(records)
}

/// Write a monthly series as `Date,Price` with ISO dates.
pub fn write_processed<W: Write>(series: &TimeSeries, writer: W) -> Result<()> {
    let mut csv = ::csv::Writer::from_writer(writer);
    for (date, price) in series.iter() {
        csv.serialize(ProcessedRow {
            date: date.format(ISO_DATE_FORMAT).to_string(),
            price,
        })?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the processed series to `path`, creating parent directories.
pub fn write_processed_csv(series: &TimeSeries, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_processed(series, file)?;
    tracing::info!(path = %path.display(), months = series.len(), "wrote processed series");
    Ok(())
}

/// Read a processed `Date,Price` file back into a series.
pub fn read_processed<R: Read>(reader: R) -> Result<TimeSeries> {
    let mut csv = ::csv::ReaderBuilder::new()
        .trim(::csv::Trim::All)
        .from_reader(reader);

    let mut dates = Vec::new();
    let mut values = Vec::new();
    for row in csv.deserialize::<RawPriceRow>() {
        let row = row?;
        let date = NaiveDate::parse_from_str(&row.date, ISO_DATE_FORMAT).map_err(|e| {
            ChangePointError::Parse {
                line: dates.len() + 2,
                message: format!("'{}': {e}", row.date),
            }
        })?;
        dates.push(date);
        values.push(row.price.unwrap_or(f64::NAN));
    }
    Ok(TimeSeries::new(dates, values)?.with_label("Price"))
}

pub fn load_processed_csv(path: &Path) -> Result<TimeSeries> {
    let file = std::fs::File::open(path)?;
    read_processed(file)
}
