//! Key geopolitical and economic events.

use super::prices::ISO_DATE_FORMAT;
use crate::error::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// A dated event to compare against the inferred change point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub date: NaiveDate,
    pub event: String,
}

#[derive(Debug, Deserialize)]
struct RawEventRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Event")]
    event: String,
}

/// Read `Date,Event` rows, sorted by date.
///
/// Rows whose date does not parse are skipped with a warning.
pub fn read_key_events<R: Read>(reader: R) -> Result<Vec<KeyEvent>> {
    let mut csv = ::csv::ReaderBuilder::new()
        .trim(::csv::Trim::All)
        .from_reader(reader);

    let mut events = Vec::new();
    for (i, row) in csv.deserialize::<RawEventRow>().enumerate() {
        let row = row?;
        match NaiveDate::parse_from_str(&row.date, ISO_DATE_FORMAT) {
            Ok(date) => events.push(KeyEvent {
                date,
                event: row.event,
            }),
            Err(e) => tracing::warn!(
                line = i + 2,
                date = %row.date,
                error = %e,
                "skipping event with unparseable date"
            ),
        }
    }
    events.sort_by_key(|e| e.date);
    Ok(events)
}

pub fn load_key_events(path: &Path) -> Result<Vec<KeyEvent>> {
    let file = std::fs::File::open(path)?;
    let events = read_key_events(file)?;
    tracing::info!(path = %path.display(), events = events.len(), "loaded key events");
    Ok(events)
}
