//! Daily-to-monthly resampling.

use super::prices::PriceRecord;
use crate::core::TimeSeries;
use crate::error::{ChangePointError, Result};
use chrono::{Datelike, Months, NaiveDate};
use std::collections::BTreeMap;

fn month_start(date: NaiveDate) -> NaiveDate {
    // Day 1 always exists
    date.with_day(1).unwrap_or(date)
}

/// Monthly mean of the records keyed on the first day of each month.
///
/// Every month between the first and last observation is present. Months
/// without a finite price take the previous month's value, and leading gaps
/// take the first available value.
pub fn resample_monthly(records: &[PriceRecord]) -> Result<TimeSeries> {
    let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for record in records {
        let bucket = buckets.entry(month_start(record.date)).or_insert((0.0, 0));
        if record.price.is_finite() {
            bucket.0 += record.price;
            bucket.1 += 1;
        }
    }

    let (first, last) = match (buckets.keys().next(), buckets.keys().next_back()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => {
            return Err(ChangePointError::InsufficientData {
                needed: 1,
                got: 0,
            })
        }
    };

    let mut months: Vec<Option<f64>> = Vec::new();
    let mut month = first;
    while month <= last {
        let mean = buckets
            .get(&month)
            .filter(|(_, count)| *count > 0)
            .map(|(sum, count)| sum / *count as f64);
        months.push(mean);
        month = month.checked_add_months(Months::new(1)).ok_or_else(|| {
            ChangePointError::MalformedSeries(format!("month after {month} is out of range"))
        })?;
    }

    let gaps = months.iter().filter(|m| m.is_none()).count();
    let values = fill_gaps(&months).ok_or_else(|| {
        ChangePointError::MalformedSeries("no finite prices to resample".to_string())
    })?;
    if gaps > 0 {
        tracing::debug!(gaps, "filled months without observations");
    }

    Ok(TimeSeries::monthly(first, values)?.with_label("Price"))
}

/// Forward fill, then back fill. `None` when every slot is empty.
fn fill_gaps(slots: &[Option<f64>]) -> Option<Vec<f64>> {
    let first = slots.iter().flatten().copied().next()?;
    let mut last = first;
    Some(
        slots
            .iter()
            .map(|slot| {
                if let Some(v) = slot {
                    last = *v;
                }
                last
            })
            .collect(),
    )
}
