//! TimeSeries data structure for monthly observations.

use crate::error::{ChangePointError, Result};
use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

/// A univariate series of dated observations.
///
/// Dates are strictly increasing and every value is finite. The series is
/// immutable once built; inference results record its length and date span
/// so they can refuse to be applied to a different series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
    label: Option<String>,
}

impl TimeSeries {
    /// Create a new series, validating ordering and finiteness.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ChangePointError::DimensionMismatch {
                expected: dates.len(),
                got: values.len(),
            });
        }

        for i in 1..dates.len() {
            if dates[i] <= dates[i - 1] {
                return Err(ChangePointError::MalformedSeries(format!(
                    "dates must be strictly increasing ({} follows {})",
                    dates[i],
                    dates[i - 1]
                )));
            }
        }

        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ChangePointError::MalformedSeries(format!(
                "non-finite value {} at index {}",
                values[pos], pos
            )));
        }

        Ok(Self {
            dates,
            values,
            label: None,
        })
    }

    /// Create a contiguous monthly series starting at the month of `start`.
    ///
    /// Each observation is dated on the first day of its month.
    pub fn monthly(start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        let first = start.with_day(1).unwrap_or(start);
        let dates = (0..values.len())
            .map(|i| {
                first.checked_add_months(Months::new(i as u32)).ok_or_else(|| {
                    ChangePointError::MalformedSeries(format!(
                        "month offset {i} from {first} is out of range"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(dates, values)
    }

    /// Attach a descriptive label (e.g. the column name).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Get the number of observations.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Check if the series is empty.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Get the observation dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Get the observed values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Get the date at `index`.
    pub fn date(&self, index: usize) -> Result<NaiveDate> {
        self.dates
            .get(index)
            .copied()
            .ok_or(ChangePointError::OutOfRangeEstimate {
                index,
                size: self.len(),
            })
    }

    /// Iterate over `(date, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Arithmetic mean of the values (NaN for an empty series).
    pub fn mean(&self) -> f64 {
        crate::utils::stats::mean(&self.values)
    }

    /// First and last date, if the series is non-empty.
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.dates.first()?, *self.dates.last()?))
    }

    /// Short identity used to match inference results to their series.
    pub fn fingerprint(&self) -> String {
        match self.span() {
            Some((first, last)) => format!("{} points {}..{}", self.len(), first, last),
            None => "0 points".to_string(),
        }
    }

    /// Check that consecutive observations are exactly one calendar month apart.
    pub fn is_contiguous_monthly(&self) -> bool {
        self.dates.windows(2).all(|w| {
            let months_a = w[0].year() * 12 + w[0].month0() as i32;
            let months_b = w[1].year() * 12 + w[1].month0() as i32;
            months_b - months_a == 1
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn monthly_builds_month_starts() {
        let ts = TimeSeries::monthly(ymd(1987, 5, 20), vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(ts.len(), 3);
        assert_eq!(ts.dates()[0], ymd(1987, 5, 1));
        assert_eq!(ts.dates()[2], ymd(1987, 7, 1));
        assert!(ts.is_contiguous_monthly());
    }

    #[test]
    fn monthly_crosses_year_boundary() {
        let ts = TimeSeries::monthly(ymd(2019, 11, 1), vec![1.0; 4]).unwrap();
        assert_eq!(ts.dates()[3], ymd(2020, 2, 1));
    }

    #[test]
    fn rejects_non_increasing_dates() {
        let dates = vec![ymd(2020, 1, 1), ymd(2020, 3, 1), ymd(2020, 2, 1)];
        let err = TimeSeries::new(dates, vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, ChangePointError::MalformedSeries(_)));

        let dates = vec![ymd(2020, 1, 1), ymd(2020, 1, 1)];
        assert!(TimeSeries::new(dates, vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn rejects_non_finite_values() {
        let err = TimeSeries::monthly(ymd(2020, 1, 1), vec![1.0, f64::NAN]).unwrap_err();
        assert!(matches!(err, ChangePointError::MalformedSeries(_)));

        let err = TimeSeries::monthly(ymd(2020, 1, 1), vec![f64::INFINITY]).unwrap_err();
        assert!(matches!(err, ChangePointError::MalformedSeries(_)));
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = TimeSeries::new(vec![ymd(2020, 1, 1)], vec![1.0, 2.0]).unwrap_err();
        assert_eq!(err, ChangePointError::DimensionMismatch { expected: 1, got: 2 });
    }

    #[test]
    fn date_lookup_is_bounds_checked() {
        let ts = TimeSeries::monthly(ymd(2020, 1, 1), vec![1.0, 2.0]).unwrap();
        assert_eq!(ts.date(1).unwrap(), ymd(2020, 2, 1));
        assert_eq!(
            ts.date(2).unwrap_err(),
            ChangePointError::OutOfRangeEstimate { index: 2, size: 2 }
        );
    }

    #[test]
    fn gaps_are_detected() {
        let dates = vec![ymd(2020, 1, 1), ymd(2020, 3, 1)];
        let ts = TimeSeries::new(dates, vec![1.0, 2.0]).unwrap();
        assert!(!ts.is_contiguous_monthly());
    }

    #[test]
    fn mean_and_fingerprint() {
        let ts = TimeSeries::monthly(ymd(2000, 1, 1), vec![1.0, 2.0, 3.0, 6.0])
            .unwrap()
            .with_label("Price");
        assert_relative_eq!(ts.mean(), 3.0, epsilon = 1e-12);
        assert_eq!(ts.fingerprint(), "4 points 2000-01-01..2000-04-01");
        assert_eq!(ts.label(), Some("Price"));
    }
}
