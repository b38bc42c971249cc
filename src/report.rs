//! Dashboard payloads and the change-point analysis report.

use crate::changepoint::ChangePointEstimate;
use crate::core::TimeSeries;
use crate::ingest::{KeyEvent, ISO_DATE_FORMAT};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default distance, in months, at which an event counts as near the change point.
pub const DEFAULT_EVENT_WINDOW_MONTHS: u32 = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Price")]
    pub price: f64,
}

/// Price series with the inferred change-point date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceData {
    pub prices: Vec<PricePoint>,
    pub change_point_date: Option<String>,
}

impl PriceData {
    pub fn new(series: &TimeSeries, estimate: Option<&ChangePointEstimate>) -> Self {
        let prices = series
            .iter()
            .map(|(date, price)| PricePoint {
                date: date.format(ISO_DATE_FORMAT).to_string(),
                price,
            })
            .collect();
        Self {
            prices,
            change_point_date: estimate
                .map(|e| e.change_point_date.format(ISO_DATE_FORMAT).to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Event")]
    pub event: String,
}

/// Events list in the same shape as the price payload.
pub fn event_records(events: &[KeyEvent]) -> Vec<EventRecord> {
    events
        .iter()
        .map(|e| EventRecord {
            date: e.date.format(ISO_DATE_FORMAT).to_string(),
            event: e.event.clone(),
        })
        .collect()
}

/// An event with its signed distance from the change point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyEvent {
    pub date: NaiveDate,
    pub event: String,
    /// Negative when the event precedes the change point.
    pub months_from_change: i32,
}

/// Months from `from` to `to`, ignoring the day of month.
fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    use chrono::Datelike;
    (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32
}

/// Estimate plus the key events that fall near it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub estimate: ChangePointEstimate,
    pub window_months: u32,
    /// Closest first; ties keep date order.
    pub nearby_events: Vec<NearbyEvent>,
    /// Events inside the credible interval of the change point.
    pub events_in_interval: Vec<KeyEvent>,
}

impl AnalysisReport {
    pub fn new(estimate: ChangePointEstimate, events: &[KeyEvent], window_months: u32) -> Self {
        let change = estimate.change_point_date;
        let mut nearby_events: Vec<NearbyEvent> = events
            .iter()
            .map(|e| NearbyEvent {
                date: e.date,
                event: e.event.clone(),
                months_from_change: months_between(change, e.date),
            })
            .filter(|e| e.months_from_change.unsigned_abs() <= window_months)
            .collect();
        nearby_events.sort_by_key(|e| e.months_from_change.unsigned_abs());

        let interval = &estimate.tau_interval;
        let events_in_interval = events
            .iter()
            .filter(|e| {
                months_between(interval.lower_date, e.date) >= 0
                    && months_between(e.date, interval.upper_date) >= 0
            })
            .cloned()
            .collect();

        Self {
            estimate,
            window_months,
            nearby_events,
            events_in_interval,
        }
    }

    /// The event closest to the change point, if any is within the window.
    pub fn closest_event(&self) -> Option<&NearbyEvent> {
        self.nearby_events.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changepoint::{ParameterSummary, TauInterval};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn estimate(date: NaiveDate) -> ChangePointEstimate {
        let flat = ParameterSummary {
            mean: 0.0,
            sd: 0.0,
            ci_lower: 0.0,
            ci_upper: 0.0,
            hdi_lower: 0.0,
            hdi_upper: 0.0,
        };
        ChangePointEstimate {
            most_probable_tau: 3,
            change_point_date: date,
            credible_mass: 0.95,
            tau_interval: TauInterval {
                lower_index: 2,
                upper_index: 4,
                lower_date: ymd(2008, 8, 1),
                upper_date: ymd(2008, 10, 1),
            },
            tau_histogram: Vec::new(),
            tau: flat,
            mu_pre: flat,
            mu_post: flat,
            sigma: flat,
            shift: flat,
            converged: true,
        }
    }

    fn events() -> Vec<KeyEvent> {
        vec![
            KeyEvent {
                date: ymd(1990, 8, 2),
                event: "Invasion of Kuwait".into(),
            },
            KeyEvent {
                date: ymd(2008, 9, 15),
                event: "Lehman Brothers collapse".into(),
            },
            KeyEvent {
                date: ymd(2009, 6, 1),
                event: "Recovery".into(),
            },
        ]
    }

    #[test]
    fn price_data_uses_iso_dates() {
        let series = TimeSeries::monthly(ymd(2008, 1, 1), vec![90.0, 95.0]).unwrap();
        let data = PriceData::new(&series, Some(&estimate(ymd(2008, 2, 1))));
        assert_eq!(data.prices[1].date, "2008-02-01");
        assert_eq!(data.change_point_date.as_deref(), Some("2008-02-01"));

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["prices"][0]["Date"], "2008-01-01");
        assert_eq!(json["prices"][0]["Price"], 90.0);

        assert!(PriceData::new(&series, None).change_point_date.is_none());
    }

    #[test]
    fn report_keeps_events_within_window() {
        let report = AnalysisReport::new(estimate(ymd(2008, 9, 1)), &events(), 12);
        assert_eq!(report.nearby_events.len(), 2);
        let closest = report.closest_event().unwrap();
        assert_eq!(closest.event, "Lehman Brothers collapse");
        assert_eq!(closest.months_from_change, 0);
        assert_eq!(report.nearby_events[1].months_from_change, 9);
        assert_eq!(report.events_in_interval.len(), 1);
    }

    #[test]
    fn events_payload_mirrors_input() {
        let records = event_records(&events());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].date, "1990-08-02");
        let json = serde_json::to_value(&records).unwrap();
        assert_eq!(json[2]["Event"], "Recovery");
    }
}
