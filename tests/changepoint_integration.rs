//! End-to-end tests for fitting and summarizing the change-point model.

use approx::assert_relative_eq;
use brent_changepoint::changepoint::{
    fit_changepoint, summarize, CancellationToken, ChangePointModel, FitEvent, InferenceResult,
    NoopObserver, PosteriorSummarizer, SamplerConfig, SummaryConfig,
};
use brent_changepoint::core::TimeSeries;
use brent_changepoint::ChangePointError;
use chrono::NaiveDate;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::sync::Mutex;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1987, 5, 1).unwrap()
}

/// Two regimes with Gaussian noise of the given scale.
fn step_series(pre: (usize, f64), post: (usize, f64), noise: f64, seed: u64) -> TimeSeries {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let normal = Normal::new(0.0, noise).unwrap();
    let values: Vec<f64> = std::iter::repeat(pre.1)
        .take(pre.0)
        .chain(std::iter::repeat(post.1).take(post.0))
        .map(|level| level + normal.sample(&mut rng))
        .collect();
    TimeSeries::monthly(start(), values).unwrap()
}

fn quick_config() -> SamplerConfig {
    SamplerConfig::default()
        .num_samples(300)
        .tuning_steps(300)
        .progress_interval(0)
}

#[test]
fn clear_shift_is_located() {
    let series = step_series((60, 10.0), (60, 50.0), 1.0, 11);
    let result = fit_changepoint(&series, &SamplerConfig::default()).unwrap();
    let estimate = summarize(&result, &series).unwrap();

    let tau = estimate.most_probable_tau as i64;
    assert!((tau - 60).abs() <= 3, "tau = {tau}");
    assert_eq!(estimate.change_point_date, series.dates()[estimate.most_probable_tau]);
    assert_relative_eq!(estimate.mu_pre.mean, 10.0, epsilon = 0.5);
    assert_relative_eq!(estimate.mu_post.mean, 50.0, epsilon = 0.5);
    assert!(estimate.sigma.mean > 0.7 && estimate.sigma.mean < 1.4);
    assert!(estimate.shift.ci_lower > 35.0);
    assert!(estimate.tau.sd < 2.0);
}

#[test]
fn flat_series_leaves_change_point_uncertain() {
    let series = step_series((60, 30.0), (60, 30.0), 1.0, 5);
    let result = fit_changepoint(&series, &SamplerConfig::default()).unwrap();
    let estimate = summarize(&result, &series).unwrap();

    assert!(estimate.tau.sd > 5.0, "tau sd = {}", estimate.tau.sd);
    let width = estimate.tau_interval.upper_index - estimate.tau_interval.lower_index;
    assert!(width > 20, "interval width = {width}");
}

#[test]
fn estimates_always_index_the_series() {
    let series = step_series((20, 70.0), (15, 95.0), 4.0, 3);
    let result = fit_changepoint(&series, &quick_config()).unwrap();
    assert!(result.tau_draws().iter().all(|&t| t < series.len()));
    assert!(result.samples().all(|s| s.sigma > 0.0));
    let estimate = summarize(&result, &series).unwrap();
    assert!(estimate.most_probable_tau < series.len());
}

#[test]
fn shift_at_last_month_is_found() {
    let mut values: Vec<f64> = (0..59).map(|i| 10.0 + ((i * 7) % 5) as f64 * 0.1).collect();
    values.push(50.0);
    let series = TimeSeries::monthly(start(), values).unwrap();

    let result = fit_changepoint(&series, &SamplerConfig::default()).unwrap();
    let estimate = summarize(&result, &series).unwrap();
    assert_eq!(estimate.most_probable_tau, 59);
    assert_eq!(estimate.change_point_date, series.dates()[59]);
}

#[test]
fn same_seed_reproduces_draws() {
    let series = step_series((25, 20.0), (25, 35.0), 2.0, 8);
    let config = quick_config().random_seed(1234);

    let a = fit_changepoint(&series, &config).unwrap();
    let b = fit_changepoint(&series, &config).unwrap();
    assert_eq!(a.chains(), b.chains());
    assert_eq!(summarize(&a, &series).unwrap(), summarize(&b, &series).unwrap());

    let c = fit_changepoint(&series, &config.clone().random_seed(4321)).unwrap();
    assert_ne!(a.chains(), c.chains());
}

#[test]
fn chains_use_distinct_streams() {
    let series = step_series((25, 20.0), (25, 35.0), 2.0, 8);
    let result = fit_changepoint(&series, &quick_config().num_chains(3)).unwrap();
    assert_eq!(result.chains().len(), 3);
    assert_ne!(result.chains()[0].sigma, result.chains()[1].sigma);
    assert_ne!(result.chains()[1].sigma, result.chains()[2].sigma);
    assert_eq!(result.num_draws(), 900);
}

#[test]
fn invalid_inputs_are_rejected_before_sampling() {
    let one = TimeSeries::monthly(start(), vec![42.0]).unwrap();
    assert_eq!(
        fit_changepoint(&one, &SamplerConfig::default()).unwrap_err(),
        ChangePointError::InsufficientData { needed: 2, got: 1 }
    );

    let empty = TimeSeries::new(Vec::new(), Vec::new()).unwrap();
    assert!(matches!(
        fit_changepoint(&empty, &SamplerConfig::default()),
        Err(ChangePointError::InsufficientData { .. })
    ));

    let series = step_series((5, 1.0), (5, 2.0), 0.1, 1);
    assert!(matches!(
        fit_changepoint(&series, &SamplerConfig::default().num_samples(0)),
        Err(ChangePointError::InvalidConfig(_))
    ));

    let events = Mutex::new(Vec::new());
    let observer = |e: &FitEvent| events.lock().unwrap().push(format!("{e:?}"));
    let err = ChangePointModel::default()
        .fit_with(
            &series,
            &SamplerConfig::default().num_chains(0),
            &observer,
            &CancellationToken::new(),
        )
        .unwrap_err();
    assert!(matches!(err, ChangePointError::InvalidConfig(_)));
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn two_point_series_fits() {
    let series = TimeSeries::monthly(start(), vec![10.0, 12.0]).unwrap();
    let result = fit_changepoint(&series, &quick_config()).unwrap();
    let estimate = summarize(&result, &series).unwrap();
    assert!(estimate.most_probable_tau <= 1);
}

#[test]
fn summarize_is_idempotent() {
    let series = step_series((30, 80.0), (30, 60.0), 3.0, 21);
    let result = fit_changepoint(&series, &quick_config()).unwrap();
    let summarizer = PosteriorSummarizer::new(SummaryConfig::default().credible_mass(0.9)).unwrap();
    let first = summarizer.summarize(&result, &series).unwrap();
    let second = summarizer.summarize(&result, &series).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.credible_mass, 0.9);
}

#[test]
fn result_rejects_a_different_series() {
    let series = step_series((30, 80.0), (30, 60.0), 3.0, 21);
    let result = fit_changepoint(&series, &quick_config()).unwrap();
    let other = step_series((30, 80.0), (31, 60.0), 3.0, 21);
    assert!(matches!(
        summarize(&result, &other),
        Err(ChangePointError::SeriesMismatch { .. })
    ));
}

#[test]
fn persisted_result_gives_same_estimate() {
    let series = step_series((40, 100.0), (40, 60.0), 5.0, 2);
    let result = fit_changepoint(&series, &quick_config()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.json");
    result.write_json(&path).unwrap();
    let restored = InferenceResult::read_json(&path).unwrap();

    let a = summarize(&result, &series).unwrap();
    let b = summarize(&restored, &series).unwrap();
    assert_eq!(a.most_probable_tau, b.most_probable_tau);
    assert_eq!(a.change_point_date, b.change_point_date);
    assert_eq!(a.tau_histogram, b.tau_histogram);
    assert_relative_eq!(a.mu_pre.mean, b.mu_pre.mean, epsilon = 1e-9);
    assert_relative_eq!(a.sigma.mean, b.sigma.mean, epsilon = 1e-9);
    assert_eq!(restored.metadata(), result.metadata());
}

#[test]
fn observer_sees_lifecycle_events() {
    let series = step_series((20, 5.0), (20, 9.0), 0.5, 4);
    let config = quick_config().progress_interval(100);
    let events = Mutex::new(Vec::new());
    let observer = |e: &FitEvent| events.lock().unwrap().push(e.clone());

    ChangePointModel::default()
        .fit_with(&series, &config, &observer, &CancellationToken::new())
        .unwrap();

    let events = events.into_inner().unwrap();
    assert!(matches!(events.first(), Some(FitEvent::Started { series_len: 40, .. })));
    assert!(matches!(events.last(), Some(FitEvent::Finished { draws: 600, .. })));
    let finished_chains = events
        .iter()
        .filter(|e| matches!(e, FitEvent::ChainFinished { .. }))
        .count();
    assert_eq!(finished_chains, 2);
    // 600 iterations per chain, one event every 100
    let progress = events
        .iter()
        .filter(|e| matches!(e, FitEvent::Progress(_)))
        .count();
    assert_eq!(progress, 12);
}

#[test]
fn cancellation_stops_the_fit() {
    let series = step_series((20, 5.0), (20, 9.0), 0.5, 4);
    let cancel = CancellationToken::new();
    let config = quick_config().progress_interval(10);
    let observer = |e: &FitEvent| {
        if matches!(e, FitEvent::Progress(_)) {
            cancel.cancel();
        }
    };

    let err = ChangePointModel::default()
        .fit_with(&series, &config, &observer, &cancel)
        .unwrap_err();
    assert_eq!(err, ChangePointError::Cancelled);
    assert!(cancel.is_cancelled());

    let err = ChangePointModel::default()
        .fit_with(&series, &config, &NoopObserver, &cancel)
        .unwrap_err();
    assert_eq!(err, ChangePointError::Cancelled);
}
