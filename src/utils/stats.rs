//! Statistical utility functions for posterior draws.

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the variance of a slice (sample variance with n-1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

/// Calculate the standard deviation of a slice.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Return a sorted copy of the values.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted
}

/// Calculate the median of a slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let sorted = sorted(values);
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Quantile of already sorted values with linear interpolation between
/// order statistics (`q` in `[0, 1]`).
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Equal-tailed interval holding `mass` of the draws.
pub fn equal_tailed_interval(values: &[f64], mass: f64) -> (f64, f64) {
    let sorted = sorted(values);
    let tail = (1.0 - mass) / 2.0;
    (quantile_sorted(&sorted, tail), quantile_sorted(&sorted, 1.0 - tail))
}

/// Highest-density interval: the narrowest window of sorted draws that
/// holds `floor(mass * n)` of them (at least one), as ArviZ does.
pub fn highest_density_interval(values: &[f64], mass: f64) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let sorted = sorted(values);
    let n = sorted.len();
    let width = ((mass * n as f64).floor() as usize).clamp(1, n);
    let last_start = n - width;

    let mut best = (sorted[0], sorted[width - 1]);
    for start in 0..=last_start {
        let lo = sorted[start];
        let hi = sorted[start + width - 1];
        if hi - lo < best.1 - best.0 {
            best = (lo, hi);
        }
    }
    best
}

/// Compute lag-k autocorrelation given a precomputed mean and variance.
fn autocorrelation_at(chain: &[f64], k: usize, mean: f64, var: f64) -> f64 {
    let n = chain.len();
    if k >= n {
        return 0.0;
    }

    let cov: f64 = (0..(n - k))
        .map(|i| (chain[i] - mean) * (chain[i + k] - mean))
        .sum::<f64>()
        / (n - k) as f64;

    cov / var
}

/// Effective sample size of a single chain accounting for autocorrelation.
///
/// ESS = N / (1 + 2 * Σ_k ρ_k), truncating the sum at the first lag whose
/// autocorrelation drops below 0.05.
pub fn effective_sample_size(chain: &[f64]) -> f64 {
    let n = chain.len();
    if n < 2 {
        return n as f64;
    }

    let m = mean(chain);
    let var: f64 = chain.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / n as f64;

    if var < 1e-12 {
        return n as f64;
    }

    let max_lag = (n / 2).min(1000);
    let mut sum_rho = 0.0;
    for k in 1..=max_lag {
        let rho_k = autocorrelation_at(chain, k, m, var);
        if rho_k < 0.05 {
            break;
        }
        sum_rho += rho_k;
    }

    (n as f64 / (1.0 + 2.0 * sum_rho)).min(n as f64)
}

/// Split R-hat (Gelman-Rubin) over a set of chains.
///
/// Each chain is halved so a single chain still yields a statistic. Returns
/// NaN when fewer than four draws per chain are available and 1.0 when every
/// draw is identical.
pub fn split_r_hat(chains: &[Vec<f64>]) -> f64 {
    let halves: Vec<&[f64]> = chains
        .iter()
        .flat_map(|c| {
            let half = c.len() / 2;
            [&c[..half], &c[c.len() - half..]]
        })
        .collect();

    let m = halves.len();
    let n = halves.iter().map(|h| h.len()).min().unwrap_or(0);
    if m < 2 || n < 2 {
        return f64::NAN;
    }

    let means: Vec<f64> = halves.iter().map(|h| mean(&h[..n])).collect();
    let within = halves.iter().map(|h| variance(&h[..n])).sum::<f64>() / m as f64;
    let between = n as f64 * variance(&means);

    if within <= 0.0 {
        return if between <= 0.0 { 1.0 } else { f64::INFINITY };
    }

    let var_plus = (n as f64 - 1.0) / n as f64 * within + between / n as f64;
    (var_plus / within).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_calculates_correctly() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3.0, epsilon = 1e-10);
        assert_relative_eq!(mean(&[10.0]), 10.0, epsilon = 1e-10);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn variance_calculates_correctly() {
        // Sample variance of [1, 2, 3, 4, 5] = 2.5
        assert_relative_eq!(variance(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2.5, epsilon = 1e-10);
        assert!(variance(&[1.0]).is_nan());
        assert!(variance(&[]).is_nan());
    }

    #[test]
    fn std_dev_calculates_correctly() {
        assert_relative_eq!(
            std_dev(&[1.0, 2.0, 3.0, 4.0, 5.0]),
            2.5_f64.sqrt(),
            epsilon = 1e-10
        );
    }

    #[test]
    fn median_odd_and_even() {
        assert_relative_eq!(median(&[3.0, 1.0, 2.0]), 2.0, epsilon = 1e-10);
        assert_relative_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5, epsilon = 1e-10);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let sorted = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert_relative_eq!(quantile_sorted(&sorted, 0.0), 0.0);
        assert_relative_eq!(quantile_sorted(&sorted, 1.0), 40.0);
        assert_relative_eq!(quantile_sorted(&sorted, 0.5), 20.0);
        assert_relative_eq!(quantile_sorted(&sorted, 0.125), 5.0, epsilon = 1e-10);
    }

    #[test]
    fn equal_tailed_interval_of_uniform_grid() {
        let values: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        let (lo, hi) = equal_tailed_interval(&values, 0.95);
        assert_relative_eq!(lo, 2.5, epsilon = 1e-10);
        assert_relative_eq!(hi, 97.5, epsilon = 1e-10);
    }

    #[test]
    fn hdi_prefers_dense_region() {
        // Most mass near 0, a long sparse right tail
        let mut values = vec![0.0; 90];
        values.extend((1..=10).map(|i| i as f64 * 100.0));
        let (lo, hi) = highest_density_interval(&values, 0.9);
        assert_relative_eq!(lo, 0.0);
        assert_relative_eq!(hi, 0.0);

        let (elo, ehi) = equal_tailed_interval(&values, 0.9);
        assert!(ehi - elo > hi - lo);
    }

    #[test]
    fn autocorrelation_of_alternating_series() {
        let values = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        assert_relative_eq!(autocorrelation_at(&values, 1, 0.0, 1.0), -1.0, epsilon = 1e-12);
        assert_relative_eq!(autocorrelation_at(&values, 2, 0.0, 1.0), 1.0, epsilon = 1e-12);
        assert_eq!(autocorrelation_at(&values, 10, 0.0, 1.0), 0.0);
    }

    #[test]
    fn hdi_holds_floor_of_mass() {
        // floor(0.95 * 10) = 9 of 10 draws
        let values: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let (lo, hi) = highest_density_interval(&values, 0.95);
        let inside = values.iter().filter(|&&v| v >= lo && v <= hi).count();
        assert_eq!(inside, 9);
    }

    #[test]
    fn ess_is_reduced_by_autocorrelation() {
        let chain: Vec<f64> = (0..100).map(|i| (i as f64 * 0.1).sin()).collect();
        let ess = effective_sample_size(&chain);
        assert!(ess < 100.0);
        assert!(ess > 0.0);
    }

    #[test]
    fn ess_of_constant_chain_is_length() {
        assert_relative_eq!(effective_sample_size(&[2.0; 50]), 50.0);
    }

    #[test]
    fn r_hat_near_one_for_matching_chains() {
        let a: Vec<f64> = (0..200).map(|i| ((i * 37) % 17) as f64).collect();
        let b: Vec<f64> = (0..200).map(|i| ((i * 53) % 17) as f64).collect();
        let r = split_r_hat(&[a, b]);
        assert!(r < 1.05, "r_hat = {r}");
    }

    #[test]
    fn r_hat_flags_separated_chains() {
        let a: Vec<f64> = (0..100).map(|i| (i % 3) as f64).collect();
        let b: Vec<f64> = (0..100).map(|i| 100.0 + (i % 3) as f64).collect();
        assert!(split_r_hat(&[a, b]) > 1.5);
    }

    #[test]
    fn r_hat_edge_cases() {
        assert!(split_r_hat(&[vec![1.0, 2.0]]).is_nan());
        assert_relative_eq!(split_r_hat(&[vec![5.0; 10], vec![5.0; 10]]), 1.0);
    }
}
