//! Descriptive statistics over hour samples.
//!
//! All functions ignore non-finite values and never reorder the caller's
//! data, so the same samples always give the same result.

use crate::estimate::SampleStats;

fn finite_sorted(samples: &[f64]) -> Vec<f64> {
    let mut values: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

/// Arithmetic mean, `None` when there are no finite samples.
pub fn mean(samples: &[f64]) -> Option<f64> {
    let values: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Percentile `p` in `[0, 1]` with linear interpolation between closest ranks.
pub fn percentile(samples: &[f64], p: f64) -> Option<f64> {
    let values = finite_sorted(samples);
    percentile_sorted(&values, p)
}

fn percentile_sorted(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let p = p.clamp(0.0, 1.0);
    let rank = p * (values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(values[lower] + (values[upper] - values[lower]) * weight)
}

/// Median (50th percentile).
pub fn median(samples: &[f64]) -> Option<f64> {
    percentile(samples, 0.5)
}

/// Sample standard deviation (`n - 1`), zero for a single sample.
pub fn std_dev(samples: &[f64]) -> Option<f64> {
    let values: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    let m = mean(&values)?;
    if values.len() < 2 {
        return Some(0.0);
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Relative deviation of `value` from `reference`.
///
/// A zero reference gives infinity for any non-zero value and zero otherwise.
pub fn relative_deviation(value: f64, reference: f64) -> f64 {
    if reference == 0.0 {
        if value == 0.0 { 0.0 } else { f64::INFINITY }
    } else {
        ((value - reference) / reference).abs()
    }
}

impl SampleStats {
    /// Compute statistics, `None` when there are no finite samples.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let values = finite_sorted(samples);
        let first = *values.first()?;
        let last = *values.last()?;

        Some(Self {
            count: values.len(),
            mean: mean(&values)?,
            median: percentile_sorted(&values, 0.5)?,
            p80: percentile_sorted(&values, 0.8)?,
            std_dev: std_dev(&values)?,
            min: first,
            max: last,
        })
    }
}
