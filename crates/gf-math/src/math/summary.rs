//! Descriptive statistics.

use serde::{Deserialize, Serialize};

use super::quantile::{quantile_sorted, sorted_copy};

/// Arithmetic mean. NaN for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator). Zero for a single value, NaN for empty input.
pub fn variance(values: &[f64]) -> f64 {
    match values.len() {
        0 => f64::NAN,
        1 => 0.0,
        n => {
            let m = mean(values);
            values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (n - 1) as f64
        }
    }
}

/// Sample standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Median (linear-interpolated). NaN for empty input.
pub fn median(values: &[f64]) -> f64 {
    quantile_sorted(&sorted_copy(values), 0.5)
}

/// Root mean squared value of residuals.
pub fn rmse(residuals: &[f64]) -> f64 {
    if residuals.is_empty() {
        return f64::NAN;
    }
    (residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64).sqrt()
}

/// Mean absolute value of residuals.
pub fn mae(residuals: &[f64]) -> f64 {
    if residuals.is_empty() {
        return f64::NAN;
    }
    residuals.iter().map(|r| r.abs()).sum::<f64>() / residuals.len() as f64
}

/// Five-number-style summary of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

impl Summary {
    /// Summarize a sample. Returns None for empty input.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sorted = sorted_copy(values);
        Some(Summary {
            n: values.len(),
            mean: mean(values),
            std_dev: std_dev(values),
            min: sorted[0],
            median: quantile_sorted(&sorted, 0.5),
            max: sorted[sorted.len() - 1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_variance() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&v), 5.0);
        assert!((variance(&v) - 32.0 / 7.0).abs() < 1e-12);
        assert!(mean(&[]).is_nan());
        assert_eq!(variance(&[3.0]), 0.0);
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn error_metrics() {
        let r = [1.0, -1.0, 3.0, -3.0];
        assert!((rmse(&r) - 5.0f64.sqrt()).abs() < 1e-12);
        assert_eq!(mae(&r), 2.0);
    }

    #[test]
    fn summary_fields() {
        let s = Summary::of(&[5.0, 1.0, 3.0]).unwrap();
        assert_eq!(s.n, 3);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.median, 3.0);
        assert_eq!(s.max, 5.0);
        assert!(Summary::of(&[]).is_none());
    }
}
