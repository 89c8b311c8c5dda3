//! Empirical quantiles and their inverse (percentile rank).
//!
//! Quantiles use linear interpolation between order statistics: the value at
//! probability `q` sits at fractional position `q * (n - 1)` of the sorted
//! sample. `rank_sorted` inverts that mapping, assigning a run of tied values
//! the midpoint of its positions so the rank stays monotonic non-decreasing.

/// Sort a sample ascending using total ordering.
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Value at probability `q` in an ascending sample.
///
/// `q` is clamped to [0, 1]. Returns NaN for an empty sample or NaN `q`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 || q.is_nan() {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }
    let h = q.clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    let a = sorted[lo];
    let b = sorted[hi];
    if frac == 0.0 || a == b {
        return a;
    }
    (a + frac * (b - a)).clamp(a, b)
}

/// Probability in [0, 1] at which `x` sits in an ascending sample.
///
/// Inverse of [`quantile_sorted`] for strictly increasing samples. Values
/// below the minimum map to 0, above the maximum to 1. Returns NaN for an
/// empty sample or NaN `x`.
pub fn rank_sorted(sorted: &[f64], x: f64) -> f64 {
    let n = sorted.len();
    if n == 0 || x.is_nan() {
        return f64::NAN;
    }
    if n == 1 {
        return match x.total_cmp(&sorted[0]) {
            std::cmp::Ordering::Less => 0.0,
            std::cmp::Ordering::Equal => 0.5,
            std::cmp::Ordering::Greater => 1.0,
        };
    }
    let lower = sorted.partition_point(|&v| v < x);
    let upper = sorted.partition_point(|&v| v <= x);
    let last = (n - 1) as f64;

    if upper > lower {
        let mid = (lower + upper - 1) as f64 / 2.0;
        return mid / last;
    }
    if lower == 0 {
        return 0.0;
    }
    if lower == n {
        return 1.0;
    }
    let i = lower - 1;
    let (a, b) = (sorted[i], sorted[lower]);
    let pos = i as f64 + (x - a) / (b - a);
    (pos / last).clamp(0.0, 1.0)
}

/// An immutable empirical distribution over a finite sample.
#[derive(Debug, Clone, PartialEq)]
pub struct EmpiricalDistribution {
    sorted: Vec<f64>,
}

impl EmpiricalDistribution {
    /// Build from a sample. Returns None if the sample is empty or contains
    /// a non-finite value.
    pub fn new(values: &[f64]) -> Option<Self> {
        if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(EmpiricalDistribution {
            sorted: sorted_copy(values),
        })
    }

    /// Value at probability `q` (clamped to [0, 1]).
    pub fn quantile(&self, q: f64) -> f64 {
        quantile_sorted(&self.sorted, q)
    }

    /// Probability in [0, 1] at which `x` sits.
    pub fn rank(&self, x: f64) -> f64 {
        rank_sorted(&self.sorted, x)
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn min(&self) -> f64 {
        self.sorted[0]
    }

    pub fn max(&self) -> f64 {
        self.sorted[self.sorted.len() - 1]
    }

    /// The ascending sample.
    pub fn sorted(&self) -> &[f64] {
        &self.sorted
    }
}
