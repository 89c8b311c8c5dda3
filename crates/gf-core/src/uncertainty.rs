//! Bootstrap uncertainty around the model's prediction.
//!
//! Each iteration resamples the corpus with replacement, refits the four
//! coefficients by least squares and evaluates the refit at the fixed query.
//! Iterations are independent: a master RNG seeded once per call hands every
//! iteration its own seed up front, iterations run as a rayon parallel map,
//! and the ordered collection is the aggregation barrier. Results are
//! bit-identical for a given seed regardless of thread count.

use gf_common::{Error, Factor, FactorScores, Result};
use gf_config::{BootstrapPolicy, IntervalKind, TierPolicy};
use gf_math::{fit_ols, quantile_sorted, sorted_copy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::ThreadPool;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::guard::{ExtrapolationGuard, ExtrapolationLevel};
use crate::model::RegressionModel;

/// Observations needed to refit an intercept and four coefficients.
pub const MIN_BOOTSTRAP_OBSERVATIONS: usize = Factor::COUNT + 1;

/// Confidence tier of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    /// Tier from interval width relative to the model's out-of-sample error.
    pub fn from_width(width: f64, error_scale: f64, policy: &TierPolicy) -> Self {
        if width <= policy.high_width_multiple * error_scale {
            ConfidenceTier::High
        } else if width <= policy.medium_width_multiple * error_scale {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    /// One level lower; Low stays Low.
    pub fn downgrade(self) -> Self {
        match self {
            ConfidenceTier::High => ConfidenceTier::Medium,
            ConfidenceTier::Medium | ConfidenceTier::Low => ConfidenceTier::Low,
        }
    }
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceTier::High => write!(f, "high"),
            ConfidenceTier::Medium => write!(f, "medium"),
            ConfidenceTier::Low => write!(f, "low"),
        }
    }
}

/// Per-request bootstrap parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapOptions {
    pub iterations: usize,
    pub confidence: f64,
    pub interval: IntervalKind,
    /// Fixed seed for reproducible output. None draws fresh entropy.
    pub seed: Option<u64>,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        BootstrapOptions::from_policy(&BootstrapPolicy::default())
    }
}

impl BootstrapOptions {
    pub fn from_policy(policy: &BootstrapPolicy) -> Self {
        BootstrapOptions {
            iterations: policy.iterations,
            confidence: policy.confidence,
            interval: policy.interval,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_interval(mut self, interval: IntervalKind) -> Self {
        self.interval = interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::invalid_input("iterations", "must be at least 1"));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(Error::invalid_input(
                "confidence",
                format!("must be in (0, 1), got {}", self.confidence),
            ));
        }
        Ok(())
    }
}

/// A prediction qualified by its interval, tier and extrapolation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PredictionResult {
    /// Mean of the bootstrap distribution.
    pub point_estimate: f64,
    pub lower: f64,
    pub upper: f64,
    pub confidence: f64,
    pub interval: IntervalKind,
    pub tier: ConfidenceTier,
    pub is_extrapolating: bool,
    pub severity: f64,
    pub extrapolation_level: ExtrapolationLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_message: Option<String>,
    /// The loaded model's own prediction at the query.
    pub model_estimate: f64,
    /// The standardized query the prediction was made at.
    pub standardized: FactorScores,
    /// Iterations that produced an estimate.
    pub iterations: usize,
    /// Resamples skipped because their least-squares system was singular.
    pub skipped_resamples: usize,
    /// Seed of the master RNG; pass it back to reproduce this result.
    pub seed: u64,
}

impl PredictionResult {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, outcome: f64) -> bool {
        self.lower <= outcome && outcome <= self.upper
    }
}

/// Bootstrap estimator borrowing one snapshot's corpus, model and guard.
pub struct UncertaintyEstimator<'a> {
    rows: &'a [[f64; Factor::COUNT]],
    outcomes: &'a [f64],
    model: &'a RegressionModel,
    guard: &'a ExtrapolationGuard,
    tiers: &'a TierPolicy,
    pool: Option<&'a ThreadPool>,
}

impl<'a> UncertaintyEstimator<'a> {
    pub fn new(
        rows: &'a [[f64; Factor::COUNT]],
        outcomes: &'a [f64],
        model: &'a RegressionModel,
        guard: &'a ExtrapolationGuard,
        tiers: &'a TierPolicy,
    ) -> Self {
        UncertaintyEstimator {
            rows,
            outcomes,
            model,
            guard,
            tiers,
            pool: None,
        }
    }

    /// Run iterations on a dedicated pool instead of the global one.
    pub fn with_pool(mut self, pool: &'a ThreadPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn predict_with_uncertainty(
        &self,
        standardized: &FactorScores,
        options: &BootstrapOptions,
        cancel: &CancellationToken,
    ) -> Result<PredictionResult> {
        options.validate()?;
        if !standardized.is_finite() {
            return Err(Error::invalid_input(
                "standardized",
                "query vector must be finite",
            ));
        }
        let n = self.rows.len();
        if n < MIN_BOOTSTRAP_OBSERVATIONS {
            return Err(Error::InsufficientTrainingData {
                observed: n,
                required: MIN_BOOTSTRAP_OBSERVATIONS,
            });
        }

        let assessment = self.guard.assess(standardized);
        let seed = options.seed.unwrap_or_else(|| rand::rng().random());
        let mut master = StdRng::seed_from_u64(seed);
        let seeds: Vec<u64> = (0..options.iterations).map(|_| master.random()).collect();

        let query = standardized.to_array();
        let run = || {
            seeds
                .par_iter()
                .map(|&s| {
                    if cancel.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                    Ok(self.resample_estimate(&query, s, options.interval))
                })
                .collect::<Result<Vec<Option<f64>>>>()
        };
        let draws = match self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };
        let draws = match draws {
            Ok(draws) if !cancel.is_cancelled() => draws,
            Ok(_) | Err(Error::Cancelled) => {
                tracing::debug!(seed, "bootstrap cancelled; partial draws discarded");
                return Err(Error::Cancelled);
            }
            Err(e) => return Err(e),
        };

        let estimates: Vec<f64> = draws.into_iter().flatten().collect();
        let skipped = options.iterations - estimates.len();
        if estimates.is_empty() {
            return Err(Error::NumericalInstability(format!(
                "all {} bootstrap resamples were singular",
                options.iterations
            )));
        }
        if skipped > 0 {
            tracing::warn!(skipped, iterations = options.iterations, "skipped singular bootstrap resamples");
        }

        let point_estimate = estimates.iter().sum::<f64>() / estimates.len() as f64;
        let sorted = sorted_copy(&estimates);
        let alpha = 1.0 - options.confidence;
        // Percentile bounds can exclude the mean of a skewed distribution; widen to contain it.
        let lower = quantile_sorted(&sorted, alpha / 2.0).min(point_estimate);
        let upper = quantile_sorted(&sorted, 1.0 - alpha / 2.0).max(point_estimate);

        let mut tier =
            ConfidenceTier::from_width(upper - lower, self.model.out_of_sample_error, self.tiers);
        if assessment.level == ExtrapolationLevel::Severe {
            tier = tier.downgrade();
        }

        tracing::debug!(
            seed,
            iterations = estimates.len(),
            skipped,
            point_estimate,
            lower,
            upper,
            %tier,
            severity = assessment.severity,
            "bootstrap finished"
        );

        Ok(PredictionResult {
            point_estimate,
            lower,
            upper,
            confidence: options.confidence,
            interval: options.interval,
            tier,
            is_extrapolating: assessment.is_extrapolating,
            severity: assessment.severity,
            extrapolation_level: assessment.level,
            warning_message: assessment.warning().map(|w| w.message),
            model_estimate: self.model.predict(standardized),
            standardized: *standardized,
            iterations: estimates.len(),
            skipped_resamples: skipped,
            seed,
        })
    }

    /// One resample-refit-evaluate step. None when the resample is singular.
    fn resample_estimate(
        &self,
        query: &[f64; Factor::COUNT],
        seed: u64,
        interval: IntervalKind,
    ) -> Option<f64> {
        let n = self.rows.len();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut xs = Vec::with_capacity(n);
        let mut ys = Vec::with_capacity(n);
        for _ in 0..n {
            let i = rng.random_range(0..n);
            xs.push(self.rows[i]);
            ys.push(self.outcomes[i]);
        }

        let fit = fit_ols(&xs, &ys).ok()?;
        let mut estimate = fit.predict(query);
        if interval == IntervalKind::Prediction {
            // Fitted residuals understate the noise by the lost degrees of freedom.
            let dof = n.saturating_sub(MIN_BOOTSTRAP_OBSERVATIONS).max(1) as f64;
            let inflate = (n as f64 / dof).sqrt();
            estimate += fit.residuals[rng.random_range(0..n)] * inflate;
        }
        Some(estimate)
    }
}
