//! Empirical interval coverage on held-out outcomes.

use gf_common::{Error, Result};
use gf_config::IntervalKind;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::corpus::CorpusMember;
use crate::engine::Engine;
use crate::uncertainty::BootstrapOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CoverageReport {
    pub n: usize,
    pub covered: usize,
    /// Fraction of held-out outcomes inside their interval.
    pub coverage: f64,
    /// The confidence level the intervals were built for.
    pub nominal: f64,
    pub interval: IntervalKind,
    pub mean_width: f64,
}

impl CoverageReport {
    /// Observed minus nominal coverage.
    pub fn deviation(&self) -> f64 {
        self.coverage - self.nominal
    }
}

/// Predict every held-out member against the engine's current snapshot and
/// count how many known outcomes land inside their reported interval.
///
/// Held-out scores are taken as already standardized. With a fixed seed,
/// member `i` is predicted with `seed + i` so the report is reproducible.
pub fn interval_coverage(
    engine: &Engine,
    held_out: &[CorpusMember],
    options: &BootstrapOptions,
    cancel: &CancellationToken,
) -> Result<CoverageReport> {
    if held_out.is_empty() {
        return Err(Error::invalid_input("held_out", "needs at least one member"));
    }
    options.validate()?;

    let mut covered = 0;
    let mut total_width = 0.0;
    for (i, member) in held_out.iter().enumerate() {
        let mut item_options = options.clone();
        item_options.seed = options.seed.map(|s| s.wrapping_add(i as u64));
        let result = engine
            .predict_standardized(&member.scores, &item_options, cancel)?
            .data;
        if result.contains(member.outcome) {
            covered += 1;
        }
        total_width += result.width();
    }

    let n = held_out.len();
    let report = CoverageReport {
        n,
        covered,
        coverage: covered as f64 / n as f64,
        nominal: options.confidence,
        interval: options.interval,
        mean_width: total_width / n as f64,
    };
    tracing::info!(
        n,
        covered,
        coverage = report.coverage,
        nominal = report.nominal,
        "interval coverage measured"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{synthetic_engine, synthetic_members};

    #[test]
    fn prediction_intervals_cover_most_outcomes() {
        let engine = synthetic_engine(60, 3);
        let held_out = synthetic_members(40, 99);
        let options = BootstrapOptions::default()
            .with_iterations(300)
            .with_interval(IntervalKind::Prediction)
            .with_seed(5);
        let report =
            interval_coverage(&engine, &held_out, &options, &CancellationToken::new()).unwrap();
        assert_eq!(report.n, 40);
        assert!(report.coverage >= 0.8, "coverage {}", report.coverage);
        assert!(report.mean_width > 0.0);
        assert!((report.deviation() - (report.coverage - 0.95)).abs() < 1e-12);
    }

    #[test]
    fn confidence_intervals_are_narrower_than_prediction_intervals() {
        let engine = synthetic_engine(40, 3);
        let held_out = synthetic_members(10, 17);
        let base = BootstrapOptions::default().with_iterations(150).with_seed(1);
        let token = CancellationToken::new();
        let ci = interval_coverage(&engine, &held_out, &base, &token).unwrap();
        let pi = interval_coverage(
            &engine,
            &held_out,
            &base.clone().with_interval(IntervalKind::Prediction),
            &token,
        )
        .unwrap();
        assert!(pi.mean_width > ci.mean_width);
        assert_eq!(pi.interval, IntervalKind::Prediction);
    }

    #[test]
    fn empty_hold_out_rejected() {
        let engine = synthetic_engine(20, 1);
        assert!(matches!(
            interval_coverage(&engine, &[], &BootstrapOptions::default(), &CancellationToken::new()),
            Err(Error::InvalidInput { .. })
        ));
    }
}
