//! Competitor-to-venue alignment on a 0-100 scale.
//!
//! The raw alignment `sum(z[f] * demand[f])` is rescaled linearly so that the
//! worst- and best-aligned corpus members for that venue sit at 0 and 100.
//! Queries outside the corpus range are clamped and marked saturated.

use gf_common::{Error, FactorScores, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::corpus::TrainingCorpus;

/// Alignment span below which every competitor is scored at the midpoint.
const DEGENERATE_SPAN: f64 = 1e-12;

/// How strongly a venue rewards (positive) or penalizes (negative) each factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CircuitDemandProfile {
    pub venue: String,
    pub demands: FactorScores,
}

impl CircuitDemandProfile {
    pub fn new(venue: impl Into<String>, demands: FactorScores) -> Self {
        CircuitDemandProfile {
            venue: venue.into(),
            demands,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.venue.trim().is_empty() {
            return Err(Error::InvalidSnapshot("circuit venue id is empty".to_string()));
        }
        if !self.demands.is_finite() {
            return Err(Error::InvalidSnapshot(format!(
                "circuit {} has non-finite demand coefficients",
                self.venue
            )));
        }
        Ok(())
    }

    pub fn raw_alignment(&self, standardized: &FactorScores) -> f64 {
        standardized.dot(&self.demands)
    }
}

/// Observed raw alignment range over the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AlignmentRange {
    pub min: f64,
    pub max: f64,
}

/// A scored competitor/venue pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CircuitFitScore {
    pub venue: String,
    /// 0-100.
    pub fit_score: f64,
    pub raw_alignment: f64,
    pub range: AlignmentRange,
    /// True when the raw alignment fell outside the corpus range and was clamped.
    pub saturated: bool,
}

/// Scorer for one venue with its corpus anchors precomputed.
#[derive(Debug, Clone)]
pub struct CircuitFitScorer {
    profile: CircuitDemandProfile,
    range: AlignmentRange,
}

impl CircuitFitScorer {
    pub fn from_corpus(corpus: &TrainingCorpus, profile: CircuitDemandProfile) -> Result<Self> {
        profile.validate()?;
        corpus.require(1)?;
        let (min, max) = corpus
            .members()
            .iter()
            .map(|m| profile.raw_alignment(&m.scores))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        Ok(CircuitFitScorer {
            profile,
            range: AlignmentRange { min, max },
        })
    }

    pub fn profile(&self) -> &CircuitDemandProfile {
        &self.profile
    }

    pub fn range(&self) -> AlignmentRange {
        self.range
    }

    pub fn score(&self, standardized: &FactorScores) -> CircuitFitScore {
        let raw = self.profile.raw_alignment(standardized);
        let span = self.range.max - self.range.min;
        let (fit_score, saturated) = if span <= DEGENERATE_SPAN {
            (50.0, false)
        } else {
            let scaled = 100.0 * (raw - self.range.min) / span;
            (scaled.clamp(0.0, 100.0), !(0.0..=100.0).contains(&scaled))
        };
        CircuitFitScore {
            venue: self.profile.venue.clone(),
            fit_score,
            raw_alignment: raw,
            range: self.range,
            saturated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusMember;

    fn corpus() -> TrainingCorpus {
        TrainingCorpus::new(
            "v1".into(),
            None,
            vec![
                CorpusMember::new("low", FactorScores::new(-1.0, 0.0, 0.0, 0.0), 0.0),
                CorpusMember::new("mid", FactorScores::new(0.0, 0.0, 0.0, 0.0), 0.0),
                CorpusMember::new("high", FactorScores::new(1.0, 0.0, 0.0, 0.0), 0.0),
            ],
        )
        .unwrap()
    }

    fn speed_circuit() -> CircuitDemandProfile {
        CircuitDemandProfile::new("monza", FactorScores::new(2.0, 0.5, 0.0, -0.5))
    }

    #[test]
    fn corpus_extremes_anchor_the_scale() {
        let scorer = CircuitFitScorer::from_corpus(&corpus(), speed_circuit()).unwrap();
        assert_eq!(scorer.range(), AlignmentRange { min: -2.0, max: 2.0 });
        assert_eq!(scorer.score(&FactorScores::new(-1.0, 0.0, 0.0, 0.0)).fit_score, 0.0);
        assert_eq!(scorer.score(&FactorScores::new(1.0, 0.0, 0.0, 0.0)).fit_score, 100.0);
        assert_eq!(scorer.score(&FactorScores::splat(0.0)).fit_score, 50.0);
    }

    #[test]
    fn outside_range_is_clamped() {
        let scorer = CircuitFitScorer::from_corpus(&corpus(), speed_circuit()).unwrap();
        let s = scorer.score(&FactorScores::new(3.0, 0.0, 0.0, 0.0));
        assert_eq!(s.fit_score, 100.0);
        assert_eq!(s.raw_alignment, 6.0);
        assert!(s.saturated);
    }

    #[test]
    fn degenerate_range_scores_midpoint() {
        let flat = CircuitDemandProfile::new("flat", FactorScores::new(0.0, 1.0, 0.0, 0.0));
        let scorer = CircuitFitScorer::from_corpus(&corpus(), flat).unwrap();
        assert_eq!(scorer.score(&FactorScores::splat(3.0)).fit_score, 50.0);
    }

    #[test]
    fn invalid_profiles_rejected() {
        let blank = CircuitDemandProfile::new(" ", FactorScores::splat(1.0));
        assert!(CircuitFitScorer::from_corpus(&corpus(), blank).is_err());
        let nan = CircuitDemandProfile::new("x", FactorScores::new(f64::NAN, 0.0, 0.0, 0.0));
        assert!(CircuitFitScorer::from_corpus(&corpus(), nan).is_err());
    }
}
