//! Out-of-distribution detection for query vectors.
//!
//! Severity is the query's nearest-neighbor distance to the corpus divided by
//! the typical in-sample nearest-neighbor distance (the median, over corpus
//! members, of each member's distance to its closest other member). Distances
//! are plain Euclidean in standardized space.
//!
//! A query that coincides with a corpus member is measured the same way the
//! baseline measures that member: against its closest *other* member. This
//! keeps an existing competitor's own profile at severity near 1 instead of 0.

use gf_common::{CompetitorId, Error, Factor, FactorScores, Result};
use gf_config::ExtrapolationPolicy;
use gf_math::{euclidean, median};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::corpus::TrainingCorpus;

/// Distance at or below which a query is treated as the same point as a member.
const COINCIDENCE_TOLERANCE: f64 = 1e-12;

/// Floor for the typical distance, so a corpus of duplicates cannot divide by zero.
const MIN_TYPICAL_DISTANCE: f64 = 1e-9;

/// Extrapolation classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtrapolationLevel {
    InDistribution,
    Moderate,
    Severe,
}

impl ExtrapolationLevel {
    pub fn is_extrapolating(self) -> bool {
        self != ExtrapolationLevel::InDistribution
    }
}

impl std::fmt::Display for ExtrapolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtrapolationLevel::InDistribution => write!(f, "in_distribution"),
            ExtrapolationLevel::Moderate => write!(f, "moderate"),
            ExtrapolationLevel::Severe => write!(f, "severe"),
        }
    }
}

/// Non-fatal warning attached to a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtrapolationWarning {
    pub level: ExtrapolationLevel,
    pub severity: f64,
    pub message: String,
}

/// Result of assessing one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtrapolationAssessment {
    pub is_extrapolating: bool,
    pub severity: f64,
    pub level: ExtrapolationLevel,
    pub nearest_distance: f64,
    pub typical_distance: f64,
    /// Closest corpus member (ties go to the earliest inserted).
    pub nearest_member: Option<CompetitorId>,
}

impl ExtrapolationAssessment {
    /// Warning text for flagged queries; None when in distribution.
    pub fn warning(&self) -> Option<ExtrapolationWarning> {
        let message = match self.level {
            ExtrapolationLevel::InDistribution => return None,
            ExtrapolationLevel::Moderate => format!(
                "Moderate extrapolation: this profile is {:.2}x further from the nearest \
                 training competitor than is typical; treat the prediction with caution",
                self.severity
            ),
            ExtrapolationLevel::Severe => format!(
                "Severe extrapolation: this profile is {:.2}x further from the nearest \
                 training competitor than is typical; the model has no comparable data \
                 and the prediction is unreliable",
                self.severity
            ),
        };
        Some(ExtrapolationWarning {
            level: self.level,
            severity: self.severity,
            message,
        })
    }
}

/// Nearest-neighbor distance guard over a fixed corpus.
#[derive(Debug, Clone)]
pub struct ExtrapolationGuard {
    points: Vec<[f64; Factor::COUNT]>,
    ids: Vec<CompetitorId>,
    typical_distance: f64,
    moderate_threshold: f64,
    severe_threshold: f64,
}

impl ExtrapolationGuard {
    /// Precompute the in-sample baseline. O(n^2) once per snapshot.
    pub fn from_corpus(corpus: &TrainingCorpus, policy: &ExtrapolationPolicy) -> Result<Self> {
        corpus.require(2)?;
        if !(policy.moderate_threshold > 0.0 && policy.severe_threshold > policy.moderate_threshold)
        {
            return Err(Error::Config(format!(
                "extrapolation thresholds must satisfy 0 < moderate < severe, got {} / {}",
                policy.moderate_threshold, policy.severe_threshold
            )));
        }

        let points = corpus.score_rows();
        let nn: Vec<f64> = (0..points.len())
            .map(|i| {
                points
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, p)| euclidean(&points[i], p))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let typical_distance = median(&nn).max(MIN_TYPICAL_DISTANCE);

        Ok(ExtrapolationGuard {
            ids: corpus.members().iter().map(|m| m.id.clone()).collect(),
            points,
            typical_distance,
            moderate_threshold: policy.moderate_threshold,
            severe_threshold: policy.severe_threshold,
        })
    }

    /// Median in-sample nearest-neighbor distance.
    pub fn typical_distance(&self) -> f64 {
        self.typical_distance
    }

    /// Leave-one-out nearest-neighbor distance and the index of that neighbor.
    fn nearest(&self, query: &[f64; Factor::COUNT]) -> (f64, Option<usize>) {
        let distances: Vec<f64> = self.points.iter().map(|p| euclidean(query, p)).collect();
        let coincident = distances
            .iter()
            .position(|&d| d <= COINCIDENCE_TOLERANCE);

        let mut best = (f64::INFINITY, None);
        for (i, &d) in distances.iter().enumerate() {
            if Some(i) == coincident {
                continue;
            }
            if d < best.0 {
                best = (d, Some(i));
            }
        }
        best
    }

    /// Nearest-neighbor distance from a standardized query to the corpus.
    pub fn nearest_distance(&self, standardized: &FactorScores) -> f64 {
        self.nearest(&standardized.to_array()).0
    }

    pub fn classify(&self, severity: f64) -> ExtrapolationLevel {
        if severity > self.severe_threshold {
            ExtrapolationLevel::Severe
        } else if severity > self.moderate_threshold {
            ExtrapolationLevel::Moderate
        } else {
            ExtrapolationLevel::InDistribution
        }
    }

    pub fn assess(&self, standardized: &FactorScores) -> ExtrapolationAssessment {
        let (nearest_distance, index) = self.nearest(&standardized.to_array());
        let severity = nearest_distance / self.typical_distance;
        let level = self.classify(severity);
        ExtrapolationAssessment {
            is_extrapolating: level.is_extrapolating(),
            severity,
            level,
            nearest_distance,
            typical_distance: self.typical_distance,
            nearest_member: index.map(|i| self.ids[i].clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusMember;

    /// Unit grid on the speed/consistency plane: every member's nearest neighbor is 1 away.
    fn grid() -> TrainingCorpus {
        let mut members = Vec::new();
        for i in 0..4 {
            for j in 0..4 {
                members.push(CorpusMember::new(
                    format!("g{i}{j}"),
                    FactorScores::new(i as f64, j as f64, 0.0, 0.0),
                    0.0,
                ));
            }
        }
        TrainingCorpus::new("v1".into(), None, members).unwrap()
    }

    fn guard() -> ExtrapolationGuard {
        ExtrapolationGuard::from_corpus(&grid(), &ExtrapolationPolicy::default()).unwrap()
    }

    #[test]
    fn typical_distance_is_median_nearest_neighbor() {
        assert!((guard().typical_distance() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn member_profile_has_unit_severity() {
        let a = guard().assess(&FactorScores::new(1.0, 2.0, 0.0, 0.0));
        assert!((a.severity - 1.0).abs() < 1e-12);
        assert!(!a.is_extrapolating);
        assert!(a.warning().is_none());
    }

    #[test]
    fn levels_follow_thresholds() {
        let g = guard();
        let inside = g.assess(&FactorScores::new(1.5, 1.5, 0.0, 0.0));
        assert_eq!(inside.level, ExtrapolationLevel::InDistribution);

        let moderate = g.assess(&FactorScores::new(4.8, 0.0, 0.0, 0.0));
        assert_eq!(moderate.level, ExtrapolationLevel::Moderate);
        assert!(moderate.warning().unwrap().message.starts_with("Moderate"));

        let severe = g.assess(&FactorScores::new(10.0, 10.0, 0.0, 0.0));
        assert_eq!(severe.level, ExtrapolationLevel::Severe);
        assert!(severe.is_extrapolating);
        assert_eq!(severe.nearest_member, Some(CompetitorId::new("g33")));
        assert!(severe.warning().unwrap().message.contains("unreliable"));
    }

    #[test]
    fn boundary_is_inclusive_of_lower_level() {
        let g = guard();
        assert_eq!(g.classify(1.5), ExtrapolationLevel::InDistribution);
        assert_eq!(g.classify(2.0), ExtrapolationLevel::Moderate);
        assert_eq!(g.classify(2.0 + 1e-9), ExtrapolationLevel::Severe);
    }

    #[test]
    fn needs_two_members() {
        let corpus = TrainingCorpus::new(
            "v1".into(),
            None,
            vec![CorpusMember::new("solo", FactorScores::splat(0.0), 1.0)],
        )
        .unwrap();
        assert!(ExtrapolationGuard::from_corpus(&corpus, &ExtrapolationPolicy::default()).is_err());
    }

    #[test]
    fn duplicate_members_keep_baseline_positive() {
        let members = (0..5)
            .map(|i| CorpusMember::new(format!("d{i}"), FactorScores::splat(1.0), 0.0))
            .collect();
        let corpus = TrainingCorpus::new("v1".into(), None, members).unwrap();
        let g = ExtrapolationGuard::from_corpus(&corpus, &ExtrapolationPolicy::default()).unwrap();
        assert!(g.typical_distance() > 0.0);
        assert_eq!(g.nearest_distance(&FactorScores::splat(1.0)), 0.0);
    }
}
