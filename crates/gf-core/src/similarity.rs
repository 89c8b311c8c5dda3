//! Comparable-competitor search under a coefficient-weighted metric.
//!
//! `distance = sqrt(sum(coef[f]^2 * (q[f] - m[f])^2))`, so a factor with five
//! times the predictive weight moves the distance five times as much for the
//! same score gap. `similarity = 100 * exp(-distance / k)`.

use gf_common::{CompetitorId, Error, FactorScores, Result};
use gf_math::weighted_euclidean;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::corpus::TrainingCorpus;
use crate::model::RegressionModel;

/// One ranked corpus member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SimilarityMatch {
    /// 1-based position in the ranking.
    pub rank: usize,
    pub competitor: CompetitorId,
    pub distance: f64,
    /// 0-100, decreasing in distance.
    pub similarity: f64,
    /// Signed `query - member` per factor, in standardized units.
    pub differences: FactorScores,
    /// The member's recorded outcome.
    pub known_outcome: f64,
    /// The loaded model's prediction for the member's profile.
    pub predicted_outcome: f64,
}

pub struct SimilarityEngine<'a> {
    corpus: &'a TrainingCorpus,
    model: &'a RegressionModel,
    decay: f64,
}

impl<'a> SimilarityEngine<'a> {
    pub fn new(corpus: &'a TrainingCorpus, model: &'a RegressionModel, decay: f64) -> Self {
        SimilarityEngine {
            corpus,
            model,
            decay,
        }
    }

    pub fn weighted_distance(&self, a: &FactorScores, b: &FactorScores) -> f64 {
        weighted_euclidean(
            &a.to_array(),
            &b.to_array(),
            &self.model.coefficients.to_array(),
        )
    }

    pub fn similarity_score(&self, distance: f64) -> f64 {
        100.0 * (-distance / self.decay).exp()
    }

    /// The `top_n` most similar members, best first.
    ///
    /// Ordered by descending similarity, then ascending distance, then corpus
    /// insertion order.
    pub fn find_similar(
        &self,
        standardized: &FactorScores,
        top_n: usize,
    ) -> Result<Vec<SimilarityMatch>> {
        if top_n == 0 {
            return Err(Error::invalid_input("top_n", "must be at least 1"));
        }
        if !(self.decay.is_finite() && self.decay > 0.0) {
            return Err(Error::Config(format!(
                "similarity decay must be positive, got {}",
                self.decay
            )));
        }

        let mut scored: Vec<(usize, f64, f64)> = self
            .corpus
            .members()
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let d = self.weighted_distance(standardized, &m.scores);
                (i, d, self.similarity_score(d))
            })
            .collect();
        scored.sort_by(|a, b| {
            b.2.total_cmp(&a.2)
                .then(a.1.total_cmp(&b.1))
                .then(a.0.cmp(&b.0))
        });

        let members = self.corpus.members();
        Ok(scored
            .into_iter()
            .take(top_n)
            .enumerate()
            .map(|(rank, (i, distance, similarity))| {
                let m = &members[i];
                SimilarityMatch {
                    rank: rank + 1,
                    competitor: m.id.clone(),
                    distance,
                    similarity,
                    differences: *standardized - m.scores,
                    known_outcome: m.outcome,
                    predicted_outcome: self.model.predict(&m.scores),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusMember;

    fn model(coefficients: FactorScores) -> RegressionModel {
        RegressionModel {
            version: "v1".into(),
            intercept: 0.0,
            coefficients,
            out_of_sample_error: 1.0,
        }
    }

    fn corpus(members: Vec<CorpusMember>) -> TrainingCorpus {
        TrainingCorpus::new("v1".into(), None, members).unwrap()
    }

    #[test]
    fn weighted_distance_follows_coefficients() {
        let c = corpus(vec![]);
        let m = model(FactorScores::new(3.0, 1.0, 1.0, 1.0));
        let engine = SimilarityEngine::new(&c, &m, 2.0);
        let d = engine.weighted_distance(&FactorScores::splat(0.0), &FactorScores::new(1.0, 0.0, 0.0, 0.0));
        assert_eq!(d, 3.0);
        assert_eq!(engine.similarity_score(0.0), 100.0);
        assert!((engine.similarity_score(2.0) - 100.0 / std::f64::consts::E).abs() < 1e-9);
    }

    #[test]
    fn equal_distances_keep_insertion_order() {
        let c = corpus(vec![
            CorpusMember::new("far", FactorScores::splat(5.0), 1.0),
            CorpusMember::new("b", FactorScores::new(1.0, 0.0, 0.0, 0.0), 2.0),
            CorpusMember::new("a", FactorScores::new(-1.0, 0.0, 0.0, 0.0), 3.0),
        ]);
        let m = model(FactorScores::splat(1.0));
        let matches = SimilarityEngine::new(&c, &m, 2.0)
            .find_similar(&FactorScores::splat(0.0), 10)
            .unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.competitor.as_str()).collect();
        assert_eq!(ids, ["b", "a", "far"]);
        assert_eq!(matches[0].rank, 1);
        assert_eq!(matches[0].differences.speed, -1.0);
        assert_eq!(matches[2].known_outcome, 1.0);
        assert_eq!(matches[2].predicted_outcome, 20.0);
    }

    #[test]
    fn swapped_factors_are_not_equally_similar() {
        // Racecraft carries four times TireManagement's weight.
        let c = corpus(vec![
            CorpusMember::new("rc_high", FactorScores::new(0.5, 0.5, 1.0, -1.0), 0.0),
            CorpusMember::new("tm_high", FactorScores::new(0.5, 0.5, -1.0, 1.0), 0.0),
        ]);
        let m = model(FactorScores::new(1.0, 1.0, 2.0, 0.5));
        let query = FactorScores::new(0.5, 0.5, 1.0, 0.0);
        let matches = SimilarityEngine::new(&c, &m, 2.0)
            .find_similar(&query, 2)
            .unwrap();
        assert_eq!(matches[0].competitor.as_str(), "rc_high");
        assert!(matches[0].similarity > matches[1].similarity);
    }

    #[test]
    fn top_n_truncates_and_zero_is_rejected() {
        let c = corpus(
            (0..6)
                .map(|i| CorpusMember::new(format!("m{i}"), FactorScores::splat(i as f64), 0.0))
                .collect(),
        );
        let m = model(FactorScores::splat(1.0));
        let engine = SimilarityEngine::new(&c, &m, 2.0);
        assert_eq!(engine.find_similar(&FactorScores::splat(0.0), 3).unwrap().len(), 3);
        assert!(matches!(
            engine.find_similar(&FactorScores::splat(0.0), 0),
            Err(Error::InvalidInput { .. })
        ));
    }
}
