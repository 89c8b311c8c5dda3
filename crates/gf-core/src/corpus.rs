//! The immutable training corpus.
//!
//! A corpus is a versioned set of competitors with their standardized factor
//! scores and known outcomes. It is built once per published snapshot and
//! never mutated afterwards; every statistic the engine serves (percentile
//! tables, nearest-neighbor baseline, alignment ranges) is derived from it.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use gf_common::{CompetitorId, Error, Factor, FactorScores, Result, SnapshotVersion};
use gf_math::Summary;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sign convention of the scores stored in a corpus document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Scores are already higher-is-better for every factor.
    #[default]
    Reflected,
    /// Scores are raw upstream measures; lower-is-better factors get negated on load.
    Raw,
}

/// One competitor in the training corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CorpusMember {
    pub id: CompetitorId,
    /// Standardized factor scores.
    pub scores: FactorScores,
    /// Known outcome.
    pub outcome: f64,
}

impl CorpusMember {
    pub fn new(id: impl Into<String>, scores: FactorScores, outcome: f64) -> Self {
        CorpusMember {
            id: CompetitorId::new(id),
            scores,
            outcome,
        }
    }
}

/// Serialized form of a corpus inside a snapshot artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CorpusDocument {
    pub version: SnapshotVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub orientation: Orientation,
    pub members: Vec<CorpusMember>,
}

/// Validated, read-only training corpus.
#[derive(Debug, Clone)]
pub struct TrainingCorpus {
    version: SnapshotVersion,
    built_at: Option<DateTime<Utc>>,
    members: Vec<CorpusMember>,
}

impl TrainingCorpus {
    /// Validate and freeze a set of members.
    ///
    /// Rejects an invalid version tag, empty or padded competitor ids,
    /// non-finite scores or outcomes, and duplicate ids. An undersized corpus is accepted here;
    /// operations that need statistics check the size themselves.
    pub fn new(
        version: SnapshotVersion,
        built_at: Option<DateTime<Utc>>,
        members: Vec<CorpusMember>,
    ) -> Result<Self> {
        if !version.is_valid() {
            return Err(Error::InvalidSnapshot(format!(
                "corpus version {:?} is empty or padded",
                version.as_str()
            )));
        }

        let mut seen = HashSet::with_capacity(members.len());
        for member in &members {
            if !member.id.is_valid() {
                return Err(Error::InvalidSnapshot(format!(
                    "competitor id {:?} is empty or padded",
                    member.id.as_str()
                )));
            }
            if !member.scores.is_finite() {
                return Err(Error::InvalidSnapshot(format!(
                    "competitor {} has non-finite factor scores",
                    member.id
                )));
            }
            if !member.outcome.is_finite() {
                return Err(Error::InvalidSnapshot(format!(
                    "competitor {} has a non-finite outcome",
                    member.id
                )));
            }
            if !seen.insert(member.id.as_str()) {
                return Err(Error::InvalidSnapshot(format!(
                    "duplicate competitor id {}",
                    member.id
                )));
            }
        }

        Ok(TrainingCorpus {
            version,
            built_at,
            members,
        })
    }

    /// Build from a serialized document, applying its orientation.
    pub fn from_document(doc: CorpusDocument) -> Result<Self> {
        let members = match doc.orientation {
            Orientation::Reflected => doc.members,
            Orientation::Raw => doc
                .members
                .into_iter()
                .map(|m| CorpusMember {
                    scores: m.scores.oriented(),
                    ..m
                })
                .collect(),
        };
        TrainingCorpus::new(doc.version, doc.built_at, members)
    }

    /// Serialize back to a (reflected) document.
    pub fn to_document(&self) -> CorpusDocument {
        CorpusDocument {
            version: self.version.clone(),
            built_at: self.built_at,
            orientation: Orientation::Reflected,
            members: self.members.clone(),
        }
    }

    pub fn version(&self) -> &SnapshotVersion {
        &self.version
    }

    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    pub fn members(&self) -> &[CorpusMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Fail with `InsufficientTrainingData` below `required` members.
    pub fn require(&self, required: usize) -> Result<()> {
        if self.members.len() < required {
            return Err(Error::InsufficientTrainingData {
                observed: self.members.len(),
                required,
            });
        }
        Ok(())
    }

    /// All scores for one factor, in insertion order.
    pub fn factor_values(&self, factor: Factor) -> Vec<f64> {
        self.members.iter().map(|m| m.scores[factor]).collect()
    }

    /// Score rows in insertion order, as regression design rows.
    pub fn score_rows(&self) -> Vec<[f64; Factor::COUNT]> {
        self.members.iter().map(|m| m.scores.to_array()).collect()
    }

    pub fn outcomes(&self) -> Vec<f64> {
        self.members.iter().map(|m| m.outcome).collect()
    }

    /// Descriptive summary of one factor's scores.
    pub fn factor_summary(&self, factor: Factor) -> Option<Summary> {
        Summary::of(&self.factor_values(factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, v: f64) -> CorpusMember {
        CorpusMember::new(id, FactorScores::splat(v), v * 2.0)
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = TrainingCorpus::new(
            "v1".into(),
            None,
            vec![member("a", 0.0), member("a", 1.0)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidSnapshot(_)));
    }

    #[test]
    fn rejects_non_finite_values() {
        let bad_score = CorpusMember::new("a", FactorScores::new(0.0, f64::NAN, 0.0, 0.0), 1.0);
        assert!(TrainingCorpus::new("v1".into(), None, vec![bad_score]).is_err());

        let bad_outcome = CorpusMember::new("a", FactorScores::splat(0.0), f64::INFINITY);
        assert!(TrainingCorpus::new("v1".into(), None, vec![bad_outcome]).is_err());
    }

    #[test]
    fn rejects_blank_competitor_ids() {
        for id in ["", " a"] {
            let err = TrainingCorpus::new("v1".into(), None, vec![member(id, 0.0)]).unwrap_err();
            assert!(matches!(err, Error::InvalidSnapshot(_)));
        }
    }

    #[test]
    fn rejects_blank_version() {
        assert!(TrainingCorpus::new("".into(), None, vec![]).is_err());
    }

    #[test]
    fn require_reports_counts() {
        let corpus =
            TrainingCorpus::new("v1".into(), None, vec![member("a", 0.0), member("b", 1.0)])
                .unwrap();
        match corpus.require(10).unwrap_err() {
            Error::InsufficientTrainingData { observed, required } => {
                assert_eq!((observed, required), (2, 10));
            }
            other => panic!("unexpected error: {other}"),
        }
        corpus.require(2).unwrap();
    }

    #[test]
    fn raw_orientation_reflects_lower_is_better_factors() {
        let doc = CorpusDocument {
            version: "v1".into(),
            built_at: None,
            orientation: Orientation::Raw,
            members: vec![CorpusMember::new(
                "a",
                FactorScores::new(1.0, 2.0, 3.0, 4.0),
                5.0,
            )],
        };
        let corpus = TrainingCorpus::from_document(doc).unwrap();
        assert_eq!(
            corpus.members()[0].scores.to_array(),
            [-1.0, -2.0, 3.0, -4.0]
        );
        assert_eq!(corpus.to_document().orientation, Orientation::Reflected);
    }

    #[test]
    fn accessors_preserve_insertion_order() {
        let corpus = TrainingCorpus::new(
            "v1".into(),
            None,
            vec![member("b", 2.0), member("a", 1.0)],
        )
        .unwrap();
        assert_eq!(corpus.factor_values(Factor::Speed), vec![2.0, 1.0]);
        assert_eq!(corpus.outcomes(), vec![4.0, 2.0]);
        assert_eq!(corpus.score_rows()[1], [1.0; 4]);
        assert_eq!(corpus.factor_summary(Factor::Racecraft).unwrap().n, 2);
    }
}
