//! Percentile (0-100) to standardized score conversion.
//!
//! Each factor has its own empirical distribution drawn from the corpus, so a
//! 65th-percentile Speed score maps to the 65th percentile of the corpus's
//! Speed scores whatever that factor's spread is. No shared linear formula is
//! applied across factors.

use gf_common::{Error, Factor, FactorScores, Result};
use gf_math::EmpiricalDistribution;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::corpus::TrainingCorpus;

/// Upper bound of the normalized scale.
pub const NORMALIZED_MAX: f64 = 100.0;

/// A caller-supplied profile of four normalized scores in [0, 100].
///
/// Construction validates every component, so a `QueryVector` that exists is
/// always in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct QueryVector(FactorScores);

impl QueryVector {
    pub fn new(scores: FactorScores) -> Result<Self> {
        for (factor, value) in scores.iter() {
            validate_normalized(value, factor)?;
        }
        Ok(QueryVector(scores))
    }

    pub fn from_array(values: [f64; Factor::COUNT]) -> Result<Self> {
        QueryVector::new(FactorScores::from_array(values))
    }

    pub fn scores(&self) -> &FactorScores {
        &self.0
    }

    pub fn get(&self, factor: Factor) -> f64 {
        self.0[factor]
    }

    /// Add per-factor increments, capping at the top of the scale.
    pub fn raised_by(&self, increments: &FactorScores) -> QueryVector {
        QueryVector(
            self.0
                .map(|f, v| (v + increments[f].max(0.0)).min(NORMALIZED_MAX)),
        )
    }
}

impl<'de> Deserialize<'de> for QueryVector {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let scores = FactorScores::deserialize(deserializer)?;
        QueryVector::new(scores).map_err(serde::de::Error::custom)
    }
}

fn validate_normalized(value: f64, factor: Factor) -> Result<()> {
    if !(0.0..=NORMALIZED_MAX).contains(&value) {
        return Err(Error::invalid_input(
            format!("scores.{}", factor),
            format!("normalized score must be in [0, 100], got {}", value),
        ));
    }
    Ok(())
}

/// Per-factor empirical distributions over the corpus.
#[derive(Debug, Clone)]
pub struct PercentileZScoreConverter {
    distributions: Vec<EmpiricalDistribution>,
}

impl PercentileZScoreConverter {
    /// Build from a corpus holding at least `min_observations` members.
    pub fn from_corpus(corpus: &TrainingCorpus, min_observations: usize) -> Result<Self> {
        corpus.require(min_observations.max(1))?;
        let mut distributions = Vec::with_capacity(Factor::COUNT);
        for factor in Factor::ALL {
            let dist = EmpiricalDistribution::new(&corpus.factor_values(factor)).ok_or_else(
                || Error::InvalidSnapshot(format!("no finite {} scores in corpus", factor)),
            )?;
            distributions.push(dist);
        }
        Ok(PercentileZScoreConverter { distributions })
    }

    pub fn distribution(&self, factor: Factor) -> &EmpiricalDistribution {
        &self.distributions[factor.index()]
    }

    /// Standardized score at the given percentile rank of `factor`'s distribution.
    pub fn to_standardized(&self, normalized: f64, factor: Factor) -> Result<f64> {
        validate_normalized(normalized, factor)?;
        Ok(self
            .distribution(factor)
            .quantile(normalized / NORMALIZED_MAX))
    }

    /// Percentile rank (0-100) of a standardized score within `factor`'s distribution.
    pub fn to_normalized(&self, standardized: f64, factor: Factor) -> Result<f64> {
        if !standardized.is_finite() {
            return Err(Error::invalid_input(
                format!("standardized.{}", factor),
                "standardized score must be finite",
            ));
        }
        Ok(self.distribution(factor).rank(standardized) * NORMALIZED_MAX)
    }

    /// Convert a validated query to standardized space.
    pub fn standardize(&self, query: &QueryVector) -> FactorScores {
        FactorScores::from_fn(|f| {
            self.distribution(f)
                .quantile(query.get(f) / NORMALIZED_MAX)
        })
    }

    /// Convert a standardized vector back to normalized scores.
    pub fn normalize(&self, standardized: &FactorScores) -> Result<FactorScores> {
        let mut out = FactorScores::default();
        for (factor, z) in standardized.iter() {
            out[factor] = self.to_normalized(z, factor)?;
        }
        Ok(out)
    }
}
