//! The linear outcome model.

use gf_common::{Error, Factor, FactorScores, ModelUnavailableReason, Result, SnapshotVersion};
use gf_math::{OlsError, OlsFit};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fixed regression coefficients and intercept, fitted against one corpus version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RegressionModel {
    /// Corpus version the model was fitted against.
    pub version: SnapshotVersion,
    pub intercept: f64,
    pub coefficients: FactorScores,
    /// Typical out-of-sample prediction error (RMSE), the scale for confidence tiers.
    pub out_of_sample_error: f64,
}

impl RegressionModel {
    /// Build from an OLS fit over standardized score rows.
    pub fn from_fit(
        version: SnapshotVersion,
        fit: &OlsFit<{ Factor::COUNT }>,
        out_of_sample_error: f64,
    ) -> Self {
        RegressionModel {
            version,
            intercept: fit.intercept,
            coefficients: FactorScores::from_array(fit.coefficients),
            out_of_sample_error,
        }
    }

    /// Reject non-finite parameters, non-positive factor weights and a
    /// non-positive error scale.
    ///
    /// Scores are reflected so higher is better, and allocation and weighted
    /// distance read each coefficient as a positive weight. An outcome where
    /// lower is better (a finishing position) must be negated before fitting.
    pub fn validate(&self) -> Result<()> {
        if !self.version.is_valid() {
            return Err(Error::InvalidSnapshot(
                "model version is empty or padded".to_string(),
            ));
        }
        if !self.intercept.is_finite() || !self.coefficients.is_finite() {
            return Err(Error::InvalidSnapshot(
                "model intercept and coefficients must be finite".to_string(),
            ));
        }
        if let Some(factor) = Factor::ALL
            .into_iter()
            .find(|&f| self.coefficients[f] <= 0.0)
        {
            return Err(Error::InvalidSnapshot(format!(
                "model coefficient for {} must be positive, got {}",
                factor, self.coefficients[factor]
            )));
        }
        if !(self.out_of_sample_error.is_finite() && self.out_of_sample_error > 0.0) {
            return Err(Error::InvalidSnapshot(format!(
                "model out_of_sample_error must be positive, got {}",
                self.out_of_sample_error
            )));
        }
        Ok(())
    }

    /// `intercept + sum(coefficient[f] * z[f])`.
    pub fn predict(&self, standardized: &FactorScores) -> f64 {
        self.intercept + self.coefficients.dot(standardized)
    }

    /// Fail with `ModelUnavailable` unless fitted against `corpus_version`.
    pub fn ensure_matches(&self, corpus_version: &SnapshotVersion) -> Result<()> {
        if &self.version != corpus_version {
            return Err(Error::ModelUnavailable(
                ModelUnavailableReason::VersionMismatch {
                    model: self.version.to_string(),
                    corpus: corpus_version.to_string(),
                },
            ));
        }
        Ok(())
    }
}

/// Lift a least-squares failure on a full corpus into the engine taxonomy.
pub(crate) fn ols_error(err: OlsError) -> Error {
    match err {
        OlsError::TooFewObservations { n, required } => Error::InsufficientTrainingData {
            observed: n,
            required,
        },
        OlsError::Singular => Error::NumericalInstability(err.to_string()),
        OlsError::DimensionMismatch { .. } | OlsError::NonFinite { .. } => {
            Error::InvalidSnapshot(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> RegressionModel {
        RegressionModel {
            version: "v1".into(),
            intercept: 10.0,
            coefficients: FactorScores::new(2.0, 1.0, 0.5, 0.25),
            out_of_sample_error: 1.5,
        }
    }

    #[test]
    fn predict_is_linear() {
        let m = model();
        assert_eq!(m.predict(&FactorScores::splat(0.0)), 10.0);
        assert_eq!(m.predict(&FactorScores::new(1.0, 2.0, 4.0, 8.0)), 10.0 + 2.0 + 2.0 + 2.0 + 2.0);
    }

    #[test]
    fn version_mismatch_is_model_unavailable() {
        let err = model().ensure_matches(&"v2".into()).unwrap_err();
        assert!(matches!(
            err,
            Error::ModelUnavailable(ModelUnavailableReason::VersionMismatch { .. })
        ));
        model().ensure_matches(&"v1".into()).unwrap();
    }

    #[test]
    fn validate_rejects_bad_parameters() {
        let mut m = model();
        m.out_of_sample_error = 0.0;
        assert!(m.validate().is_err());

        let mut m = model();
        m.coefficients.racecraft = f64::NAN;
        assert!(m.validate().is_err());

        model().validate().unwrap();
    }

    #[test]
    fn validate_rejects_non_positive_coefficients() {
        let mut m = model();
        m.coefficients = FactorScores::new(-2.0, -1.0, -0.5, -0.25);
        let err = m.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidSnapshot(ref msg) if msg.contains("speed")));

        let mut m = model();
        m.coefficients.tire_management = 0.0;
        assert!(matches!(m.validate(), Err(Error::InvalidSnapshot(ref msg)) if msg.contains("tire")));
    }

    #[test]
    fn ols_errors_map_to_taxonomy() {
        assert!(matches!(ols_error(OlsError::Singular), Error::NumericalInstability(_)));
        assert!(matches!(
            ols_error(OlsError::TooFewObservations { n: 3, required: 5 }),
            Error::InsufficientTrainingData { observed: 3, required: 5 }
        ));
    }
}
