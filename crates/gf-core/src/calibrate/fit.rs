//! Least-squares fitting and k-fold cross-validation.

use gf_common::{Error, Factor, Result};
use gf_math::{fit_ols, mae, rmse};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::corpus::TrainingCorpus;
use crate::model::{ols_error, RegressionModel};

/// Folds used when the caller does not choose.
pub const DEFAULT_FOLDS: usize = 5;

/// Held-out error for one fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FoldMetrics {
    pub fold: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub rmse: f64,
    pub mae: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CrossValidationReport {
    pub folds: usize,
    pub observations: usize,
    pub per_fold: Vec<FoldMetrics>,
    /// RMSE over all held-out residuals pooled.
    pub rmse: f64,
    pub mae: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FitReport {
    /// Full-corpus fit, with `out_of_sample_error` set to the cross-validated RMSE.
    pub model: RegressionModel,
    pub in_sample_rmse: f64,
    pub residual_std_error: f64,
    pub cross_validation: CrossValidationReport,
}

/// Deterministic k-fold cross-validation; member `i` is held out in fold `i % k`.
pub fn cross_validate(corpus: &TrainingCorpus, folds: usize) -> Result<CrossValidationReport> {
    if folds < 2 {
        return Err(Error::invalid_input(
            "folds",
            format!("must be at least 2, got {}", folds),
        ));
    }
    corpus.require(folds)?;

    let rows = corpus.score_rows();
    let outcomes = corpus.outcomes();
    let mut pooled = Vec::with_capacity(rows.len());
    let mut per_fold = Vec::with_capacity(folds);

    for fold in 0..folds {
        let mut train_x: Vec<[f64; Factor::COUNT]> = Vec::new();
        let mut train_y = Vec::new();
        let mut test = Vec::new();
        for (i, (x, &y)) in rows.iter().zip(&outcomes).enumerate() {
            if i % folds == fold {
                test.push((x, y));
            } else {
                train_x.push(*x);
                train_y.push(y);
            }
        }

        let fit = fit_ols(&train_x, &train_y).map_err(ols_error)?;
        let residuals: Vec<f64> = test.iter().map(|(x, y)| y - fit.predict(x)).collect();
        per_fold.push(FoldMetrics {
            fold,
            train_size: train_x.len(),
            test_size: residuals.len(),
            rmse: rmse(&residuals),
            mae: mae(&residuals),
        });
        pooled.extend(residuals);
    }

    Ok(CrossValidationReport {
        folds,
        observations: rows.len(),
        per_fold,
        rmse: rmse(&pooled),
        mae: mae(&pooled),
    })
}

/// Fit the four coefficients and intercept against the corpus outcomes.
pub fn fit_model(corpus: &TrainingCorpus, folds: usize) -> Result<FitReport> {
    let cross_validation = cross_validate(corpus, folds)?;
    let fit = fit_ols(&corpus.score_rows(), &corpus.outcomes()).map_err(ols_error)?;

    let model = RegressionModel::from_fit(corpus.version().clone(), &fit, cross_validation.rmse);
    model.validate()?;

    tracing::info!(
        version = %corpus.version(),
        observations = corpus.len(),
        folds,
        cv_rmse = cross_validation.rmse,
        "model fitted"
    );

    Ok(FitReport {
        in_sample_rmse: rmse(&fit.residuals),
        residual_std_error: fit.residual_std_error(),
        model,
        cross_validation,
    })
}
