//! Calibration primitives for the offline model-fitting procedure.
//!
//! The engine consumes a fitted model as part of a snapshot; these functions
//! let the pipeline that produces that model (or an operator checking it) fit
//! coefficients, estimate out-of-sample error by k-fold cross-validation, and
//! measure how often held-out outcomes land inside reported intervals.
//!
//! # Usage
//!
//! ```ignore
//! use gf_core::calibrate::{fit_model, interval_coverage};
//!
//! let report = fit_model(&corpus, 5)?;
//! artifact.model = Some(report.model);
//! let coverage = interval_coverage(&engine, &held_out, &options, &token)?;
//! assert!(coverage.deviation().abs() < 0.03);
//! ```

pub mod coverage;
pub mod fit;

pub use coverage::{interval_coverage, CoverageReport};
pub use fit::{cross_validate, fit_model, CrossValidationReport, FitReport, FoldMetrics, DEFAULT_FOLDS};
