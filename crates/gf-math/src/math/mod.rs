//! Core math modules.

pub mod distance;
pub mod ols;
pub mod quantile;
pub mod summary;
