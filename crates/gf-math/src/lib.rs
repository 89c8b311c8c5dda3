//! gridfit math utilities.

pub mod math;

pub use math::distance::*;
pub use math::ols::{fit_ols, OlsError, OlsFit};
pub use math::quantile::*;
pub use math::summary::*;
