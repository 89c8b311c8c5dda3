//! The four latent performance factors and fixed-size score vectors.
//!
//! Factors are a closed set. Every per-factor quantity in the engine is a
//! `FactorScores` value rather than a string-keyed map, so a missing or
//! misspelled factor is a compile error instead of a runtime lookup failure.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut, Sub};

/// A latent performance factor.
///
/// The declaration order is the engine's fixed factor ordering; it decides
/// deterministic tie-breaks (lowest index wins).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Speed,
    Consistency,
    Racecraft,
    TireManagement,
}

impl Factor {
    /// Number of factors.
    pub const COUNT: usize = 4;

    /// All factors in fixed order.
    pub const ALL: [Factor; Factor::COUNT] = [
        Factor::Speed,
        Factor::Consistency,
        Factor::Racecraft,
        Factor::TireManagement,
    ];

    /// Position in the fixed ordering.
    pub fn index(self) -> usize {
        match self {
            Factor::Speed => 0,
            Factor::Consistency => 1,
            Factor::Racecraft => 2,
            Factor::TireManagement => 3,
        }
    }

    /// Stable snake_case name (matches the serialized form).
    pub fn name(self) -> &'static str {
        match self {
            Factor::Speed => "speed",
            Factor::Consistency => "consistency",
            Factor::Racecraft => "racecraft",
            Factor::TireManagement => "tire_management",
        }
    }

    /// Sign applied to the raw upstream measure so that higher is better.
    ///
    /// Speed (gap to the fastest lap), consistency (lap-time spread) and tire
    /// management (degradation slope) are measured lower-is-better and get
    /// reflected. Racecraft (positions gained) is already higher-is-better.
    pub fn sign(self) -> f64 {
        match self {
            Factor::Speed | Factor::Consistency | Factor::TireManagement => -1.0,
            Factor::Racecraft => 1.0,
        }
    }

    /// Whether the raw measure is reflected.
    pub fn is_reflected(self) -> bool {
        self.sign() < 0.0
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Factor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "speed" => Ok(Factor::Speed),
            "consistency" => Ok(Factor::Consistency),
            "racecraft" => Ok(Factor::Racecraft),
            "tire_management" | "tyre_management" | "tires" => Ok(Factor::TireManagement),
            _ => Err(format!("unknown factor: {}", s)),
        }
    }
}

/// One real value per factor.
///
/// Used for standardized vectors, normalized (0-100) profiles, regression
/// coefficients, circuit demand profiles and signed differences alike.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FactorScores {
    pub speed: f64,
    pub consistency: f64,
    pub racecraft: f64,
    pub tire_management: f64,
}

impl FactorScores {
    pub const fn new(speed: f64, consistency: f64, racecraft: f64, tire_management: f64) -> Self {
        FactorScores {
            speed,
            consistency,
            racecraft,
            tire_management,
        }
    }

    /// Same value for every factor.
    pub const fn splat(value: f64) -> Self {
        FactorScores::new(value, value, value, value)
    }

    pub fn from_array(values: [f64; Factor::COUNT]) -> Self {
        FactorScores::new(values[0], values[1], values[2], values[3])
    }

    pub fn to_array(self) -> [f64; Factor::COUNT] {
        [
            self.speed,
            self.consistency,
            self.racecraft,
            self.tire_management,
        ]
    }

    /// Build from a per-factor function.
    pub fn from_fn(mut f: impl FnMut(Factor) -> f64) -> Self {
        FactorScores::new(
            f(Factor::Speed),
            f(Factor::Consistency),
            f(Factor::Racecraft),
            f(Factor::TireManagement),
        )
    }

    /// Iterate `(factor, value)` pairs in fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (Factor, f64)> + '_ {
        Factor::ALL.into_iter().map(move |f| (f, self[f]))
    }

    /// Apply `f` to every value.
    pub fn map(self, mut f: impl FnMut(Factor, f64) -> f64) -> Self {
        FactorScores::from_fn(|factor| f(factor, self[factor]))
    }

    /// Dot product.
    pub fn dot(&self, other: &FactorScores) -> f64 {
        Factor::ALL.iter().map(|&f| self[f] * other[f]).sum()
    }

    /// Sum of all values.
    pub fn total(&self) -> f64 {
        Factor::ALL.iter().map(|&f| self[f]).sum()
    }

    pub fn is_finite(&self) -> bool {
        Factor::ALL.iter().all(|&f| self[f].is_finite())
    }

    /// Apply each factor's sign convention to raw upstream measures.
    pub fn oriented(self) -> Self {
        self.map(|f, v| v * f.sign())
    }
}

impl Index<Factor> for FactorScores {
    type Output = f64;

    fn index(&self, factor: Factor) -> &f64 {
        match factor {
            Factor::Speed => &self.speed,
            Factor::Consistency => &self.consistency,
            Factor::Racecraft => &self.racecraft,
            Factor::TireManagement => &self.tire_management,
        }
    }
}

impl IndexMut<Factor> for FactorScores {
    fn index_mut(&mut self, factor: Factor) -> &mut f64 {
        match factor {
            Factor::Speed => &mut self.speed,
            Factor::Consistency => &mut self.consistency,
            Factor::Racecraft => &mut self.racecraft,
            Factor::TireManagement => &mut self.tire_management,
        }
    }
}

impl Sub for FactorScores {
    type Output = FactorScores;

    fn sub(self, rhs: FactorScores) -> FactorScores {
        FactorScores::from_fn(|f| self[f] - rhs[f])
    }
}

impl From<[f64; Factor::COUNT]> for FactorScores {
    fn from(values: [f64; Factor::COUNT]) -> Self {
        FactorScores::from_array(values)
    }
}
