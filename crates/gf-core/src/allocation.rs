//! Greedy improvement-budget allocation.
//!
//! Each point goes to the factor with the highest marginal utility
//! `coef[f] * (1 - effective[f] / 100)`, where `effective` is the current
//! normalized score plus points already assigned, capped at 100. Ties go to
//! the lowest factor index.

use std::collections::BTreeMap;

use gf_common::{Error, Factor, FactorScores, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::convert::{QueryVector, NORMALIZED_MAX};

/// Largest accepted budget: enough to lift all four factors from 0 to 100.
/// Points past that carry zero utility.
pub const MAX_BUDGET: u32 = 400;

/// Validate a caller-supplied budget.
pub fn validate_budget(raw: i64) -> Result<u32> {
    match u32::try_from(raw) {
        Ok(budget) if budget <= MAX_BUDGET => Ok(budget),
        _ => Err(Error::invalid_input(
            "budget",
            format!("must be an integer between 0 and {MAX_BUDGET}, got {raw}"),
        )),
    }
}

/// Whole points per factor, summing to the budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AllocationPlan {
    pub budget: u32,
    pub points: BTreeMap<Factor, u32>,
    /// Marginal utility of one more point per factor after the plan is applied.
    pub final_utilities: FactorScores,
}

impl AllocationPlan {
    pub fn get(&self, factor: Factor) -> u32 {
        self.points.get(&factor).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.points.values().map(|&p| u64::from(p)).sum()
    }

    /// Points as a per-factor score increment.
    pub fn as_increments(&self) -> FactorScores {
        FactorScores::from_fn(|f| f64::from(self.get(f)))
    }
}

pub struct AllocationOptimizer<'a> {
    coefficients: &'a FactorScores,
}

impl<'a> AllocationOptimizer<'a> {
    pub fn new(coefficients: &'a FactorScores) -> Self {
        AllocationOptimizer { coefficients }
    }

    pub fn marginal_utility(&self, factor: Factor, effective: f64) -> f64 {
        self.coefficients[factor] * (1.0 - effective.min(NORMALIZED_MAX) / NORMALIZED_MAX)
    }

    pub fn allocate(&self, current: &QueryVector, budget: u32) -> AllocationPlan {
        let mut assigned = [0u32; Factor::COUNT];
        let effective = |f: Factor, assigned: &[u32; Factor::COUNT]| {
            current.get(f) + f64::from(assigned[f.index()])
        };

        for _ in 0..budget {
            let mut best = Factor::ALL[0];
            let mut best_utility = self.marginal_utility(best, effective(best, &assigned));
            for &f in &Factor::ALL[1..] {
                let u = self.marginal_utility(f, effective(f, &assigned));
                // Strictly greater, so the earlier factor keeps ties.
                if u > best_utility {
                    best = f;
                    best_utility = u;
                }
            }
            assigned[best.index()] += 1;
        }

        AllocationPlan {
            budget,
            points: Factor::ALL.iter().map(|&f| (f, assigned[f.index()])).collect(),
            final_utilities: FactorScores::from_fn(|f| {
                self.marginal_utility(f, effective(f, &assigned))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_ceiling_factor_gets_fewer_points() {
        let coef = FactorScores::splat(1.0);
        let current = QueryVector::from_array([90.0, 50.0, 50.0, 50.0]).unwrap();
        let plan = AllocationOptimizer::new(&coef).allocate(&current, 5);
        assert_eq!(plan.total(), 5);
        assert!(plan.get(Factor::Speed) < plan.get(Factor::Consistency));
        assert_eq!(plan.get(Factor::Speed), 0);
        // Ties resolve to the lowest index: C, R, T, C, R.
        assert_eq!(plan.get(Factor::Consistency), 2);
        assert_eq!(plan.get(Factor::Racecraft), 2);
        assert_eq!(plan.get(Factor::TireManagement), 1);
    }

    #[test]
    fn heavier_coefficient_wins() {
        let coef = FactorScores::new(1.0, 1.0, 3.0, 1.0);
        let current = QueryVector::from_array([50.0; 4]).unwrap();
        let plan = AllocationOptimizer::new(&coef).allocate(&current, 10);
        assert_eq!(plan.get(Factor::Racecraft), 10);
    }

    #[test]
    fn zero_budget_and_saturated_profile() {
        let coef = FactorScores::splat(1.0);
        let current = QueryVector::from_array([100.0; 4]).unwrap();
        let empty = AllocationOptimizer::new(&coef).allocate(&current, 0);
        assert_eq!(empty.total(), 0);
        assert_eq!(empty.points.len(), 4);

        // Every utility is zero; all points fall to Speed by tie-break.
        let plan = AllocationOptimizer::new(&coef).allocate(&current, 3);
        assert_eq!(plan.get(Factor::Speed), 3);
        assert_eq!(plan.final_utilities, FactorScores::splat(0.0));
    }

    #[test]
    fn budget_validation() {
        assert_eq!(validate_budget(7).unwrap(), 7);
        assert_eq!(validate_budget(0).unwrap(), 0);
        assert!(matches!(validate_budget(-1), Err(Error::InvalidInput { .. })));
        assert_eq!(validate_budget(i64::from(MAX_BUDGET)).unwrap(), 400);
        assert!(validate_budget(i64::from(MAX_BUDGET) + 1).is_err());
        assert!(validate_budget(4_000_000_000).is_err());
        assert!(validate_budget(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn plan_serializes_factor_keys() {
        let coef = FactorScores::splat(1.0);
        let current = QueryVector::from_array([0.0; 4]).unwrap();
        let plan = AllocationOptimizer::new(&coef).allocate(&current, 2);
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["points"]["speed"], 1);
        assert_eq!(json["points"]["tire_management"], 0);
    }
}
