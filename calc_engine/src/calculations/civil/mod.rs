//! # Civil / Structural Calculations
//!
//! Reinforced-concrete member design (strength design, φ-factored capacities)
//! plus the structural load routes of the [`crate::loads`] calculator.
//!
//! | Calculation | Module |
//! |---|---|
//! | `beam-analysis` | [`beam`] |
//! | `column-design` | [`column`] |
//! | `foundation-design` | [`foundation`] |
//! | `slab-design` | [`slab`] |
//! | `concrete-quantity` | [`quantity`] |
//! | `dead-loads`, `live-loads`, `wind-loads`, `seismic-loads`, `load-combinations` | [`loads`] |
//!
//! Concrete and reinforcement properties (`fck_mpa`, `elastic_modulus_mpa`,
//! `fy_mpa`) come from the Material Database by grade name.

pub mod beam;
pub mod column;
pub mod foundation;
pub mod loads;
pub mod quantity;
pub mod slab;

use std::sync::Arc;

use crate::calculations::{discipline_menu, Discipline};
use crate::context::EngineContext;
use crate::errors::EngineResult;
use crate::validation::FieldChecks;

/// Unit weight of reinforced concrete (kN/m³)
pub const CONCRETE_UNIT_WEIGHT_KN_M3: f64 = 25.0;

/// Strength reduction factors
pub const PHI_FLEXURE: f64 = 0.90;
pub const PHI_SHEAR: f64 = 0.75;
pub const PHI_COMPRESSION_TIED: f64 = 0.65;

/// Net tensile strain of 0.005 keeps a section tension-controlled: c/d ≤ 3/8
const TENSION_CONTROLLED_DEPTH_RATIO: f64 = 0.375;

pub const CONCRETE_CATEGORY: (&str, &str) = ("concrete", "structural");
pub const REINFORCEMENT_CATEGORY: (&str, &str) = ("steel", "reinforcement");

/// Civil discipline calculator
#[derive(Debug, Clone)]
pub struct CivilCalculator {
    ctx: Arc<EngineContext>,
}

impl CivilCalculator {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        CivilCalculator { ctx }
    }
}

discipline_menu!(CivilCalculator, Discipline::Civil, {
    "beam-analysis" => beam::BeamAnalysisInput => beam::calculate,
    "column-design" => column::ColumnDesignInput => column::calculate,
    "foundation-design" => foundation::FoundationDesignInput => foundation::calculate,
    "slab-design" => slab::SlabDesignInput => slab::calculate,
    "concrete-quantity" => quantity::ConcreteQuantityInput => quantity::calculate,
    "dead-loads" => loads::DeadLoadsInput => loads::dead_loads,
    "live-loads" => loads::LiveLoadsInput => loads::live_loads,
    "wind-loads" => crate::loads::WindLoadInput => loads::wind_loads,
    "seismic-loads" => crate::loads::SeismicLoadInput => loads::seismic_loads,
    "load-combinations" => loads::LoadCombinationsInput => loads::load_combinations,
});

// ============================================================================
// Shared concrete design helpers
// ============================================================================

/// Concrete grade properties used in design
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Concrete {
    pub fck_mpa: f64,
    pub elastic_modulus_mpa: f64,
}

impl Concrete {
    pub fn lookup(ctx: &EngineContext, grade: &str) -> EngineResult<Self> {
        let (cat, sub) = CONCRETE_CATEGORY;
        let db = &ctx.data.materials;
        Ok(Concrete {
            fck_mpa: db.property(cat, sub, grade, "fck_mpa")?,
            elastic_modulus_mpa: db.property(cat, sub, grade, "elastic_modulus_mpa")?,
        })
    }

    /// Whitney stress block factor β₁
    pub fn beta1(&self) -> f64 {
        if self.fck_mpa <= 28.0 {
            0.85
        } else {
            (0.85 - 0.05 * (self.fck_mpa - 28.0) / 7.0).max(0.65)
        }
    }

    pub fn sqrt_fc(&self) -> f64 {
        self.fck_mpa.sqrt()
    }

    /// φM_n at the tension-controlled limit (N·mm) for a b × d section
    pub fn max_flexural_capacity_nmm(&self, b_mm: f64, d_mm: f64) -> f64 {
        let a = self.beta1() * TENSION_CONTROLLED_DEPTH_RATIO * d_mm;
        PHI_FLEXURE * 0.85 * self.fck_mpa * b_mm * a * (d_mm - a / 2.0)
    }

    /// Required tension steel ratio for a factored moment, or `None` when
    /// the section cannot develop it with a rectangular stress block.
    pub fn required_steel_ratio(&self, mu_nmm: f64, fy_mpa: f64, b_mm: f64, d_mm: f64) -> Option<f64> {
        let rn = mu_nmm / (PHI_FLEXURE * b_mm * d_mm * d_mm);
        let term = 1.0 - 2.0 * rn / (0.85 * self.fck_mpa);
        if term < 0.0 {
            return None;
        }
        Some(0.85 * self.fck_mpa / fy_mpa * (1.0 - term.sqrt()))
    }

    /// Minimum flexural steel ratio `max(0.25√f'c / fy, 1.4 / fy)`
    pub fn minimum_steel_ratio(&self, fy_mpa: f64) -> f64 {
        (0.25 * self.sqrt_fc() / fy_mpa).max(1.4 / fy_mpa)
    }
}

pub fn steel_yield(ctx: &EngineContext, grade: &str) -> EngineResult<f64> {
    let (cat, sub) = REINFORCEMENT_CATEGORY;
    ctx.data.materials.property(cat, sub, grade, "fy_mpa")
}

pub(crate) fn check_concrete_grade(checks: &mut FieldChecks, ctx: &EngineContext, field: &str, grade: &str) {
    let (cat, sub) = CONCRETE_CATEGORY;
    if ctx.data.materials.get(cat, sub, grade).is_err() {
        checks.push(
            field,
            format!(
                "unknown concrete grade '{}', expected one of: {}",
                grade,
                ctx.data.materials.grades(cat, sub).join(", ")
            ),
        );
    }
}

pub(crate) fn check_steel_grade(checks: &mut FieldChecks, ctx: &EngineContext, field: &str, grade: &str) {
    let (cat, sub) = REINFORCEMENT_CATEGORY;
    if ctx.data.materials.get(cat, sub, grade).is_err() {
        checks.push(
            field,
            format!(
                "unknown reinforcement grade '{}', expected one of: {}",
                grade,
                ctx.data.materials.grades(cat, sub).join(", ")
            ),
        );
    }
}

pub(crate) fn default_steel_grade() -> String {
    "B500".to_string()
}

pub(crate) fn default_true() -> bool {
    true
}

/// Round `value` up to the next multiple of `step`
pub(crate) fn round_up_to(value: f64, step: f64) -> f64 {
    (value / step - 1e-9).ceil() * step
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::test_support::context;
    use crate::calculations::Calculator;
    use serde_json::json;

    #[test]
    fn test_beta1() {
        let c = |fc| Concrete { fck_mpa: fc, elastic_modulus_mpa: 1.0 };
        assert_eq!(c(25.0).beta1(), 0.85);
        assert!((c(35.0).beta1() - 0.80).abs() < 1e-12);
        assert_eq!(c(80.0).beta1(), 0.65);
    }

    #[test]
    fn test_concrete_lookup_from_database() {
        let ctx = context();
        let c30 = Concrete::lookup(&ctx, "c30").unwrap();
        assert_eq!(c30.fck_mpa, 30.0);
        assert!((c30.elastic_modulus_mpa - 4700.0 * 30f64.sqrt()).abs() < 1.0);
        assert_eq!(steel_yield(&ctx, "B500").unwrap(), 500.0);
    }

    #[test]
    fn test_round_up_to() {
        assert!((round_up_to(2.4297, 0.05) - 2.45).abs() < 1e-12);
        assert!((round_up_to(2.45, 0.05) - 2.45).abs() < 1e-12);
        assert_eq!(round_up_to(101.0, 10.0), 110.0);
    }

    #[test]
    fn test_menu_is_closed() {
        let calc = CivilCalculator::new(context());
        assert_eq!(calc.available_calculations().len(), 10);
        let err = calc
            .calculate("nonexistent-calc", &json!({}), &Default::default())
            .unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_CALCULATION");
        let err = calc.validate_inputs("nonexistent-calc", &json!({})).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_CALCULATION");
    }

    #[test]
    fn test_validation_error_carries_context() {
        let calc = CivilCalculator::new(context());
        let err = calc
            .calculate("beam-analysis", &json!({"width_mm": 300}), &Default::default())
            .unwrap_err();
        match err {
            crate::errors::EngineError::Validation { discipline, calculation_type, errors } => {
                assert_eq!(discipline, "civil");
                assert_eq!(calculation_type, "beam-analysis");
                assert!(!errors.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
