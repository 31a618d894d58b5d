//! # One-Way Slab Design
//!
//! Per metre width. Minimum thickness by support condition (L/20, L/24,
//! L/28, L/10); when no thickness is given the minimum is used, rounded up
//! to 10 mm. Bottom steel from the factored moment, never less than the
//! 0.0018·b·h shrinkage steel, converted to a bar spacing.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::{
    check_concrete_grade, check_steel_grade, default_steel_grade, round_up_to, steel_yield, Concrete,
    CONCRETE_UNIT_WEIGHT_KN_M3,
};
use crate::calculations::{ComplianceCheck, InputRecord, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineError, EngineResult, FieldError};
use crate::validation::FieldChecks;

const STRIP_WIDTH_MM: f64 = 1000.0;
const SHRINKAGE_STEEL_RATIO: f64 = 0.0018;
const SPACING_STEP_MM: f64 = 25.0;
const MAX_SPACING_MM: f64 = 450.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlabSupport {
    #[default]
    SimplySupported,
    OneEndContinuous,
    BothEndsContinuous,
    Cantilever,
}

impl SlabSupport {
    /// Span divisor for the minimum thickness
    pub fn thickness_divisor(&self) -> f64 {
        match self {
            SlabSupport::SimplySupported => 20.0,
            SlabSupport::OneEndContinuous => 24.0,
            SlabSupport::BothEndsContinuous => 28.0,
            SlabSupport::Cantilever => 10.0,
        }
    }

    /// `M = w L² / divisor`
    pub fn moment_divisor(&self) -> f64 {
        match self {
            SlabSupport::SimplySupported => 8.0,
            SlabSupport::OneEndContinuous => 10.0,
            SlabSupport::BothEndsContinuous => 12.0,
            SlabSupport::Cantilever => 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlabDesignInput {
    pub span_m: f64,
    #[serde(default)]
    pub support_condition: SlabSupport,
    #[serde(default)]
    pub thickness_mm: Option<f64>,
    pub concrete_grade: String,
    #[serde(default = "default_steel_grade")]
    pub steel_grade: String,
    /// Superimposed dead load (finishes, services, partitions)
    #[serde(default)]
    pub dead_load_kpa: f64,
    pub live_load_kpa: f64,
    #[serde(default = "default_bar")]
    pub bar_diameter_mm: f64,
    #[serde(default = "default_cover")]
    pub cover_mm: f64,
}

fn default_bar() -> f64 {
    12.0
}

fn default_cover() -> f64 {
    20.0
}

impl InputRecord for SlabDesignInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks
            .positive("span_m", self.span_m)
            .positive_opt("thickness_mm", self.thickness_mm)
            .non_negative("dead_load_kpa", self.dead_load_kpa)
            .non_negative("live_load_kpa", self.live_load_kpa)
            .in_range("bar_diameter_mm", self.bar_diameter_mm, 8.0, 32.0)
            .in_range("cover_mm", self.cover_mm, 15.0, 75.0);
        check_concrete_grade(&mut checks, ctx, "concrete_grade", &self.concrete_grade);
        check_steel_grade(&mut checks, ctx, "steel_grade", &self.steel_grade);
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlabDesignResult {
    pub minimum_thickness_mm: f64,
    pub thickness_mm: f64,
    pub effective_depth_mm: f64,
    pub self_weight_kpa: f64,
    pub factored_load_kpa: f64,
    pub design_moment_knm_per_m: f64,
    pub moment_capacity_knm_per_m: f64,
    pub bending_ratio: f64,
    pub required_steel_mm2_per_m: f64,
    pub bar_diameter_mm: f64,
    pub bar_spacing_mm: f64,
    pub provided_steel_mm2_per_m: f64,
}

pub fn design(ctx: &EngineContext, input: &SlabDesignInput) -> EngineResult<SlabDesignResult> {
    let concrete = Concrete::lookup(ctx, &input.concrete_grade)?;
    let fy = steel_yield(ctx, &input.steel_grade)?;

    let minimum = input.span_m * 1000.0 / input.support_condition.thickness_divisor();
    let h = input
        .thickness_mm
        .unwrap_or_else(|| round_up_to(minimum, 10.0));
    let d = h - input.cover_mm - input.bar_diameter_mm / 2.0;
    if d <= 0.0 {
        return Err(EngineError::invalid_field(
            "thickness_mm",
            "slab is thinner than cover plus half a bar",
        ));
    }

    let self_weight = CONCRETE_UNIT_WEIGHT_KN_M3 * h / 1000.0;
    let wu = 1.2 * (self_weight + input.dead_load_kpa) + 1.6 * input.live_load_kpa;
    let mu = wu * input.span_m * input.span_m / input.support_condition.moment_divisor();
    let capacity = concrete.max_flexural_capacity_nmm(STRIP_WIDTH_MM, d) / 1e6;

    let shrinkage = SHRINKAGE_STEEL_RATIO * STRIP_WIDTH_MM * h;
    let required = concrete
        .required_steel_ratio(mu * 1e6, fy, STRIP_WIDTH_MM, d)
        .map(|rho| (rho * STRIP_WIDTH_MM * d).max(shrinkage))
        .ok_or_else(|| EngineError::calculation("slab cannot develop the design moment; increase thickness"))?;

    let bar_area = PI * input.bar_diameter_mm.powi(2) / 4.0;
    let raw_spacing = STRIP_WIDTH_MM * bar_area / required;
    let spacing = ((raw_spacing / SPACING_STEP_MM).floor() * SPACING_STEP_MM)
        .min(3.0 * h)
        .min(MAX_SPACING_MM);
    if spacing <= 0.0 {
        return Err(EngineError::calculation(format!(
            "{} mm bars cannot supply {:.0} mm²/m; use a larger bar",
            input.bar_diameter_mm, required
        )));
    }

    Ok(SlabDesignResult {
        minimum_thickness_mm: minimum,
        thickness_mm: h,
        effective_depth_mm: d,
        self_weight_kpa: self_weight,
        factored_load_kpa: wu,
        design_moment_knm_per_m: mu,
        moment_capacity_knm_per_m: capacity,
        bending_ratio: mu / capacity,
        required_steel_mm2_per_m: required,
        bar_diameter_mm: input.bar_diameter_mm,
        bar_spacing_mm: spacing,
        provided_steel_mm2_per_m: STRIP_WIDTH_MM * bar_area / spacing,
    })
}

pub(crate) fn calculate(ctx: &EngineContext, input: &SlabDesignInput) -> EngineResult<Outcome> {
    let r = design(ctx, input)?;
    Ok(Outcome::new(&r)?
        .check(
            "minimum_thickness",
            ComplianceCheck::flag(
                r.thickness_mm >= r.minimum_thickness_mm,
                format!("h = {:.0} mm vs minimum {:.0} mm", r.thickness_mm, r.minimum_thickness_mm),
            ),
        )
        .check(
            "bending",
            ComplianceCheck::ratio(
                r.bending_ratio,
                format!(
                    "Mu = {:.1} kNm/m vs φMn,max = {:.1} kNm/m",
                    r.design_moment_knm_per_m, r.moment_capacity_knm_per_m
                ),
            ),
        )
        .recommend(format!(
            "Provide T{:.0} bars at {:.0} mm centres",
            r.bar_diameter_mm, r.bar_spacing_mm
        ))
        .standards(&[
            "SBC 304:2018 (ACI 318-19) Table 7.3.1.1 - Minimum one-way slab thickness",
            "SBC 304:2018 Section 24.4 - Shrinkage and temperature reinforcement",
        ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::test_support::context;

    fn input() -> SlabDesignInput {
        serde_json::from_value(serde_json::json!({
            "span_m": 4.0,
            "concrete_grade": "C30",
            "dead_load_kpa": 1.5,
            "live_load_kpa": 2.5
        }))
        .unwrap()
    }

    #[test]
    fn test_minimum_thickness_used_by_default() {
        let ctx = context();
        let r = design(&ctx, &input()).unwrap();
        assert!((r.minimum_thickness_mm - 200.0).abs() < 1e-9);
        assert!((r.thickness_mm - 200.0).abs() < 1e-9);
        // d = 200 - 20 - 6
        assert!((r.effective_depth_mm - 174.0).abs() < 1e-9);
    }

    #[test]
    fn test_loads_and_moment() {
        let ctx = context();
        let r = design(&ctx, &input()).unwrap();
        // wu = 1.2*(5.0 + 1.5) + 1.6*2.5 = 11.8; M = 11.8*16/8
        assert!((r.factored_load_kpa - 11.8).abs() < 1e-9);
        assert!((r.design_moment_knm_per_m - 23.6).abs() < 1e-9);
        assert!(r.bending_ratio < 1.0);
    }

    #[test]
    fn test_spacing_provides_required_steel() {
        let ctx = context();
        let r = design(&ctx, &input()).unwrap();
        assert!(r.provided_steel_mm2_per_m >= r.required_steel_mm2_per_m);
        assert_eq!(r.bar_spacing_mm % 25.0, 0.0);
        assert!(r.bar_spacing_mm <= 450.0);
    }

    #[test]
    fn test_thin_slab_flagged() {
        let ctx = context();
        let mut i = input();
        i.thickness_mm = Some(150.0);
        let outcome = calculate(&ctx, &i).unwrap();
        let result = outcome
            .finish(crate::calculations::Discipline::Civil, "slab-design", &serde_json::Value::Null)
            .unwrap();
        assert!(!result.compliance["minimum_thickness"].passed);
    }
}
