//! # Isolated Pad Foundation
//!
//! Sizes a square or rectangular pad under a single column and checks
//! bearing and punching shear.
//!
//! - Net allowable pressure removes the footing weight and the soil above it
//! - Plan dimensions round up to 50 mm
//! - Punching shear on the critical perimeter at d/2 from the column face,
//!   `φV_c = 0.75 · 0.33√f'c · b₀ · d`
//! - Bottom steel from the cantilever moment at the column face

use serde::{Deserialize, Serialize};

use super::{
    check_concrete_grade, check_steel_grade, default_steel_grade, round_up_to, steel_yield, Concrete,
    CONCRETE_UNIT_WEIGHT_KN_M3, PHI_SHEAR,
};
use crate::calculations::{ComplianceCheck, InputRecord, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineError, EngineResult, FieldError};
use crate::validation::FieldChecks;

const SOIL_UNIT_WEIGHT_KN_M3: f64 = 18.0;
const PLAN_STEP_M: f64 = 0.05;
const BAR_ALLOWANCE_MM: f64 = 16.0;
/// Load factor applied to service load when no factored load is given
const DEFAULT_LOAD_FACTOR: f64 = 1.45;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundationDesignInput {
    /// Service column load
    pub column_load_kn: f64,
    #[serde(default)]
    pub factored_load_kn: Option<f64>,
    pub allowable_bearing_kpa: f64,
    pub column_width_mm: f64,
    /// Defaults to `column_width_mm` (square column)
    #[serde(default)]
    pub column_depth_mm: Option<f64>,
    pub thickness_mm: f64,
    pub concrete_grade: String,
    #[serde(default = "default_steel_grade")]
    pub steel_grade: String,
    /// Founding depth below ground
    #[serde(default = "default_founding_depth")]
    pub founding_depth_m: f64,
    /// Plan L/B; 1.0 gives a square pad
    #[serde(default = "default_aspect")]
    pub aspect_ratio: f64,
    #[serde(default = "default_cover")]
    pub cover_mm: f64,
}

fn default_founding_depth() -> f64 {
    1.5
}

fn default_aspect() -> f64 {
    1.0
}

fn default_cover() -> f64 {
    75.0
}

impl FoundationDesignInput {
    fn column_depth(&self) -> f64 {
        self.column_depth_mm.unwrap_or(self.column_width_mm)
    }
}

impl InputRecord for FoundationDesignInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks
            .positive("column_load_kn", self.column_load_kn)
            .positive_opt("factored_load_kn", self.factored_load_kn)
            .positive("allowable_bearing_kpa", self.allowable_bearing_kpa)
            .positive("column_width_mm", self.column_width_mm)
            .positive_opt("column_depth_mm", self.column_depth_mm)
            .positive("thickness_mm", self.thickness_mm)
            .non_negative("founding_depth_m", self.founding_depth_m)
            .in_range("aspect_ratio", self.aspect_ratio, 1.0, 3.0)
            .in_range("cover_mm", self.cover_mm, 40.0, 150.0);
        if self.thickness_mm.is_finite() && self.cover_mm.is_finite() {
            checks.require(
                self.thickness_mm > self.cover_mm + BAR_ALLOWANCE_MM,
                "thickness_mm",
                "must exceed cover plus bar diameter",
            );
        }
        check_concrete_grade(&mut checks, ctx, "concrete_grade", &self.concrete_grade);
        check_steel_grade(&mut checks, ctx, "steel_grade", &self.steel_grade);
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoundationDesignResult {
    pub net_allowable_bearing_kpa: f64,
    pub required_area_m2: f64,
    pub width_m: f64,
    pub length_m: f64,
    pub provided_area_m2: f64,
    pub bearing_pressure_kpa: f64,
    pub bearing_ratio: f64,
    pub factored_load_kn: f64,
    pub effective_depth_mm: f64,
    pub punching_perimeter_mm: f64,
    pub punching_shear_kn: f64,
    pub punching_capacity_kn: f64,
    pub punching_ratio: f64,
    pub design_moment_knm_per_m: f64,
    pub required_steel_mm2_per_m: f64,
    pub concrete_volume_m3: f64,
}

pub fn design(ctx: &EngineContext, input: &FoundationDesignInput) -> EngineResult<FoundationDesignResult> {
    let concrete = Concrete::lookup(ctx, &input.concrete_grade)?;
    let fy = steel_yield(ctx, &input.steel_grade)?;

    let t_m = input.thickness_mm / 1000.0;
    let soil_above = (input.founding_depth_m - t_m).max(0.0);
    let surcharge = CONCRETE_UNIT_WEIGHT_KN_M3 * t_m + SOIL_UNIT_WEIGHT_KN_M3 * soil_above;
    let net_allowable = input.allowable_bearing_kpa - surcharge;
    if net_allowable <= 0.0 {
        return Err(EngineError::calculation(format!(
            "footing and overburden weight ({:.1} kPa) exhaust the allowable bearing pressure",
            surcharge
        )));
    }

    let required_area = input.column_load_kn / net_allowable;
    let width = round_up_to((required_area / input.aspect_ratio).sqrt(), PLAN_STEP_M);
    let length = round_up_to(width * input.aspect_ratio, PLAN_STEP_M);
    let area = width * length;
    let bearing_pressure = input.column_load_kn / area + surcharge;

    let pu = input
        .factored_load_kn
        .unwrap_or(DEFAULT_LOAD_FACTOR * input.column_load_kn);
    let qu = pu / area;

    let d = input.thickness_mm - input.cover_mm - BAR_ALLOWANCE_MM;
    let c1 = input.column_width_mm;
    let c2 = input.column_depth();
    let b0 = 2.0 * (c1 + d) + 2.0 * (c2 + d);
    let punching_area_m2 = (c1 + d) * (c2 + d) / 1e6;
    let vu = (pu - qu * punching_area_m2).max(0.0);
    let phi_vc = PHI_SHEAR * 0.33 * concrete.sqrt_fc() * b0 * d / 1000.0;

    // Cantilever from the column face in the long direction, per metre width
    let overhang = ((length * 1000.0 - c2.max(c1)) / 2.0).max(0.0) / 1000.0;
    let mu = qu * overhang * overhang / 2.0;
    let minimum_steel = 0.0018 * 1000.0 * input.thickness_mm;
    let steel = match concrete.required_steel_ratio(mu * 1e6, fy, 1000.0, d) {
        Some(rho) => (rho * 1000.0 * d).max(minimum_steel),
        None => {
            return Err(EngineError::calculation(
                "footing thickness cannot develop the flexural demand; increase thickness_mm",
            ))
        }
    };

    Ok(FoundationDesignResult {
        net_allowable_bearing_kpa: net_allowable,
        required_area_m2: required_area,
        width_m: width,
        length_m: length,
        provided_area_m2: area,
        bearing_pressure_kpa: bearing_pressure,
        bearing_ratio: bearing_pressure / input.allowable_bearing_kpa,
        factored_load_kn: pu,
        effective_depth_mm: d,
        punching_perimeter_mm: b0,
        punching_shear_kn: vu,
        punching_capacity_kn: phi_vc,
        punching_ratio: vu / phi_vc,
        design_moment_knm_per_m: mu,
        required_steel_mm2_per_m: steel,
        concrete_volume_m3: area * t_m,
    })
}

pub(crate) fn calculate(ctx: &EngineContext, input: &FoundationDesignInput) -> EngineResult<Outcome> {
    let r = design(ctx, input)?;
    Ok(Outcome::new(&r)?
        .check(
            "bearing",
            ComplianceCheck::ratio(
                r.bearing_ratio,
                format!(
                    "q = {:.1} kPa vs allowable {:.1} kPa",
                    r.bearing_pressure_kpa, input.allowable_bearing_kpa
                ),
            ),
        )
        .check(
            "punching_shear",
            ComplianceCheck::ratio(
                r.punching_ratio,
                format!("Vu = {:.0} kN vs φVc = {:.0} kN", r.punching_shear_kn, r.punching_capacity_kn),
            ),
        )
        .recommend_if(
            r.punching_ratio > 1.0,
            "Increase footing thickness to resist punching shear",
        )
        .recommend(format!(
            "Provide a {:.2} m x {:.2} m pad, {:.0} mm thick",
            r.width_m, r.length_m, input.thickness_mm
        ))
        .standards(&[
            "SBC 304:2018 (ACI 318-19) Chapter 13 - Foundations",
            "SBC 304:2018 Section 22.6 - Two-way shear",
            "SBC 303:2018 - Soils and foundations",
        ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::test_support::context;

    fn input() -> FoundationDesignInput {
        serde_json::from_value(serde_json::json!({
            "column_load_kn": 1000,
            "factored_load_kn": 1450,
            "allowable_bearing_kpa": 200,
            "column_width_mm": 400,
            "thickness_mm": 600,
            "concrete_grade": "C30"
        }))
        .unwrap()
    }

    #[test]
    fn test_square_pad_sizing() {
        let ctx = context();
        let r = design(&ctx, &input()).unwrap();
        // net = 200 - 25*0.6 - 18*0.9 = 168.8 kPa
        assert!((r.net_allowable_bearing_kpa - 168.8).abs() < 1e-9);
        // sqrt(1000/168.8) = 2.434 -> 2.45 m
        assert!((r.width_m - 2.45).abs() < 1e-9);
        assert_eq!(r.width_m, r.length_m);
        assert!(r.bearing_ratio <= 1.0);
    }

    #[test]
    fn test_punching_shear() {
        let ctx = context();
        let r = design(&ctx, &input()).unwrap();
        // d = 600 - 75 - 16 = 509, b0 = 4 * 909
        assert!((r.effective_depth_mm - 509.0).abs() < 1e-9);
        assert!((r.punching_perimeter_mm - 3636.0).abs() < 1e-9);
        let expected = 0.75 * 0.33 * 30f64.sqrt() * 3636.0 * 509.0 / 1000.0;
        assert!((r.punching_capacity_kn - expected).abs() < 1e-6);
        assert!(r.punching_ratio < 1.0);
    }

    #[test]
    fn test_rectangular_pad() {
        let ctx = context();
        let mut i = input();
        i.aspect_ratio = 2.0;
        let r = design(&ctx, &i).unwrap();
        assert!(r.length_m >= 2.0 * r.width_m - 1e-9);
        assert!(r.provided_area_m2 >= r.required_area_m2);
    }

    #[test]
    fn test_exhausted_bearing_is_calculation_error() {
        let ctx = context();
        let mut i = input();
        i.allowable_bearing_kpa = 20.0;
        let err = design(&ctx, &i).unwrap_err();
        assert_eq!(err.error_code(), "CALCULATION_ERROR");
    }
}
