//! Outdoor air requirements and round duct sizing.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::{altshul_friction_factor, pressure_gradient};
use crate::calculations::{divide, whole_count, ComplianceCheck, InputRecord, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineError, EngineResult, FieldError};
use crate::validation::FieldChecks;

const AIR_DENSITY_KG_M3: f64 = 1.2;
const AIR_KINEMATIC_VISCOSITY_M2_S: f64 = 1.5e-5;
/// Galvanised steel duct
const DUCT_ROUGHNESS_MM: f64 = 0.09;
/// Friction rate above which the duct is considered noisy and costly to run
const DESIGN_FRICTION_PA_M: f64 = 1.0;
/// Rectangular duct sides are rounded up to this increment (mm)
const RECTANGULAR_STEP_MM: f64 = 50.0;

// ============================================================================
// Ventilation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VentilationInput {
    pub space_type: String,
    pub floor_area_m2: f64,
    #[serde(default)]
    pub occupants: Option<u32>,
    #[serde(default = "default_ceiling")]
    pub ceiling_height_m: f64,
    /// Zone air distribution effectiveness E_z
    #[serde(default = "default_effectiveness")]
    pub zone_effectiveness: f64,
    /// Outdoor air actually delivered, when known
    #[serde(default)]
    pub supplied_outdoor_air_l_s: Option<f64>,
}

fn default_ceiling() -> f64 {
    3.0
}

fn default_effectiveness() -> f64 {
    1.0
}

impl InputRecord for VentilationInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks
            .positive("floor_area_m2", self.floor_area_m2)
            .positive("ceiling_height_m", self.ceiling_height_m)
            .in_range("zone_effectiveness", self.zone_effectiveness, 0.5, 1.2)
            .positive_opt("supplied_outdoor_air_l_s", self.supplied_outdoor_air_l_s);
        checks.known(
            "space_type",
            "outdoor air",
            &self.space_type,
            ctx.data.hvac.outdoor_air_rate(&self.space_type),
        );
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VentilationResult {
    pub occupants: u32,
    pub people_outdoor_air_l_s: f64,
    pub area_outdoor_air_l_s: f64,
    pub breathing_zone_l_s: f64,
    pub zone_outdoor_air_l_s: f64,
    pub zone_outdoor_air_m3_h: f64,
    pub air_changes_per_hour: f64,
}

pub fn ventilation(ctx: &EngineContext, input: &VentilationInput) -> EngineResult<VentilationResult> {
    let rate = ctx.data.hvac.outdoor_air_rate(&input.space_type).ok_or_else(|| {
        EngineError::invalid_field("space_type", format!("no outdoor air entry for '{}'", input.space_type))
    })?;
    let occupants = match input.occupants {
        Some(n) => n,
        None => whole_count(
            (rate.default_density_per_100m2 * input.floor_area_m2 / 100.0).ceil(),
            "default occupants",
        )?,
    };
    let people = rate.per_person_l_s * f64::from(occupants);
    let area = rate.per_area_l_s_m2 * input.floor_area_m2;
    let vbz = people + area;
    let voz = vbz / input.zone_effectiveness;
    let m3_h = voz * 3.6;
    Ok(VentilationResult {
        occupants,
        people_outdoor_air_l_s: people,
        area_outdoor_air_l_s: area,
        breathing_zone_l_s: vbz,
        zone_outdoor_air_l_s: voz,
        zone_outdoor_air_m3_h: m3_h,
        air_changes_per_hour: m3_h / (input.floor_area_m2 * input.ceiling_height_m),
    })
}

pub(crate) fn ventilation_rate(ctx: &EngineContext, input: &VentilationInput) -> EngineResult<Outcome> {
    let r = ventilation(ctx, input)?;
    let mut outcome = Outcome::new(&r)?.standards(&[
        "ASHRAE 62.1 - Ventilation for acceptable indoor air quality",
        "SBC 501 - Mechanical",
    ]);
    if let Some(supplied) = input.supplied_outdoor_air_l_s {
        outcome = outcome
            .check(
                "outdoor_air",
                ComplianceCheck::ratio(
                    r.zone_outdoor_air_l_s / supplied,
                    format!("{:.0} L/s required, {:.0} L/s supplied", r.zone_outdoor_air_l_s, supplied),
                ),
            )
            .recommend_if(
                supplied < r.zone_outdoor_air_l_s,
                format!("Increase outdoor air to at least {:.0} L/s", r.zone_outdoor_air_l_s.ceil()),
            );
    }
    Ok(outcome)
}

// ============================================================================
// Duct sizing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuctSizingInput {
    pub airflow_l_s: f64,
    /// Velocity limit class: main, branch, riser, residential
    #[serde(default = "default_duct_class")]
    pub duct_class: String,
    #[serde(default)]
    pub max_velocity_m_s: Option<f64>,
    /// Width over height of the equivalent rectangular duct
    #[serde(default = "default_aspect")]
    pub aspect_ratio: f64,
    #[serde(default = "default_length")]
    pub length_m: f64,
}

fn default_duct_class() -> String {
    "main".to_string()
}

fn default_aspect() -> f64 {
    2.0
}

fn default_length() -> f64 {
    10.0
}

impl InputRecord for DuctSizingInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks
            .positive("airflow_l_s", self.airflow_l_s)
            .positive_opt("max_velocity_m_s", self.max_velocity_m_s)
            .in_range("aspect_ratio", self.aspect_ratio, 1.0, 8.0)
            .positive("length_m", self.length_m);
        if self.max_velocity_m_s.is_none() {
            checks.known(
                "duct_class",
                "duct velocity limit",
                &self.duct_class,
                ctx.data.hvac.duct_velocity_limit(&self.duct_class),
            );
        }
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuctSizingResult {
    pub velocity_limit_m_s: f64,
    pub required_diameter_mm: f64,
    pub diameter_mm: f64,
    pub velocity_m_s: f64,
    pub rectangular_width_mm: f64,
    pub rectangular_height_mm: f64,
    pub reynolds_number: f64,
    pub friction_factor: f64,
    pub friction_pa_m: f64,
    pub pressure_loss_pa: f64,
}

/// Height of the rectangular duct with the same friction as a round duct of
/// diameter `de` (Huebscher), for `width = aspect · height`.
pub fn equivalent_rectangular_height(de_mm: f64, aspect: f64) -> f64 {
    de_mm * (aspect + 1.0).powf(0.25) / (1.30 * aspect.powf(0.625))
}

pub fn size_duct(ctx: &EngineContext, input: &DuctSizingInput) -> EngineResult<DuctSizingResult> {
    let tables = &ctx.data.hvac;
    let limit = match input.max_velocity_m_s {
        Some(v) => v,
        None => tables.duct_velocity_limit(&input.duct_class).ok_or_else(|| {
            EngineError::invalid_field("duct_class", format!("no duct velocity limit for '{}'", input.duct_class))
        })?,
    };
    let q = input.airflow_l_s / 1000.0;
    let required_mm = (4.0 * q / (PI * limit)).sqrt() * 1000.0;
    let diameter_mm = tables.duct_diameter_at_or_above(required_mm).ok_or_else(|| {
        EngineError::calculation(format!(
            "required diameter {:.0} mm exceeds the largest standard duct; split the airflow",
            required_mm
        ))
    })?;

    let d = diameter_mm / 1000.0;
    let velocity = divide(q, PI * d * d / 4.0, "duct area")?;
    let reynolds = velocity * d / AIR_KINEMATIC_VISCOSITY_M2_S;
    let f = altshul_friction_factor(DUCT_ROUGHNESS_MM / 1000.0, d, reynolds);
    let gradient = pressure_gradient(f, d, AIR_DENSITY_KG_M3, velocity);

    let step = |mm: f64| (mm / RECTANGULAR_STEP_MM).ceil() * RECTANGULAR_STEP_MM;
    let height = equivalent_rectangular_height(diameter_mm, input.aspect_ratio);

    Ok(DuctSizingResult {
        velocity_limit_m_s: limit,
        required_diameter_mm: required_mm,
        diameter_mm,
        velocity_m_s: velocity,
        rectangular_width_mm: step(height * input.aspect_ratio),
        rectangular_height_mm: step(height),
        reynolds_number: reynolds,
        friction_factor: f,
        friction_pa_m: gradient,
        pressure_loss_pa: gradient * input.length_m,
    })
}

pub(crate) fn duct_sizing(ctx: &EngineContext, input: &DuctSizingInput) -> EngineResult<Outcome> {
    let r = size_duct(ctx, input)?;
    Ok(Outcome::new(&r)?
        .check(
            "velocity",
            ComplianceCheck::ratio(
                r.velocity_m_s / r.velocity_limit_m_s,
                format!("{:.2} m/s vs {:.1} m/s limit", r.velocity_m_s, r.velocity_limit_m_s),
            ),
        )
        .recommend(format!(
            "Ø{:.0} mm round or {:.0} x {:.0} mm rectangular",
            r.diameter_mm, r.rectangular_width_mm, r.rectangular_height_mm
        ))
        .recommend_if(
            r.friction_pa_m > DESIGN_FRICTION_PA_M,
            format!(
                "Friction rate {:.2} Pa/m is above {:.1} Pa/m; upsizing reduces fan energy",
                r.friction_pa_m, DESIGN_FRICTION_PA_M
            ),
        )
        .standards(&["SMACNA HVAC Duct Construction Standards", "ASHRAE Handbook - Fundamentals, Chapter 21"]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::test_support::context;
    use serde_json::json;

    #[test]
    fn test_office_ventilation() {
        let ctx = context();
        let input: VentilationInput =
            serde_json::from_value(json!({"space_type": "office", "floor_area_m2": 200, "occupants": 20})).unwrap();
        let r = ventilation(&ctx, &input).unwrap();
        // 2.5*20 + 0.3*200 = 110 L/s
        assert!((r.breathing_zone_l_s - 110.0).abs() < 1e-9);
        assert!((r.zone_outdoor_air_m3_h - 396.0).abs() < 1e-9);
        assert!((r.air_changes_per_hour - 396.0 / 600.0).abs() < 1e-12);
    }

    #[test]
    fn test_effectiveness_raises_zone_air() {
        let ctx = context();
        let input: VentilationInput = serde_json::from_value(json!({
            "space_type": "classroom", "floor_area_m2": 100, "zone_effectiveness": 0.8
        }))
        .unwrap();
        let r = ventilation(&ctx, &input).unwrap();
        // 35 pupils: 5*35 + 0.6*100 = 235 L/s, / 0.8
        assert_eq!(r.occupants, 35);
        assert!((r.zone_outdoor_air_l_s - 293.75).abs() < 1e-9);
    }

    #[test]
    fn test_uncountable_default_occupancy_is_an_error() {
        let ctx = context();
        let input: VentilationInput =
            serde_json::from_value(json!({"space_type": "office", "floor_area_m2": 1e12})).unwrap();
        assert!(input.check(&ctx).is_empty());
        assert_eq!(ventilation(&ctx, &input).unwrap_err().error_code(), "CALCULATION_ERROR");
    }

    #[test]
    fn test_duct_rounds_up_to_standard() {
        let ctx = context();
        let input: DuctSizingInput = serde_json::from_value(json!({"airflow_l_s": 500})).unwrap();
        let r = size_duct(&ctx, &input).unwrap();
        // 0.5 m³/s at 8 m/s needs 282 mm
        assert!((r.required_diameter_mm - 282.1).abs() < 0.1);
        assert_eq!(r.diameter_mm, 300.0);
        assert!(r.velocity_m_s < 8.0);
        assert!(r.rectangular_width_mm >= r.rectangular_height_mm);
    }

    #[test]
    fn test_square_equivalent() {
        // A square duct is about 9% smaller than the round duct it replaces
        let h = equivalent_rectangular_height(1000.0, 1.0);
        assert!((h - 914.8).abs() < 0.5);
    }

    #[test]
    fn test_oversized_airflow_is_calculation_error() {
        let ctx = context();
        let input: DuctSizingInput = serde_json::from_value(json!({"airflow_l_s": 50000})).unwrap();
        assert_eq!(size_duct(&ctx, &input).unwrap_err().error_code(), "CALCULATION_ERROR");
    }
}
