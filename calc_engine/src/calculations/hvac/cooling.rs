//! Peak space cooling load by additive decomposition.
//!
//! Sensible terms: people, lighting, equipment, walls, roof, glazing
//! conduction, glazing solar, ventilation (`1.23·Q·ΔT`). Latent terms:
//! people, ventilation (`3.0·Q·Δw`). The subtotal is multiplied by the
//! configured safety factor and the difference appears as its own
//! `safety_allowance` row, so the breakdown always sums to the total.

use serde::{Deserialize, Serialize};

use super::{BTU_H_PER_W, KW_PER_TON};
use crate::calculations::{whole_count, ComplianceCheck, InputRecord, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineError, EngineResult, FieldError};
use crate::validation::FieldChecks;

const INSULATION_CATEGORY: (&str, &str) = ("insulation", "thermal");

/// Sol-air temperature excess over the outdoor dry bulb (K)
const WALL_SOL_AIR_EXCESS_K: f64 = 4.0;
const ROOF_SOL_AIR_EXCESS_K: f64 = 12.0;

/// Maximum envelope U-values (W/m²K)
pub const WALL_U_LIMIT: f64 = 0.57;
pub const ROOF_U_LIMIT: f64 = 0.30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoolingLoadInput {
    pub area_m2: f64,
    /// Defaults to the design density of `space_type`
    #[serde(default)]
    pub occupants: Option<u32>,
    #[serde(default = "default_office")]
    pub activity: String,
    #[serde(default = "default_office")]
    pub space_type: String,
    #[serde(default = "default_lighting")]
    pub lighting_w_m2: f64,
    #[serde(default = "default_equipment")]
    pub equipment_w_m2: f64,
    #[serde(default = "default_outdoor")]
    pub outdoor_temp_c: f64,
    #[serde(default = "default_indoor")]
    pub indoor_temp_c: f64,
    #[serde(default)]
    pub wall_area_m2: f64,
    #[serde(default = "default_wall_u")]
    pub wall_u_value: f64,
    /// Added insulation layer, by Material Database grade
    #[serde(default)]
    pub wall_insulation: Option<String>,
    #[serde(default)]
    pub wall_insulation_thickness_mm: Option<f64>,
    #[serde(default)]
    pub roof_area_m2: f64,
    #[serde(default = "default_roof_u")]
    pub roof_u_value: f64,
    #[serde(default)]
    pub glazing_area_m2: f64,
    #[serde(default = "default_glazing_u")]
    pub glazing_u_value: f64,
    #[serde(default = "default_shading")]
    pub shading_coefficient: f64,
    #[serde(default = "default_irradiance")]
    pub solar_irradiance_w_m2: f64,
    /// Defaults to the ventilation rate of `space_type`
    #[serde(default)]
    pub outdoor_air_l_s: Option<f64>,
    /// Outdoor minus indoor humidity ratio (g/kg)
    #[serde(default = "default_moisture")]
    pub moisture_difference_g_kg: f64,
}

fn default_office() -> String {
    "office".to_string()
}

fn default_lighting() -> f64 {
    10.0
}

fn default_equipment() -> f64 {
    15.0
}

fn default_outdoor() -> f64 {
    46.0
}

fn default_indoor() -> f64 {
    24.0
}

fn default_wall_u() -> f64 {
    0.5
}

fn default_roof_u() -> f64 {
    0.3
}

fn default_glazing_u() -> f64 {
    2.8
}

fn default_shading() -> f64 {
    0.6
}

fn default_irradiance() -> f64 {
    500.0
}

fn default_moisture() -> f64 {
    5.0
}

impl InputRecord for CoolingLoadInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        let tables = &ctx.data.hvac;
        let mut checks = FieldChecks::new();
        checks
            .positive("area_m2", self.area_m2)
            .non_negative("lighting_w_m2", self.lighting_w_m2)
            .non_negative("equipment_w_m2", self.equipment_w_m2)
            .in_range("outdoor_temp_c", self.outdoor_temp_c, -40.0, 60.0)
            .in_range("indoor_temp_c", self.indoor_temp_c, 10.0, 35.0)
            .require(
                self.outdoor_temp_c > self.indoor_temp_c,
                "outdoor_temp_c",
                "must exceed indoor_temp_c for a cooling load",
            )
            .non_negative("wall_area_m2", self.wall_area_m2)
            .positive("wall_u_value", self.wall_u_value)
            .non_negative("roof_area_m2", self.roof_area_m2)
            .positive("roof_u_value", self.roof_u_value)
            .non_negative("glazing_area_m2", self.glazing_area_m2)
            .positive("glazing_u_value", self.glazing_u_value)
            .in_range("shading_coefficient", self.shading_coefficient, 0.0, 1.0)
            .non_negative("solar_irradiance_w_m2", self.solar_irradiance_w_m2)
            .non_negative("moisture_difference_g_kg", self.moisture_difference_g_kg);
        if let Some(q) = self.outdoor_air_l_s {
            checks.non_negative("outdoor_air_l_s", q);
        }
        checks.known("activity", "occupant gain", &self.activity, tables.occupant_gain(&self.activity));
        if self.occupants.is_none() || self.outdoor_air_l_s.is_none() {
            checks.known(
                "space_type",
                "outdoor air",
                &self.space_type,
                tables.outdoor_air_rate(&self.space_type),
            );
        }
        match (&self.wall_insulation, self.wall_insulation_thickness_mm) {
            (Some(grade), Some(t)) => {
                checks.positive("wall_insulation_thickness_mm", t);
                let (cat, sub) = INSULATION_CATEGORY;
                if ctx.data.materials.get(cat, sub, grade).is_err() {
                    checks.push(
                        "wall_insulation",
                        format!(
                            "unknown insulation '{}', expected one of: {}",
                            grade,
                            ctx.data.materials.grades(cat, sub).join(", ")
                        ),
                    );
                }
            }
            (Some(_), None) => {
                checks.push("wall_insulation_thickness_mm", "required when wall_insulation is given");
            }
            (None, Some(_)) => {
                checks.push("wall_insulation", "required when wall_insulation_thickness_mm is given");
            }
            (None, None) => {}
        }
        checks.finish()
    }
}

/// One line of the load breakdown (W)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadComponent {
    pub component: &'static str,
    pub sensible_w: f64,
    pub latent_w: f64,
    pub total_w: f64,
}

impl LoadComponent {
    fn new(component: &'static str, sensible_w: f64, latent_w: f64) -> Self {
        LoadComponent {
            component,
            sensible_w,
            latent_w,
            total_w: sensible_w + latent_w,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoolingLoadResult {
    pub occupants: u32,
    pub outdoor_air_l_s: f64,
    pub effective_wall_u_value: f64,
    pub breakdown: Vec<LoadComponent>,
    pub sensible_w: f64,
    pub latent_w: f64,
    pub subtotal_w: f64,
    pub safety_factor: f64,
    pub safety_allowance_w: f64,
    pub total_w: f64,
    pub total_kw: f64,
    pub total_tr: f64,
    pub total_btu_h: f64,
    pub sensible_heat_ratio: f64,
    pub load_density_w_m2: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_unit_tr: Option<f64>,
}

/// U-value after adding an insulation layer of conductivity `k` (W/mK)
pub fn insulated_u_value(base_u: f64, thickness_mm: f64, conductivity_w_mk: f64) -> f64 {
    1.0 / (1.0 / base_u + thickness_mm / 1000.0 / conductivity_w_mk)
}

pub fn cooling_load(ctx: &EngineContext, input: &CoolingLoadInput) -> EngineResult<CoolingLoadResult> {
    let tables = &ctx.data.hvac;
    let gain = tables.occupant_gain(&input.activity).ok_or_else(|| {
        EngineError::invalid_field("activity", format!("no occupant gain entry for '{}'", input.activity))
    })?;
    let air_rate = tables.outdoor_air_rate(&input.space_type);
    let occupants = match (input.occupants, air_rate) {
        (Some(n), _) => n,
        (None, Some(rate)) => whole_count(
            (rate.default_density_per_100m2 * input.area_m2 / 100.0).ceil(),
            "default occupants",
        )?,
        (None, None) => return Err(EngineError::invalid_field("occupants", "required for this space type")),
    };
    let outdoor_air = match (input.outdoor_air_l_s, air_rate) {
        (Some(q), _) => q,
        (None, Some(rate)) => rate.per_person_l_s * f64::from(occupants) + rate.per_area_l_s_m2 * input.area_m2,
        (None, None) => {
            return Err(EngineError::invalid_field("outdoor_air_l_s", "required for this space type"))
        }
    };

    let wall_u = match (&input.wall_insulation, input.wall_insulation_thickness_mm) {
        (Some(grade), Some(t)) => {
            let (cat, sub) = INSULATION_CATEGORY;
            let k = ctx.data.materials.property(cat, sub, grade, "conductivity_w_mk")?;
            insulated_u_value(input.wall_u_value, t, k)
        }
        _ => input.wall_u_value,
    };

    let dt = input.outdoor_temp_c - input.indoor_temp_c;
    let n = f64::from(occupants);
    let mut breakdown = vec![
        LoadComponent::new("people", n * gain.sensible_w, n * gain.latent_w),
        LoadComponent::new("lighting", input.lighting_w_m2 * input.area_m2, 0.0),
        LoadComponent::new("equipment", input.equipment_w_m2 * input.area_m2, 0.0),
        LoadComponent::new("walls", wall_u * input.wall_area_m2 * (dt + WALL_SOL_AIR_EXCESS_K), 0.0),
        LoadComponent::new("roof", input.roof_u_value * input.roof_area_m2 * (dt + ROOF_SOL_AIR_EXCESS_K), 0.0),
        LoadComponent::new("glazing_conduction", input.glazing_u_value * input.glazing_area_m2 * dt, 0.0),
        LoadComponent::new(
            "glazing_solar",
            input.glazing_area_m2 * input.solar_irradiance_w_m2 * input.shading_coefficient,
            0.0,
        ),
        LoadComponent::new(
            "ventilation",
            1.23 * outdoor_air * dt,
            3.0 * outdoor_air * input.moisture_difference_g_kg,
        ),
    ];

    let sensible: f64 = breakdown.iter().map(|c| c.sensible_w).sum();
    let latent: f64 = breakdown.iter().map(|c| c.latent_w).sum();
    let subtotal = sensible + latent;
    if subtotal <= 0.0 {
        return Err(EngineError::calculation("space has no cooling load"));
    }
    let factor = ctx.config.design.cooling_safety_factor;
    let allowance = LoadComponent::new("safety_allowance", sensible * (factor - 1.0), latent * (factor - 1.0));
    let total = subtotal + allowance.total_w;
    breakdown.push(allowance);

    let total_kw = total / 1000.0;
    let tons = total_kw / KW_PER_TON;
    Ok(CoolingLoadResult {
        occupants,
        outdoor_air_l_s: outdoor_air,
        effective_wall_u_value: wall_u,
        breakdown,
        sensible_w: sensible * factor,
        latent_w: latent * factor,
        subtotal_w: subtotal,
        safety_factor: factor,
        safety_allowance_w: total - subtotal,
        total_w: total,
        total_kw,
        total_tr: tons,
        total_btu_h: total * BTU_H_PER_W,
        sensible_heat_ratio: sensible / subtotal,
        load_density_w_m2: total / input.area_m2,
        recommended_unit_tr: tables.unit_capacity_at_or_above(tons),
    })
}

pub(crate) fn calculate(ctx: &EngineContext, input: &CoolingLoadInput) -> EngineResult<Outcome> {
    let r = cooling_load(ctx, input)?;
    let mut outcome = Outcome::new(&r)?;
    if input.wall_area_m2 > 0.0 {
        outcome = outcome.check(
            "wall_u_value",
            ComplianceCheck::ratio(
                r.effective_wall_u_value / WALL_U_LIMIT,
                format!("U = {:.3} W/m²K vs {:.2} maximum", r.effective_wall_u_value, WALL_U_LIMIT),
            ),
        );
    }
    if input.roof_area_m2 > 0.0 {
        outcome = outcome.check(
            "roof_u_value",
            ComplianceCheck::ratio(
                input.roof_u_value / ROOF_U_LIMIT,
                format!("U = {:.3} W/m²K vs {:.2} maximum", input.roof_u_value, ROOF_U_LIMIT),
            ),
        );
    }
    outcome = match r.recommended_unit_tr {
        Some(unit) => outcome.recommend(format!("Packaged unit {:.1} TR ({:.1} TR required)", unit, r.total_tr)),
        None => outcome.recommend(format!(
            "{:.0} TR exceeds packaged unit sizes; consider a chilled water system",
            r.total_tr
        )),
    };
    Ok(outcome
        .recommend_if(
            r.effective_wall_u_value > WALL_U_LIMIT && input.wall_area_m2 > 0.0,
            "Add wall insulation to meet the envelope U-value limit",
        )
        .recommend_if(
            r.sensible_heat_ratio < 0.7,
            "Low sensible heat ratio; provide dedicated dehumidification",
        )
        .standards(&[
            "ASHRAE Handbook - Fundamentals, Chapter 18",
            "SBC 601 - Energy conservation",
            "SBC 501 - Mechanical",
        ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::test_support::context;
    use serde_json::json;

    fn internal_only() -> CoolingLoadInput {
        serde_json::from_value(json!({
            "area_m2": 100, "occupants": 10, "outdoor_air_l_s": 100
        }))
        .unwrap()
    }

    #[test]
    fn test_internal_and_ventilation_terms() {
        let ctx = context();
        let r = cooling_load(&ctx, &internal_only()).unwrap();
        // sensible: 750 + 1000 + 1500 + 1.23*100*22 = 5956; latent: 550 + 1500
        assert!((r.subtotal_w - 8006.0).abs() < 1e-9);
        assert!((r.total_w - 8006.0 * 1.1).abs() < 1e-9);
        assert!((r.sensible_heat_ratio - 5956.0 / 8006.0).abs() < 1e-12);
    }

    #[test]
    fn test_breakdown_sums_to_total() {
        let ctx = context();
        let input: CoolingLoadInput = serde_json::from_value(json!({
            "area_m2": 120, "wall_area_m2": 60, "roof_area_m2": 120, "glazing_area_m2": 18
        }))
        .unwrap();
        let r = cooling_load(&ctx, &input).unwrap();
        let sum: f64 = r.breakdown.iter().map(|c| c.total_w).sum();
        assert!((sum - r.total_w).abs() < 1e-6);
        assert_eq!(r.breakdown.last().unwrap().component, "safety_allowance");
        // Office default density 5 per 100 m²
        assert_eq!(r.occupants, 6);
    }

    #[test]
    fn test_uncountable_default_occupancy_is_an_error() {
        let ctx = context();
        let input: CoolingLoadInput = serde_json::from_value(json!({"area_m2": 1e12})).unwrap();
        let err = cooling_load(&ctx, &input).unwrap_err();
        assert_eq!(err.error_code(), "CALCULATION_ERROR");
        assert!(err.to_string().contains("default occupants"));
    }

    #[test]
    fn test_insulation_lowers_wall_u() {
        let u = insulated_u_value(0.5, 50.0, 0.030);
        assert!((u - 1.0 / (2.0 + 50.0 / 30.0)).abs() < 1e-12);

        let ctx = context();
        let mut input = internal_only();
        input.wall_area_m2 = 50.0;
        input.wall_insulation = Some("xps".into());
        input.wall_insulation_thickness_mm = Some(50.0);
        let r = cooling_load(&ctx, &input).unwrap();
        assert!((r.effective_wall_u_value - u).abs() < 1e-12);
    }

    #[test]
    fn test_insulation_needs_thickness() {
        let ctx = context();
        let mut input = internal_only();
        input.wall_insulation = Some("eps".into());
        let errors = input.check(&ctx);
        assert_eq!(errors[0].field, "wall_insulation_thickness_mm");
    }

    #[test]
    fn test_unknown_activity_rejected() {
        let ctx = context();
        let mut input = internal_only();
        input.activity = "sleeping".into();
        let errors = input.check(&ctx);
        assert_eq!(errors[0].field, "activity");
    }
}
