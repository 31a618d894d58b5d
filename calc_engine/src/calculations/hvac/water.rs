//! Chilled water pipe selection.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::{altshul_friction_factor, pressure_gradient};
use crate::calculations::{ComplianceCheck, InputRecord, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineError, EngineResult, FieldError};
use crate::validation::FieldChecks;

/// Specific heat of water (kJ/kg·K), density 1 kg/L
const WATER_CP_KJ_KG_K: f64 = 4.186;
const WATER_DENSITY_KG_M3: f64 = 1000.0;
/// Water at about 7 °C
const WATER_KINEMATIC_VISCOSITY_M2_S: f64 = 1.4e-6;
/// Commercial steel pipe
const PIPE_ROUGHNESS_MM: f64 = 0.045;
const MAX_FRICTION_PA_M: f64 = 400.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChilledWaterPipeInput {
    pub load_kw: f64,
    #[serde(default = "default_delta_t")]
    pub delta_t_k: f64,
    /// Velocity limit class from the reference tables
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default)]
    pub max_velocity_m_s: Option<f64>,
}

fn default_delta_t() -> f64 {
    5.5
}

fn default_service() -> String {
    "default".to_string()
}

impl InputRecord for ChilledWaterPipeInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks
            .positive("load_kw", self.load_kw)
            .in_range("delta_t_k", self.delta_t_k, 2.0, 15.0)
            .positive_opt("max_velocity_m_s", self.max_velocity_m_s);
        if self.max_velocity_m_s.is_none() {
            checks.known(
                "service",
                "pipe velocity limit",
                &self.service,
                ctx.data.hvac.pipe_velocity_limit(&self.service),
            );
        }
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChilledWaterPipeResult {
    pub flow_l_s: f64,
    pub flow_m3_h: f64,
    pub velocity_limit_m_s: f64,
    pub diameter_mm: f64,
    pub velocity_m_s: f64,
    pub friction_pa_m: f64,
}

fn velocity_in(flow_m3_s: f64, diameter_mm: f64) -> f64 {
    let d = diameter_mm / 1000.0;
    flow_m3_s / (PI * d * d / 4.0)
}

pub fn select_pipe(ctx: &EngineContext, input: &ChilledWaterPipeInput) -> EngineResult<ChilledWaterPipeResult> {
    let tables = &ctx.data.hvac;
    let limit = match input.max_velocity_m_s {
        Some(v) => v,
        None => tables.pipe_velocity_limit(&input.service).ok_or_else(|| {
            EngineError::invalid_field("service", format!("no pipe velocity limit for '{}'", input.service))
        })?,
    };
    let flow_l_s = input.load_kw / (WATER_CP_KJ_KG_K * input.delta_t_k);
    let q = flow_l_s / 1000.0;

    let diameter_mm = tables
        .pipe_diameters_mm
        .iter()
        .copied()
        .find(|&d| velocity_in(q, d) <= limit)
        .ok_or_else(|| {
            EngineError::calculation(format!(
                "{:.1} L/s exceeds the largest standard pipe at {:.1} m/s; use parallel headers",
                flow_l_s, limit
            ))
        })?;

    let velocity = velocity_in(q, diameter_mm);
    let d = diameter_mm / 1000.0;
    let reynolds = velocity * d / WATER_KINEMATIC_VISCOSITY_M2_S;
    let f = altshul_friction_factor(PIPE_ROUGHNESS_MM / 1000.0, d, reynolds);

    Ok(ChilledWaterPipeResult {
        flow_l_s,
        flow_m3_h: flow_l_s * 3.6,
        velocity_limit_m_s: limit,
        diameter_mm,
        velocity_m_s: velocity,
        friction_pa_m: pressure_gradient(f, d, WATER_DENSITY_KG_M3, velocity),
    })
}

pub(crate) fn calculate(ctx: &EngineContext, input: &ChilledWaterPipeInput) -> EngineResult<Outcome> {
    let r = select_pipe(ctx, input)?;
    Ok(Outcome::new(&r)?
        .check(
            "velocity",
            ComplianceCheck::ratio(
                r.velocity_m_s / r.velocity_limit_m_s,
                format!("{:.2} m/s in DN{:.0}", r.velocity_m_s, r.diameter_mm),
            ),
        )
        .recommend_if(
            r.friction_pa_m > MAX_FRICTION_PA_M,
            format!(
                "Friction {:.0} Pa/m exceeds {:.0} Pa/m; consider the next size up",
                r.friction_pa_m, MAX_FRICTION_PA_M
            ),
        )
        .standards(&["ASHRAE Handbook - Fundamentals, Chapter 22", "SBC 501 - Mechanical"]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::test_support::context;

    #[test]
    fn test_flow_and_selection() {
        let ctx = context();
        let input: ChilledWaterPipeInput = serde_json::from_value(serde_json::json!({"load_kw": 350})).unwrap();
        let r = select_pipe(&ctx, &input).unwrap();
        // 350 / (4.186 * 5.5) = 15.2 L/s; DN80 gives 3.0 m/s, DN100 gives 1.94 m/s
        assert!((r.flow_l_s - 15.202).abs() < 1e-3);
        assert_eq!(r.diameter_mm, 100.0);
        assert!(r.velocity_m_s <= 2.4);
    }

    #[test]
    fn test_quieter_service_upsizes() {
        let ctx = context();
        let input: ChilledWaterPipeInput =
            serde_json::from_value(serde_json::json!({"load_kw": 350, "service": "noise_sensitive"})).unwrap();
        let r = select_pipe(&ctx, &input).unwrap();
        assert_eq!(r.diameter_mm, 150.0);
    }
}
