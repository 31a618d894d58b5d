//! # Sewerage / Drainage Calculations
//!
//! Gravity pipe hydraulics use Manning's equation with the roughness of the
//! pipe material from the Material Database (`pipe/gravity`):
//!
//! ```text
//! Q = (1/n) · A · R^(2/3) · S^(1/2)
//! ```
//!
//! - [`gravity`] - `pipe-sizing`, `storm-drainage`
//! - [`onsite`] - `septic-tank`, `fixture-units`

pub mod gravity;
pub mod onsite;

use std::f64::consts::PI;
use std::sync::Arc;

use serde::Serialize;

use crate::calculations::{discipline_menu, ComplianceCheck, Discipline, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineError, EngineResult};
use crate::validation::FieldChecks;

const PIPE_CATEGORY: (&str, &str) = ("pipe", "gravity");

/// Depth ratio at which a circular section carries its maximum flow
const PEAK_FLOW_DEPTH_RATIO: f64 = 0.938;
const BISECTION_STEPS: usize = 60;

#[derive(Debug, Clone)]
pub struct SewerageCalculator {
    ctx: Arc<EngineContext>,
}

impl SewerageCalculator {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        SewerageCalculator { ctx }
    }
}

discipline_menu!(SewerageCalculator, Discipline::Sewerage, {
    "pipe-sizing" => gravity::PipeSizingInput => gravity::pipe_sizing,
    "storm-drainage" => gravity::StormDrainageInput => gravity::storm_drainage,
    "septic-tank" => onsite::SepticTankInput => onsite::septic_tank,
    "fixture-units" => onsite::FixtureUnitsInput => onsite::fixture_units,
});

// ============================================================================
// Circular section hydraulics
// ============================================================================

/// Flow area and wetted perimeter at proportional depth `y = d/D`
pub fn section_geometry(depth_ratio: f64, diameter_m: f64) -> (f64, f64) {
    let theta = 2.0 * (1.0 - 2.0 * depth_ratio.clamp(0.0, 1.0)).acos();
    let area = diameter_m * diameter_m / 8.0 * (theta - theta.sin());
    let perimeter = diameter_m * theta / 2.0;
    (area, perimeter)
}

/// Manning discharge (m³/s) at proportional depth `y`
pub fn manning_flow(depth_ratio: f64, diameter_m: f64, manning_n: f64, slope: f64) -> f64 {
    let (area, perimeter) = section_geometry(depth_ratio, diameter_m);
    if perimeter <= 0.0 {
        return 0.0;
    }
    let radius = area / perimeter;
    area * radius.powf(2.0 / 3.0) * slope.sqrt() / manning_n
}

/// Full-bore discharge (m³/s)
pub fn full_bore_capacity(diameter_m: f64, manning_n: f64, slope: f64) -> f64 {
    let area = PI * diameter_m * diameter_m / 4.0;
    area * (diameter_m / 4.0).powf(2.0 / 3.0) * slope.sqrt() / manning_n
}

/// Proportional depth carrying `flow_m3_s`, by bisection on the rising limb
/// of the discharge curve. `None` when the pipe cannot carry the flow.
pub fn proportional_depth(flow_m3_s: f64, diameter_m: f64, manning_n: f64, slope: f64) -> Option<f64> {
    if manning_flow(PEAK_FLOW_DEPTH_RATIO, diameter_m, manning_n, slope) < flow_m3_s {
        return None;
    }
    let (mut lo, mut hi) = (0.0, PEAK_FLOW_DEPTH_RATIO);
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if manning_flow(mid, diameter_m, manning_n, slope) < flow_m3_s {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Some(hi)
}

// ============================================================================
// Gravity pipe selection shared by sanitary and storm routes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GravityPipe {
    pub material: String,
    pub manning_n: f64,
    pub diameter_mm: f64,
    pub full_bore_capacity_l_s: f64,
    pub full_bore_velocity_m_s: f64,
    pub depth_ratio: f64,
    pub flow_depth_mm: f64,
    pub velocity_m_s: f64,
    pub min_velocity_m_s: f64,
    pub max_velocity_m_s: f64,
    pub max_depth_ratio: f64,
}

pub(crate) fn check_pipe_material(checks: &mut FieldChecks, ctx: &EngineContext, material: &str) {
    let (cat, sub) = PIPE_CATEGORY;
    if ctx.data.materials.get(cat, sub, material).is_err() {
        checks.push(
            "pipe_material",
            format!(
                "unknown pipe material '{}', expected one of: {}",
                material,
                ctx.data.materials.grades(cat, sub).join(", ")
            ),
        );
    }
}

pub(crate) fn default_pipe_material() -> String {
    "uPVC".to_string()
}

/// First standard diameter whose full-bore capacity meets the demand
pub fn select_gravity_pipe(
    ctx: &EngineContext,
    demand_l_s: f64,
    slope_percent: f64,
    material: &str,
    min_diameter_mm: f64,
) -> EngineResult<GravityPipe> {
    let tables = &ctx.data.drainage;
    let (cat, sub) = PIPE_CATEGORY;
    let spec = ctx.data.materials.get(cat, sub, material)?;
    let n = ctx.data.materials.property(cat, sub, material, "manning_n")?;
    let slope = slope_percent / 100.0;
    let demand = demand_l_s / 1000.0;

    let diameter_mm = tables
        .pipe_diameters_mm
        .iter()
        .copied()
        .filter(|&d| d >= min_diameter_mm)
        .find(|&d| full_bore_capacity(d / 1000.0, n, slope) >= demand)
        .ok_or_else(|| {
            EngineError::calculation(format!(
                "{:.1} L/s exceeds the largest standard pipe at {:.2}% slope; increase slope or use twin pipes",
                demand_l_s, slope_percent
            ))
        })?;

    let d = diameter_mm / 1000.0;
    let full = full_bore_capacity(d, n, slope);
    let y = proportional_depth(demand, d, n, slope)
        .ok_or_else(|| EngineError::calculation("proportional depth did not converge"))?;
    let (area, _) = section_geometry(y, d);
    let velocity = if demand > 0.0 { demand / area } else { 0.0 };
    let max_velocity = spec
        .property("max_velocity_m_s")
        .map_or(tables.velocity_limits_m_s.maximum, |m| m.min(tables.velocity_limits_m_s.maximum));

    Ok(GravityPipe {
        material: spec.grade.clone(),
        manning_n: n,
        diameter_mm,
        full_bore_capacity_l_s: full * 1000.0,
        full_bore_velocity_m_s: full / (PI * d * d / 4.0),
        depth_ratio: y,
        flow_depth_mm: y * diameter_mm,
        velocity_m_s: velocity,
        min_velocity_m_s: tables.velocity_limits_m_s.minimum,
        max_velocity_m_s: max_velocity,
        max_depth_ratio: tables.max_depth_ratio,
    })
}

/// Sedimentation and erosion are reported separately, with the depth check.
pub(crate) fn gravity_checks(outcome: Outcome, pipe: &GravityPipe) -> Outcome {
    let too_slow = pipe.velocity_m_s < pipe.min_velocity_m_s;
    let too_fast = pipe.velocity_m_s > pipe.max_velocity_m_s;
    let too_full = pipe.depth_ratio > pipe.max_depth_ratio;
    outcome
        .check(
            "velocity_minimum",
            ComplianceCheck::flag(
                !too_slow,
                format!(
                    "{:.2} m/s vs {:.1} m/s self-cleansing minimum",
                    pipe.velocity_m_s, pipe.min_velocity_m_s
                ),
            ),
        )
        .check(
            "velocity_maximum",
            ComplianceCheck::ratio(
                pipe.velocity_m_s / pipe.max_velocity_m_s,
                format!("{:.2} m/s vs {:.1} m/s erosion limit", pipe.velocity_m_s, pipe.max_velocity_m_s),
            ),
        )
        .check(
            "depth_ratio",
            ComplianceCheck::ratio(
                pipe.depth_ratio / pipe.max_depth_ratio,
                format!("d/D = {:.2} vs {:.2} maximum", pipe.depth_ratio, pipe.max_depth_ratio),
            ),
        )
        .recommend(format!("DN{:.0} {} pipe", pipe.diameter_mm, pipe.material))
        .recommend_if(too_slow, "Velocity below self-cleansing minimum: sedimentation risk; steepen the gradient")
        .recommend_if(too_fast, "Velocity above erosion limit; reduce the gradient or add drop manholes")
        .recommend_if(too_full, "Flow depth exceeds the design ratio; use the next pipe size for ventilation")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_section_geometry() {
        let (a, p) = section_geometry(1.0, 0.3);
        assert!((a - PI * 0.09 / 4.0).abs() < 1e-12);
        assert!((p - PI * 0.3).abs() < 1e-12);
        let (half, _) = section_geometry(0.5, 0.3);
        assert!((half - a / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_full_bore_matches_partial_at_one() {
        let q_full = full_bore_capacity(0.3, 0.013, 0.01);
        let q_partial = manning_flow(1.0, 0.3, 0.013, 0.01);
        assert!((q_full - q_partial).abs() / q_full < 1e-9);
    }

    #[test]
    fn test_proportional_depth_half_full() {
        // Half-full pipe carries half the full-bore flow
        let q_full = full_bore_capacity(0.3, 0.013, 0.01);
        let y = proportional_depth(q_full / 2.0, 0.3, 0.013, 0.01).unwrap();
        assert!((y - 0.5).abs() < 1e-9);
        assert!(proportional_depth(q_full * 1.2, 0.3, 0.013, 0.01).is_none());
    }
}
