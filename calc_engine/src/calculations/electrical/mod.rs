//! # Electrical Calculations
//!
//! Low-voltage distribution design to IEC 60364 style tables.
//!
//! - [`cable`] - `cable-sizing`, `voltage-drop`
//! - [`supply`] - `maximum-demand`, `short-circuit`
//! - [`lighting`] - `lighting-design`
//!
//! Cable ampacities and voltage-drop figures are for copper; aluminium
//! conductors scale them by the `ampacity_factor` and `voltage_drop_factor`
//! carried in the Material Database (`cable/conductor`).

pub mod cable;
pub mod lighting;
pub mod supply;

use std::sync::Arc;

use crate::calculations::{discipline_menu, Discipline};
use crate::context::EngineContext;
use crate::errors::EngineResult;
use crate::validation::FieldChecks;

const CONDUCTOR_CATEGORY: (&str, &str) = ("cable", "conductor");

#[derive(Debug, Clone)]
pub struct ElectricalCalculator {
    ctx: Arc<EngineContext>,
}

impl ElectricalCalculator {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        ElectricalCalculator { ctx }
    }
}

discipline_menu!(ElectricalCalculator, Discipline::Electrical, {
    "cable-sizing" => cable::CableSizingInput => cable::size_cable,
    "voltage-drop" => cable::VoltageDropInput => cable::voltage_drop,
    "maximum-demand" => supply::MaximumDemandInput => supply::maximum_demand,
    "short-circuit" => supply::ShortCircuitInput => supply::short_circuit,
    "lighting-design" => lighting::LightingDesignInput => lighting::calculate,
});

/// Conductor material factors relative to the copper tables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conductor {
    pub resistivity_ohm_mm2_m: f64,
    pub ampacity_factor: f64,
    pub voltage_drop_factor: f64,
}

impl Conductor {
    pub fn lookup(ctx: &EngineContext, material: &str) -> EngineResult<Self> {
        let (cat, sub) = CONDUCTOR_CATEGORY;
        let db = &ctx.data.materials;
        Ok(Conductor {
            resistivity_ohm_mm2_m: db.property(cat, sub, material, "resistivity_ohm_mm2_m")?,
            ampacity_factor: db.property(cat, sub, material, "ampacity_factor")?,
            voltage_drop_factor: db.property(cat, sub, material, "voltage_drop_factor")?,
        })
    }
}

pub(crate) fn check_conductor(checks: &mut FieldChecks, ctx: &EngineContext, material: &str) {
    let (cat, sub) = CONDUCTOR_CATEGORY;
    if ctx.data.materials.get(cat, sub, material).is_err() {
        checks.push(
            "conductor",
            format!(
                "unknown conductor '{}', expected one of: {}",
                material,
                ctx.data.materials.grades(cat, sub).join(", ")
            ),
        );
    }
}

pub(crate) fn check_phases(checks: &mut FieldChecks, phases: u8) {
    checks.require(phases == 1 || phases == 3, "phases", "must be 1 or 3");
}

pub(crate) fn default_conductor() -> String {
    "copper".to_string()
}

pub(crate) fn default_three_phase() -> u8 {
    3
}

pub(crate) fn default_power_factor() -> f64 {
    0.85
}

/// Nominal voltage when none is given: 400 V three-phase, 230 V single-phase
pub fn nominal_voltage(phases: u8) -> f64 {
    if phases == 3 {
        400.0
    } else {
        230.0
    }
}

/// Line current for a real power demand
pub fn line_current(load_kw: f64, voltage_v: f64, power_factor: f64, phases: u8) -> f64 {
    let watts = load_kw * 1000.0;
    if phases == 3 {
        watts / (3f64.sqrt() * voltage_v * power_factor)
    } else {
        watts / (voltage_v * power_factor)
    }
}

/// Current drawn by an apparent power
pub fn current_from_kva(kva: f64, voltage_v: f64, phases: u8) -> f64 {
    let va = kva * 1000.0;
    if phases == 3 {
        va / (3f64.sqrt() * voltage_v)
    } else {
        va / voltage_v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::test_support::context;

    #[test]
    fn test_line_current() {
        // 100 kW, 400 V, pf 0.85, 3-phase: 169.8 A
        let i = line_current(100.0, 400.0, 0.85, 3);
        assert!((i - 169.82).abs() < 0.01);
        let i1 = line_current(2.3, 230.0, 1.0, 1);
        assert!((i1 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_conductor_factors() {
        let ctx = context();
        let al = Conductor::lookup(&ctx, "aluminium").unwrap();
        assert_eq!(al.ampacity_factor, 0.78);
        let cu = Conductor::lookup(&ctx, "Copper").unwrap();
        assert_eq!(cu.voltage_drop_factor, 1.0);
        assert!(Conductor::lookup(&ctx, "silver").is_err());
    }
}
