//! Supply-side sizing: maximum demand with main breaker and transformer
//! selection, and prospective short-circuit current.

use serde::{Deserialize, Serialize};

use super::{
    check_conductor, check_phases, current_from_kva, default_conductor, default_power_factor,
    default_three_phase, nominal_voltage, Conductor,
};
use crate::calculations::{ComplianceCheck, InputRecord, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineError, EngineResult, FieldError};
use crate::reference::standard_at_or_above;
use crate::validation::FieldChecks;

/// Cable reactance used for fault-loop impedance (Ω/m)
const CABLE_REACTANCE_OHM_M: f64 = 0.08e-3;

// ============================================================================
// Maximum demand
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledLoad {
    pub name: String,
    pub connected_kw: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default = "default_demand_factor")]
    pub demand_factor: f64,
}

fn default_quantity() -> u32 {
    1
}

fn default_demand_factor() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaximumDemandInput {
    pub loads: Vec<ScheduledLoad>,
    #[serde(default = "default_power_factor")]
    pub power_factor: f64,
    #[serde(default = "default_three_phase")]
    pub phases: u8,
    #[serde(default)]
    pub voltage_v: Option<f64>,
    /// Multiplier for future growth; configured default when absent
    #[serde(default)]
    pub spare_capacity_factor: Option<f64>,
}

impl InputRecord for MaximumDemandInput {
    fn check(&self, _ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks.non_empty("loads", &self.loads);
        for (i, load) in self.loads.iter().enumerate() {
            checks
                .non_negative(format!("loads[{}].connected_kw", i), load.connected_kw)
                .in_range(format!("loads[{}].demand_factor", i), load.demand_factor, 0.0, 1.0);
        }
        checks
            .in_range("power_factor", self.power_factor, 0.1, 1.0)
            .positive_opt("voltage_v", self.voltage_v)
            .in_range_opt("spare_capacity_factor", self.spare_capacity_factor, 1.0, 3.0);
        check_phases(&mut checks, self.phases);
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadDemand {
    pub name: String,
    pub connected_kw: f64,
    pub demand_kw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaximumDemandResult {
    pub loads: Vec<LoadDemand>,
    pub connected_load_kw: f64,
    pub maximum_demand_kw: f64,
    pub overall_demand_factor: f64,
    pub spare_capacity_factor: f64,
    pub design_demand_kw: f64,
    pub design_demand_kva: f64,
    pub design_current_a: f64,
    pub main_breaker_a: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transformer_kva: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transformer_loading_percent: Option<f64>,
}

pub fn demand(ctx: &EngineContext, input: &MaximumDemandInput) -> EngineResult<MaximumDemandResult> {
    let tables = &ctx.data.electrical;
    let loads: Vec<LoadDemand> = input
        .loads
        .iter()
        .map(|l| {
            let connected = l.connected_kw * f64::from(l.quantity);
            LoadDemand {
                name: l.name.clone(),
                connected_kw: connected,
                demand_kw: connected * l.demand_factor,
            }
        })
        .collect();

    let connected: f64 = loads.iter().map(|l| l.connected_kw).sum();
    let maximum: f64 = loads.iter().map(|l| l.demand_kw).sum();
    if connected <= 0.0 {
        return Err(EngineError::calculation("load schedule has no connected load"));
    }
    let spare = input
        .spare_capacity_factor
        .unwrap_or(ctx.config.design.spare_capacity_factor);
    let design_kw = maximum * spare;
    let kva = design_kw / input.power_factor;
    let voltage = input.voltage_v.unwrap_or_else(|| nominal_voltage(input.phases));
    let current = current_from_kva(kva, voltage, input.phases);

    let breaker = standard_at_or_above(&tables.protective_device_ratings_a, current).ok_or_else(|| {
        EngineError::calculation(format!(
            "design current {:.0} A exceeds the largest standard breaker; split the supply",
            current
        ))
    })?;
    let transformer = standard_at_or_above(&tables.transformer_ratings_kva, kva);

    Ok(MaximumDemandResult {
        loads,
        connected_load_kw: connected,
        maximum_demand_kw: maximum,
        overall_demand_factor: maximum / connected,
        spare_capacity_factor: spare,
        design_demand_kw: design_kw,
        design_demand_kva: kva,
        design_current_a: current,
        main_breaker_a: breaker,
        transformer_kva: transformer,
        transformer_loading_percent: transformer.map(|t| kva / t * 100.0),
    })
}

pub(crate) fn maximum_demand(ctx: &EngineContext, input: &MaximumDemandInput) -> EngineResult<Outcome> {
    let r = demand(ctx, input)?;
    let mut outcome = Outcome::new(&r)?
        .recommend(format!("Main breaker {:.0} A", r.main_breaker_a))
        .standards(&[
            "IEC 60364-3 - Assessment of general characteristics",
            "SBC 401:2018 - Electrical requirements",
        ]);
    outcome = match r.transformer_kva {
        Some(t) => outcome
            .check(
                "transformer_loading",
                ComplianceCheck::ratio(
                    r.design_demand_kva / t,
                    format!("{:.0} kVA on a {:.0} kVA transformer", r.design_demand_kva, t),
                ),
            )
            .recommend(format!("Transformer {:.0} kVA", t)),
        None => outcome.recommend(format!(
            "Design demand {:.0} kVA exceeds the largest standard transformer; use multiple units",
            r.design_demand_kva
        )),
    };
    Ok(outcome)
}

// ============================================================================
// Short circuit
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortCircuitInput {
    pub transformer_kva: f64,
    #[serde(default = "default_secondary")]
    pub secondary_voltage_v: f64,
    #[serde(default = "default_impedance")]
    pub impedance_percent: f64,
    /// Cable between transformer and fault point
    #[serde(default)]
    pub cable_size_mm2: Option<f64>,
    #[serde(default)]
    pub cable_length_m: Option<f64>,
    #[serde(default = "default_conductor")]
    pub conductor: String,
    /// Rated breaking capacity of the device at the fault point
    #[serde(default)]
    pub device_breaking_capacity_ka: Option<f64>,
}

fn default_secondary() -> f64 {
    400.0
}

fn default_impedance() -> f64 {
    5.0
}

impl InputRecord for ShortCircuitInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks
            .positive("transformer_kva", self.transformer_kva)
            .positive("secondary_voltage_v", self.secondary_voltage_v)
            .in_range("impedance_percent", self.impedance_percent, 1.0, 20.0)
            .positive_opt("cable_size_mm2", self.cable_size_mm2)
            .positive_opt("cable_length_m", self.cable_length_m)
            .positive_opt("device_breaking_capacity_ka", self.device_breaking_capacity_ka)
            .require(
                self.cable_size_mm2.is_some() == self.cable_length_m.is_some(),
                "cable_length_m",
                "cable_size_mm2 and cable_length_m must be given together",
            );
        check_conductor(&mut checks, ctx, &self.conductor);
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortCircuitResult {
    pub transformer_impedance_ohm: f64,
    pub transformer_fault_current_ka: f64,
    pub cable_resistance_ohm: f64,
    pub cable_reactance_ohm: f64,
    pub fault_loop_impedance_ohm: f64,
    pub fault_current_ka: f64,
}

pub fn fault_level(ctx: &EngineContext, input: &ShortCircuitInput) -> EngineResult<ShortCircuitResult> {
    let v = input.secondary_voltage_v;
    let z_t = v * v / (input.transformer_kva * 1000.0) * input.impedance_percent / 100.0;
    let sqrt3 = 3f64.sqrt();

    let (r_c, x_c) = match (input.cable_size_mm2, input.cable_length_m) {
        (Some(size), Some(length)) => {
            let conductor = Conductor::lookup(ctx, &input.conductor)?;
            (conductor.resistivity_ohm_mm2_m * length / size, CABLE_REACTANCE_OHM_M * length)
        }
        _ => (0.0, 0.0),
    };
    // Transformer impedance treated as reactive
    let z = (r_c * r_c + (z_t + x_c) * (z_t + x_c)).sqrt();

    Ok(ShortCircuitResult {
        transformer_impedance_ohm: z_t,
        transformer_fault_current_ka: v / (sqrt3 * z_t) / 1000.0,
        cable_resistance_ohm: r_c,
        cable_reactance_ohm: x_c,
        fault_loop_impedance_ohm: z,
        fault_current_ka: v / (sqrt3 * z) / 1000.0,
    })
}

pub(crate) fn short_circuit(ctx: &EngineContext, input: &ShortCircuitInput) -> EngineResult<Outcome> {
    let r = fault_level(ctx, input)?;
    let mut outcome = Outcome::new(&r)?.standards(&[
        "IEC 60909-0 - Short-circuit currents in three-phase AC systems",
        "IEC 60947-2 - Circuit-breakers",
    ]);
    if let Some(icu) = input.device_breaking_capacity_ka {
        outcome = outcome
            .check(
                "breaking_capacity",
                ComplianceCheck::ratio(
                    r.fault_current_ka / icu,
                    format!("Isc = {:.1} kA vs Icu = {:.1} kA", r.fault_current_ka, icu),
                ),
            )
            .recommend_if(
                r.fault_current_ka > icu,
                format!(
                    "Select a device rated for at least {:.0} kA or use cascading",
                    r.fault_current_ka.ceil()
                ),
            );
    } else {
        outcome = outcome.recommend(format!(
            "Protective devices at this point need a breaking capacity of at least {:.1} kA",
            r.fault_current_ka
        ));
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::test_support::context;

    fn schedule() -> MaximumDemandInput {
        serde_json::from_value(serde_json::json!({
            "loads": [
                {"name": "lighting", "connected_kw": 20, "demand_factor": 0.9},
                {"name": "fan coils", "connected_kw": 10, "quantity": 5, "demand_factor": 0.8},
                {"name": "sockets", "connected_kw": 30, "demand_factor": 0.5}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_maximum_demand() {
        let ctx = context();
        let r = demand(&ctx, &schedule()).unwrap();
        assert!((r.connected_load_kw - 100.0).abs() < 1e-9);
        assert!((r.maximum_demand_kw - 73.0).abs() < 1e-9);
        // 73 * 1.25 / 0.85 = 107.35 kVA -> 154.9 A
        assert!((r.design_demand_kva - 107.353).abs() < 1e-3);
        assert_eq!(r.main_breaker_a, 160.0);
        assert_eq!(r.transformer_kva, Some(160.0));
    }

    #[test]
    fn test_explicit_spare_factor() {
        let ctx = context();
        let mut input = schedule();
        input.spare_capacity_factor = Some(1.0);
        let r = demand(&ctx, &input).unwrap();
        assert!((r.design_demand_kw - 73.0).abs() < 1e-9);
    }

    #[test]
    fn test_transformer_fault_current() {
        let ctx = context();
        let input: ShortCircuitInput =
            serde_json::from_value(serde_json::json!({"transformer_kva": 1000})).unwrap();
        let r = fault_level(&ctx, &input).unwrap();
        // 1000 kVA / (√3 * 400 V * 0.05) = 28.87 kA
        assert!((r.transformer_fault_current_ka - 28.87).abs() < 0.01);
        assert_eq!(r.fault_current_ka, r.transformer_fault_current_ka);
    }

    #[test]
    fn test_cable_reduces_fault_current() {
        let ctx = context();
        let input: ShortCircuitInput = serde_json::from_value(serde_json::json!({
            "transformer_kva": 1000, "cable_size_mm2": 95, "cable_length_m": 100,
            "device_breaking_capacity_ka": 10
        }))
        .unwrap();
        let r = fault_level(&ctx, &input).unwrap();
        assert!(r.fault_current_ka < r.transformer_fault_current_ka);
        assert!((r.cable_resistance_ohm - 0.0178 * 100.0 / 95.0).abs() < 1e-12);
    }

    #[test]
    fn test_cable_fields_together() {
        let ctx = context();
        let input: ShortCircuitInput = serde_json::from_value(serde_json::json!({
            "transformer_kva": 1000, "cable_size_mm2": 95
        }))
        .unwrap();
        assert_eq!(input.check(&ctx)[0].field, "cable_length_m");
    }
}
