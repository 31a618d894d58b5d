//! # Cable Sizing and Voltage Drop
//!
//! ## Selection
//!
//! 1. Design current `I_b` from `design_current_a`, or from the load in kW
//! 2. Required tabulated ampacity `I_z,req = I_b / (C_a · C_g · C_i)`,
//!    further divided by the conductor's ampacity factor
//! 3. First size in ascending order with ampacity ≥ requirement
//! 4. From there, the first size whose voltage drop is within the circuit
//!    limit and whose derated capacity carries the protective device rating
//!
//! Each step only ever moves up the table, so a larger demand never
//! selects a smaller cable.

use serde::{Deserialize, Serialize};

use super::{
    check_conductor, check_phases, default_conductor, default_power_factor, default_three_phase,
    line_current, nominal_voltage, Conductor,
};
use crate::calculations::{ComplianceCheck, InputRecord, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineError, EngineResult, FieldError};
use crate::reference::electrical::CableRating;
use crate::reference::standard_at_or_above;
use crate::validation::FieldChecks;

const IEC_CABLES: &str = "IEC 60364-5-52 - Selection and erection of wiring systems";
const SBC_ELECTRICAL: &str = "SBC 401:2018 - Electrical requirements";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableSizingInput {
    #[serde(default)]
    pub design_current_a: Option<f64>,
    #[serde(default)]
    pub load_kw: Option<f64>,
    /// Line voltage; 400 V (3-phase) or 230 V (1-phase) when absent
    #[serde(default)]
    pub voltage_v: Option<f64>,
    #[serde(default = "default_power_factor")]
    pub power_factor: f64,
    #[serde(default = "default_three_phase")]
    pub phases: u8,
    pub length_m: f64,
    #[serde(default = "default_ambient")]
    pub ambient_temperature_c: f64,
    #[serde(default = "default_circuits")]
    pub grouped_circuits: u32,
    #[serde(default = "default_method")]
    pub installation_method: String,
    #[serde(default = "default_conductor")]
    pub conductor: String,
    #[serde(default = "default_circuit_type")]
    pub circuit_type: String,
    /// Rating of the protective device; the next standard rating at or above
    /// the design current when absent
    #[serde(default)]
    pub protective_device_a: Option<f64>,
}

fn default_ambient() -> f64 {
    30.0
}

fn default_circuits() -> u32 {
    1
}

fn default_method() -> String {
    "clipped_direct".to_string()
}

fn default_circuit_type() -> String {
    "power".to_string()
}

impl CableSizingInput {
    pub fn voltage(&self) -> f64 {
        self.voltage_v.unwrap_or_else(|| nominal_voltage(self.phases))
    }

    pub fn design_current(&self) -> Option<f64> {
        self.design_current_a.or_else(|| {
            self.load_kw
                .map(|kw| line_current(kw, self.voltage(), self.power_factor, self.phases))
        })
    }
}

impl InputRecord for CableSizingInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        let tables = &ctx.data.electrical;
        let mut checks = FieldChecks::new();
        checks.require(
            self.design_current_a.is_some() || self.load_kw.is_some(),
            "design_current_a",
            "supply design_current_a or load_kw",
        );
        checks
            .positive_opt("design_current_a", self.design_current_a)
            .positive_opt("load_kw", self.load_kw)
            .positive_opt("voltage_v", self.voltage_v)
            .in_range("power_factor", self.power_factor, 0.1, 1.0)
            .positive("length_m", self.length_m)
            .positive_opt("protective_device_a", self.protective_device_a);
        check_phases(&mut checks, self.phases);
        checks.known(
            "ambient_temperature_c",
            "temperature derating",
            &self.ambient_temperature_c.to_string(),
            tables.temperature_factor(self.ambient_temperature_c),
        );
        checks.require(self.grouped_circuits >= 1, "grouped_circuits", "must be at least 1");
        checks.known(
            "grouped_circuits",
            "grouping derating",
            &self.grouped_circuits.to_string(),
            tables.grouping_factor(self.grouped_circuits),
        );
        if tables.installation_factor(&self.installation_method).is_none() {
            checks.push(
                "installation_method",
                format!(
                    "unknown installation method '{}', expected one of: {}",
                    self.installation_method,
                    tables.installation_methods().join(", ")
                ),
            );
        }
        check_conductor(&mut checks, ctx, &self.conductor);
        checks.finish()
    }
}

/// Which requirement fixed the final cable size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingCriterion {
    Ampacity,
    VoltageDrop,
    Protection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CableSizingResult {
    pub design_current_a: f64,
    pub voltage_v: f64,
    pub temperature_factor: f64,
    pub grouping_factor: f64,
    pub installation_factor: f64,
    pub conductor_factor: f64,
    pub combined_derating_factor: f64,
    pub required_ampacity_a: f64,
    /// Smallest size meeting the ampacity requirement alone
    pub ampacity_size_mm2: f64,
    pub cable_size_mm2: f64,
    pub governed_by: SizingCriterion,
    pub derated_capacity_a: f64,
    pub voltage_drop_v: f64,
    pub voltage_drop_percent: f64,
    pub voltage_drop_limit_percent: f64,
    pub protective_device_a: f64,
    pub coordinated: bool,
}

fn drop_volts(cable: &CableRating, phases: u8, current_a: f64, length_m: f64, factor: f64) -> f64 {
    cable.mv_per_a_m(phases) * factor * current_a * length_m / 1000.0
}

/// Select the cable for a circuit.
pub fn select(ctx: &EngineContext, input: &CableSizingInput) -> EngineResult<CableSizingResult> {
    let tables = &ctx.data.electrical;
    let conductor = Conductor::lookup(ctx, &input.conductor)?;
    let missing = |what: &str| EngineError::calculation(format!("derating lookup failed: {}", what));

    let ib = input
        .design_current()
        .ok_or_else(|| EngineError::invalid_field("design_current_a", "supply design_current_a or load_kw"))?;
    let voltage = input.voltage();
    let ca = tables
        .temperature_factor(input.ambient_temperature_c)
        .ok_or_else(|| missing("ambient_temperature_c"))?;
    let cg = tables
        .grouping_factor(input.grouped_circuits)
        .ok_or_else(|| missing("grouped_circuits"))?;
    let ci = tables
        .installation_factor(&input.installation_method)
        .ok_or_else(|| missing("installation_method"))?;
    let derating = ca * cg * ci;
    let required = ib / derating;

    let device = match input.protective_device_a {
        Some(rating) => rating,
        None => standard_at_or_above(&tables.protective_device_ratings_a, ib).ok_or_else(|| {
            EngineError::calculation(format!(
                "design current {:.0} A exceeds the largest standard protective device",
                ib
            ))
        })?,
    };

    let first = tables
        .cables
        .iter()
        .position(|c| c.ampacity(input.phases) * conductor.ampacity_factor >= required)
        .ok_or_else(|| {
            EngineError::calculation(format!(
                "required ampacity {:.0} A exceeds the largest standard cable; use parallel runs",
                required
            ))
        })?;

    let limit = tables.voltage_drop_limit(&input.circuit_type);
    let capacity = |c: &CableRating| c.ampacity(input.phases) * conductor.ampacity_factor * derating;
    let percent = |c: &CableRating| {
        drop_volts(c, input.phases, ib, input.length_m, conductor.voltage_drop_factor) / voltage * 100.0
    };

    let mut governed_by = SizingCriterion::Ampacity;
    let mut chosen = &tables.cables[first];
    let candidates = &tables.cables[first..];
    match candidates.iter().find(|&c| percent(c) <= limit && capacity(c) >= device) {
        Some(c) => {
            if c.size_mm2 > chosen.size_mm2 {
                let vd_only = candidates.iter().find(|&c| percent(c) <= limit);
                governed_by = match vd_only {
                    Some(v) if (v.size_mm2 - c.size_mm2).abs() < 1e-9 => SizingCriterion::VoltageDrop,
                    _ => SizingCriterion::Protection,
                };
            }
            chosen = c;
        }
        None => {
            // Largest size; the failing check reports the shortfall
            if let Some(last) = tables.cables.last() {
                chosen = last;
                governed_by = if percent(last) > limit {
                    SizingCriterion::VoltageDrop
                } else {
                    SizingCriterion::Protection
                };
            }
        }
    }

    let derated_capacity = capacity(chosen);
    let vd = drop_volts(chosen, input.phases, ib, input.length_m, conductor.voltage_drop_factor);

    Ok(CableSizingResult {
        design_current_a: ib,
        voltage_v: voltage,
        temperature_factor: ca,
        grouping_factor: cg,
        installation_factor: ci,
        conductor_factor: conductor.ampacity_factor,
        combined_derating_factor: derating,
        required_ampacity_a: required,
        ampacity_size_mm2: tables.cables[first].size_mm2,
        cable_size_mm2: chosen.size_mm2,
        governed_by,
        derated_capacity_a: derated_capacity,
        voltage_drop_v: vd,
        voltage_drop_percent: vd / voltage * 100.0,
        voltage_drop_limit_percent: limit,
        protective_device_a: device,
        coordinated: ib <= device && device <= derated_capacity,
    })
}

pub(crate) fn size_cable(ctx: &EngineContext, input: &CableSizingInput) -> EngineResult<Outcome> {
    let r = select(ctx, input)?;
    Ok(Outcome::new(&r)?
        .check(
            "ampacity",
            ComplianceCheck::ratio(
                r.design_current_a / r.derated_capacity_a,
                format!(
                    "Ib = {:.1} A vs derated Iz = {:.1} A ({} mm²)",
                    r.design_current_a, r.derated_capacity_a, r.cable_size_mm2
                ),
            ),
        )
        .check(
            "voltage_drop",
            ComplianceCheck::ratio(
                r.voltage_drop_percent / r.voltage_drop_limit_percent,
                format!(
                    "{:.2}% vs {}% limit for {} circuits",
                    r.voltage_drop_percent, r.voltage_drop_limit_percent, input.circuit_type
                ),
            ),
        )
        .check(
            "protection_coordination",
            ComplianceCheck::flag(
                r.coordinated,
                format!(
                    "Ib {:.1} A ≤ In {:.0} A ≤ Iz {:.1} A",
                    r.design_current_a, r.protective_device_a, r.derated_capacity_a
                ),
            ),
        )
        .recommend(format!(
            "{} mm² {} cable, {:.0} A protective device",
            r.cable_size_mm2, input.conductor, r.protective_device_a
        ))
        .recommend_if(
            r.voltage_drop_percent > r.voltage_drop_limit_percent,
            "Voltage drop exceeds the limit even at the largest size; shorten the run or use parallel cables",
        )
        .recommend_if(
            r.combined_derating_factor < 0.7,
            "Heavy derating; consider spacing circuits or an alternative installation method",
        )
        .standards(&[IEC_CABLES, "IEC 60364-4-43 - Protection against overcurrent", SBC_ELECTRICAL]))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageDropInput {
    pub cable_size_mm2: f64,
    pub length_m: f64,
    pub current_a: f64,
    #[serde(default = "default_three_phase")]
    pub phases: u8,
    #[serde(default)]
    pub voltage_v: Option<f64>,
    #[serde(default = "default_conductor")]
    pub conductor: String,
    #[serde(default = "default_limit_type")]
    pub circuit_type: String,
}

fn default_limit_type() -> String {
    "default".to_string()
}

impl InputRecord for VoltageDropInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks
            .positive("length_m", self.length_m)
            .positive("current_a", self.current_a)
            .positive_opt("voltage_v", self.voltage_v);
        check_phases(&mut checks, self.phases);
        checks.known(
            "cable_size_mm2",
            "standard cable size",
            &self.cable_size_mm2.to_string(),
            ctx.data.electrical.cable(self.cable_size_mm2),
        );
        check_conductor(&mut checks, ctx, &self.conductor);
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoltageDropResult {
    pub mv_per_a_m: f64,
    pub voltage_drop_v: f64,
    pub voltage_drop_percent: f64,
    pub voltage_drop_limit_percent: f64,
    pub receiving_end_voltage_v: f64,
    /// Longest run at this current that stays within the limit
    pub max_length_m: f64,
}

pub(crate) fn voltage_drop(ctx: &EngineContext, input: &VoltageDropInput) -> EngineResult<Outcome> {
    let tables = &ctx.data.electrical;
    let conductor = Conductor::lookup(ctx, &input.conductor)?;
    let cable = tables
        .cable(input.cable_size_mm2)
        .ok_or_else(|| EngineError::invalid_field("cable_size_mm2", "not a standard cable size"))?;
    let voltage = input.voltage_v.unwrap_or_else(|| nominal_voltage(input.phases));
    let mv = cable.mv_per_a_m(input.phases) * conductor.voltage_drop_factor;
    let vd = mv * input.current_a * input.length_m / 1000.0;
    let limit = tables.voltage_drop_limit(&input.circuit_type);

    let r = VoltageDropResult {
        mv_per_a_m: mv,
        voltage_drop_v: vd,
        voltage_drop_percent: vd / voltage * 100.0,
        voltage_drop_limit_percent: limit,
        receiving_end_voltage_v: voltage - vd,
        max_length_m: limit / 100.0 * voltage * 1000.0 / (mv * input.current_a),
    };
    Ok(Outcome::new(&r)?
        .check(
            "voltage_drop",
            ComplianceCheck::ratio(
                r.voltage_drop_percent / limit,
                format!("{:.2}% vs {}% limit", r.voltage_drop_percent, limit),
            ),
        )
        .recommend_if(
            r.voltage_drop_percent > limit,
            format!("Limit the run to {:.0} m or increase the cable size", r.max_length_m),
        )
        .standards(&["IEC 60364-5-52 Annex G - Voltage drop", SBC_ELECTRICAL]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::test_support::context;

    fn circuit(current: f64) -> CableSizingInput {
        serde_json::from_value(serde_json::json!({
            "design_current_a": current,
            "phases": 1,
            "length_m": 30
        }))
        .unwrap()
    }

    #[test]
    fn test_ampacity_governs_short_run() {
        let ctx = context();
        let r = select(&ctx, &circuit(20.0)).unwrap();
        // 2.5 mm² carries 27 A; 18 mV/A/m * 20 A * 30 m = 10.8 V = 4.7% < 5%
        assert_eq!(r.cable_size_mm2, 2.5);
        assert_eq!(r.governed_by, SizingCriterion::Ampacity);
        assert_eq!(r.protective_device_a, 20.0);
        assert!(r.coordinated);
    }

    #[test]
    fn test_lighting_limit_upsizes_for_voltage_drop() {
        let ctx = context();
        let mut input = circuit(20.0);
        input.circuit_type = "lighting".to_string();
        let r = select(&ctx, &input).unwrap();
        assert_eq!(r.ampacity_size_mm2, 2.5);
        assert_eq!(r.cable_size_mm2, 4.0);
        assert_eq!(r.governed_by, SizingCriterion::VoltageDrop);
        assert!(r.voltage_drop_percent <= 3.0);
    }

    #[test]
    fn test_unreachable_limits_name_the_failing_criterion() {
        let ctx = context();
        // 1000 A device: no size reaches Iz >= In, voltage drop is fine
        let mut input = circuit(20.0);
        input.protective_device_a = Some(1000.0);
        let r = select(&ctx, &input).unwrap();
        assert_eq!(r.cable_size_mm2, 300.0);
        assert_eq!(r.governed_by, SizingCriterion::Protection);
        assert!(!r.coordinated);
        assert!(r.voltage_drop_percent <= r.voltage_drop_limit_percent);

        // 100 km run: the largest size still drops too much
        let mut input = circuit(20.0);
        input.length_m = 100_000.0;
        let r = select(&ctx, &input).unwrap();
        assert_eq!(r.cable_size_mm2, 300.0);
        assert_eq!(r.governed_by, SizingCriterion::VoltageDrop);
        assert!(r.coordinated);
    }

    #[test]
    fn test_derating_multiplies() {
        let ctx = context();
        let input: CableSizingInput = serde_json::from_value(serde_json::json!({
            "load_kw": 100, "length_m": 50, "ambient_temperature_c": 40,
            "grouped_circuits": 2, "installation_method": "conduit"
        }))
        .unwrap();
        let r = select(&ctx, &input).unwrap();
        assert!((r.combined_derating_factor - 0.87 * 0.8 * 0.87).abs() < 1e-12);
        assert!((r.design_current_a - 169.82).abs() < 0.01);
        assert!(r.derated_capacity_a >= r.protective_device_a);
    }

    #[test]
    fn test_aluminium_needs_larger_size() {
        let ctx = context();
        let mut input = circuit(20.0);
        input.conductor = "aluminium".to_string();
        let r = select(&ctx, &input).unwrap();
        assert_eq!(r.cable_size_mm2, 4.0);
    }

    #[test]
    fn test_oversized_demand_is_calculation_error() {
        let ctx = context();
        let err = select(&ctx, &circuit(1000.0)).unwrap_err();
        assert_eq!(err.error_code(), "CALCULATION_ERROR");
    }

    #[test]
    fn test_missing_current_and_load() {
        let ctx = context();
        let input: CableSizingInput = serde_json::from_value(serde_json::json!({"length_m": 10})).unwrap();
        let errors = input.check(&ctx);
        assert_eq!(errors[0].field, "design_current_a");
    }

    #[test]
    fn test_ambient_beyond_table_rejected() {
        let ctx = context();
        let mut input = circuit(20.0);
        input.ambient_temperature_c = 70.0;
        let errors = input.check(&ctx);
        assert_eq!(errors[0].field, "ambient_temperature_c");
    }

    #[test]
    fn test_voltage_drop_route() {
        let ctx = context();
        let input: VoltageDropInput = serde_json::from_value(serde_json::json!({
            "cable_size_mm2": 16, "length_m": 100, "current_a": 50
        }))
        .unwrap();
        let outcome = voltage_drop(&ctx, &input).unwrap();
        let result = outcome
            .finish(crate::calculations::Discipline::Electrical, "voltage-drop", &serde_json::Value::Null)
            .unwrap();
        // 2.4 * 50 * 100 / 1000 = 12 V = 3% of 400 V
        assert!((result.number("voltage_drop_v").unwrap() - 12.0).abs() < 1e-9);
        assert!((result.number("voltage_drop_percent").unwrap() - 3.0).abs() < 1e-9);
        assert!(result.compliance["voltage_drop"].passed);
    }
}
