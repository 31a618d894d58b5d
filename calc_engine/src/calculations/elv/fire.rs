//! Fire alarm standby batteries and automatic detector quantities.

use serde::{Deserialize, Serialize};

use super::{aggregate, default_quantity};
use crate::calculations::{count_total, whole_count, ComplianceCheck, InputRecord, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineError, EngineResult, FieldError};
use crate::validation::FieldChecks;

const FIRE_STANDARDS: &[&str] = &[
    "NFPA 72 - National Fire Alarm and Signaling Code",
    "SBC 801 - Fire protection",
];

// ============================================================================
// Battery
// ============================================================================

/// Panel or field device drawing from the fire alarm battery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmDevice {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub standby_ma: f64,
    pub alarm_ma: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireAlarmBatteryInput {
    /// Added to the device list total
    #[serde(default)]
    pub standby_current_a: Option<f64>,
    #[serde(default)]
    pub alarm_current_a: Option<f64>,
    #[serde(default)]
    pub devices: Vec<AlarmDevice>,
    #[serde(default = "default_standby_hours")]
    pub standby_hours: f64,
    #[serde(default = "default_alarm_minutes")]
    pub alarm_minutes: f64,
}

fn default_standby_hours() -> f64 {
    24.0
}

fn default_alarm_minutes() -> f64 {
    30.0
}

impl InputRecord for FireAlarmBatteryInput {
    fn check(&self, _ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks
            .require(
                self.standby_current_a.is_some() || !self.devices.is_empty(),
                "standby_current_a",
                "required unless a device list is given",
            )
            .in_range_opt("standby_current_a", self.standby_current_a, 0.0, 100.0)
            .in_range_opt("alarm_current_a", self.alarm_current_a, 0.0, 100.0)
            .in_range("standby_hours", self.standby_hours, 1.0, 72.0)
            .in_range("alarm_minutes", self.alarm_minutes, 5.0, 120.0);
        for (i, d) in self.devices.iter().enumerate() {
            checks
                .non_negative(format!("devices[{}].standby_ma", i), d.standby_ma)
                .non_negative(format!("devices[{}].alarm_ma", i), d.alarm_ma);
        }
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FireAlarmBatteryResult {
    pub standby_current_a: f64,
    pub alarm_current_a: f64,
    pub standby_ah: f64,
    pub alarm_ah: f64,
    pub safety_margin: f64,
    pub required_ah: f64,
    pub battery_ah: f64,
}

pub fn size_battery(ctx: &EngineContext, input: &FireAlarmBatteryInput) -> EngineResult<FireAlarmBatteryResult> {
    let standby = input.standby_current_a.unwrap_or(0.0)
        + aggregate(&input.devices, |d| d.quantity, |d| d.standby_ma) / 1000.0;
    let alarm =
        input.alarm_current_a.unwrap_or(0.0) + aggregate(&input.devices, |d| d.quantity, |d| d.alarm_ma) / 1000.0;
    let standby_ah = standby * input.standby_hours;
    let alarm_ah = alarm * input.alarm_minutes / 60.0;
    let margin = ctx.config.design.battery_safety_margin;
    let required = (standby_ah + alarm_ah) * margin;
    let battery = ctx.data.elv.battery_at_or_above(required).ok_or_else(|| {
        EngineError::calculation(format!(
            "{:.1} Ah exceeds the largest standard battery; split the system across power supplies",
            required
        ))
    })?;
    Ok(FireAlarmBatteryResult {
        standby_current_a: standby,
        alarm_current_a: alarm,
        standby_ah,
        alarm_ah,
        safety_margin: margin,
        required_ah: required,
        battery_ah: battery,
    })
}

pub(crate) fn fire_alarm_battery(ctx: &EngineContext, input: &FireAlarmBatteryInput) -> EngineResult<Outcome> {
    let r = size_battery(ctx, input)?;
    Ok(Outcome::new(&r)?
        .check(
            "battery_capacity",
            ComplianceCheck::ratio(
                r.required_ah / r.battery_ah,
                format!("{:.1} Ah required, {:.0} Ah fitted", r.required_ah, r.battery_ah),
            ),
        )
        .recommend(format!("2 x 12 V {:.0} Ah sealed lead-acid batteries", r.battery_ah))
        .standards(FIRE_STANDARDS)
        .standards(&["EN 54-4 - Power supply equipment"]))
}

// ============================================================================
// Detectors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedArea {
    pub name: String,
    pub area_m2: f64,
    pub ceiling_height_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorCoverageInput {
    pub areas: Vec<ProtectedArea>,
    #[serde(default = "default_detector")]
    pub detector_type: String,
    /// Addressable devices per loop
    #[serde(default = "default_loop_capacity")]
    pub loop_capacity: u32,
}

fn default_detector() -> String {
    "smoke".to_string()
}

fn default_loop_capacity() -> u32 {
    126
}

impl InputRecord for DetectorCoverageInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks.non_empty("areas", &self.areas);
        for (i, a) in self.areas.iter().enumerate() {
            checks
                .positive(format!("areas[{}].area_m2", i), a.area_m2)
                .positive(format!("areas[{}].ceiling_height_m", i), a.ceiling_height_m);
        }
        checks.require(self.loop_capacity > 0, "loop_capacity", "must be at least 1");
        checks.known(
            "detector_type",
            "detector",
            &self.detector_type,
            ctx.data.elv.detector(&self.detector_type),
        );
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaDetectors {
    pub name: String,
    pub detectors: u32,
    pub within_height_limit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorCoverageResult {
    pub coverage_per_detector_m2: f64,
    pub max_ceiling_height_m: f64,
    pub areas: Vec<AreaDetectors>,
    pub total_detectors: u32,
    pub loops: u32,
}

pub fn count_detectors(ctx: &EngineContext, input: &DetectorCoverageInput) -> EngineResult<DetectorCoverageResult> {
    let rule = ctx.data.elv.detector(&input.detector_type).ok_or_else(|| {
        EngineError::invalid_field("detector_type", format!("no detector entry for '{}'", input.detector_type))
    })?;
    let areas = input
        .areas
        .iter()
        .map(|a| -> EngineResult<AreaDetectors> {
            Ok(AreaDetectors {
                name: a.name.clone(),
                detectors: whole_count((a.area_m2 / rule.coverage_m2).ceil().max(1.0), "detectors")?,
                within_height_limit: a.ceiling_height_m <= rule.max_ceiling_height_m,
            })
        })
        .collect::<EngineResult<Vec<_>>>()?;
    let total = count_total(areas.iter().map(|a| a.detectors), "total detectors")?;
    Ok(DetectorCoverageResult {
        coverage_per_detector_m2: rule.coverage_m2,
        max_ceiling_height_m: rule.max_ceiling_height_m,
        areas,
        total_detectors: total,
        loops: total.div_ceil(input.loop_capacity),
    })
}

pub(crate) fn detector_coverage(ctx: &EngineContext, input: &DetectorCoverageInput) -> EngineResult<Outcome> {
    let r = count_detectors(ctx, input)?;
    let too_high: Vec<&str> = r
        .areas
        .iter()
        .filter(|a| !a.within_height_limit)
        .map(|a| a.name.as_str())
        .collect();
    let note = if too_high.is_empty() {
        format!("All ceilings within {:.1} m", r.max_ceiling_height_m)
    } else {
        format!("Ceiling above {:.1} m in: {}", r.max_ceiling_height_m, too_high.join(", "))
    };
    Ok(Outcome::new(&r)?
        .check("ceiling_height", ComplianceCheck::flag(too_high.is_empty(), note))
        .recommend(format!("{} detector(s) on {} loop(s)", r.total_detectors, r.loops))
        .recommend_if(
            !too_high.is_empty(),
            "Use beam or aspirating detection where ceilings exceed the point detector limit",
        )
        .standards(FIRE_STANDARDS))
}
