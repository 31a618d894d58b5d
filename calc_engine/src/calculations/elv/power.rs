//! ELV power budget and UPS selection.

use serde::{Deserialize, Serialize};

use super::{aggregate, default_quantity};
use crate::calculations::{ComplianceCheck, InputRecord, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineResult, FieldError};
use crate::validation::FieldChecks;

const INVERTER_EFFICIENCY: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoweredDevice {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub unit_power_w: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerBudgetInput {
    pub devices: Vec<PoweredDevice>,
    #[serde(default = "default_power_factor")]
    pub power_factor: f64,
    #[serde(default = "default_autonomy")]
    pub autonomy_minutes: f64,
    #[serde(default = "default_battery_voltage")]
    pub battery_voltage_v: f64,
}

fn default_power_factor() -> f64 {
    0.9
}

fn default_autonomy() -> f64 {
    15.0
}

fn default_battery_voltage() -> f64 {
    48.0
}

impl InputRecord for PowerBudgetInput {
    fn check(&self, _ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks.non_empty("devices", &self.devices);
        for (i, d) in self.devices.iter().enumerate() {
            checks.non_negative(format!("devices[{}].unit_power_w", i), d.unit_power_w);
        }
        checks
            .in_range("power_factor", self.power_factor, 0.5, 1.0)
            .in_range("autonomy_minutes", self.autonomy_minutes, 1.0, 480.0)
            .positive("battery_voltage_v", self.battery_voltage_v);
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceLoad {
    pub name: String,
    pub quantity: u32,
    pub power_w: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerBudgetResult {
    pub devices: Vec<DeviceLoad>,
    pub total_power_w: f64,
    pub apparent_power_va: f64,
    pub growth_margin: f64,
    pub design_power_va: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ups_kva: Option<f64>,
    pub battery_ah: f64,
}

pub fn budget(ctx: &EngineContext, input: &PowerBudgetInput) -> PowerBudgetResult {
    let devices = input
        .devices
        .iter()
        .map(|d| DeviceLoad {
            name: d.name.clone(),
            quantity: d.quantity,
            power_w: f64::from(d.quantity) * d.unit_power_w,
        })
        .collect();
    let total = aggregate(&input.devices, |d| d.quantity, |d| d.unit_power_w);
    let va = total / input.power_factor;
    let margin = ctx.config.design.ups_growth_margin;
    let design = va * margin;
    let battery_ah = total * margin * input.autonomy_minutes / 60.0 / (input.battery_voltage_v * INVERTER_EFFICIENCY);

    PowerBudgetResult {
        devices,
        total_power_w: total,
        apparent_power_va: va,
        growth_margin: margin,
        design_power_va: design,
        ups_kva: ctx.data.elv.ups_at_or_above(design / 1000.0),
        battery_ah,
    }
}

pub(crate) fn calculate(ctx: &EngineContext, input: &PowerBudgetInput) -> EngineResult<Outcome> {
    let r = budget(ctx, input);
    let mut outcome = Outcome::new(&r)?.standards(&[
        "IEC 62040-3 - Uninterruptible power systems, performance",
        "SBC 401 - Electrical, standby power",
    ]);
    outcome = match r.ups_kva {
        Some(ups) => outcome
            .check(
                "ups_loading",
                ComplianceCheck::ratio(
                    r.design_power_va / 1000.0 / ups,
                    format!("{:.2} kVA on a {:.1} kVA UPS", r.design_power_va / 1000.0, ups),
                ),
            )
            .recommend(format!("{:.1} kVA UPS with {:.0} Ah at {:.0} V", ups, r.battery_ah.ceil(), input.battery_voltage_v)),
        None => outcome.recommend(format!(
            "{:.0} kVA exceeds single UPS ratings; use parallel modules",
            r.design_power_va / 1000.0
        )),
    };
    Ok(outcome)
}
