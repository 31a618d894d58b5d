//! # ELV Calculations
//!
//! Extra-low-voltage building systems: surveillance, fire detection,
//! standby power and structured cabling. Most routes aggregate a device list
//! (`Σ quantity × unit value`) and then size a standard component with a
//! configured safety margin.
//!
//! - [`cctv`] - `cctv-coverage`
//! - [`fire`] - `fire-alarm-battery`, `detector-coverage`
//! - [`power`] - `power-budget`
//! - [`cabling`] - `structured-cabling`

pub mod cabling;
pub mod cctv;
pub mod fire;
pub mod power;

use std::sync::Arc;

use crate::calculations::{discipline_menu, Discipline};
use crate::context::EngineContext;

#[derive(Debug, Clone)]
pub struct ElvCalculator {
    ctx: Arc<EngineContext>,
}

impl ElvCalculator {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        ElvCalculator { ctx }
    }
}

discipline_menu!(ElvCalculator, Discipline::Elv, {
    "cctv-coverage" => cctv::CctvCoverageInput => cctv::calculate,
    "fire-alarm-battery" => fire::FireAlarmBatteryInput => fire::fire_alarm_battery,
    "power-budget" => power::PowerBudgetInput => power::calculate,
    "structured-cabling" => cabling::StructuredCablingInput => cabling::calculate,
    "detector-coverage" => fire::DetectorCoverageInput => fire::detector_coverage,
});

pub(crate) fn default_quantity() -> u32 {
    1
}

/// `Σ quantity × value` over a device list
pub fn aggregate<T>(items: &[T], quantity: impl Fn(&T) -> u32, value: impl Fn(&T) -> f64) -> f64 {
    items.iter().map(|i| f64::from(quantity(i)) * value(i)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::test_support::context;
    use crate::calculations::Calculator;
    use serde_json::json;

    #[test]
    fn test_aggregate() {
        let items = [(2u32, 1.5), (3, 2.0)];
        assert!((aggregate(&items, |i| i.0, |i| i.1) - 9.0).abs() < 1e-12);
        let empty: [(u32, f64); 0] = [];
        assert_eq!(aggregate(&empty, |i| i.0, |i| i.1), 0.0);
    }

    #[test]
    fn test_unknown_calculation() {
        let calc = ElvCalculator::new(context());
        let err = calc
            .calculate("intercom-design", &json!({}), &Default::default())
            .unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_CALCULATION");
    }
}
