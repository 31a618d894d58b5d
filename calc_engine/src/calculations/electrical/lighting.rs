//! Lumen-method interior lighting layout.

use serde::{Deserialize, Serialize};

use crate::calculations::{count_product, divide, whole_count, ComplianceCheck, InputRecord, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineResult, FieldError};
use crate::validation::FieldChecks;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightingDesignInput {
    pub length_m: f64,
    pub width_m: f64,
    pub target_lux: f64,
    pub luminaire_lumens: f64,
    pub luminaire_watts: f64,
    #[serde(default = "default_utilization")]
    pub utilization_factor: f64,
    #[serde(default = "default_maintenance")]
    pub maintenance_factor: f64,
    /// Allowed lighting power density (W/m²)
    #[serde(default = "default_lpd_limit")]
    pub lpd_limit_w_m2: f64,
}

fn default_utilization() -> f64 {
    0.6
}

fn default_maintenance() -> f64 {
    0.8
}

fn default_lpd_limit() -> f64 {
    10.0
}

impl InputRecord for LightingDesignInput {
    fn check(&self, _ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks
            .positive("length_m", self.length_m)
            .positive("width_m", self.width_m)
            .positive("target_lux", self.target_lux)
            .positive("luminaire_lumens", self.luminaire_lumens)
            .positive("luminaire_watts", self.luminaire_watts)
            .in_range("utilization_factor", self.utilization_factor, 0.05, 1.0)
            .in_range("maintenance_factor", self.maintenance_factor, 0.05, 1.0)
            .positive("lpd_limit_w_m2", self.lpd_limit_w_m2);
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightingDesignResult {
    pub area_m2: f64,
    pub required_lumens: f64,
    pub luminaires: u32,
    /// Suggested grid, rows along the width
    pub rows: u32,
    pub columns: u32,
    pub achieved_lux: f64,
    pub total_watts: f64,
    pub power_density_w_m2: f64,
}

pub fn design(input: &LightingDesignInput) -> EngineResult<LightingDesignResult> {
    let area = input.length_m * input.width_m;
    let per_luminaire = input.luminaire_lumens * input.utilization_factor * input.maintenance_factor;
    let required = input.target_lux * area;
    let count = whole_count(
        divide(required, per_luminaire, "effective lumens per luminaire")?
            .ceil()
            .max(1.0),
        "luminaires",
    )?;

    // Grid close to the room proportions, columns along the length
    let rows = whole_count(
        (f64::from(count) * input.width_m / input.length_m).sqrt().round().max(1.0),
        "luminaire rows",
    )?;
    let columns = count.div_ceil(rows);
    let installed = count_product(rows, columns, "installed luminaires")?;

    let total_watts = f64::from(installed) * input.luminaire_watts;
    Ok(LightingDesignResult {
        area_m2: area,
        required_lumens: required / (input.utilization_factor * input.maintenance_factor),
        luminaires: installed,
        rows,
        columns,
        achieved_lux: f64::from(installed) * per_luminaire / area,
        total_watts,
        power_density_w_m2: total_watts / area,
    })
}

pub(crate) fn calculate(_ctx: &EngineContext, input: &LightingDesignInput) -> EngineResult<Outcome> {
    let r = design(input)?;
    Ok(Outcome::new(&r)?
        .check(
            "illuminance",
            ComplianceCheck::flag(
                r.achieved_lux >= input.target_lux,
                format!("{:.0} lx achieved for a {:.0} lx target", r.achieved_lux, input.target_lux),
            ),
        )
        .check(
            "lighting_power_density",
            ComplianceCheck::ratio(
                r.power_density_w_m2 / input.lpd_limit_w_m2,
                format!("{:.1} W/m² vs {:.1} W/m² allowed", r.power_density_w_m2, input.lpd_limit_w_m2),
            ),
        )
        .recommend(format!("{} x {} grid of luminaires", r.rows, r.columns))
        .recommend_if(
            r.power_density_w_m2 > input.lpd_limit_w_m2,
            "Lighting power density exceeds the allowance; use higher-efficacy luminaires",
        )
        .standards(&["CIBSE SLL Code for Lighting", "ASHRAE 90.1 Section 9 - Lighting", "SBC 601 - Energy conservation"]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn office() -> LightingDesignInput {
        LightingDesignInput {
            length_m: 10.0,
            width_m: 8.0,
            target_lux: 500.0,
            luminaire_lumens: 4000.0,
            luminaire_watts: 36.0,
            utilization_factor: 0.6,
            maintenance_factor: 0.8,
            lpd_limit_w_m2: 10.0,
        }
    }

    #[test]
    fn test_lumen_method_count() {
        // 500 * 80 / (4000 * 0.48) = 20.83 -> 21, laid out as 4 x 6
        let r = design(&office()).unwrap();
        assert_eq!(r.rows, 4);
        assert_eq!(r.columns, 6);
        assert_eq!(r.luminaires, 24);
        assert!(r.achieved_lux >= 500.0);
        assert!((r.power_density_w_m2 - 24.0 * 36.0 / 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_luminaire_minimum() {
        let mut input = office();
        input.target_lux = 1.0;
        let r = design(&input).unwrap();
        assert_eq!(r.luminaires, 1);
    }

    #[test]
    fn test_uncountable_luminaire_count_is_an_error() {
        let mut input = office();
        input.target_lux = 1e15;
        let err = design(&input).unwrap_err();
        assert_eq!(err.error_code(), "CALCULATION_ERROR");
        assert!(err.to_string().contains("luminaires"));
    }

    #[test]
    fn test_factor_range_checked() {
        let mut input = office();
        input.maintenance_factor = 1.5;
        let errors = input.check(&crate::calculations::test_support::context());
        assert_eq!(errors[0].field, "maintenance_factor");
    }
}
