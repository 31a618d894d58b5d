//! Structural load routes: request records for the [`crate::loads`]
//! calculator and the compliance entries derived from its results.

use serde::{Deserialize, Serialize};

use crate::calculations::{ComplianceCheck, InputRecord, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineResult, FieldError};
use crate::loads::{AreaLoadElement, LimitState, LoadCase, SeismicLoadInput, WindLoadInput};

const LOADS_STANDARD: &str = "SBC 301:2018 - Loads and forces";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLoadsInput {
    pub elements: Vec<AreaLoadElement>,
}

impl InputRecord for DeadLoadsInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        ctx.load_calculator().check_dead_loads(&self.elements)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveLoadsInput {
    pub areas: Vec<AreaLoadElement>,
}

impl InputRecord for LiveLoadsInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        ctx.load_calculator().check_live_loads(&self.areas)
    }
}

impl InputRecord for WindLoadInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        ctx.load_calculator().check_wind_loads(self)
    }
}

impl InputRecord for SeismicLoadInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        ctx.load_calculator().check_seismic_loads(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadCombinationsInput {
    pub loads: LoadCase,
    #[serde(default)]
    pub limit_state: LimitState,
}

impl InputRecord for LoadCombinationsInput {
    fn check(&self, _ctx: &EngineContext) -> Vec<FieldError> {
        self.loads.validate()
    }
}

pub(crate) fn dead_loads(ctx: &EngineContext, input: &DeadLoadsInput) -> EngineResult<Outcome> {
    let r = ctx.load_calculator().calculate_dead_loads(&input.elements)?;
    let custom = r
        .elements
        .iter()
        .filter(|e| e.source == crate::loads::UnitLoadSource::Custom)
        .count();
    Ok(Outcome::new(&r)?
        .recommend_if(
            custom > 0,
            format!("{} element(s) use custom unit loads; confirm against manufacturer data", custom),
        )
        .standards(&[LOADS_STANDARD, "SBC 301:2018 Chapter 3 - Dead loads"]))
}

pub(crate) fn live_loads(ctx: &EngineContext, input: &LiveLoadsInput) -> EngineResult<Outcome> {
    let r = ctx.load_calculator().calculate_live_loads(&input.areas)?;
    Ok(Outcome::new(&r)?.standards(&[LOADS_STANDARD, "SBC 301:2018 Table 4.3-1 - Minimum live loads"]))
}

pub(crate) fn wind_loads(ctx: &EngineContext, input: &WindLoadInput) -> EngineResult<Outcome> {
    let r = ctx.load_calculator().calculate_wind_loads(input)?;
    Ok(Outcome::new(&r)?
        .recommend_if(
            input.height_m > 60.0,
            "Building exceeds 60 m; a dynamic wind analysis or wind tunnel study is advised",
        )
        .standards(&[LOADS_STANDARD, "SBC 301:2018 Chapter 26-27 - Wind loads"]))
}

pub(crate) fn seismic_loads(ctx: &EngineContext, input: &SeismicLoadInput) -> EngineResult<Outcome> {
    let r = ctx.load_calculator().calculate_seismic_loads(input)?;
    Ok(Outcome::new(&r)?
        .check(
            "base_shear_cap",
            ComplianceCheck::flag(
                !r.capped,
                format!(
                    "Cs = {:.4} (uncapped {:.4}, policy ceiling {:.2})",
                    r.seismic_coefficient, r.uncapped_coefficient, ctx.config.design.max_base_shear_coefficient
                ),
            ),
        )
        .recommend_if(
            r.capped,
            "Seismic coefficient reached the policy ceiling; a site-specific seismic study is required",
        )
        .standards(&[LOADS_STANDARD, "SBC 301:2018 Chapter 12 - Seismic design"]))
}

pub(crate) fn load_combinations(ctx: &EngineContext, input: &LoadCombinationsInput) -> EngineResult<Outcome> {
    let r = ctx
        .load_calculator()
        .calculate_load_combinations(&input.loads, input.limit_state)?;
    Ok(Outcome::new(&r)?
        .recommend(format!(
            "Design for {} ({} = {:.2})",
            r.governing.name, r.governing.equation, r.governing.value
        ))
        .recommend_if(
            r.minimum.value < 0.0,
            format!("{} produces net uplift; check anchorage and overturning", r.minimum.name),
        )
        .standards(&[LOADS_STANDARD, "SBC 301:2018 Section 2.3 - Load combinations"]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::test_support::context;
    use crate::calculations::civil::CivilCalculator;
    use crate::calculations::Calculator;
    use serde_json::json;

    #[test]
    fn test_governing_combination_through_calculator() {
        let calc = CivilCalculator::new(context());
        let result = calc
            .calculate(
                "load-combinations",
                &json!({"loads": {"dead": 100, "live": 50, "wind": 30}}),
                &Default::default(),
            )
            .unwrap();
        assert_eq!(result.value("governing.name").unwrap(), "ULS-3");
        assert!((result.number("governing.value").unwrap() - 218.0).abs() < 1e-9);
        assert_eq!(result.value("limit_state").unwrap(), "strength");
    }

    #[test]
    fn test_serviceability_by_alias() {
        let calc = CivilCalculator::new(context());
        let result = calc
            .calculate(
                "load-combinations",
                &json!({"loads": {"dead": 100, "live": 50}, "limit_state": "sls"}),
                &Default::default(),
            )
            .unwrap();
        assert_eq!(result.value("governing.name").unwrap(), "SLS-1");
    }

    #[test]
    fn test_dead_loads_validation_report() {
        let calc = CivilCalculator::new(context());
        let report = calc
            .validate_inputs(
                "dead-loads",
                &json!({"elements": [{"name": "x", "key": "unknown_key", "area_m2": 5}]}),
            )
            .unwrap();
        assert!(!report.is_valid);
        assert_eq!(report.errors[0].field, "elements[0].custom_unit_load_kpa");
    }

    #[test]
    fn test_seismic_cap_check() {
        let calc = CivilCalculator::new(context());
        let result = calc
            .calculate(
                "seismic-loads",
                &json!({
                    "zone": "2A", "soil_class": "C", "importance_category": "II",
                    "structural_system": "rc_shear_wall", "seismic_weight_kn": 10000
                }),
                &Default::default(),
            )
            .unwrap();
        assert!(result.compliance["base_shear_cap"].passed);
        assert!((result.number("base_shear_kn").unwrap() - 360.0).abs() < 1e-9);
    }

    #[test]
    fn test_wind_route_missing_field() {
        let calc = CivilCalculator::new(context());
        let report = calc
            .validate_inputs("wind-loads", &json!({"terrain_category": "C", "building_type": "low_rise"}))
            .unwrap();
        assert!(!report.is_valid);
        assert_eq!(report.errors[0].field, "height_m");
    }
}
