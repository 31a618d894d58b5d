//! Horizontal structured cabling quantities.

use serde::{Deserialize, Serialize};

use crate::calculations::{count_product, whole_count, ComplianceCheck, InputRecord, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineError, EngineResult, FieldError};
use crate::validation::FieldChecks;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredCablingInput {
    pub outlets: u32,
    #[serde(default = "default_ports")]
    pub ports_per_outlet: u32,
    pub average_run_m: f64,
    /// Longest run, checked against the permanent link limit
    #[serde(default)]
    pub max_run_m: Option<f64>,
    #[serde(default = "default_slack")]
    pub slack_percent: f64,
}

fn default_ports() -> u32 {
    2
}

fn default_slack() -> f64 {
    10.0
}

impl InputRecord for StructuredCablingInput {
    fn check(&self, _ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks
            .require(self.outlets > 0, "outlets", "must be at least 1")
            .require(self.ports_per_outlet > 0, "ports_per_outlet", "must be at least 1")
            .positive("average_run_m", self.average_run_m)
            .positive_opt("max_run_m", self.max_run_m)
            .in_range("slack_percent", self.slack_percent, 0.0, 50.0);
        if let Some(max) = self.max_run_m {
            checks.require(max >= self.average_run_m, "max_run_m", "must not be below average_run_m");
        }
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredCablingResult {
    pub cable_runs: u32,
    pub run_length_m: f64,
    pub total_cable_m: f64,
    pub runs_per_box: u32,
    pub cable_boxes: u32,
    pub patch_panels: u32,
    pub longest_run_m: f64,
    pub max_permanent_link_m: f64,
}

pub fn quantities(ctx: &EngineContext, input: &StructuredCablingInput) -> EngineResult<StructuredCablingResult> {
    let tables = &ctx.data.elv;
    let runs = count_product(input.outlets, input.ports_per_outlet, "cable runs")?;
    let run_length = input.average_run_m * (1.0 + input.slack_percent / 100.0);
    // Runs are never spliced, so each box yields whole runs only
    let per_box = whole_count((tables.cable_box_length_m / run_length).floor(), "runs per box")?;
    if per_box == 0 {
        return Err(EngineError::calculation(format!(
            "a {:.0} m run with slack exceeds a {:.0} m cable box",
            run_length, tables.cable_box_length_m
        )));
    }
    Ok(StructuredCablingResult {
        cable_runs: runs,
        run_length_m: run_length,
        total_cable_m: run_length * f64::from(runs),
        runs_per_box: per_box,
        cable_boxes: runs.div_ceil(per_box),
        patch_panels: runs.div_ceil(tables.patch_panel_ports),
        longest_run_m: input.max_run_m.unwrap_or(input.average_run_m),
        max_permanent_link_m: tables.max_permanent_link_m,
    })
}

pub(crate) fn calculate(ctx: &EngineContext, input: &StructuredCablingInput) -> EngineResult<Outcome> {
    let r = quantities(ctx, input)?;
    Ok(Outcome::new(&r)?
        .check(
            "permanent_link",
            ComplianceCheck::ratio(
                r.longest_run_m / r.max_permanent_link_m,
                format!("longest run {:.0} m vs {:.0} m permanent link", r.longest_run_m, r.max_permanent_link_m),
            ),
        )
        .recommend(format!(
            "{} boxes of cable, {} x {}-port patch panels",
            r.cable_boxes, r.patch_panels, ctx.data.elv.patch_panel_ports
        ))
        .recommend_if(
            r.longest_run_m > r.max_permanent_link_m,
            "Runs exceed the permanent link limit; add a floor distributor closer to the outlets",
        )
        .standards(&["ISO/IEC 11801-1 - Generic cabling for customer premises", "TIA-568.2-D"]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::test_support::context;
    use serde_json::json;

    #[test]
    fn test_boxes_and_panels() {
        let ctx = context();
        let input: StructuredCablingInput =
            serde_json::from_value(json!({"outlets": 50, "average_run_m": 40})).unwrap();
        let r = quantities(&ctx, &input).unwrap();
        // 100 runs of 44 m, 6 runs per 305 m box
        assert_eq!(r.cable_runs, 100);
        assert_eq!(r.runs_per_box, 6);
        assert_eq!(r.cable_boxes, 17);
        assert_eq!(r.patch_panels, 5);
        assert!((r.total_cable_m - 4400.0).abs() < 1e-9);
    }

    #[test]
    fn test_long_run_fails_link_check() {
        let ctx = context();
        let calc = crate::calculations::ElvCalculator::new(ctx);
        use crate::calculations::Calculator;
        let result = calc
            .calculate(
                "structured-cabling",
                &json!({"outlets": 10, "average_run_m": 60, "max_run_m": 95}),
                &Default::default(),
            )
            .unwrap();
        assert!(!result.compliance["permanent_link"].passed);
    }

    #[test]
    fn test_run_count_overflow_is_an_error() {
        let ctx = context();
        let input: StructuredCablingInput = serde_json::from_value(json!({
            "outlets": 100_000, "ports_per_outlet": 100_000, "average_run_m": 40
        }))
        .unwrap();
        assert!(input.check(&ctx).is_empty());
        let err = quantities(&ctx, &input).unwrap_err();
        assert_eq!(err.error_code(), "CALCULATION_ERROR");
        assert!(err.to_string().contains("cable runs"));
    }
}
