//! OSHA 29 CFR 1926 construction safety rule set.
//!
//! Rules read site context from the request inputs alongside the design
//! values: `work_height_m`, `fall_protection`, `excavation_depth_m` /
//! `trench_depth_m`, `engineer_designed`, `risk_likelihood`,
//! `risk_severity`.

use super::{ComplianceEvaluator, EvaluationContext, Rule, Severity};
use crate::calculations::Discipline;
use crate::safety::{
    excavation_protection_required, excavation_requires_engineer, fall_protection_required,
    minimum_approach_distance_m, RiskLevel, RiskMatrix, VoltageBand,
};

const OSHA_FALL: &str = "OSHA 29 CFR 1926.501 - Duty to have fall protection";
const OSHA_EXCAVATION: &str = "OSHA 29 CFR 1926.652 - Requirements for protective systems";
const OSHA_CONFINED: &str = "OSHA 29 CFR 1926.1203 - Confined spaces in construction";
const OSHA_ELECTRICAL: &str = "OSHA 29 CFR 1926.960 - Working on or near exposed energized parts";
const OSHA_RISK: &str = "OSHA 29 CFR 1926.20 - General safety and health provisions";

/// Prospective fault current above which arc-flash PPE assessment is required
const ARC_FLASH_FAULT_KA: f64 = 10.0;

fn fall_protection(ctx: &EvaluationContext<'_>) -> Option<(Severity, String)> {
    let height = ctx.input("work_height_m")?;
    if !fall_protection_required(height) || ctx.input_flag("fall_protection") {
        return None;
    }
    Some((
        Severity::Blocking,
        format!("work at {:.1} m requires guardrails, safety nets or personal fall arrest", height),
    ))
}

/// Depth of the excavation implied by the request, if any
fn excavation_depth(ctx: &EvaluationContext<'_>) -> Option<f64> {
    ctx.input("excavation_depth_m")
        .or_else(|| ctx.input("trench_depth_m"))
        .or_else(|| match (ctx.discipline, ctx.calculation_type) {
            (Discipline::Civil, "foundation-design") => ctx.input("founding_depth_m"),
            (Discipline::Sewerage, "septic-tank") => ctx.result("overall_depth_m"),
            _ => None,
        })
}

fn excavation(ctx: &EvaluationContext<'_>) -> Option<(Severity, String)> {
    let depth = excavation_depth(ctx)?;
    if excavation_requires_engineer(depth) && !ctx.input_flag("engineer_designed") {
        Some((
            Severity::Blocking,
            format!("{:.1} m excavation needs a protective system designed by a registered engineer", depth),
        ))
    } else if excavation_protection_required(depth) {
        Some((
            Severity::Advisory,
            format!("{:.1} m excavation needs sloping, benching, shoring or a trench shield", depth),
        ))
    } else {
        None
    }
}

fn confined_space(_ctx: &EvaluationContext<'_>) -> Option<(Severity, String)> {
    Some((
        Severity::Advisory,
        "septic tank entry is permit-required confined space work; test the atmosphere before entry".to_string(),
    ))
}

fn energized_parts(ctx: &EvaluationContext<'_>) -> Option<(Severity, String)> {
    let volts = ctx.input("voltage_v").or_else(|| ctx.input("secondary_voltage_v"))?;
    match VoltageBand::classify(volts) {
        VoltageBand::High => Some((
            Severity::Advisory,
            format!(
                "{:.0} V is {}; keep unqualified persons {:.2} m from exposed parts",
                volts,
                VoltageBand::High,
                minimum_approach_distance_m(volts)
            ),
        )),
        _ => None,
    }
}

fn arc_flash(ctx: &EvaluationContext<'_>) -> Option<(Severity, String)> {
    let fault = ctx.result("fault_current_ka")?;
    (fault > ARC_FLASH_FAULT_KA).then(|| {
        (
            Severity::Advisory,
            format!("{:.1} kA prospective fault current; carry out an arc-flash assessment", fault),
        )
    })
}

fn risk_rating(ctx: &EvaluationContext<'_>) -> Option<(Severity, String)> {
    let likelihood = ctx.input("risk_likelihood")?;
    let severity = ctx.input("risk_severity")?;
    let matrix = match RiskMatrix::new(likelihood as u8, severity as u8) {
        Ok(m) if likelihood.fract() == 0.0 && severity.fract() == 0.0 => m,
        _ => {
            return Some((
                Severity::Advisory,
                "risk rating ignored; likelihood and severity must be whole numbers 1 to 5".to_string(),
            ))
        }
    };
    let level = matrix.level();
    match level {
        RiskLevel::Extreme => Some((
            Severity::Blocking,
            format!("residual risk {} ({}); work must not start", level, matrix.score()),
        )),
        RiskLevel::High => Some((
            Severity::Advisory,
            format!("residual risk {} ({}); senior approval and added controls needed", level, matrix.score()),
        )),
        _ => None,
    }
}

static RULES: &[Rule] = &[
    Rule::custom(None, "*", "fall_protection", OSHA_FALL, fall_protection),
    Rule::custom(None, "*", "excavation", OSHA_EXCAVATION, excavation),
    Rule::custom(None, "*", "risk_rating", OSHA_RISK, risk_rating),
    Rule::custom(Some(Discipline::Sewerage), "septic-tank", "confined_space", OSHA_CONFINED, confined_space),
    Rule::custom(Some(Discipline::Electrical), "*", "energized_parts", OSHA_ELECTRICAL, energized_parts),
    Rule::custom(Some(Discipline::Electrical), "short-circuit", "arc_flash", OSHA_ELECTRICAL, arc_flash),
];

/// OSHA construction safety
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyRegulation;

impl ComplianceEvaluator for SafetyRegulation {
    fn name(&self) -> &'static str {
        "safety-regulation"
    }

    fn rules(&self) -> &'static [Rule] {
        RULES
    }

    fn documentation_fields(&self) -> &'static [&'static str] {
        &["risk_assessment", "method_statement"]
    }
}
