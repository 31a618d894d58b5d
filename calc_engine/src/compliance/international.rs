//! International standards rule set: ACI 318, IEC 60364, ASHRAE, EN 752,
//! NFPA 72, ISO/IEC 11801, IEC 62040.

use super::{ComplianceEvaluator, EvaluationContext, Rule, Severity};
use crate::calculations::Discipline::{Civil, Electrical, Elv, Hvac, Sewerage};

const ACI_318: &str = "ACI 318-19 - Building code requirements for structural concrete";
const ACI_318_DEFLECTION: &str = "ACI 318-19 Table 24.2.2 - Maximum permissible computed deflections";
const IEC_60364_52: &str = "IEC 60364-5-52 - Selection and erection, wiring systems";
const IEC_60364_43: &str = "IEC 60364-4-43 - Protection against overcurrent";
const IEC_60909: &str = "IEC 60909-0 - Short-circuit currents in three-phase systems";
const EN_12464: &str = "EN 12464-1 - Lighting of indoor work places";
const ASHRAE_62_1: &str = "ASHRAE 62.1 - Ventilation for acceptable indoor air quality";
const ASHRAE_90_1: &str = "ASHRAE 90.1 - Energy standard for buildings";
const ASHRAE_FUNDAMENTALS: &str = "ASHRAE Handbook - Fundamentals, duct and pipe sizing";
const EN_752: &str = "EN 752 - Drain and sewer systems outside buildings";
const EN_12056: &str = "EN 12056-2 - Gravity drainage systems inside buildings";
const NFPA_72: &str = "NFPA 72 - National Fire Alarm and Signaling Code";
const ISO_11801: &str = "ISO/IEC 11801-1 - Generic cabling for customer premises";
const IEC_62040: &str = "IEC 62040-3 - Uninterruptible power systems";
const IEC_62676: &str = "IEC 62676-4 - Video surveillance systems, application guidelines";

/// Voltage drop above which IEC 60364-5-52 Annex G recommends justification
const IEC_MAX_DROP_PERCENT: f64 = 5.0;
/// Self-cleansing velocity for sewers flowing at least once a day
const SELF_CLEANSING_VELOCITY_M_S: f64 = 0.7;

fn voltage_drop_percent(ctx: &EvaluationContext<'_>) -> Option<(Severity, String)> {
    let drop = ctx.result("voltage_drop_percent")?;
    (drop > IEC_MAX_DROP_PERCENT).then(|| {
        (
            Severity::Advisory,
            format!("voltage drop {:.2} % exceeds the {:.0} % recommended maximum", drop, IEC_MAX_DROP_PERCENT),
        )
    })
}

fn self_cleansing(ctx: &EvaluationContext<'_>) -> Option<(Severity, String)> {
    let velocity = ctx.result("velocity_m_s")?;
    (velocity < SELF_CLEANSING_VELOCITY_M_S).then(|| {
        (
            Severity::Advisory,
            format!(
                "part-full velocity {:.2} m/s is below the {:.1} m/s self-cleansing velocity",
                velocity, SELF_CLEANSING_VELOCITY_M_S
            ),
        )
    })
}

static RULES: &[Rule] = &[
    Rule::ratio(Civil, "beam-analysis", "bending", ACI_318),
    Rule::ratio(Civil, "beam-analysis", "shear", ACI_318),
    Rule::ratio(Civil, "beam-analysis", "deflection", ACI_318_DEFLECTION),
    Rule::ratio(Civil, "column-design", "axial", ACI_318),
    Rule::ratio(Civil, "column-design", "slenderness", ACI_318),
    Rule::ratio(Civil, "foundation-design", "punching_shear", ACI_318),
    Rule::ratio(Civil, "slab-design", "bending", ACI_318),
    Rule::ratio(Electrical, "cable-sizing", "ampacity", IEC_60364_52),
    Rule::ratio(Electrical, "cable-sizing", "voltage_drop", IEC_60364_52),
    Rule::flag(Electrical, "cable-sizing", "protection_coordination", Severity::Blocking, IEC_60364_43),
    Rule::custom(Some(Electrical), "cable-sizing", "voltage_drop_percent", IEC_60364_52, voltage_drop_percent),
    Rule::ratio(Electrical, "voltage-drop", "voltage_drop", IEC_60364_52),
    Rule::custom(Some(Electrical), "voltage-drop", "voltage_drop_percent", IEC_60364_52, voltage_drop_percent),
    Rule::ratio(Electrical, "short-circuit", "breaking_capacity", IEC_60909),
    Rule::flag(Electrical, "lighting-design", "illuminance", Severity::Advisory, EN_12464),
    Rule::ratio(Hvac, "cooling-load", "wall_u_value", ASHRAE_90_1),
    Rule::ratio(Hvac, "cooling-load", "roof_u_value", ASHRAE_90_1),
    Rule::ratio(Hvac, "ventilation-rate", "outdoor_air", ASHRAE_62_1),
    Rule::ratio(Hvac, "duct-sizing", "velocity", ASHRAE_FUNDAMENTALS),
    Rule::ratio(Hvac, "chilled-water-pipe", "velocity", ASHRAE_FUNDAMENTALS),
    Rule::ratio(Sewerage, "pipe-sizing", "depth_ratio", EN_752),
    Rule::custom(Some(Sewerage), "pipe-sizing", "self_cleansing", EN_752, self_cleansing),
    Rule::ratio(Sewerage, "storm-drainage", "depth_ratio", EN_752),
    Rule::custom(Some(Sewerage), "storm-drainage", "self_cleansing", EN_752, self_cleansing),
    Rule::ratio(Sewerage, "fixture-units", "drain_capacity", EN_12056),
    Rule::ratio(Elv, "fire-alarm-battery", "battery_capacity", NFPA_72),
    Rule::flag(Elv, "detector-coverage", "ceiling_height", Severity::Blocking, NFPA_72),
    Rule::ratio(Elv, "structured-cabling", "permanent_link", ISO_11801),
    Rule::ratio(Elv, "power-budget", "ups_loading", IEC_62040),
    Rule::flag(Elv, "cctv-coverage", "camera_count", Severity::Advisory, IEC_62676),
    Rule::ratio(Elv, "cctv-coverage", "poe_budget", IEC_62676),
];

/// International standards, with ISO 9001 documentation scoring
#[derive(Debug, Clone, Copy, Default)]
pub struct InternationalStandard;

impl ComplianceEvaluator for InternationalStandard {
    fn name(&self) -> &'static str {
        "international-standard"
    }

    fn rules(&self) -> &'static [Rule] {
        RULES
    }

    fn documentation_fields(&self) -> &'static [&'static str] {
        &["calculation_reference", "quality_plan"]
    }
}
