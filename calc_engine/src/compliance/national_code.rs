//! Saudi Building Code rule set.

use super::{ComplianceEvaluator, EvaluationContext, Rule, Severity};
use crate::calculations::Discipline::{Civil, Electrical, Elv, Hvac, Sewerage};

const SBC_304_BEAMS: &str = "SBC 304:2018 Chapter 9 - Beams";
const SBC_304_DEFLECTION: &str = "SBC 304:2018 Table 24.2.2 - Maximum permissible deflections";
const SBC_304_COLUMNS: &str = "SBC 304:2018 Chapter 10 - Columns";
const SBC_304_FOOTINGS: &str = "SBC 304:2018 Chapter 13 - Foundations";
const SBC_304_SLABS: &str = "SBC 304:2018 Chapters 7 and 8 - Slabs";
const SBC_304_COVER: &str = "SBC 304:2018 Table 20.5.1.3.1 - Specified concrete cover";
const SBC_303: &str = "SBC 303:2018 - Soils and foundations";
const SBC_301: &str = "SBC 301:2018 - Loads and forces";
const SBC_401: &str = "SBC 401:2018 - Electrical requirements";
const SBC_601: &str = "SBC 601:2018 - Energy conservation, non-residential";
const SBC_501: &str = "SBC 501:2018 - Mechanical";
const SBC_701: &str = "SBC 701:2018 - Sanitary";
const SBC_702: &str = "SBC 702:2018 - Private sewage disposal";
const SBC_801: &str = "SBC 801:2018 - Fire protection";

/// Minimum cover for cast-in-place members not exposed to weather or earth
const MIN_INTERIOR_COVER_MM: f64 = 40.0;
const MIN_SPECIAL_FRAME_COLUMN_MM: f64 = 300.0;
const MIN_FOUNDING_DEPTH_M: f64 = 0.6;

fn beam_cover(ctx: &EvaluationContext<'_>) -> Option<(Severity, String)> {
    let cover = ctx.input("cover_mm")?;
    (cover < MIN_INTERIOR_COVER_MM).then(|| {
        (
            Severity::Advisory,
            format!("cover {:.0} mm is below {:.0} mm for interior members", cover, MIN_INTERIOR_COVER_MM),
        )
    })
}

fn column_dimension(ctx: &EvaluationContext<'_>) -> Option<(Severity, String)> {
    let least = ctx.input("width_mm")?.min(ctx.input("depth_mm")?);
    (least < MIN_SPECIAL_FRAME_COLUMN_MM).then(|| {
        (
            Severity::Advisory,
            format!(
                "least dimension {:.0} mm is below {:.0} mm required in special moment frames",
                least, MIN_SPECIAL_FRAME_COLUMN_MM
            ),
        )
    })
}

fn founding_depth(ctx: &EvaluationContext<'_>) -> Option<(Severity, String)> {
    let depth = ctx.input("founding_depth_m")?;
    (depth < MIN_FOUNDING_DEPTH_M).then(|| {
        (
            Severity::Advisory,
            format!("founding depth {:.2} m is shallower than {:.1} m", depth, MIN_FOUNDING_DEPTH_M),
        )
    })
}

static RULES: &[Rule] = &[
    Rule::ratio(Civil, "beam-analysis", "bending", SBC_304_BEAMS),
    Rule::ratio(Civil, "beam-analysis", "shear", SBC_304_BEAMS),
    Rule::ratio(Civil, "beam-analysis", "deflection", SBC_304_DEFLECTION),
    Rule::flag(Civil, "beam-analysis", "minimum_depth", Severity::Blocking, SBC_304_BEAMS),
    Rule::custom(Some(Civil), "beam-analysis", "beam_cover", SBC_304_COVER, beam_cover),
    Rule::ratio(Civil, "column-design", "axial", SBC_304_COLUMNS),
    Rule::flag(Civil, "column-design", "steel_ratio", Severity::Blocking, SBC_304_COLUMNS),
    Rule::ratio(Civil, "column-design", "slenderness", SBC_304_COLUMNS),
    Rule::custom(Some(Civil), "column-design", "column_dimension", SBC_304_COLUMNS, column_dimension),
    Rule::ratio(Civil, "foundation-design", "bearing", SBC_303),
    Rule::ratio(Civil, "foundation-design", "punching_shear", SBC_304_FOOTINGS),
    Rule::custom(Some(Civil), "foundation-design", "founding_depth", SBC_303, founding_depth),
    Rule::flag(Civil, "slab-design", "minimum_thickness", Severity::Blocking, SBC_304_SLABS),
    Rule::ratio(Civil, "slab-design", "bending", SBC_304_SLABS),
    Rule::flag(Civil, "seismic-loads", "base_shear_cap", Severity::Advisory, SBC_301),
    Rule::ratio(Electrical, "cable-sizing", "ampacity", SBC_401),
    Rule::ratio(Electrical, "cable-sizing", "voltage_drop", SBC_401),
    Rule::flag(Electrical, "cable-sizing", "protection_coordination", Severity::Blocking, SBC_401),
    Rule::ratio(Electrical, "voltage-drop", "voltage_drop", SBC_401),
    Rule::ratio(Electrical, "maximum-demand", "transformer_loading", SBC_401),
    Rule::ratio(Electrical, "short-circuit", "breaking_capacity", SBC_401),
    Rule::ratio(Electrical, "lighting-design", "lighting_power_density", SBC_601),
    Rule::ratio(Hvac, "cooling-load", "wall_u_value", SBC_601),
    Rule::ratio(Hvac, "cooling-load", "roof_u_value", SBC_601),
    Rule::ratio(Hvac, "ventilation-rate", "outdoor_air", SBC_501),
    Rule::ratio(Sewerage, "pipe-sizing", "velocity_maximum", SBC_701),
    Rule::flag(Sewerage, "pipe-sizing", "velocity_minimum", Severity::Blocking, SBC_701),
    Rule::ratio(Sewerage, "pipe-sizing", "depth_ratio", SBC_701),
    Rule::ratio(Sewerage, "storm-drainage", "velocity_maximum", SBC_701),
    Rule::flag(Sewerage, "storm-drainage", "velocity_minimum", Severity::Blocking, SBC_701),
    Rule::ratio(Sewerage, "storm-drainage", "depth_ratio", SBC_701),
    Rule::ratio(Sewerage, "septic-tank", "volume", SBC_702),
    Rule::ratio(Sewerage, "fixture-units", "drain_capacity", SBC_701),
    Rule::ratio(Elv, "fire-alarm-battery", "battery_capacity", SBC_801),
    Rule::flag(Elv, "detector-coverage", "ceiling_height", Severity::Blocking, SBC_801),
    Rule::ratio(Elv, "power-budget", "ups_loading", SBC_401),
];

/// Saudi Building Code (SBC 201-801)
#[derive(Debug, Clone, Copy, Default)]
pub struct NationalCode;

impl ComplianceEvaluator for NationalCode {
    fn name(&self) -> &'static str {
        "national-code"
    }

    fn rules(&self) -> &'static [Rule] {
        RULES
    }

    fn documentation_fields(&self) -> &'static [&'static str] {
        &["design_basis", "approved_drawings"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::{ComplianceCheck, Discipline};
    use crate::compliance::test_support::result_with;
    use crate::compliance::Subject;
    use crate::config::EngineConfig;
    use serde_json::json;

    #[test]
    fn test_deflection_over_limit_blocks() {
        let result = result_with(
            Discipline::Civil,
            "beam-analysis",
            json!({}),
            &[("deflection", ComplianceCheck::ratio(1.12, "δ over"))],
        );
        let v = NationalCode.check(&Subject::of(&result), &EngineConfig::default(), None).unwrap();
        assert!(!v.passed);
        assert_eq!(v.blocking_count(), 1);
        assert_eq!(v.findings[0].rule, "deflection");
        assert_eq!(v.findings[0].reference, SBC_304_DEFLECTION);
    }

    #[test]
    fn test_low_ratio_has_no_findings() {
        let result = result_with(
            Discipline::Civil,
            "beam-analysis",
            json!({"cover_mm": 40, "design_basis": "DBR-01", "approved_drawings": "S-101"}),
            &[
                ("bending", ComplianceCheck::ratio(0.6, "ok")),
                ("deflection", ComplianceCheck::ratio(0.3, "ok")),
                ("minimum_depth", ComplianceCheck::flag(true, "ok")),
            ],
        );
        let v = NationalCode.check(&Subject::of(&result), &EngineConfig::default(), None).unwrap();
        assert!(v.passed);
        assert!(v.notes.is_empty());
        assert!(v.missing_documentation.is_empty());
        // worst ratio 0.6 costs 4 points
        assert_eq!(v.score, 96.0);
    }

    #[test]
    fn test_failed_flag_blocks() {
        let result = result_with(
            Discipline::Sewerage,
            "pipe-sizing",
            json!({}),
            &[("velocity_minimum", ComplianceCheck::flag(false, "0.45 m/s below 0.6 m/s"))],
        );
        let v = NationalCode.check(&Subject::of(&result), &EngineConfig::default(), None).unwrap();
        assert!(!v.passed);
        assert!(v.notes[0].contains("0.45 m/s"));
    }

    #[test]
    fn test_raw_input_rules() {
        let result = result_with(
            Discipline::Civil,
            "column-design",
            json!({"width_mm": 250, "depth_mm": 400}),
            &[],
        );
        let v = NationalCode.check(&Subject::of(&result), &EngineConfig::default(), None).unwrap();
        assert!(v.passed);
        assert_eq!(v.advisory_count(), 1);
        assert_eq!(v.findings[0].rule, "column_dimension");
    }

    #[test]
    fn test_pair_without_rules_passes_clean() {
        let result = result_with(Discipline::Civil, "concrete-quantity", json!({}), &[]);
        let v = NationalCode.check(&Subject::of(&result), &EngineConfig::default(), None).unwrap();
        assert!(v.passed);
        assert!(v.notes.is_empty());
        assert!(v.applicable_references.is_empty());
        // only the documentation term applies
        assert_eq!(v.score, 80.0);
    }
}
