//! # Reinforced Concrete Beam Analysis
//!
//! Rectangular RC beam under a uniform load, checked for bending, shear,
//! deflection and minimum depth.
//!
//! ## Method
//!
//! - Self-weight `25 kN/m³ × b × h` (optional)
//! - Factored load `w_u = 1.2·w_sw + 1.6·q`; service load `w_sw + q`
//! - Moment, shear and deflection coefficients per support type
//! - `E_c` from the Material Database, effective inertia `k·I_g` with `k`
//!   the configured cracked-inertia factor
//! - Bending utilisation against φM_n at the tension-controlled limit
//! - Shear utilisation against `φ(V_c + V_s,max)`, `V_c = 0.17√f'c·b·d`,
//!   `V_s,max = 0.66√f'c·b·d`
//!
//! ## Example
//!
//! ```json
//! {
//!   "width_mm": 300,
//!   "depth_mm": 600,
//!   "span_m": 5.0,
//!   "concrete_grade": "C30",
//!   "uniform_load_kn_m": 25.0,
//!   "support_type": "simply_supported"
//! }
//! ```

use serde::{Deserialize, Serialize};

use super::{
    check_concrete_grade, check_steel_grade, default_steel_grade, default_true, steel_yield,
    Concrete, CONCRETE_UNIT_WEIGHT_KN_M3, PHI_SHEAR, TENSION_CONTROLLED_DEPTH_RATIO,
};
use crate::calculations::{ComplianceCheck, InputRecord, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineResult, FieldError};
use crate::validation::FieldChecks;

/// Stirrup plus half the main bar diameter, between cover and bar centroid
const STIRRUP_AND_HALF_BAR_MM: f64 = 20.0;

/// Beam end conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportType {
    #[default]
    #[serde(alias = "simple", alias = "simply-supported")]
    SimplySupported,
    #[serde(alias = "fixed")]
    Continuous,
    Cantilever,
}

/// Analysis coefficients for a uniformly loaded span
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanCoefficients {
    /// `M = w L² / moment_divisor`
    pub moment_divisor: f64,
    /// `V = shear_factor · w L`
    pub shear_factor: f64,
    /// `δ = deflection_factor · w L⁴ / (E I)`
    pub deflection_factor: f64,
    /// `h_min = L / min_depth_divisor`
    pub min_depth_divisor: f64,
}

impl SupportType {
    pub fn coefficients(&self) -> SpanCoefficients {
        match self {
            SupportType::SimplySupported => SpanCoefficients {
                moment_divisor: 8.0,
                shear_factor: 0.5,
                deflection_factor: 5.0 / 384.0,
                min_depth_divisor: 16.0,
            },
            SupportType::Continuous => SpanCoefficients {
                moment_divisor: 10.0,
                shear_factor: 0.6,
                deflection_factor: 2.0 / 384.0,
                min_depth_divisor: 21.0,
            },
            SupportType::Cantilever => SpanCoefficients {
                moment_divisor: 2.0,
                shear_factor: 1.0,
                deflection_factor: 1.0 / 8.0,
                min_depth_divisor: 8.0,
            },
        }
    }
}

/// Input parameters for `beam-analysis`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamAnalysisInput {
    pub width_mm: f64,
    /// Overall depth h
    pub depth_mm: f64,
    pub span_m: f64,
    pub concrete_grade: String,
    /// Superimposed service load (dead + live), excluding self-weight
    pub uniform_load_kn_m: f64,
    #[serde(default = "default_steel_grade")]
    pub steel_grade: String,
    #[serde(default)]
    pub support_type: SupportType,
    #[serde(default = "default_cover")]
    pub cover_mm: f64,
    #[serde(default = "default_true")]
    pub include_self_weight: bool,
    /// Deflection limit as a span divisor (L/limit); configured default when absent
    #[serde(default)]
    pub deflection_limit: Option<f64>,
}

fn default_cover() -> f64 {
    40.0
}

impl InputRecord for BeamAnalysisInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks
            .positive("width_mm", self.width_mm)
            .positive("depth_mm", self.depth_mm)
            .positive("span_m", self.span_m)
            .non_negative("uniform_load_kn_m", self.uniform_load_kn_m)
            .in_range("cover_mm", self.cover_mm, 15.0, 100.0)
            .positive_opt("deflection_limit", self.deflection_limit);
        if self.depth_mm.is_finite() && self.cover_mm.is_finite() {
            checks.require(
                self.depth_mm > self.cover_mm + STIRRUP_AND_HALF_BAR_MM,
                "depth_mm",
                format!("must exceed cover plus {} mm", STIRRUP_AND_HALF_BAR_MM),
            );
        }
        check_concrete_grade(&mut checks, ctx, "concrete_grade", &self.concrete_grade);
        check_steel_grade(&mut checks, ctx, "steel_grade", &self.steel_grade);
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeamAnalysisResult {
    pub support_type: SupportType,
    pub self_weight_kn_m: f64,
    pub factored_load_kn_m: f64,
    pub service_load_kn_m: f64,
    pub max_moment_knm: f64,
    pub max_shear_kn: f64,
    pub effective_depth_mm: f64,
    pub elastic_modulus_mpa: f64,
    pub gross_inertia_mm4: f64,
    pub effective_inertia_mm4: f64,
    pub deflection_mm: f64,
    pub allowable_deflection_mm: f64,
    pub moment_capacity_knm: f64,
    pub concrete_shear_kn: f64,
    pub shear_capacity_kn: f64,
    pub required_steel_mm2: f64,
    pub minimum_steel_mm2: f64,
    /// False when the factored moment exceeds a singly reinforced section
    pub singly_reinforced_adequate: bool,
    pub stirrups_required: bool,
    pub minimum_depth_mm: f64,
    pub bending_ratio: f64,
    pub shear_ratio: f64,
    pub deflection_ratio: f64,
}

impl BeamAnalysisResult {
    pub fn passes(&self) -> bool {
        self.bending_ratio <= 1.0 && self.shear_ratio <= 1.0 && self.deflection_ratio <= 1.0
    }

    pub fn governing_ratio(&self) -> f64 {
        self.bending_ratio.max(self.shear_ratio).max(self.deflection_ratio)
    }
}

/// Analyse a beam.
pub fn analyse(ctx: &EngineContext, input: &BeamAnalysisInput) -> EngineResult<BeamAnalysisResult> {
    let concrete = Concrete::lookup(ctx, &input.concrete_grade)?;
    let fy = steel_yield(ctx, &input.steel_grade)?;
    let design = &ctx.config.design;
    let k = input.support_type.coefficients();

    let b = input.width_mm;
    let h = input.depth_mm;
    let span = input.span_m;
    let span_mm = span * 1000.0;
    let d = h - input.cover_mm - STIRRUP_AND_HALF_BAR_MM;

    let self_weight = if input.include_self_weight {
        CONCRETE_UNIT_WEIGHT_KN_M3 * (b / 1000.0) * (h / 1000.0)
    } else {
        0.0
    };
    let w_u = 1.2 * self_weight + 1.6 * input.uniform_load_kn_m;
    let w_s = self_weight + input.uniform_load_kn_m;

    let mu = w_u * span * span / k.moment_divisor;
    let vu = k.shear_factor * w_u * span;

    // kN/m is N/mm
    let gross_inertia = b * h.powi(3) / 12.0;
    let effective_inertia = design.cracked_inertia_factor * gross_inertia;
    let deflection =
        k.deflection_factor * w_s * span_mm.powi(4) / (concrete.elastic_modulus_mpa * effective_inertia);
    let limit = input.deflection_limit.unwrap_or(design.deflection_limit_divisor);
    let allowable_deflection = span_mm / limit;

    let moment_capacity = concrete.max_flexural_capacity_nmm(b, d) / 1e6;
    let minimum_steel = concrete.minimum_steel_ratio(fy) * b * d;
    let (required_steel, adequate) = match concrete.required_steel_ratio(mu * 1e6, fy, b, d) {
        Some(rho) => ((rho * b * d).max(minimum_steel), true),
        None => {
            // Report the tension-controlled maximum the section can carry
            let a = concrete.beta1() * TENSION_CONTROLLED_DEPTH_RATIO * d;
            (0.85 * concrete.fck_mpa * b * a / fy, false)
        }
    };

    let vc = 0.17 * concrete.sqrt_fc() * b * d / 1000.0;
    let vs_max = 0.66 * concrete.sqrt_fc() * b * d / 1000.0;
    let shear_capacity = PHI_SHEAR * (vc + vs_max);

    Ok(BeamAnalysisResult {
        support_type: input.support_type,
        self_weight_kn_m: self_weight,
        factored_load_kn_m: w_u,
        service_load_kn_m: w_s,
        max_moment_knm: mu,
        max_shear_kn: vu,
        effective_depth_mm: d,
        elastic_modulus_mpa: concrete.elastic_modulus_mpa,
        gross_inertia_mm4: gross_inertia,
        effective_inertia_mm4: effective_inertia,
        deflection_mm: deflection,
        allowable_deflection_mm: allowable_deflection,
        moment_capacity_knm: moment_capacity,
        concrete_shear_kn: vc,
        shear_capacity_kn: shear_capacity,
        required_steel_mm2: required_steel,
        minimum_steel_mm2: minimum_steel,
        singly_reinforced_adequate: adequate,
        stirrups_required: vu > 0.5 * PHI_SHEAR * vc,
        minimum_depth_mm: span_mm / k.min_depth_divisor,
        bending_ratio: mu / moment_capacity,
        shear_ratio: vu / shear_capacity,
        deflection_ratio: deflection / allowable_deflection,
    })
}

pub(crate) fn calculate(ctx: &EngineContext, input: &BeamAnalysisInput) -> EngineResult<Outcome> {
    let r = analyse(ctx, input)?;
    let depth_ok = input.depth_mm >= r.minimum_depth_mm;

    Ok(Outcome::new(&r)?
        .check(
            "bending",
            ComplianceCheck::ratio(
                r.bending_ratio,
                format!("Mu = {:.1} kNm vs φMn,max = {:.1} kNm", r.max_moment_knm, r.moment_capacity_knm),
            ),
        )
        .check(
            "shear",
            ComplianceCheck::ratio(
                r.shear_ratio,
                format!("Vu = {:.1} kN vs φ(Vc+Vs,max) = {:.1} kN", r.max_shear_kn, r.shear_capacity_kn),
            ),
        )
        .check(
            "deflection",
            ComplianceCheck::ratio(
                r.deflection_ratio,
                format!(
                    "δ = {:.2} mm vs allowable {:.2} mm",
                    r.deflection_mm, r.allowable_deflection_mm
                ),
            ),
        )
        .check(
            "minimum_depth",
            ComplianceCheck::flag(
                depth_ok,
                format!("h = {:.0} mm vs minimum {:.0} mm", input.depth_mm, r.minimum_depth_mm),
            ),
        )
        .recommend_if(
            !r.singly_reinforced_adequate,
            "Factored moment exceeds a singly reinforced section; increase depth or add compression steel",
        )
        .recommend_if(
            r.bending_ratio > 1.0 || r.deflection_ratio > 1.0,
            "Increase beam depth or concrete grade to reduce bending and deflection utilisation",
        )
        .recommend_if(r.shear_ratio > 1.0, "Increase beam width; shear exceeds the maximum stirrup capacity")
        .recommend_if(
            r.stirrups_required,
            format!("Provide shear links; Vu exceeds φVc/2 = {:.1} kN", 0.5 * PHI_SHEAR * r.concrete_shear_kn),
        )
        .recommend_if(
            r.passes() && depth_ok && r.governing_ratio() < 0.5,
            "Section is lightly utilised; a shallower beam may be more economical",
        )
        .standards(&[
            "SBC 304:2018 (ACI 318-19) Chapter 9 - Beams",
            "SBC 304:2018 Table 9.3.1.1 - Minimum beam depth",
            "SBC 304:2018 Table 24.2.2 - Maximum permissible deflections",
        ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::test_support::context;

    fn scenario() -> BeamAnalysisInput {
        serde_json::from_value(serde_json::json!({
            "width_mm": 300,
            "depth_mm": 600,
            "span_m": 5,
            "concrete_grade": "C30",
            "uniform_load_kn_m": 25
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let input = scenario();
        assert_eq!(input.steel_grade, "B500");
        assert_eq!(input.support_type, SupportType::SimplySupported);
        assert_eq!(input.cover_mm, 40.0);
        assert!(input.include_self_weight);
    }

    #[test]
    fn test_simply_supported_scenario() {
        let ctx = context();
        let r = analyse(&ctx, &scenario()).unwrap();

        // sw = 25 * 0.3 * 0.6 = 4.5 kN/m; wu = 1.2*4.5 + 1.6*25 = 45.4
        assert!((r.self_weight_kn_m - 4.5).abs() < 1e-9);
        assert!((r.factored_load_kn_m - 45.4).abs() < 1e-9);
        assert!((r.max_moment_knm - 141.875).abs() < 1e-9);
        assert!((r.max_shear_kn - 113.5).abs() < 1e-9);
        assert!((r.effective_depth_mm - 540.0).abs() < 1e-9);

        // δ = 5 * 29.5 * 5000^4 / (384 * 25743 * 0.5 * 5.4e9) ≈ 3.454 mm
        assert!((r.deflection_mm - 3.454).abs() < 0.01);
        assert!((r.allowable_deflection_mm - 20.0).abs() < 1e-9);
        assert!(r.deflection_ratio < 0.8);
        assert!(r.passes());
        assert!(r.stirrups_required);
    }

    #[test]
    fn test_flexural_capacity() {
        let ctx = context();
        let r = analyse(&ctx, &scenario()).unwrap();
        // β1 = 0.85 - 0.05*2/7; a = β1 * 0.375 * 540
        let beta1 = 0.85 - 0.05 * 2.0 / 7.0;
        let a = beta1 * 0.375 * 540.0;
        let expected = 0.9 * 0.85 * 30.0 * 300.0 * a * (540.0 - a / 2.0) / 1e6;
        assert!((r.moment_capacity_knm - expected).abs() < 1e-6);
        assert!(r.required_steel_mm2 > r.minimum_steel_mm2);
    }

    #[test]
    fn test_support_type_changes_moment() {
        let ctx = context();
        let mut input = scenario();
        input.support_type = SupportType::Cantilever;
        let cantilever = analyse(&ctx, &input).unwrap();
        assert!((cantilever.max_moment_knm - 45.4 * 25.0 / 2.0).abs() < 1e-9);
        assert!(cantilever.deflection_ratio > 1.0);
    }

    #[test]
    fn test_overloaded_beam_fails_deflection() {
        let ctx = context();
        let mut input = scenario();
        input.width_mm = 200.0;
        input.depth_mm = 300.0;
        input.span_m = 8.0;
        input.uniform_load_kn_m = 40.0;
        let outcome = calculate(&ctx, &input).unwrap();
        let result = outcome
            .finish(crate::calculations::Discipline::Civil, "beam-analysis", &serde_json::Value::Null)
            .unwrap();
        assert!(!result.compliance["deflection"].passed);
        assert!(!result.compliance["minimum_depth"].passed);
        assert!(result.ratio("deflection").unwrap() > 1.0);
        assert!(!result.recommendations.is_empty());
    }

    #[test]
    fn test_check_collects_all_errors() {
        let ctx = context();
        let mut input = scenario();
        input.width_mm = 0.0;
        input.concrete_grade = "C99".to_string();
        input.steel_grade = "mild".to_string();
        let fields: Vec<String> = input.check(&ctx).into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["width_mm", "concrete_grade", "steel_grade"]);
    }

    #[test]
    fn test_depth_must_exceed_cover() {
        let ctx = context();
        let mut input = scenario();
        input.depth_mm = 50.0;
        let errors = input.check(&ctx);
        assert_eq!(errors[0].field, "depth_mm");
    }
}
