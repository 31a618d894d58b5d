//! # Reinforced Concrete Column Design
//!
//! Tied rectangular column under factored axial load.
//!
//! `φP_n,max = 0.65 · 0.80 · (0.85 f'c (A_g − A_st) + f_y A_st)`
//!
//! When `steel_area_mm2` is omitted the required steel is solved from the
//! same expression and bounded below by 1 % of the gross area. Slenderness
//! `kL/r` uses `r = 0.3 h` about the weaker axis; above 22 the column is
//! slender and second-order effects must be considered.

use serde::{Deserialize, Serialize};

use super::{
    check_concrete_grade, check_steel_grade, default_steel_grade, steel_yield, Concrete,
    PHI_COMPRESSION_TIED,
};
use crate::calculations::{ComplianceCheck, InputRecord, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineResult, FieldError};
use crate::validation::FieldChecks;

/// Reduction for accidental eccentricity in tied columns
const TIED_ECCENTRICITY_FACTOR: f64 = 0.80;
pub const MIN_STEEL_RATIO: f64 = 0.01;
pub const MAX_STEEL_RATIO: f64 = 0.08;
/// kL/r limit for a short column in a non-sway frame
pub const SHORT_COLUMN_SLENDERNESS: f64 = 22.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDesignInput {
    pub width_mm: f64,
    pub depth_mm: f64,
    /// Unbraced length
    pub height_m: f64,
    pub concrete_grade: String,
    #[serde(default = "default_steel_grade")]
    pub steel_grade: String,
    /// Factored axial load
    pub axial_load_kn: f64,
    /// Provided longitudinal steel; designed when absent
    #[serde(default)]
    pub steel_area_mm2: Option<f64>,
    #[serde(default = "default_k")]
    pub effective_length_factor: f64,
}

fn default_k() -> f64 {
    1.0
}

impl InputRecord for ColumnDesignInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks
            .positive("width_mm", self.width_mm)
            .positive("depth_mm", self.depth_mm)
            .positive("height_m", self.height_m)
            .non_negative("axial_load_kn", self.axial_load_kn)
            .positive_opt("steel_area_mm2", self.steel_area_mm2)
            .in_range("effective_length_factor", self.effective_length_factor, 0.5, 2.5);
        check_concrete_grade(&mut checks, ctx, "concrete_grade", &self.concrete_grade);
        check_steel_grade(&mut checks, ctx, "steel_grade", &self.steel_grade);
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDesignResult {
    pub gross_area_mm2: f64,
    pub required_steel_mm2: f64,
    pub steel_area_mm2: f64,
    pub steel_ratio_percent: f64,
    pub axial_capacity_kn: f64,
    pub axial_ratio: f64,
    pub radius_of_gyration_mm: f64,
    pub slenderness_ratio: f64,
    pub is_short_column: bool,
}

fn axial_capacity_n(fc: f64, fy: f64, ag: f64, ast: f64) -> f64 {
    PHI_COMPRESSION_TIED * TIED_ECCENTRICITY_FACTOR * (0.85 * fc * (ag - ast) + fy * ast)
}

pub fn design(ctx: &EngineContext, input: &ColumnDesignInput) -> EngineResult<ColumnDesignResult> {
    let concrete = Concrete::lookup(ctx, &input.concrete_grade)?;
    let fc = concrete.fck_mpa;
    let fy = steel_yield(ctx, &input.steel_grade)?;

    let ag = input.width_mm * input.depth_mm;
    let pu_n = input.axial_load_kn * 1000.0;

    let phi_factor = PHI_COMPRESSION_TIED * TIED_ECCENTRICITY_FACTOR;
    let solved = (pu_n / phi_factor - 0.85 * fc * ag) / (fy - 0.85 * fc);
    let required = solved.max(MIN_STEEL_RATIO * ag);
    let provided = input.steel_area_mm2.unwrap_or(required);

    let capacity_kn = axial_capacity_n(fc, fy, ag, provided) / 1000.0;

    let r = 0.3 * input.width_mm.min(input.depth_mm);
    let slenderness = input.effective_length_factor * input.height_m * 1000.0 / r;

    Ok(ColumnDesignResult {
        gross_area_mm2: ag,
        required_steel_mm2: required,
        steel_area_mm2: provided,
        steel_ratio_percent: provided / ag * 100.0,
        axial_capacity_kn: capacity_kn,
        axial_ratio: input.axial_load_kn / capacity_kn,
        radius_of_gyration_mm: r,
        slenderness_ratio: slenderness,
        is_short_column: slenderness <= SHORT_COLUMN_SLENDERNESS,
    })
}

pub(crate) fn calculate(ctx: &EngineContext, input: &ColumnDesignInput) -> EngineResult<Outcome> {
    let r = design(ctx, input)?;
    let rho = r.steel_ratio_percent / 100.0;
    let rho_ok = (MIN_STEEL_RATIO..=MAX_STEEL_RATIO).contains(&rho);

    Ok(Outcome::new(&r)?
        .check(
            "axial",
            ComplianceCheck::ratio(
                r.axial_ratio,
                format!("Pu = {:.0} kN vs φPn,max = {:.0} kN", input.axial_load_kn, r.axial_capacity_kn),
            ),
        )
        .check(
            "steel_ratio",
            ComplianceCheck::flag(
                rho_ok,
                format!("ρ = {:.2}% (limits 1% to 8%)", r.steel_ratio_percent),
            ),
        )
        .check(
            "slenderness",
            ComplianceCheck::ratio(
                r.slenderness_ratio / SHORT_COLUMN_SLENDERNESS,
                format!("kL/r = {:.1} vs short-column limit 22", r.slenderness_ratio),
            ),
        )
        .recommend_if(
            !r.is_short_column,
            "Column is slender; apply moment magnification or increase the section",
        )
        .recommend_if(
            rho > MAX_STEEL_RATIO,
            "Steel ratio exceeds 8%; increase the column section or concrete grade",
        )
        .recommend_if(
            rho < MIN_STEEL_RATIO,
            "Provide at least 1% longitudinal reinforcement",
        )
        .standards(&[
            "SBC 304:2018 (ACI 318-19) Section 22.4 - Axial strength",
            "SBC 304:2018 Section 10.6 - Reinforcement limits",
            "SBC 304:2018 Section 6.2.5 - Slenderness",
        ]))
}
