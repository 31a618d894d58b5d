//! On-site sanitary sizing: septic tanks and drainage fixture units.

use serde::{Deserialize, Serialize};

use crate::calculations::{ComplianceCheck, InputRecord, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineError, EngineResult, FieldError};
use crate::validation::FieldChecks;

const MIN_TANK_VOLUME_M3: f64 = 2.0;
/// Plan dimensions are rounded up to this step (m)
const DIMENSION_STEP_M: f64 = 0.05;
/// First compartment share of the tank length
const FIRST_COMPARTMENT_SHARE: f64 = 2.0 / 3.0;

// ============================================================================
// Septic tank
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SepticTankInput {
    pub population: u32,
    #[serde(default = "default_per_capita")]
    pub per_capita_l_day: f64,
    #[serde(default = "default_retention")]
    pub retention_days: f64,
    #[serde(default = "default_sludge")]
    pub sludge_l_per_capita_year: f64,
    #[serde(default = "default_desludging")]
    pub desludging_interval_years: f64,
    /// Liquid depth
    #[serde(default = "default_depth")]
    pub depth_m: f64,
    #[serde(default = "default_freeboard")]
    pub freeboard_m: f64,
}

fn default_per_capita() -> f64 {
    120.0
}

fn default_retention() -> f64 {
    1.0
}

fn default_sludge() -> f64 {
    40.0
}

fn default_desludging() -> f64 {
    2.0
}

fn default_depth() -> f64 {
    1.5
}

fn default_freeboard() -> f64 {
    0.3
}

impl InputRecord for SepticTankInput {
    fn check(&self, _ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks
            .require(self.population > 0, "population", "must be at least 1")
            .positive("per_capita_l_day", self.per_capita_l_day)
            .in_range("retention_days", self.retention_days, 0.5, 5.0)
            .non_negative("sludge_l_per_capita_year", self.sludge_l_per_capita_year)
            .in_range("desludging_interval_years", self.desludging_interval_years, 0.5, 10.0)
            .in_range("depth_m", self.depth_m, 1.0, 3.0)
            .non_negative("freeboard_m", self.freeboard_m);
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SepticTankResult {
    pub daily_flow_m3: f64,
    pub liquid_volume_m3: f64,
    pub sludge_volume_m3: f64,
    pub required_volume_m3: f64,
    pub length_m: f64,
    pub width_m: f64,
    pub liquid_depth_m: f64,
    pub overall_depth_m: f64,
    pub first_compartment_length_m: f64,
    pub second_compartment_length_m: f64,
    pub provided_volume_m3: f64,
}

fn round_up(value: f64) -> f64 {
    (value / DIMENSION_STEP_M - 1e-9).ceil() * DIMENSION_STEP_M
}

pub fn size_tank(input: &SepticTankInput) -> SepticTankResult {
    let p = f64::from(input.population);
    let daily = p * input.per_capita_l_day / 1000.0;
    let liquid = daily * input.retention_days;
    let sludge = p * input.sludge_l_per_capita_year * input.desludging_interval_years / 1000.0;
    let required = (liquid + sludge).max(MIN_TANK_VOLUME_M3);

    // 2:1 length to width at the liquid depth
    let width = round_up((required / input.depth_m / 2.0).sqrt());
    let length = round_up(required / input.depth_m / width);
    let first = round_up(length * FIRST_COMPARTMENT_SHARE);

    SepticTankResult {
        daily_flow_m3: daily,
        liquid_volume_m3: liquid,
        sludge_volume_m3: sludge,
        required_volume_m3: required,
        length_m: length,
        width_m: width,
        liquid_depth_m: input.depth_m,
        overall_depth_m: input.depth_m + input.freeboard_m,
        first_compartment_length_m: first,
        second_compartment_length_m: length - first,
        provided_volume_m3: length * width * input.depth_m,
    }
}

pub(crate) fn septic_tank(_ctx: &EngineContext, input: &SepticTankInput) -> EngineResult<Outcome> {
    let r = size_tank(input);
    Ok(Outcome::new(&r)?
        .check(
            "volume",
            ComplianceCheck::ratio(
                r.required_volume_m3 / r.provided_volume_m3,
                format!("{:.2} m³ required, {:.2} m³ provided", r.required_volume_m3, r.provided_volume_m3),
            ),
        )
        .recommend(format!(
            "{:.2} m x {:.2} m x {:.2} m deep, two compartments",
            r.length_m, r.width_m, r.overall_depth_m
        ))
        .recommend_if(
            input.population > 300,
            "Population above 300; a packaged treatment plant is normally preferred",
        )
        .standards(&["SBC 701 - Sanitary", "EN 12566-1 - Small wastewater treatment systems"]))
}

// ============================================================================
// Drainage fixture units
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureCount {
    pub fixture: String,
    #[serde(default = "default_count")]
    pub quantity: u32,
}

fn default_count() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureUnitsInput {
    pub fixtures: Vec<FixtureCount>,
}

impl InputRecord for FixtureUnitsInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks.non_empty("fixtures", &self.fixtures);
        for (i, f) in self.fixtures.iter().enumerate() {
            checks.known(
                format!("fixtures[{}].fixture", i),
                "fixture unit",
                &f.fixture,
                ctx.data.drainage.fixture_unit_value(&f.fixture),
            );
        }
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureLine {
    pub fixture: String,
    pub quantity: u32,
    pub unit_value: f64,
    pub fixture_units: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureUnitsResult {
    pub fixtures: Vec<FixtureLine>,
    pub total_fixture_units: f64,
    pub has_water_closet: bool,
    pub drain_diameter_mm: f64,
    pub drain_capacity_dfu: f64,
}

pub fn total_units(ctx: &EngineContext, input: &FixtureUnitsInput) -> EngineResult<FixtureUnitsResult> {
    let tables = &ctx.data.drainage;
    let fixtures = input
        .fixtures
        .iter()
        .map(|f| {
            let unit = tables.fixture_unit_value(&f.fixture).ok_or_else(|| {
                EngineError::invalid_field("fixtures", format!("no fixture unit entry for '{}'", f.fixture))
            })?;
            Ok(FixtureLine {
                fixture: f.fixture.clone(),
                quantity: f.quantity,
                unit_value: unit,
                fixture_units: unit * f64::from(f.quantity),
            })
        })
        .collect::<EngineResult<Vec<_>>>()?;

    let total: f64 = fixtures.iter().map(|f| f.fixture_units).sum();
    let has_wc = fixtures
        .iter()
        .any(|f| f.quantity > 0 && f.fixture.eq_ignore_ascii_case("water_closet"));
    let min_diameter = if has_wc { tables.min_water_closet_diameter_mm } else { 0.0 };
    let drain = tables.drain_for_dfu(total, min_diameter).ok_or_else(|| {
        EngineError::calculation(format!(
            "{:.0} fixture units exceed the largest tabulated building drain",
            total
        ))
    })?;

    Ok(FixtureUnitsResult {
        fixtures,
        total_fixture_units: total,
        has_water_closet: has_wc,
        drain_diameter_mm: drain.diameter_mm,
        drain_capacity_dfu: drain.max_dfu,
    })
}

pub(crate) fn fixture_units(ctx: &EngineContext, input: &FixtureUnitsInput) -> EngineResult<Outcome> {
    let r = total_units(ctx, input)?;
    Ok(Outcome::new(&r)?
        .check(
            "drain_capacity",
            ComplianceCheck::ratio(
                r.total_fixture_units / r.drain_capacity_dfu,
                format!("{:.0} DFU on a DN{:.0} drain", r.total_fixture_units, r.drain_diameter_mm),
            ),
        )
        .recommend(format!("Building drain DN{:.0} at 2% slope", r.drain_diameter_mm))
        .standards(&["SBC 701 - Sanitary, Chapter 7", "EN 12056-2 - Gravity drainage systems inside buildings"]))
}
