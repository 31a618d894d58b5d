//! Wind loads on a rectangular building.
//!
//! `V_z = V_b (z / 10)^α` at roof height, `q = 0.613 V_z²` (Pa), face
//! pressure `q·Cp`, face force = pressure × face area. The horizontal
//! resultant adds the windward push to the leeward suction; overturning is
//! taken about the base with the resultant at mid-height.

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult, FieldError};
use crate::reference::loads::WindTables;
use crate::validation::FieldChecks;

/// Air density term of the dynamic pressure, 0.5 × 1.226 kg/m³
const DYNAMIC_PRESSURE_COEFFICIENT: f64 = 0.613;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindLoadInput {
    /// Location key for the basic wind speed table
    #[serde(default)]
    pub location: String,
    pub terrain_category: String,
    /// Pressure-coefficient archetype (low_rise, high_rise, ...)
    pub building_type: String,
    pub height_m: f64,
    /// Face normal to the wind
    pub width_m: f64,
    /// Dimension parallel to the wind
    pub length_m: f64,
    /// Overrides the location table when given
    #[serde(default)]
    pub basic_wind_speed_m_s: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceValues {
    pub windward: f64,
    pub leeward: f64,
    pub side: f64,
    pub roof: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindLoadResult {
    pub basic_wind_speed_m_s: f64,
    pub terrain_exponent: f64,
    pub design_wind_speed_m_s: f64,
    pub dynamic_pressure_kpa: f64,
    pub pressure_coefficients: FaceValues,
    pub pressures_kpa: FaceValues,
    pub face_areas_m2: FaceValues,
    pub forces_kn: FaceValues,
    pub resultant_horizontal_kn: f64,
    pub overturning_moment_knm: f64,
    pub roof_uplift_kn: f64,
}

pub(crate) fn check(tables: &WindTables, input: &WindLoadInput) -> Vec<FieldError> {
    let mut checks = FieldChecks::new();
    checks
        .positive("height_m", input.height_m)
        .positive("width_m", input.width_m)
        .positive("length_m", input.length_m)
        .positive_opt("basic_wind_speed_m_s", input.basic_wind_speed_m_s);
    if input.basic_wind_speed_m_s.is_none() {
        checks.known(
            "location",
            "basic wind speed",
            &input.location,
            tables.basic_speed(&input.location),
        );
    }
    checks.known(
        "terrain_category",
        "terrain exponent",
        &input.terrain_category,
        tables.terrain_exponent(&input.terrain_category),
    );
    if tables.archetype(&input.building_type).is_none() {
        checks.push(
            "building_type",
            format!(
                "unknown building type '{}', expected one of: {}",
                input.building_type,
                tables.archetype_names().join(", ")
            ),
        );
    }
    checks.finish()
}

pub(crate) fn calculate(tables: &WindTables, input: &WindLoadInput) -> EngineResult<WindLoadResult> {
    let missing = |what: &str| EngineError::calculation(format!("wind table lookup failed: {}", what));
    let v_b = match input.basic_wind_speed_m_s {
        Some(v) => v,
        None => tables.basic_speed(&input.location).ok_or_else(|| missing("location"))?,
    };
    let alpha = tables
        .terrain_exponent(&input.terrain_category)
        .ok_or_else(|| missing("terrain_category"))?;
    let cp = *tables
        .archetype(&input.building_type)
        .ok_or_else(|| missing("building_type"))?;

    let v_z = v_b * (input.height_m / 10.0).powf(alpha);
    let q_kpa = DYNAMIC_PRESSURE_COEFFICIENT * v_z * v_z / 1000.0;

    let pressures = FaceValues {
        windward: q_kpa * cp.windward,
        leeward: q_kpa * cp.leeward,
        side: q_kpa * cp.side,
        roof: q_kpa * cp.roof,
    };
    let areas = FaceValues {
        windward: input.width_m * input.height_m,
        leeward: input.width_m * input.height_m,
        side: input.length_m * input.height_m,
        roof: input.width_m * input.length_m,
    };
    let forces = FaceValues {
        windward: pressures.windward * areas.windward,
        leeward: pressures.leeward * areas.leeward,
        side: pressures.side * areas.side,
        roof: pressures.roof * areas.roof,
    };
    let resultant = forces.windward.abs() + forces.leeward.abs();

    Ok(WindLoadResult {
        basic_wind_speed_m_s: v_b,
        terrain_exponent: alpha,
        design_wind_speed_m_s: v_z,
        dynamic_pressure_kpa: q_kpa,
        pressure_coefficients: FaceValues {
            windward: cp.windward,
            leeward: cp.leeward,
            side: cp.side,
            roof: cp.roof,
        },
        pressures_kpa: pressures,
        face_areas_m2: areas,
        forces_kn: forces,
        resultant_horizontal_kn: resultant,
        overturning_moment_knm: resultant * input.height_m / 2.0,
        roof_uplift_kn: forces.roof.abs(),
    })
}
