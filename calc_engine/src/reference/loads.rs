//! Structural load tables (`loads.toml`).

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{check_map_positive, lookup};
use crate::errors::{EngineError, EngineResult};

const SOURCE: &str = "loads.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct LoadTables {
    pub version: String,
    /// Element key to area load (kPa)
    pub dead_unit_loads_kpa: BTreeMap<String, f64>,
    /// Occupancy to area load (kPa)
    pub live_unit_loads_kpa: BTreeMap<String, f64>,
    pub wind: WindTables,
    pub seismic: SeismicTables,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindTables {
    pub basic_speed_m_s: BTreeMap<String, f64>,
    pub terrain_exponent: BTreeMap<String, f64>,
    pub archetypes: Vec<ArchetypeRow>,
}

/// External pressure coefficients for one building archetype
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PressureCoefficients {
    pub windward: f64,
    pub leeward: f64,
    pub side: f64,
    pub roof: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchetypeRow {
    pub name: String,
    #[serde(flatten)]
    pub coefficients: PressureCoefficients,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeismicTables {
    pub zone_factor: BTreeMap<String, f64>,
    pub soil_factor: BTreeMap<String, f64>,
    pub importance_factor: BTreeMap<String, f64>,
    pub response_modification: BTreeMap<String, f64>,
}

impl LoadTables {
    pub fn dead_unit_load(&self, key: &str) -> Option<f64> {
        lookup(&self.dead_unit_loads_kpa, key).copied()
    }

    pub fn live_unit_load(&self, occupancy: &str) -> Option<f64> {
        lookup(&self.live_unit_loads_kpa, occupancy).copied()
    }

    pub(crate) fn validate(&self) -> EngineResult<()> {
        check_map_positive(SOURCE, "dead_unit_loads_kpa", &self.dead_unit_loads_kpa)?;
        check_map_positive(SOURCE, "live_unit_loads_kpa", &self.live_unit_loads_kpa)?;
        check_map_positive(SOURCE, "wind.basic_speed_m_s", &self.wind.basic_speed_m_s)?;
        check_map_positive(SOURCE, "wind.terrain_exponent", &self.wind.terrain_exponent)?;
        check_map_positive(SOURCE, "seismic.zone_factor", &self.seismic.zone_factor)?;
        check_map_positive(SOURCE, "seismic.soil_factor", &self.seismic.soil_factor)?;
        check_map_positive(SOURCE, "seismic.importance_factor", &self.seismic.importance_factor)?;
        check_map_positive(
            SOURCE,
            "seismic.response_modification",
            &self.seismic.response_modification,
        )?;
        self.wind.validate()
    }
}

impl WindTables {
    pub fn basic_speed(&self, location: &str) -> Option<f64> {
        lookup(&self.basic_speed_m_s, location).copied()
    }

    pub fn terrain_exponent(&self, category: &str) -> Option<f64> {
        lookup(&self.terrain_exponent, category).copied()
    }

    pub fn archetype(&self, name: &str) -> Option<&PressureCoefficients> {
        self.archetypes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| &a.coefficients)
    }

    pub fn archetype_names(&self) -> Vec<&str> {
        self.archetypes.iter().map(|a| a.name.as_str()).collect()
    }

    fn validate(&self) -> EngineResult<()> {
        if self.archetypes.is_empty() {
            return Err(EngineError::reference_data(SOURCE, "wind.archetypes is empty"));
        }
        for (i, row) in self.archetypes.iter().enumerate() {
            if self.archetypes[..i]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&row.name))
            {
                return Err(EngineError::reference_data(
                    SOURCE,
                    format!("duplicate wind archetype {}", row.name),
                ));
            }
            let c = &row.coefficients;
            if [c.windward, c.leeward, c.side, c.roof].iter().any(|v| !v.is_finite()) {
                return Err(EngineError::reference_data(
                    SOURCE,
                    format!("wind archetype {} has a non-finite coefficient", row.name),
                ));
            }
        }
        Ok(())
    }
}
