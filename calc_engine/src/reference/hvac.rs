//! HVAC tables (`hvac.toml`).

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{check_ascending, check_map_positive, check_positive, lookup, standard_at_or_above};
use crate::errors::{EngineError, EngineResult};

const SOURCE: &str = "hvac.toml";

/// Heat gain per occupant for an activity level
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OccupantGain {
    pub activity: String,
    pub sensible_w: f64,
    pub latent_w: f64,
}

/// Breathing-zone outdoor air rates for a space type
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutdoorAirRate {
    pub space_type: String,
    /// R_p, L/s per person
    pub per_person_l_s: f64,
    /// R_a, L/s per m2
    pub per_area_l_s_m2: f64,
    pub default_density_per_100m2: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HvacTables {
    pub version: String,
    pub duct_diameters_mm: Vec<f64>,
    pub pipe_diameters_mm: Vec<f64>,
    pub unit_capacities_tr: Vec<f64>,
    pub occupant_gains: Vec<OccupantGain>,
    pub outdoor_air: Vec<OutdoorAirRate>,
    pub duct_velocity_limit_m_s: BTreeMap<String, f64>,
    pub pipe_velocity_limit_m_s: BTreeMap<String, f64>,
}

impl HvacTables {
    pub fn occupant_gain(&self, activity: &str) -> Option<&OccupantGain> {
        self.occupant_gains
            .iter()
            .find(|g| g.activity.eq_ignore_ascii_case(activity))
    }

    pub fn outdoor_air_rate(&self, space_type: &str) -> Option<&OutdoorAirRate> {
        self.outdoor_air
            .iter()
            .find(|r| r.space_type.eq_ignore_ascii_case(space_type))
    }

    pub fn duct_velocity_limit(&self, duct_class: &str) -> Option<f64> {
        lookup(&self.duct_velocity_limit_m_s, duct_class).copied()
    }

    pub fn pipe_velocity_limit(&self, service: &str) -> Option<f64> {
        lookup(&self.pipe_velocity_limit_m_s, service).copied()
    }

    /// Smallest standard packaged unit at or above `tons`
    pub fn unit_capacity_at_or_above(&self, tons: f64) -> Option<f64> {
        standard_at_or_above(&self.unit_capacities_tr, tons)
    }

    pub fn duct_diameter_at_or_above(&self, diameter_mm: f64) -> Option<f64> {
        standard_at_or_above(&self.duct_diameters_mm, diameter_mm)
    }

    pub(crate) fn validate(&self) -> EngineResult<()> {
        check_ascending(SOURCE, "duct_diameters_mm", self.duct_diameters_mm.iter().copied())?;
        check_ascending(SOURCE, "pipe_diameters_mm", self.pipe_diameters_mm.iter().copied())?;
        check_ascending(SOURCE, "unit_capacities_tr", self.unit_capacities_tr.iter().copied())?;
        if self.occupant_gains.is_empty() || self.outdoor_air.is_empty() {
            return Err(EngineError::reference_data(
                SOURCE,
                "occupant_gains and outdoor_air must not be empty",
            ));
        }
        check_positive(
            SOURCE,
            "occupant_gains",
            self.occupant_gains.iter().flat_map(|g| [g.sensible_w, g.latent_w]),
        )?;
        check_positive(
            SOURCE,
            "outdoor_air",
            self.outdoor_air.iter().flat_map(|r| {
                [r.per_person_l_s, r.per_area_l_s_m2, r.default_density_per_100m2]
            }),
        )?;
        check_map_positive(SOURCE, "duct_velocity_limit_m_s", &self.duct_velocity_limit_m_s)?;
        check_map_positive(SOURCE, "pipe_velocity_limit_m_s", &self.pipe_velocity_limit_m_s)
    }
}
