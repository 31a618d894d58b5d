//! Low-voltage cable and switchgear tables (`electrical.toml`).

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{check_ascending, check_map_positive, check_positive, lookup, step_at_or_above};
use crate::errors::{EngineError, EngineResult};

const SOURCE: &str = "electrical.toml";
const DEFAULT_VOLTAGE_DROP_LIMIT: f64 = 4.0;

/// One standard copper cable size
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CableRating {
    pub size_mm2: f64,
    pub ampacity_single_phase_a: f64,
    pub ampacity_three_phase_a: f64,
    pub mv_per_a_m_single_phase: f64,
    pub mv_per_a_m_three_phase: f64,
}

impl CableRating {
    /// Tabulated current-carrying capacity for the phase count
    pub fn ampacity(&self, phases: u8) -> f64 {
        if phases == 3 {
            self.ampacity_three_phase_a
        } else {
            self.ampacity_single_phase_a
        }
    }

    /// Voltage drop per ampere per metre for the phase count
    pub fn mv_per_a_m(&self, phases: u8) -> f64 {
        if phases == 3 {
            self.mv_per_a_m_three_phase
        } else {
            self.mv_per_a_m_single_phase
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TemperatureRow {
    pub ambient_c: f64,
    pub factor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GroupingRow {
    pub circuits: u32,
    pub factor: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElectricalTables {
    pub version: String,
    pub cables: Vec<CableRating>,
    pub temperature_derating: Vec<TemperatureRow>,
    pub grouping_derating: Vec<GroupingRow>,
    pub installation_method_factor: BTreeMap<String, f64>,
    pub protective_device_ratings_a: Vec<f64>,
    pub transformer_ratings_kva: Vec<f64>,
    pub voltage_drop_limit_percent: BTreeMap<String, f64>,
}

impl ElectricalTables {
    /// Smallest cable whose tabulated ampacity meets `required_a`
    pub fn first_cable_with_ampacity(&self, required_a: f64, phases: u8) -> Option<&CableRating> {
        self.cables.iter().find(|c| c.ampacity(phases) >= required_a)
    }

    pub fn cable(&self, size_mm2: f64) -> Option<&CableRating> {
        self.cables.iter().find(|c| (c.size_mm2 - size_mm2).abs() < 1e-9)
    }

    /// Ambient temperature factor from the first row at or above `ambient_c`.
    /// Below the first row the first factor applies; above the last there is none.
    pub fn temperature_factor(&self, ambient_c: f64) -> Option<f64> {
        step_at_or_above(&self.temperature_derating, ambient_c, |r| r.ambient_c).map(|r| r.factor)
    }

    /// Grouping factor from the first row at or above `circuits`
    pub fn grouping_factor(&self, circuits: u32) -> Option<f64> {
        step_at_or_above(&self.grouping_derating, circuits as f64, |r| r.circuits as f64)
            .map(|r| r.factor)
    }

    pub fn installation_factor(&self, method: &str) -> Option<f64> {
        lookup(&self.installation_method_factor, method).copied()
    }

    pub fn installation_methods(&self) -> Vec<&str> {
        self.installation_method_factor.keys().map(|k| k.as_str()).collect()
    }

    /// Voltage-drop limit (%) for a circuit type, falling back to `default`
    pub fn voltage_drop_limit(&self, circuit_type: &str) -> f64 {
        lookup(&self.voltage_drop_limit_percent, circuit_type)
            .or_else(|| self.voltage_drop_limit_percent.get("default"))
            .copied()
            .unwrap_or(DEFAULT_VOLTAGE_DROP_LIMIT)
    }

    pub(crate) fn validate(&self) -> EngineResult<()> {
        check_ascending(SOURCE, "cables", self.cables.iter().map(|c| c.size_mm2))?;
        check_positive(
            SOURCE,
            "cables",
            self.cables.iter().flat_map(|c| {
                [
                    c.ampacity_single_phase_a,
                    c.ampacity_three_phase_a,
                    c.mv_per_a_m_single_phase,
                    c.mv_per_a_m_three_phase,
                ]
            }),
        )?;
        check_ascending(
            SOURCE,
            "temperature_derating",
            self.temperature_derating.iter().map(|r| r.ambient_c),
        )?;
        check_positive(
            SOURCE,
            "temperature_derating",
            self.temperature_derating.iter().map(|r| r.factor),
        )?;
        check_ascending(
            SOURCE,
            "grouping_derating",
            self.grouping_derating.iter().map(|r| r.circuits as f64),
        )?;
        check_positive(
            SOURCE,
            "grouping_derating",
            self.grouping_derating.iter().map(|r| r.factor),
        )?;
        check_map_positive(SOURCE, "installation_method_factor", &self.installation_method_factor)?;
        check_ascending(
            SOURCE,
            "protective_device_ratings_a",
            self.protective_device_ratings_a.iter().copied(),
        )?;
        check_ascending(
            SOURCE,
            "transformer_ratings_kva",
            self.transformer_ratings_kva.iter().copied(),
        )?;
        if !self.voltage_drop_limit_percent.contains_key("default") {
            return Err(EngineError::reference_data(
                SOURCE,
                "voltage_drop_limit_percent needs a `default` entry",
            ));
        }
        check_map_positive(SOURCE, "voltage_drop_limit_percent", &self.voltage_drop_limit_percent)
    }
}
