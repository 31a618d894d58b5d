//! Extra-low-voltage system tables (`elv.toml`).

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{check_ascending, check_map_positive, check_positive, lookup, standard_at_or_above};
use crate::errors::{EngineError, EngineResult};

const SOURCE: &str = "elv.toml";

/// Spacing rule for one detector type
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectorCoverage {
    pub detector_type: String,
    pub coverage_m2: f64,
    pub max_ceiling_height_m: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElvTables {
    pub version: String,
    pub battery_capacities_ah: Vec<f64>,
    pub ups_ratings_kva: Vec<f64>,
    pub cable_box_length_m: f64,
    pub patch_panel_ports: u32,
    pub max_permanent_link_m: f64,
    pub detectors: Vec<DetectorCoverage>,
    /// Sensor format (e.g. `1/3`) to horizontal width in mm
    pub camera_sensor_width_mm: BTreeMap<String, f64>,
}

impl ElvTables {
    pub fn battery_at_or_above(&self, ah: f64) -> Option<f64> {
        standard_at_or_above(&self.battery_capacities_ah, ah)
    }

    pub fn ups_at_or_above(&self, kva: f64) -> Option<f64> {
        standard_at_or_above(&self.ups_ratings_kva, kva)
    }

    pub fn detector(&self, detector_type: &str) -> Option<&DetectorCoverage> {
        self.detectors
            .iter()
            .find(|d| d.detector_type.eq_ignore_ascii_case(detector_type))
    }

    pub fn sensor_width(&self, format: &str) -> Option<f64> {
        lookup(&self.camera_sensor_width_mm, format).copied()
    }

    pub(crate) fn validate(&self) -> EngineResult<()> {
        check_ascending(SOURCE, "battery_capacities_ah", self.battery_capacities_ah.iter().copied())?;
        check_ascending(SOURCE, "ups_ratings_kva", self.ups_ratings_kva.iter().copied())?;
        check_positive(
            SOURCE,
            "cabling",
            [
                self.cable_box_length_m,
                self.patch_panel_ports as f64,
                self.max_permanent_link_m,
            ],
        )?;
        if self.detectors.is_empty() {
            return Err(EngineError::reference_data(SOURCE, "detectors is empty"));
        }
        check_positive(
            SOURCE,
            "detectors",
            self.detectors.iter().flat_map(|d| [d.coverage_m2, d.max_ceiling_height_m]),
        )?;
        check_map_positive(SOURCE, "camera_sensor_width_mm", &self.camera_sensor_width_mm)
    }
}
