//! Gravity drainage tables (`drainage.toml`).

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{check_ascending, check_map_positive, check_positive, lookup, step_at_or_above};
use crate::errors::{EngineError, EngineResult};

const SOURCE: &str = "drainage.toml";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct VelocityLimits {
    pub minimum: f64,
    pub maximum: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RainfallRow {
    pub return_period_years: f64,
    pub intensity_mm_h: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DrainCapacity {
    pub diameter_mm: f64,
    pub max_dfu: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DrainageTables {
    pub version: String,
    pub pipe_diameters_mm: Vec<f64>,
    pub max_depth_ratio: f64,
    pub min_water_closet_diameter_mm: f64,
    pub velocity_limits_m_s: VelocityLimits,
    pub runoff_coefficients: BTreeMap<String, f64>,
    /// Location to rainfall rows ordered by return period
    pub rainfall: BTreeMap<String, Vec<RainfallRow>>,
    pub fixture_units: BTreeMap<String, f64>,
    pub drain_capacity: Vec<DrainCapacity>,
}

impl DrainageTables {
    pub fn runoff_coefficient(&self, surface: &str) -> Option<f64> {
        lookup(&self.runoff_coefficients, surface).copied()
    }

    /// Intensity at the first tabulated return period at or above the one requested
    pub fn rainfall_intensity(&self, location: &str, return_period_years: f64) -> Option<&RainfallRow> {
        let rows = lookup(&self.rainfall, location)?;
        step_at_or_above(rows, return_period_years, |r| r.return_period_years)
    }

    pub fn fixture_unit_value(&self, fixture: &str) -> Option<f64> {
        lookup(&self.fixture_units, fixture).copied()
    }

    /// Smallest drain whose capacity covers `dfu` with a diameter of at least `min_diameter_mm`
    pub fn drain_for_dfu(&self, dfu: f64, min_diameter_mm: f64) -> Option<&DrainCapacity> {
        self.drain_capacity
            .iter()
            .find(|d| d.max_dfu >= dfu && d.diameter_mm >= min_diameter_mm)
    }

    pub(crate) fn validate(&self) -> EngineResult<()> {
        check_ascending(SOURCE, "pipe_diameters_mm", self.pipe_diameters_mm.iter().copied())?;
        check_positive(
            SOURCE,
            "velocity_limits_m_s",
            [self.velocity_limits_m_s.minimum, self.velocity_limits_m_s.maximum],
        )?;
        if self.velocity_limits_m_s.minimum >= self.velocity_limits_m_s.maximum {
            return Err(EngineError::reference_data(
                SOURCE,
                "velocity_limits_m_s: minimum must be below maximum",
            ));
        }
        if !(self.max_depth_ratio > 0.0 && self.max_depth_ratio <= 1.0) {
            return Err(EngineError::reference_data(SOURCE, "max_depth_ratio must be in (0, 1]"));
        }
        check_positive(SOURCE, "min_water_closet_diameter_mm", [self.min_water_closet_diameter_mm])?;
        check_map_positive(SOURCE, "runoff_coefficients", &self.runoff_coefficients)?;
        if self.runoff_coefficients.values().any(|c| *c > 1.0) {
            return Err(EngineError::reference_data(
                SOURCE,
                "runoff_coefficients must not exceed 1.0",
            ));
        }
        if self.rainfall.is_empty() {
            return Err(EngineError::reference_data(SOURCE, "rainfall is empty"));
        }
        for (location, rows) in &self.rainfall {
            let table = format!("rainfall.{}", location);
            check_ascending(SOURCE, &table, rows.iter().map(|r| r.return_period_years))?;
            check_positive(SOURCE, &table, rows.iter().map(|r| r.intensity_mm_h))?;
        }
        check_map_positive(SOURCE, "fixture_units", &self.fixture_units)?;
        check_ascending(SOURCE, "drain_capacity", self.drain_capacity.iter().map(|d| d.diameter_mm))?;
        check_ascending(SOURCE, "drain_capacity.max_dfu", self.drain_capacity.iter().map(|d| d.max_dfu))
    }
}

#[cfg(test)]
mod tests {
    use crate::reference::ReferenceData;

    #[test]
    fn test_rainfall_uses_next_return_period() {
        let data = ReferenceData::embedded().unwrap();
        let d = &data.drainage;
        assert_eq!(d.rainfall_intensity("riyadh", 10.0).unwrap().intensity_mm_h, 70.0);
        assert_eq!(d.rainfall_intensity("Riyadh", 7.0).unwrap().intensity_mm_h, 70.0);
        assert!(d.rainfall_intensity("riyadh", 100.0).is_none());
        assert!(d.rainfall_intensity("atlantis", 10.0).is_none());
    }

    #[test]
    fn test_drain_for_dfu_respects_minimum_diameter() {
        let data = ReferenceData::embedded().unwrap();
        let d = &data.drainage;
        assert_eq!(d.drain_for_dfu(10.0, 0.0).unwrap().diameter_mm, 50.0);
        assert_eq!(d.drain_for_dfu(10.0, 80.0).unwrap().diameter_mm, 80.0);
        assert_eq!(d.drain_for_dfu(217.0, 0.0).unwrap().diameter_mm, 125.0);
    }
}
