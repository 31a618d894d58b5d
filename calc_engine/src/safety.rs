//! # Construction Safety Helpers
//!
//! Threshold rules from OSHA 29 CFR 1926 used by the safety-regulation
//! evaluator. Each helper is a pure function of a measured quantity.
//!
//! | Rule | Threshold | Reference |
//! |---|---|---|
//! | Fall protection | work height ≥ 1.8 m | 1926.501(b)(1) |
//! | Excavation protective system | depth ≥ 1.5 m | 1926.652(a)(1) |
//! | Engineer-designed protection | depth ≥ 6.0 m | 1926.652(b)(4) |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};

pub const FALL_PROTECTION_HEIGHT_M: f64 = 1.8;
pub const EXCAVATION_PROTECTION_DEPTH_M: f64 = 1.5;
pub const EXCAVATION_ENGINEER_DEPTH_M: f64 = 6.0;

pub fn fall_protection_required(height_m: f64) -> bool {
    height_m >= FALL_PROTECTION_HEIGHT_M
}

pub fn excavation_protection_required(depth_m: f64) -> bool {
    depth_m >= EXCAVATION_PROTECTION_DEPTH_M
}

pub fn excavation_requires_engineer(depth_m: f64) -> bool {
    depth_m >= EXCAVATION_ENGINEER_DEPTH_M
}

// ============================================================================
// Electrical
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoltageBand {
    /// ≤ 50 V
    ExtraLow,
    /// ≤ 1000 V
    Low,
    High,
}

impl VoltageBand {
    pub fn classify(volts: f64) -> Self {
        if volts <= 50.0 {
            VoltageBand::ExtraLow
        } else if volts <= 1000.0 {
            VoltageBand::Low
        } else {
            VoltageBand::High
        }
    }
}

impl fmt::Display for VoltageBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VoltageBand::ExtraLow => "extra-low voltage",
            VoltageBand::Low => "low voltage",
            VoltageBand::High => "high voltage",
        })
    }
}

/// (upper voltage, approach distance in m) for unqualified persons near
/// exposed energized parts
const APPROACH_DISTANCES: &[(f64, f64)] = &[
    (300.0, 0.0),
    (750.0, 0.31),
    (15_000.0, 0.65),
    (36_000.0, 0.77),
    (46_000.0, 0.84),
    (72_500.0, 1.00),
];
const APPROACH_DISTANCE_ABOVE_TABLE_M: f64 = 3.05;

/// Minimum approach distance to exposed live parts. Zero means "avoid contact".
pub fn minimum_approach_distance_m(volts: f64) -> f64 {
    APPROACH_DISTANCES
        .iter()
        .find(|(limit, _)| volts <= *limit)
        .map_or(APPROACH_DISTANCE_ABOVE_TABLE_M, |(_, d)| *d)
}

// ============================================================================
// Risk matrix
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Extreme => "extreme",
        })
    }
}

/// 5×5 likelihood × severity matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskMatrix {
    pub likelihood: u8,
    pub severity: u8,
}

impl RiskMatrix {
    pub fn new(likelihood: u8, severity: u8) -> EngineResult<Self> {
        if !(1..=5).contains(&likelihood) {
            return Err(EngineError::invalid_field("risk_likelihood", "must be between 1 and 5"));
        }
        if !(1..=5).contains(&severity) {
            return Err(EngineError::invalid_field("risk_severity", "must be between 1 and 5"));
        }
        Ok(RiskMatrix { likelihood, severity })
    }

    pub fn score(&self) -> u8 {
        self.likelihood * self.severity
    }

    pub fn level(&self) -> RiskLevel {
        match self.score() {
            0..=4 => RiskLevel::Low,
            5..=9 => RiskLevel::Medium,
            10..=16 => RiskLevel::High,
            _ => RiskLevel::Extreme,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_and_depth_thresholds() {
        assert!(!fall_protection_required(1.79));
        assert!(fall_protection_required(1.8));
        assert!(!excavation_protection_required(1.49));
        assert!(excavation_protection_required(1.5));
        assert!(!excavation_requires_engineer(5.9));
        assert!(excavation_requires_engineer(6.0));
    }

    #[test]
    fn test_voltage_bands() {
        assert_eq!(VoltageBand::classify(24.0), VoltageBand::ExtraLow);
        assert_eq!(VoltageBand::classify(50.0), VoltageBand::ExtraLow);
        assert_eq!(VoltageBand::classify(400.0), VoltageBand::Low);
        assert_eq!(VoltageBand::classify(11_000.0), VoltageBand::High);
    }

    #[test]
    fn test_approach_distance() {
        assert_eq!(minimum_approach_distance_m(230.0), 0.0);
        assert_eq!(minimum_approach_distance_m(400.0), 0.31);
        assert_eq!(minimum_approach_distance_m(13_800.0), 0.65);
        assert_eq!(minimum_approach_distance_m(132_000.0), 3.05);
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(RiskMatrix::new(1, 4).unwrap().level(), RiskLevel::Low);
        assert_eq!(RiskMatrix::new(3, 3).unwrap().level(), RiskLevel::Medium);
        assert_eq!(RiskMatrix::new(4, 4).unwrap().level(), RiskLevel::High);
        assert_eq!(RiskMatrix::new(4, 5).unwrap().level(), RiskLevel::Extreme);
        assert!(RiskMatrix::new(0, 3).is_err());
        assert!(RiskMatrix::new(3, 6).is_err());
    }
}
