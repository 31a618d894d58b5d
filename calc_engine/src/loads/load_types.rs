//! Load type definitions
//!
//! The load categories combined by the limit-state tables in
//! [`combinations`](super::combinations).

use serde::{Deserialize, Serialize};

/// Load categories
///
/// # Example
/// ```
/// use calc_engine::loads::LoadType;
///
/// let dead = LoadType::Dead;
/// assert_eq!(dead.code(), "D");
/// assert_eq!(dead.description(), "Dead load");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    /// D - Dead load (self-weight and permanent finishes)
    Dead,
    /// L - Live load (occupancy)
    Live,
    /// Lr - Roof live load (maintenance)
    #[serde(alias = "live_roof")]
    RoofLive,
    /// W - Wind load
    Wind,
    /// E - Seismic load
    Seismic,
}

impl LoadType {
    /// All load types in standard order
    pub const ALL: [LoadType; 5] = [
        LoadType::Dead,
        LoadType::Live,
        LoadType::RoofLive,
        LoadType::Wind,
        LoadType::Seismic,
    ];

    /// Standard abbreviation used in combination equations
    pub fn code(&self) -> &'static str {
        match self {
            LoadType::Dead => "D",
            LoadType::Live => "L",
            LoadType::RoofLive => "Lr",
            LoadType::Wind => "W",
            LoadType::Seismic => "E",
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            LoadType::Dead => "Dead load",
            LoadType::Live => "Live load",
            LoadType::RoofLive => "Roof live load",
            LoadType::Wind => "Wind load",
            LoadType::Seismic => "Seismic load",
        }
    }

    /// Wind and seismic act in either direction and may be negative.
    pub fn is_directional(&self) -> bool {
        matches!(self, LoadType::Wind | LoadType::Seismic)
    }

    /// Whether this load type acts downward
    pub fn is_gravity(&self) -> bool {
        matches!(self, LoadType::Dead | LoadType::Live | LoadType::RoofLive)
    }
}

impl std::fmt::Display for LoadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_type_codes() {
        assert_eq!(LoadType::Dead.code(), "D");
        assert_eq!(LoadType::RoofLive.code(), "Lr");
        assert_eq!(LoadType::Seismic.code(), "E");
    }

    #[test]
    fn test_classification() {
        assert!(LoadType::Dead.is_gravity());
        assert!(LoadType::RoofLive.is_gravity());
        assert!(!LoadType::Wind.is_gravity());
        assert!(LoadType::Wind.is_directional());
        assert!(!LoadType::Live.is_directional());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&LoadType::RoofLive).unwrap(), "\"roof_live\"");
        let parsed: LoadType = serde_json::from_str("\"live_roof\"").unwrap();
        assert_eq!(parsed, LoadType::RoofLive);
    }
}
