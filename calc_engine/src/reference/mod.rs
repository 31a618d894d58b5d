//! # Reference Data
//!
//! Versioned numeric tables (standard loads, cable ratings, rainfall
//! intensities, material grades, ...) kept outside the calculation code so
//! they can be audited and replaced independently.
//!
//! Every document is embedded at compile time from `calc_engine/data/` and
//! parsed once. A configured `reference_data_dir` may hold replacement
//! files; any file found there (same name) wins over the embedded copy.
//! Every table is validated on load: step tables must be strictly ascending
//! and factors positive.
//!
//! ## Example
//!
//! ```rust
//! use calc_engine::reference::ReferenceData;
//!
//! let data = ReferenceData::embedded().unwrap();
//! let cable = data.electrical.first_cable_with_ampacity(30.0, 1).unwrap();
//! assert_eq!(cable.size_mm2, 4.0);
//! ```

pub mod drainage;
pub mod electrical;
pub mod elv;
pub mod hvac;
pub mod loads;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::errors::{EngineError, EngineResult};
use crate::materials::{MaterialDatabase, MaterialDocument};

pub use drainage::DrainageTables;
pub use electrical::ElectricalTables;
pub use elv::ElvTables;
pub use hvac::HvacTables;
pub use loads::LoadTables;

const LOADS_TOML: &str = include_str!("../../data/loads.toml");
const ELECTRICAL_TOML: &str = include_str!("../../data/electrical.toml");
const HVAC_TOML: &str = include_str!("../../data/hvac.toml");
const DRAINAGE_TOML: &str = include_str!("../../data/drainage.toml");
const ELV_TOML: &str = include_str!("../../data/elv.toml");
const MATERIALS_TOML: &str = include_str!("../../data/materials.toml");

/// All reference tables used by the engine
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub loads: LoadTables,
    pub electrical: ElectricalTables,
    pub hvac: HvacTables,
    pub drainage: DrainageTables,
    pub elv: ElvTables,
    pub materials: MaterialDatabase,
}

impl ReferenceData {
    /// Load the tables compiled into the crate
    pub fn embedded() -> EngineResult<Self> {
        Self::load(None)
    }

    /// Load tables, preferring files in `override_dir` when present.
    pub fn load(override_dir: Option<&Path>) -> EngineResult<Self> {
        let loads: LoadTables = parse_document("loads.toml", LOADS_TOML, override_dir)?;
        let electrical: ElectricalTables =
            parse_document("electrical.toml", ELECTRICAL_TOML, override_dir)?;
        let hvac: HvacTables = parse_document("hvac.toml", HVAC_TOML, override_dir)?;
        let drainage: DrainageTables = parse_document("drainage.toml", DRAINAGE_TOML, override_dir)?;
        let elv: ElvTables = parse_document("elv.toml", ELV_TOML, override_dir)?;
        let materials: MaterialDocument =
            parse_document("materials.toml", MATERIALS_TOML, override_dir)?;

        loads.validate()?;
        electrical.validate()?;
        hvac.validate()?;
        drainage.validate()?;
        elv.validate()?;
        let materials = MaterialDatabase::from_document(materials)?;

        let data = ReferenceData {
            loads,
            electrical,
            hvac,
            drainage,
            elv,
            materials,
        };
        info!(versions = ?data.versions(), "reference data loaded");
        Ok(data)
    }

    /// Document name to version string
    pub fn versions(&self) -> BTreeMap<&'static str, &str> {
        BTreeMap::from([
            ("loads.toml", self.loads.version.as_str()),
            ("electrical.toml", self.electrical.version.as_str()),
            ("hvac.toml", self.hvac.version.as_str()),
            ("drainage.toml", self.drainage.version.as_str()),
            ("elv.toml", self.elv.version.as_str()),
            ("materials.toml", self.materials.version()),
        ])
    }
}

fn parse_document<T: DeserializeOwned>(
    name: &'static str,
    embedded: &'static str,
    override_dir: Option<&Path>,
) -> EngineResult<T> {
    let replacement = match override_dir {
        Some(dir) => {
            let path = dir.join(name);
            if path.is_file() {
                debug!(path = %path.display(), "using reference data override");
                Some(fs::read_to_string(&path).map_err(|e| {
                    EngineError::reference_data(name, format!("{}: {}", path.display(), e))
                })?)
            } else {
                None
            }
        }
        None => None,
    };
    let text = replacement.as_deref().unwrap_or(embedded);
    toml::from_str(text).map_err(|e| EngineError::reference_data(name, e.to_string()))
}

// ============================================================================
// Table helpers
// ============================================================================

/// First row whose key is at or above `value` in an ascending table.
pub fn step_at_or_above<T>(rows: &[T], value: f64, key: impl Fn(&T) -> f64) -> Option<&T> {
    rows.iter().find(|row| key(row) >= value)
}

/// First entry at or above `value` in an ascending list of standard sizes.
pub fn standard_at_or_above(sizes: &[f64], value: f64) -> Option<f64> {
    step_at_or_above(sizes, value, |s| *s).copied()
}

pub(crate) fn check_ascending(
    source: &str,
    table: &str,
    keys: impl IntoIterator<Item = f64>,
) -> EngineResult<()> {
    let mut previous: Option<f64> = None;
    let mut count = 0usize;
    for key in keys {
        if !key.is_finite() {
            return Err(EngineError::reference_data(
                source,
                format!("{}: non-finite key", table),
            ));
        }
        if let Some(prev) = previous {
            if key <= prev {
                return Err(EngineError::reference_data(
                    source,
                    format!("{}: keys must be strictly ascending ({} after {})", table, key, prev),
                ));
            }
        }
        previous = Some(key);
        count += 1;
    }
    if count == 0 {
        return Err(EngineError::reference_data(source, format!("{} is empty", table)));
    }
    Ok(())
}

pub(crate) fn check_positive(
    source: &str,
    table: &str,
    values: impl IntoIterator<Item = f64>,
) -> EngineResult<()> {
    for value in values {
        if !value.is_finite() || value <= 0.0 {
            return Err(EngineError::reference_data(
                source,
                format!("{}: values must be positive, found {}", table, value),
            ));
        }
    }
    Ok(())
}

pub(crate) fn check_map_positive(
    source: &str,
    table: &str,
    map: &BTreeMap<String, f64>,
) -> EngineResult<()> {
    if map.is_empty() {
        return Err(EngineError::reference_data(source, format!("{} is empty", table)));
    }
    check_positive(source, table, map.values().copied())
}

/// Case-insensitive lookup in a keyed table
pub(crate) fn lookup<'a, V>(map: &'a BTreeMap<String, V>, key: &str) -> Option<&'a V> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}
