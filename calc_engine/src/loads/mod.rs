//! # Structural Loads
//!
//! Load composition (dead, live, wind, seismic) and limit-state load
//! combinations.
//!
//! # Overview
//!
//! - [`LoadType`] - load categories (D, L, Lr, W, E)
//! - [`LoadCase`] - unfactored load magnitudes by type
//! - [`LoadCombination`] - named factor sets, evaluated in declaration order
//! - [`LoadCalculator`] - table-driven load composition over [`LoadTables`]
//!
//! Units: kPa for area loads, m and m² for geometry, kN and kNm for
//! resultants. Callers supply consistent units; no conversion happens here.
//!
//! # Example
//!
//! ```
//! use calc_engine::loads::{LimitState, LoadCalculator, LoadCase, LoadType};
//! use calc_engine::reference::ReferenceData;
//!
//! let data = ReferenceData::embedded().unwrap();
//! let calc = LoadCalculator::new(&data.loads, 0.20);
//!
//! let case = LoadCase::new()
//!     .with_load(LoadType::Dead, 100.0)
//!     .with_load(LoadType::Live, 50.0);
//! let result = calc.calculate_load_combinations(&case, LimitState::Strength).unwrap();
//! assert_eq!(result.governing.name, "ULS-2");
//! ```

pub mod combinations;
pub mod gravity;
pub mod load_types;
pub mod seismic;
pub mod wind;

pub use combinations::{
    evaluate_combinations, find_governing_combination, find_minimum_combination,
    serviceability_combinations, strength_combinations, CombinationValue, LimitState,
    LoadCombination,
};
pub use gravity::{AreaLoadElement, AreaLoadResult, AreaLoadRow, UnitLoadSource};
pub use load_types::LoadType;
pub use seismic::{SeismicLoadInput, SeismicLoadResult, StoreyForce, StoreyInput};
pub use wind::{WindLoadInput, WindLoadResult};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{EngineError, EngineResult, FieldError};
use crate::reference::LoadTables;
use crate::validation::FieldChecks;

/// Unfactored load magnitudes keyed by type
///
/// # JSON Format
/// ```json
/// { "dead": 100.0, "live": 50.0, "wind": 30.0 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadCase {
    loads: BTreeMap<LoadType, f64>,
}

impl LoadCase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a load value (builder pattern)
    pub fn with_load(mut self, load_type: LoadType, value: f64) -> Self {
        self.loads.insert(load_type, value);
        self
    }

    /// Load value for a type, 0.0 if not set
    pub fn get(&self, load_type: LoadType) -> f64 {
        self.loads.get(&load_type).copied().unwrap_or(0.0)
    }

    pub fn has(&self, load_type: LoadType) -> bool {
        self.loads.contains_key(&load_type)
    }

    /// Gravity loads must be non-negative; every value must be finite.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks.require(!self.loads.is_empty(), "loads", "must contain at least one load");
        for (load_type, value) in &self.loads {
            let field = format!("loads.{}", load_type_key(*load_type));
            if load_type.is_gravity() {
                checks.non_negative(field, *value);
            } else {
                checks.finite(field, *value);
            }
        }
        checks.finish()
    }
}

fn load_type_key(load_type: LoadType) -> &'static str {
    match load_type {
        LoadType::Dead => "dead",
        LoadType::Live => "live",
        LoadType::RoofLive => "roof_live",
        LoadType::Wind => "wind",
        LoadType::Seismic => "seismic",
    }
}

/// Output of [`LoadCalculator::calculate_load_combinations`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinationResult {
    pub limit_state: LimitState,
    pub combinations: Vec<CombinationValue>,
    pub governing: CombinationValue,
    pub minimum: CombinationValue,
}

/// Table-driven load composition
#[derive(Debug, Clone, Copy)]
pub struct LoadCalculator<'a> {
    tables: &'a LoadTables,
    max_base_shear_coefficient: f64,
}

impl<'a> LoadCalculator<'a> {
    pub fn new(tables: &'a LoadTables, max_base_shear_coefficient: f64) -> Self {
        LoadCalculator {
            tables,
            max_base_shear_coefficient,
        }
    }

    pub fn tables(&self) -> &'a LoadTables {
        self.tables
    }

    pub fn check_dead_loads(&self, elements: &[AreaLoadElement]) -> Vec<FieldError> {
        gravity::check_elements(elements, "elements", |key| self.tables.dead_unit_load(key))
    }

    /// Sum of unit load × area over structural/finish elements
    pub fn calculate_dead_loads(&self, elements: &[AreaLoadElement]) -> EngineResult<AreaLoadResult> {
        reject(self.check_dead_loads(elements))?;
        Ok(gravity::compose(elements, |key| self.tables.dead_unit_load(key)))
    }

    pub fn check_live_loads(&self, areas: &[AreaLoadElement]) -> Vec<FieldError> {
        gravity::check_elements(areas, "areas", |key| self.tables.live_unit_load(key))
    }

    /// Sum of occupancy load × area
    pub fn calculate_live_loads(&self, areas: &[AreaLoadElement]) -> EngineResult<AreaLoadResult> {
        reject(self.check_live_loads(areas))?;
        Ok(gravity::compose(areas, |key| self.tables.live_unit_load(key)))
    }

    pub fn check_wind_loads(&self, input: &WindLoadInput) -> Vec<FieldError> {
        wind::check(&self.tables.wind, input)
    }

    pub fn calculate_wind_loads(&self, input: &WindLoadInput) -> EngineResult<WindLoadResult> {
        reject(self.check_wind_loads(input))?;
        wind::calculate(&self.tables.wind, input)
    }

    pub fn check_seismic_loads(&self, input: &SeismicLoadInput) -> Vec<FieldError> {
        seismic::check(&self.tables.seismic, input)
    }

    pub fn calculate_seismic_loads(&self, input: &SeismicLoadInput) -> EngineResult<SeismicLoadResult> {
        reject(self.check_seismic_loads(input))?;
        seismic::calculate(&self.tables.seismic, input, self.max_base_shear_coefficient)
    }

    /// Evaluate the limit-state table and pick governing and minimum rows.
    pub fn calculate_load_combinations(
        &self,
        case: &LoadCase,
        limit_state: LimitState,
    ) -> EngineResult<CombinationResult> {
        reject(case.validate())?;
        let table = limit_state.combinations();
        let combinations = evaluate_combinations(case, &table);
        let governing = combinations::select_first(combinations.clone(), |a, b| a > b)
            .ok_or_else(|| EngineError::calculation("combination table is empty"))?;
        let minimum = combinations::select_first(combinations.clone(), |a, b| a < b)
            .ok_or_else(|| EngineError::calculation("combination table is empty"))?;
        debug!(
            limit_state = limit_state.code(),
            governing = %governing.name,
            value = governing.value,
            "governing load combination"
        );
        Ok(CombinationResult {
            limit_state,
            combinations,
            governing,
            minimum,
        })
    }
}

fn reject(errors: Vec<FieldError>) -> EngineResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(EngineError::validation("", "", errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceData;

    #[test]
    fn test_load_case_builder() {
        let case = LoadCase::new()
            .with_load(LoadType::Dead, 10.0)
            .with_load(LoadType::Live, 20.0);
        assert_eq!(case.get(LoadType::Dead), 10.0);
        assert_eq!(case.get(LoadType::Wind), 0.0);
        assert!(case.has(LoadType::Live));
        assert!(!case.has(LoadType::Seismic));
    }

    #[test]
    fn test_load_case_json() {
        let case: LoadCase = serde_json::from_str(r#"{"dead": 100, "wind": -30.5}"#).unwrap();
        assert_eq!(case.get(LoadType::Dead), 100.0);
        assert_eq!(case.get(LoadType::Wind), -30.5);
    }

    #[test]
    fn test_negative_gravity_rejected_lateral_allowed() {
        let bad = LoadCase::new().with_load(LoadType::Live, -1.0);
        assert_eq!(bad.validate()[0].field, "loads.live");
        let ok = LoadCase::new()
            .with_load(LoadType::Dead, 1.0)
            .with_load(LoadType::Seismic, -40.0);
        assert!(ok.validate().is_empty());
    }

    #[test]
    fn test_combination_result_reports_governing_and_minimum() {
        let data = ReferenceData::embedded().unwrap();
        let calc = LoadCalculator::new(&data.loads, 0.2);
        let case = LoadCase::new()
            .with_load(LoadType::Dead, 100.0)
            .with_load(LoadType::Live, 50.0)
            .with_load(LoadType::Wind, 30.0);

        let uls = calc.calculate_load_combinations(&case, LimitState::Strength).unwrap();
        assert_eq!(uls.combinations.len(), 7);
        assert_eq!(uls.governing.name, "ULS-3");
        assert_eq!(uls.minimum.name, "ULS-6");

        let sls = calc
            .calculate_load_combinations(&case, LimitState::Serviceability)
            .unwrap();
        assert_eq!(sls.governing.name, "SLS-1");
        assert!((sls.governing.value - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_load_case_is_validation_error() {
        let data = ReferenceData::embedded().unwrap();
        let calc = LoadCalculator::new(&data.loads, 0.2);
        let err = calc
            .calculate_load_combinations(&LoadCase::new(), LimitState::Strength)
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }
}
