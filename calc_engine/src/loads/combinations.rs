//! Limit-state load combinations
//!
//! Two fixed tables: strength (ultimate) and serviceability. Factors are
//! kept in declaration order and every combination is evaluated by summing
//! in that order, so results are bit-reproducible.
//!
//! ## Governing selection
//!
//! The governing combination is the one with the largest value. Ties go to
//! the combination declared first; [`find_governing_combination`] only
//! replaces its candidate on a strictly greater value. The minimum
//! (uplift-critical) combination follows the same rule.

use serde::{Deserialize, Serialize};

use super::load_types::LoadType;
use super::LoadCase;

/// Limit state a combination table belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitState {
    /// Ultimate / strength design
    #[default]
    #[serde(alias = "ultimate", alias = "uls")]
    Strength,
    /// Serviceability (deflection, vibration)
    #[serde(alias = "sls")]
    Serviceability,
}

impl LimitState {
    pub fn combinations(&self) -> Vec<LoadCombination> {
        match self {
            LimitState::Strength => strength_combinations(),
            LimitState::Serviceability => serviceability_combinations(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            LimitState::Strength => "ULS",
            LimitState::Serviceability => "SLS",
        }
    }
}

/// A named linear combination of load types
///
/// # Example
/// ```
/// use calc_engine::loads::{LoadCase, LoadCombination, LoadType};
///
/// let combo = LoadCombination::new("ULS-2", "1.35D + 1.5L")
///     .with_factor(LoadType::Dead, 1.35)
///     .with_factor(LoadType::Live, 1.5);
///
/// let case = LoadCase::new()
///     .with_load(LoadType::Dead, 100.0)
///     .with_load(LoadType::Live, 50.0);
///
/// assert!((combo.apply(&case) - 210.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadCombination {
    /// Combination identifier (e.g., "ULS-3")
    pub name: String,
    /// Human-readable equation (e.g., "1.2D + 1.0L + 1.6W")
    pub equation: String,
    /// Factors in declaration order
    pub factors: Vec<(LoadType, f64)>,
}

impl LoadCombination {
    pub fn new(name: impl Into<String>, equation: impl Into<String>) -> Self {
        LoadCombination {
            name: name.into(),
            equation: equation.into(),
            factors: Vec::new(),
        }
    }

    /// Add a load factor (builder pattern)
    pub fn with_factor(mut self, load_type: LoadType, factor: f64) -> Self {
        self.factors.push((load_type, factor));
        self
    }

    /// Total factored load. Types absent from the case count as zero.
    pub fn apply(&self, case: &LoadCase) -> f64 {
        self.factors
            .iter()
            .map(|(load_type, factor)| factor * case.get(*load_type))
            .sum()
    }

    /// Factor for a load type (0.0 if not in the combination)
    pub fn get_factor(&self, load_type: LoadType) -> f64 {
        self.factors
            .iter()
            .find(|(t, _)| *t == load_type)
            .map(|(_, f)| *f)
            .unwrap_or(0.0)
    }
}

/// Value of one combination for a load case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationValue {
    pub name: String,
    pub equation: String,
    pub value: f64,
}

/// Strength limit state table
pub fn strength_combinations() -> Vec<LoadCombination> {
    vec![
        LoadCombination::new("ULS-1", "1.4D")
            .with_factor(LoadType::Dead, 1.4),
        LoadCombination::new("ULS-2", "1.35D + 1.5L")
            .with_factor(LoadType::Dead, 1.35)
            .with_factor(LoadType::Live, 1.5),
        LoadCombination::new("ULS-3", "1.2D + 1.0L + 1.6W")
            .with_factor(LoadType::Dead, 1.2)
            .with_factor(LoadType::Live, 1.0)
            .with_factor(LoadType::Wind, 1.6),
        LoadCombination::new("ULS-4", "1.2D + 1.0L + 1.0E")
            .with_factor(LoadType::Dead, 1.2)
            .with_factor(LoadType::Live, 1.0)
            .with_factor(LoadType::Seismic, 1.0),
        // Stabilising dead load with lateral actions (uplift, overturning)
        LoadCombination::new("ULS-5", "0.9D + 1.6W")
            .with_factor(LoadType::Dead, 0.9)
            .with_factor(LoadType::Wind, 1.6),
        LoadCombination::new("ULS-6", "0.9D + 1.0E")
            .with_factor(LoadType::Dead, 0.9)
            .with_factor(LoadType::Seismic, 1.0),
        LoadCombination::new("ULS-7", "1.2D + 1.6Lr + 0.5L")
            .with_factor(LoadType::Dead, 1.2)
            .with_factor(LoadType::RoofLive, 1.6)
            .with_factor(LoadType::Live, 0.5),
    ]
}

/// Serviceability limit state table
pub fn serviceability_combinations() -> Vec<LoadCombination> {
    vec![
        LoadCombination::new("SLS-1", "D + L")
            .with_factor(LoadType::Dead, 1.0)
            .with_factor(LoadType::Live, 1.0),
        LoadCombination::new("SLS-2", "D + 0.5L")
            .with_factor(LoadType::Dead, 1.0)
            .with_factor(LoadType::Live, 0.5),
        LoadCombination::new("SLS-3", "D + 0.6W")
            .with_factor(LoadType::Dead, 1.0)
            .with_factor(LoadType::Wind, 0.6),
        LoadCombination::new("SLS-4", "D + 0.5L + 0.6W")
            .with_factor(LoadType::Dead, 1.0)
            .with_factor(LoadType::Live, 0.5)
            .with_factor(LoadType::Wind, 0.6),
    ]
}

/// Evaluate every combination in declaration order
pub fn evaluate_combinations(case: &LoadCase, combinations: &[LoadCombination]) -> Vec<CombinationValue> {
    combinations
        .iter()
        .map(|combo| CombinationValue {
            name: combo.name.clone(),
            equation: combo.equation.clone(),
            value: combo.apply(case),
        })
        .collect()
}

/// Governing (maximum) combination; the first declared wins ties.
///
/// # Example
/// ```
/// use calc_engine::loads::{find_governing_combination, strength_combinations, LoadCase, LoadType};
///
/// let case = LoadCase::new()
///     .with_load(LoadType::Dead, 100.0)
///     .with_load(LoadType::Live, 50.0)
///     .with_load(LoadType::Wind, 30.0);
///
/// let governing = find_governing_combination(&case, &strength_combinations()).unwrap();
/// assert_eq!(governing.name, "ULS-3");
/// assert!((governing.value - 218.0).abs() < 1e-9);
/// ```
pub fn find_governing_combination(
    case: &LoadCase,
    combinations: &[LoadCombination],
) -> Option<CombinationValue> {
    select_first(evaluate_combinations(case, combinations), |candidate, best| candidate > best)
}

/// Minimum combination (uplift-critical); the first declared wins ties.
pub fn find_minimum_combination(
    case: &LoadCase,
    combinations: &[LoadCombination],
) -> Option<CombinationValue> {
    select_first(evaluate_combinations(case, combinations), |candidate, best| candidate < best)
}

/// Keep the earliest entry, replacing it only when `better` holds strictly.
pub(crate) fn select_first(
    values: Vec<CombinationValue>,
    better: impl Fn(f64, f64) -> bool,
) -> Option<CombinationValue> {
    let mut best: Option<CombinationValue> = None;
    for value in values {
        match &best {
            Some(current) if !better(value.value, current.value) => {}
            _ => best = Some(value),
        }
    }
    best
}
