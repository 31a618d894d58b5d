//! Dead and live area loads.
//!
//! Each element contributes `unit_load × area`. The standard table value is
//! used whenever the key is tabulated; a caller-supplied custom unit load is
//! only a fallback for keys the table lacks. An element with neither is
//! rejected, never counted as zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::FieldError;
use crate::validation::FieldChecks;

/// One loaded area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaLoadElement {
    pub name: String,
    /// Table key: element type for dead loads, occupancy for live loads
    #[serde(alias = "occupancy", alias = "element_type")]
    pub key: String,
    pub area_m2: f64,
    #[serde(default)]
    pub custom_unit_load_kpa: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitLoadSource {
    Table,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaLoadRow {
    pub name: String,
    pub key: String,
    pub unit_load_kpa: f64,
    pub area_m2: f64,
    pub load_kn: f64,
    pub source: UnitLoadSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaLoadResult {
    pub elements: Vec<AreaLoadRow>,
    pub total_load_kn: f64,
    pub total_area_m2: f64,
    /// Load per table key (kN), ordered by key
    pub breakdown: BTreeMap<String, f64>,
}

pub(crate) fn check_elements(
    elements: &[AreaLoadElement],
    list_name: &str,
    table: impl Fn(&str) -> Option<f64>,
) -> Vec<FieldError> {
    let mut checks = FieldChecks::new();
    checks.non_empty(list_name, elements);
    for (i, el) in elements.iter().enumerate() {
        let prefix = format!("{}[{}]", list_name, i);
        checks.not_blank(format!("{}.key", prefix), &el.key);
        checks.non_negative(format!("{}.area_m2", prefix), el.area_m2);
        checks.positive_opt(format!("{}.custom_unit_load_kpa", prefix), el.custom_unit_load_kpa);
        if table(&el.key).is_none() && el.custom_unit_load_kpa.is_none() {
            checks.push(
                format!("{}.custom_unit_load_kpa", prefix),
                format!(
                    "element '{}': no standard unit load for '{}', supply custom_unit_load_kpa",
                    el.name, el.key
                ),
            );
        }
    }
    checks.finish()
}

/// Compose loads for already-checked elements.
pub(crate) fn compose(elements: &[AreaLoadElement], table: impl Fn(&str) -> Option<f64>) -> AreaLoadResult {
    let mut rows = Vec::with_capacity(elements.len());
    let mut breakdown: BTreeMap<String, f64> = BTreeMap::new();
    for el in elements {
        let (unit_load_kpa, source) = match (table(&el.key), el.custom_unit_load_kpa) {
            (Some(v), _) => (v, UnitLoadSource::Table),
            (None, Some(v)) => (v, UnitLoadSource::Custom),
            (None, None) => (0.0, UnitLoadSource::Custom),
        };
        let load_kn = unit_load_kpa * el.area_m2;
        *breakdown.entry(el.key.clone()).or_insert(0.0) += load_kn;
        rows.push(AreaLoadRow {
            name: el.name.clone(),
            key: el.key.clone(),
            unit_load_kpa,
            area_m2: el.area_m2,
            load_kn,
            source,
        });
    }
    AreaLoadResult {
        total_load_kn: rows.iter().map(|r| r.load_kn).sum(),
        total_area_m2: rows.iter().map(|r| r.area_m2).sum(),
        elements: rows,
        breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loads::LoadCalculator;
    use crate::reference::ReferenceData;

    fn element(name: &str, key: &str, area: f64, custom: Option<f64>) -> AreaLoadElement {
        AreaLoadElement {
            name: name.to_string(),
            key: key.to_string(),
            area_m2: area,
            custom_unit_load_kpa: custom,
        }
    }

    #[test]
    fn test_dead_loads_table_and_custom() {
        let data = ReferenceData::embedded().unwrap();
        let calc = LoadCalculator::new(&data.loads, 0.2);
        let result = calc
            .calculate_dead_loads(&[
                element("slab", "rc_slab_150", 100.0, None),
                element("finishes", "screed_50", 100.0, Some(9.9)),
                element("tank", "water_tank", 4.0, Some(12.0)),
            ])
            .unwrap();

        assert!((result.elements[0].load_kn - 360.0).abs() < 1e-9);
        // Table wins over the custom value
        assert_eq!(result.elements[1].source, UnitLoadSource::Table);
        assert!((result.elements[1].unit_load_kpa - 1.1).abs() < 1e-12);
        assert_eq!(result.elements[2].source, UnitLoadSource::Custom);
        assert!((result.total_load_kn - (360.0 + 110.0 + 48.0)).abs() < 1e-9);
        assert!((result.breakdown["water_tank"] - 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_untabulated_key_without_custom_is_rejected() {
        let data = ReferenceData::embedded().unwrap();
        let calc = LoadCalculator::new(&data.loads, 0.2);
        let err = calc
            .calculate_dead_loads(&[element("mystery", "unobtainium", 10.0, None)])
            .unwrap_err();
        match err {
            crate::errors::EngineError::Validation { errors, .. } => {
                assert_eq!(errors[0].field, "elements[0].custom_unit_load_kpa");
                assert!(errors[0].reason.contains("mystery"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_live_loads_by_occupancy() {
        let data = ReferenceData::embedded().unwrap();
        let calc = LoadCalculator::new(&data.loads, 0.2);
        let areas: Vec<AreaLoadElement> = serde_json::from_str(
            r#"[{"name": "L1 office", "occupancy": "office", "area_m2": 200},
                {"name": "L1 corridor", "occupancy": "corridor", "area_m2": 40}]"#,
        )
        .unwrap();
        let result = calc.calculate_live_loads(&areas).unwrap();
        assert!((result.total_load_kn - (500.0 + 160.0)).abs() < 1e-9);
        assert!((result.total_area_m2 - 240.0).abs() < 1e-9);
    }
}
