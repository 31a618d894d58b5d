//! # Materials Database
//!
//! Read-only material grades keyed by `(category, subcategory, grade)`, each
//! with a property bag, the governing standard and cost/sustainability
//! metadata. The database is loaded once from `materials.toml` as part of
//! [`ReferenceData`](crate::reference::ReferenceData) and never mutated.
//!
//! ## Shipped categories
//!
//! - **concrete/structural**: C20 to C50 plus GGBS blends (`fck_mpa`, `density_kg_m3`, `elastic_modulus_mpa`)
//! - **steel/reinforcement**: B420, B500 (`fy_mpa`)
//! - **steel/structural**: S275, S355
//! - **masonry/block**: hollow, solid and AAC blocks
//! - **pipe/gravity**: uPVC, HDPE, concrete, vitrified clay, ductile iron (`manning_n`)
//! - **cable/conductor**: copper, aluminium
//! - **insulation/thermal**: EPS, XPS, rock wool, polyurethane (`conductivity_w_mk`)
//!
//! ## Example
//!
//! ```rust
//! use calc_engine::reference::ReferenceData;
//!
//! let data = ReferenceData::embedded().unwrap();
//! let fck = data.materials.property("concrete", "structural", "C30", "fck_mpa").unwrap();
//! assert_eq!(fck, 30.0);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};

/// One material grade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSpec {
    pub category: String,
    pub subcategory: String,
    pub grade: String,
    /// Governing product/design standard
    pub standard: String,
    /// Named numeric properties, ordered by name
    pub properties: BTreeMap<String, f64>,
    /// Unit that cost and carbon are quoted per (m3, t, m, m2, kg)
    pub unit: String,
    pub cost_per_unit: f64,
    /// kgCO2e per `unit`
    pub embodied_carbon_per_unit: f64,
    pub recycled_content_percent: f64,
}

impl MaterialSpec {
    /// Look up a named property
    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).copied()
    }

    fn matches(&self, category: &str, subcategory: &str, grade: &str) -> bool {
        self.category == category
            && self.subcategory == subcategory
            && self.grade.eq_ignore_ascii_case(grade)
    }
}

/// `materials.toml` document shape
#[derive(Debug, Clone, Deserialize)]
pub struct MaterialDocument {
    pub version: String,
    pub materials: Vec<MaterialSpec>,
}

/// Material lookup table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialDatabase {
    version: String,
    materials: Vec<MaterialSpec>,
}

impl MaterialDatabase {
    /// Build from a parsed document, rejecting duplicate keys and
    /// non-finite or negative metadata.
    pub fn from_document(doc: MaterialDocument) -> EngineResult<Self> {
        if doc.materials.is_empty() {
            return Err(EngineError::reference_data("materials.toml", "no materials defined"));
        }
        for (i, spec) in doc.materials.iter().enumerate() {
            let key = format!("{}/{}/{}", spec.category, spec.subcategory, spec.grade);
            if doc.materials[..i]
                .iter()
                .any(|other| other.matches(&spec.category, &spec.subcategory, &spec.grade))
            {
                return Err(EngineError::reference_data(
                    "materials.toml",
                    format!("duplicate material {}", key),
                ));
            }
            let metadata = [
                spec.cost_per_unit,
                spec.embodied_carbon_per_unit,
                spec.recycled_content_percent,
            ];
            if metadata.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(EngineError::reference_data(
                    "materials.toml",
                    format!("{}: cost, carbon and recycled content must be finite and non-negative", key),
                ));
            }
            if let Some((name, _)) = spec.properties.iter().find(|(_, v)| !v.is_finite()) {
                return Err(EngineError::reference_data(
                    "materials.toml",
                    format!("{}: property {} is not finite", key, name),
                ));
            }
        }
        Ok(MaterialDatabase {
            version: doc.version,
            materials: doc.materials,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Fetch one grade. Grade names match case-insensitively.
    pub fn get(&self, category: &str, subcategory: &str, grade: &str) -> EngineResult<&MaterialSpec> {
        self.materials
            .iter()
            .find(|m| m.matches(category, subcategory, grade))
            .ok_or_else(|| EngineError::material_not_found(category, subcategory, grade))
    }

    /// Fetch a single named property of a grade
    pub fn property(
        &self,
        category: &str,
        subcategory: &str,
        grade: &str,
        name: &str,
    ) -> EngineResult<f64> {
        let spec = self.get(category, subcategory, grade)?;
        spec.property(name).ok_or_else(|| {
            EngineError::reference_data(
                "materials.toml",
                format!("{}/{}/{} has no property {}", category, subcategory, grade, name),
            )
        })
    }

    /// Grade names of a subcategory, in file order
    pub fn grades(&self, category: &str, subcategory: &str) -> Vec<&str> {
        self.materials
            .iter()
            .filter(|m| m.category == category && m.subcategory == subcategory)
            .map(|m| m.grade.as_str())
            .collect()
    }

    /// Distinct `(category, subcategory)` pairs, in first-seen order
    pub fn categories(&self) -> Vec<(&str, &str)> {
        let mut out: Vec<(&str, &str)> = Vec::new();
        for m in &self.materials {
            let pair = (m.category.as_str(), m.subcategory.as_str());
            if !out.contains(&pair) {
                out.push(pair);
            }
        }
        out
    }

    /// Grades of the same subcategory (other than `grade`) whose `property`
    /// is at least `minimum` and whose embodied carbon does not exceed the
    /// reference grade's, ordered by embodied carbon then cost.
    pub fn sustainable_alternatives(
        &self,
        category: &str,
        subcategory: &str,
        grade: &str,
        property: &str,
        minimum: f64,
    ) -> EngineResult<Vec<&MaterialSpec>> {
        let reference = self.get(category, subcategory, grade)?;
        let mut out: Vec<&MaterialSpec> = self
            .materials
            .iter()
            .filter(|m| m.category == category && m.subcategory == subcategory)
            .filter(|m| !m.grade.eq_ignore_ascii_case(&reference.grade))
            .filter(|m| m.embodied_carbon_per_unit <= reference.embodied_carbon_per_unit)
            .filter(|m| m.property(property).is_some_and(|v| v >= minimum))
            .collect();
        // Stable sort keeps file order for exact ties
        out.sort_by(|a, b| {
            a.embodied_carbon_per_unit
                .total_cmp(&b.embodied_carbon_per_unit)
                .then(a.cost_per_unit.total_cmp(&b.cost_per_unit))
        });
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceData;

    fn db() -> MaterialDatabase {
        ReferenceData::embedded().unwrap().materials
    }

    #[test]
    fn test_concrete_properties() {
        let db = db();
        let c30 = db.get("concrete", "structural", "C30").unwrap();
        assert_eq!(c30.property("fck_mpa"), Some(30.0));
        assert!((c30.property("elastic_modulus_mpa").unwrap() - 25743.0).abs() < 1.0);
        assert_eq!(c30.unit, "m3");
    }

    #[test]
    fn test_grade_lookup_is_case_insensitive() {
        let db = db();
        assert!(db.get("pipe", "gravity", "upvc").is_ok());
        assert!(db.get("steel", "reinforcement", "b500").is_ok());
    }

    #[test]
    fn test_missing_material() {
        let err = db().get("concrete", "structural", "C99").unwrap_err();
        assert_eq!(err.error_code(), "MATERIAL_NOT_FOUND");
    }

    #[test]
    fn test_missing_property_is_reference_error() {
        let err = db().property("concrete", "structural", "C30", "fy_mpa").unwrap_err();
        assert_eq!(err.error_code(), "REFERENCE_DATA_ERROR");
    }

    #[test]
    fn test_grades_and_categories() {
        let db = db();
        let grades = db.grades("steel", "reinforcement");
        assert_eq!(grades, vec!["B420", "B500"]);
        let cats = db.categories();
        assert_eq!(cats[0], ("concrete", "structural"));
        assert!(cats.contains(&("cable", "conductor")));
        assert!(cats.contains(&("insulation", "thermal")));
    }

    #[test]
    fn test_sustainable_alternatives() {
        let db = db();
        let alts = db
            .sustainable_alternatives("concrete", "structural", "C40", "fck_mpa", 30.0)
            .unwrap();
        let names: Vec<&str> = alts.iter().map(|m| m.grade.as_str()).collect();
        // Lower-carbon grades first; C40 itself excluded
        assert_eq!(names.first(), Some(&"C30-GGBS"));
        assert!(!names.contains(&"C40"));
        assert!(!names.contains(&"C45"));
        assert!(names.iter().all(|g| *g != "C20" && *g != "C25"));
        for pair in alts.windows(2) {
            assert!(pair[0].embodied_carbon_per_unit <= pair[1].embodied_carbon_per_unit);
        }
    }

    #[test]
    fn test_duplicate_rejected() {
        let spec = db().get("concrete", "structural", "C30").unwrap().clone();
        let doc = MaterialDocument {
            version: "test".to_string(),
            materials: vec![spec.clone(), spec],
        };
        assert!(MaterialDatabase::from_document(doc).is_err());
    }
}
