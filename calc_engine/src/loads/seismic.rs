//! Equivalent lateral force seismic load.
//!
//! `Cs = min(Z·S·I / R, cap)`, `V = Cs·W`. The cap is a policy ceiling for
//! the low-seismicity regime the tool targets, not a physical limit; the
//! result reports whether it applied. With a storey list the base shear is
//! distributed as `F_x = V·w_x·h_x / Σ(w·h)`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult, FieldError};
use crate::reference::loads::SeismicTables;
use crate::reference::lookup;
use crate::validation::FieldChecks;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreyInput {
    /// Height of the floor above the base; storeys are listed from the base up
    pub height_m: f64,
    pub weight_kn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeismicLoadInput {
    pub zone: String,
    pub soil_class: String,
    pub importance_category: String,
    pub structural_system: String,
    pub seismic_weight_kn: f64,
    #[serde(default)]
    pub storeys: Vec<StoreyInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreyForce {
    /// 1-based from the base
    pub level: usize,
    pub height_m: f64,
    pub weight_kn: f64,
    pub force_kn: f64,
    /// Shear in the storey below this level
    pub storey_shear_kn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeismicLoadResult {
    pub zone_factor: f64,
    pub soil_factor: f64,
    pub importance_factor: f64,
    pub response_modification: f64,
    pub uncapped_coefficient: f64,
    pub seismic_coefficient: f64,
    pub capped: bool,
    pub seismic_weight_kn: f64,
    pub base_shear_kn: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub storey_forces: Vec<StoreyForce>,
}

pub(crate) fn check(tables: &SeismicTables, input: &SeismicLoadInput) -> Vec<FieldError> {
    let mut checks = FieldChecks::new();
    checks.positive("seismic_weight_kn", input.seismic_weight_kn);
    checks.known(
        "zone",
        "seismic zone",
        &input.zone,
        lookup(&tables.zone_factor, &input.zone),
    );
    checks.known(
        "soil_class",
        "soil factor",
        &input.soil_class,
        lookup(&tables.soil_factor, &input.soil_class),
    );
    checks.known(
        "importance_category",
        "importance factor",
        &input.importance_category,
        lookup(&tables.importance_factor, &input.importance_category),
    );
    checks.known(
        "structural_system",
        "response modification factor",
        &input.structural_system,
        lookup(&tables.response_modification, &input.structural_system),
    );
    for (i, storey) in input.storeys.iter().enumerate() {
        checks.positive(format!("storeys[{}].height_m", i), storey.height_m);
        checks.non_negative(format!("storeys[{}].weight_kn", i), storey.weight_kn);
    }
    // Levels and storey shears are numbered from the base in list order
    for (i, pair) in input.storeys.windows(2).enumerate() {
        checks.require(
            pair[1].height_m > pair[0].height_m,
            format!("storeys[{}].height_m", i + 1),
            format!("must be above storeys[{}] ({} m); list storeys from the base up", i, pair[0].height_m),
        );
    }
    checks.finish()
}

pub(crate) fn calculate(
    tables: &SeismicTables,
    input: &SeismicLoadInput,
    cap: f64,
) -> EngineResult<SeismicLoadResult> {
    let factor = |map: &BTreeMap<String, f64>, key: &str, what: &str| {
        lookup(map, key)
            .copied()
            .ok_or_else(|| EngineError::calculation(format!("seismic table lookup failed: {}", what)))
    };
    let z = factor(&tables.zone_factor, &input.zone, "zone")?;
    let s = factor(&tables.soil_factor, &input.soil_class, "soil_class")?;
    let i = factor(&tables.importance_factor, &input.importance_category, "importance_category")?;
    let r = factor(&tables.response_modification, &input.structural_system, "structural_system")?;

    let uncapped = z * s * i / r;
    let capped = uncapped > cap;
    let cs = uncapped.min(cap);
    let base_shear = cs * input.seismic_weight_kn;

    let storey_forces = if input.storeys.is_empty() {
        Vec::new()
    } else {
        distribute(base_shear, &input.storeys)?
    };

    Ok(SeismicLoadResult {
        zone_factor: z,
        soil_factor: s,
        importance_factor: i,
        response_modification: r,
        uncapped_coefficient: uncapped,
        seismic_coefficient: cs,
        capped,
        seismic_weight_kn: input.seismic_weight_kn,
        base_shear_kn: base_shear,
        storey_forces,
    })
}

fn distribute(base_shear: f64, storeys: &[StoreyInput]) -> EngineResult<Vec<StoreyForce>> {
    let sum_wh: f64 = storeys.iter().map(|s| s.weight_kn * s.height_m).sum();
    if sum_wh <= 0.0 {
        return Err(EngineError::calculation(
            "storey weights are all zero; cannot distribute base shear",
        ));
    }
    let forces: Vec<f64> = storeys
        .iter()
        .map(|s| base_shear * s.weight_kn * s.height_m / sum_wh)
        .collect();
    let mut out = Vec::with_capacity(storeys.len());
    for (idx, storey) in storeys.iter().enumerate() {
        let storey_shear: f64 = forces[idx..].iter().sum();
        out.push(StoreyForce {
            level: idx + 1,
            height_m: storey.height_m,
            weight_kn: storey.weight_kn,
            force_kn: forces[idx],
            storey_shear_kn: storey_shear,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loads::LoadCalculator;
    use crate::reference::ReferenceData;

    fn input(zone: &str, system: &str) -> SeismicLoadInput {
        SeismicLoadInput {
            zone: zone.to_string(),
            soil_class: "C".to_string(),
            importance_category: "II".to_string(),
            structural_system: system.to_string(),
            seismic_weight_kn: 10_000.0,
            storeys: Vec::new(),
        }
    }

    #[test]
    fn test_uncapped_coefficient() {
        let data = ReferenceData::embedded().unwrap();
        let calc = LoadCalculator::new(&data.loads, 0.2);
        // 0.15 * 1.2 * 1.0 / 5.0 = 0.036
        let r = calc
            .calculate_seismic_loads(&input("2A", "rc_shear_wall"))
            .unwrap();
        assert!((r.seismic_coefficient - 0.036).abs() < 1e-12);
        assert!(!r.capped);
        assert!((r.base_shear_kn - 360.0).abs() < 1e-9);
        assert!(r.storey_forces.is_empty());
    }

    #[test]
    fn test_cap_applies() {
        let data = ReferenceData::embedded().unwrap();
        let calc = LoadCalculator::new(&data.loads, 0.05);
        // 0.40 * 1.2 / 2.5 = 0.192 > 0.05
        let r = calc
            .calculate_seismic_loads(&input("4", "masonry_bearing_wall"))
            .unwrap();
        assert!(r.capped);
        assert_eq!(r.seismic_coefficient, 0.05);
        assert!((r.uncapped_coefficient - 0.192).abs() < 1e-12);
    }

    #[test]
    fn test_vertical_distribution() {
        let data = ReferenceData::embedded().unwrap();
        let calc = LoadCalculator::new(&data.loads, 0.2);
        let mut i = input("2A", "rc_shear_wall");
        i.storeys = vec![
            StoreyInput { height_m: 3.0, weight_kn: 5000.0 },
            StoreyInput { height_m: 6.0, weight_kn: 5000.0 },
        ];
        let r = calc.calculate_seismic_loads(&i).unwrap();
        // w·h = 15000 and 30000: one third and two thirds of V
        assert!((r.storey_forces[0].force_kn - 120.0).abs() < 1e-9);
        assert!((r.storey_forces[1].force_kn - 240.0).abs() < 1e-9);
        assert!((r.storey_forces[0].storey_shear_kn - 360.0).abs() < 1e-9);
        assert!((r.storey_forces[1].storey_shear_kn - 240.0).abs() < 1e-9);
    }

    #[test]
    fn test_weightless_storeys_are_calculation_error() {
        let data = ReferenceData::embedded().unwrap();
        let calc = LoadCalculator::new(&data.loads, 0.2);
        let mut i = input("1", "rc_shear_wall");
        i.storeys = vec![StoreyInput { height_m: 3.0, weight_kn: 0.0 }];
        let err = calc.calculate_seismic_loads(&i).unwrap_err();
        assert_eq!(err.error_code(), "CALCULATION_ERROR");
    }

    #[test]
    fn test_storeys_must_ascend_from_the_base() {
        let data = ReferenceData::embedded().unwrap();
        let calc = LoadCalculator::new(&data.loads, 0.2);
        let mut i = input("2A", "rc_shear_wall");
        i.storeys = vec![
            StoreyInput { height_m: 6.0, weight_kn: 5000.0 },
            StoreyInput { height_m: 3.0, weight_kn: 5000.0 },
        ];
        let errors = calc.check_seismic_loads(&i);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "storeys[1].height_m");

        let err = calc.calculate_seismic_loads(&i).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        i.storeys[1].height_m = 6.0;
        assert_eq!(calc.check_seismic_loads(&i)[0].field, "storeys[1].height_m");
    }

    #[test]
    fn test_unknown_zone() {
        let data = ReferenceData::embedded().unwrap();
        let calc = LoadCalculator::new(&data.loads, 0.2);
        let errors = calc.check_seismic_loads(&input("9", "rc_shear_wall"));
        assert_eq!(errors[0].field, "zone");
    }
}
