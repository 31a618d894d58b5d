//! End-to-end dispatcher scenarios.

use std::sync::{Arc, Barrier};

use calc_engine::calculations::{CalculationOptions, CalculationRequest, Discipline};
use calc_engine::compliance::Severity;
use calc_engine::{Dispatcher, EngineConfig, EngineError};
use serde_json::{json, Value};

fn dispatcher() -> Dispatcher {
    Dispatcher::new(EngineConfig::default()).unwrap()
}

fn with_compliance() -> CalculationOptions {
    CalculationOptions {
        check_compliance: true,
        ..Default::default()
    }
}

fn beam(width: f64, depth: f64, span: f64) -> Value {
    json!({
        "width_mm": width,
        "depth_mm": depth,
        "span_m": span,
        "concrete_grade": "C30",
        "uniform_load_kn_m": 25
    })
}

// ============================================================================
// Beam analysis and the national code
// ============================================================================

#[test]
fn test_reference_beam_has_no_blocking_notes() {
    let d = dispatcher();
    let result = d
        .perform_calculation("civil", "beam-analysis", &beam(300.0, 600.0, 5.0), &with_compliance())
        .unwrap();
    let deflection = result.ratio("deflection").unwrap();
    assert!(deflection <= 0.8, "deflection ratio {}", deflection);

    let report = result.compliance_report.unwrap();
    assert!(report.passed);
    let national = &report.verdicts[0];
    assert_eq!(national.evaluator, "national-code");
    assert_eq!(national.blocking_count(), 0);
    assert!(report.references.iter().any(|r| r.contains("SBC 304")));
}

#[test]
fn test_slender_beam_blocks_on_deflection() {
    let d = dispatcher();
    let result = d
        .perform_calculation("civil", "beam-analysis", &beam(300.0, 400.0, 10.0), &with_compliance())
        .unwrap();
    assert!(result.ratio("deflection").unwrap() > 1.0);
    assert!(!result.compliance["deflection"].passed);

    let report = result.compliance_report.unwrap();
    assert!(!report.passed);
    let national = &report.verdicts[0];
    assert!(national
        .findings
        .iter()
        .any(|f| f.rule == "deflection" && f.severity == Severity::Blocking));
    assert!(national.score < 100.0);
}

#[test]
fn test_merged_notes_keep_evaluator_order() {
    let d = dispatcher();
    let mut inputs = beam(300.0, 400.0, 10.0);
    inputs["work_height_m"] = json!(6.0);
    let options = CalculationOptions {
        check_compliance: true,
        actor_role: Some("site_engineer".to_string()),
        actor_id: Some("u-1042".to_string()),
    };
    let report = d
        .perform_calculation("civil", "beam-analysis", &inputs, &options)
        .unwrap()
        .compliance_report
        .unwrap();

    let expected: Vec<String> = report.verdicts.iter().flat_map(|v| v.notes.clone()).collect();
    assert_eq!(report.notes, expected);
    assert!(!report.verdicts[2].passed);
    assert!(report.notes.last().unwrap().starts_with("site_engineer:"));
    assert_eq!(report.score, report.verdicts.iter().map(|v| v.score).fold(f64::MAX, f64::min));
}

#[test]
fn test_role_never_changes_pass_fail() {
    let d = dispatcher();
    let inputs = beam(300.0, 600.0, 5.0);
    for role in ["site_engineer", "project_manager", "safety_officer", "consultant", "contractor", "visitor"] {
        let options = CalculationOptions {
            check_compliance: true,
            actor_role: Some(role.to_string()),
            actor_id: None,
        };
        let report = d
            .perform_calculation("civil", "beam-analysis", &inputs, &options)
            .unwrap()
            .compliance_report
            .unwrap();
        assert!(report.passed, "role {}", role);
        assert!(report.notes.iter().all(|n| !n.starts_with(role)));
    }
}

// ============================================================================
// Loads
// ============================================================================

#[test]
fn test_load_combination_governance() {
    let d = dispatcher();
    let result = d
        .perform_calculation(
            "structural",
            "load-combinations",
            &json!({"loads": {"dead": 100, "live": 50, "wind": 30}, "limit_state": "strength"}),
            &CalculationOptions::default(),
        )
        .unwrap();
    let rows = result.value("combinations").unwrap().as_array().unwrap();
    let largest = rows
        .iter()
        .map(|r| r["value"].as_f64().unwrap())
        .fold(f64::MIN, f64::max);
    let first_largest = rows
        .iter()
        .find(|r| r["value"].as_f64().unwrap() == largest)
        .unwrap();
    assert_eq!(result.value("governing.name").unwrap(), &first_largest["name"]);
    assert_eq!(result.number("governing.value").unwrap(), largest);
}

#[test]
fn test_tied_combinations_pick_first_declared() {
    let d = dispatcher();
    // every row evaluates to zero
    let result = d
        .perform_calculation(
            "civil",
            "load-combinations",
            &json!({"loads": {"dead": 0}}),
            &CalculationOptions::default(),
        )
        .unwrap();
    let first = &result.value("combinations").unwrap()[0]["name"];
    assert_eq!(result.value("governing.name").unwrap(), first);
}

#[test]
fn test_top_down_storeys_are_rejected() {
    let d = dispatcher();
    let inputs = json!({
        "zone": "2A", "soil_class": "C", "importance_category": "II",
        "structural_system": "rc_shear_wall", "seismic_weight_kn": 10000,
        "storeys": [
            {"height_m": 9.0, "weight_kn": 3000},
            {"height_m": 6.0, "weight_kn": 3500},
            {"height_m": 3.0, "weight_kn": 3500}
        ]
    });
    let report = d.validate_inputs("civil", "seismic-loads", &inputs).unwrap();
    assert!(!report.is_valid);
    let err = d
        .perform_calculation("civil", "seismic-loads", &inputs, &CalculationOptions::default())
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
}

// ============================================================================
// Routing and errors
// ============================================================================

#[test]
fn test_unknown_calculation_is_unsupported() {
    let d = dispatcher();
    let err = d
        .perform_calculation("civil", "nonexistent-calc", &json!({}), &with_compliance())
        .unwrap_err();
    match err {
        EngineError::UnsupportedCalculation {
            discipline,
            calculation_type,
            available,
        } => {
            assert_eq!(discipline, "civil");
            assert_eq!(calculation_type, "nonexistent-calc");
            assert!(available.contains(&"beam-analysis".to_string()));
        }
        other => panic!("expected UnsupportedCalculation, got {other:?}"),
    }
}

#[test]
fn test_unknown_discipline_is_unknown_module() {
    let err = dispatcher().get_module("geotechnical").unwrap_err();
    assert_eq!(err.error_code(), "UNKNOWN_MODULE");
    assert!(err.is_client_error());
}

#[test]
fn test_validation_error_names_the_field() {
    let d = dispatcher();
    let err = d
        .perform_calculation("civil", "beam-analysis", &beam(300.0, -600.0, 5.0), &CalculationOptions::default())
        .unwrap_err();
    match err {
        EngineError::Validation {
            discipline,
            calculation_type,
            errors,
        } => {
            assert_eq!(discipline, "civil");
            assert_eq!(calculation_type, "beam-analysis");
            assert!(errors.iter().any(|e| e.field == "depth_mm"));
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[test]
fn test_count_overflow_is_a_calculation_error() {
    let d = dispatcher();
    let requests = [
        ("elv", "structured-cabling", json!({"outlets": 100_000, "ports_per_outlet": 100_000, "average_run_m": 40})),
        (
            "elv",
            "cctv-coverage",
            json!({"focal_length_mm": 4.0, "devices": [
                {"name": "a", "quantity": 4_000_000_000u32, "poe_w": 5, "bitrate_mbps": 4},
                {"name": "b", "quantity": 4_000_000_000u32, "poe_w": 5, "bitrate_mbps": 4}
            ]}),
        ),
        (
            "elv",
            "detector-coverage",
            json!({"areas": [
                {"name": "a", "area_m2": 1e12, "ceiling_height_m": 3},
                {"name": "b", "area_m2": 1e12, "ceiling_height_m": 3}
            ]}),
        ),
        (
            "electrical",
            "lighting-design",
            json!({"length_m": 10, "width_m": 8, "target_lux": 1e15,
                   "luminaire_lumens": 4000, "luminaire_watts": 36}),
        ),
    ];
    for (discipline, calc, inputs) in requests {
        let err = d
            .perform_calculation(discipline, calc, &inputs, &CalculationOptions::default())
            .unwrap_err();
        assert_eq!(err.error_code(), "CALCULATION_ERROR", "{}", calc);
    }
}

#[test]
fn test_error_json_is_tagged() {
    let err = dispatcher().get_module("mining").unwrap_err();
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["type"], "UnknownModule");
    assert_eq!(json["details"]["available"].as_array().unwrap().len(), 5);
}

// ============================================================================
// Every discipline end to end
// ============================================================================

#[test]
fn test_one_request_per_discipline() {
    let d = dispatcher();
    let requests = [
        json!({"discipline": "civil", "calculationType": "slab-design",
               "inputs": {"span_m": 4, "concrete_grade": "C30", "live_load_kpa": 3}}),
        json!({"discipline": "electrical", "calculationType": "cable-sizing",
               "inputs": {"design_current_a": 63, "length_m": 40}}),
        json!({"discipline": "hvac", "calculationType": "ventilation-rate",
               "inputs": {"space_type": "office", "floor_area_m2": 200}}),
        json!({"discipline": "sewerage", "calculationType": "pipe-sizing",
               "inputs": {"population": 400, "slope_percent": 1.0}}),
        json!({"discipline": "elv", "calculationType": "fire-alarm-battery",
               "inputs": {"standby_current_a": 0.5, "alarm_current_a": 2.0},
               "options": {"checkCompliance": true}}),
    ];
    for body in requests {
        let request: CalculationRequest = serde_json::from_value(body.clone()).unwrap();
        let result = d.execute(&request).unwrap_or_else(|e| panic!("{}: {}", body, e));
        assert_eq!(result.discipline.name(), request.discipline);
        assert_eq!(result.inputs, request.inputs);

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["standards"].is_array());
        assert!(json["recommendations"].is_array());
        assert!(!json.to_string().contains("null"), "null in {}", request.calculation_type);
    }
}

#[test]
fn test_fire_alarm_report_cites_both_codes() {
    let d = dispatcher();
    let result = d
        .perform_calculation(
            "elv",
            "fire-alarm-battery",
            &json!({"standby_current_a": 0.5, "alarm_current_a": 2.0}),
            &with_compliance(),
        )
        .unwrap();
    let report = result.compliance_report.unwrap();
    assert!(report.references.iter().any(|r| r.starts_with("SBC 801")));
    assert!(report.references.iter().any(|r| r.starts_with("NFPA 72")));
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_shared_dispatcher_across_threads() {
    let d = Arc::new(dispatcher());
    let threads = 12;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let d = Arc::clone(&d);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                let span = 4.0 + (i % 3) as f64;
                d.perform_calculation("civil", "beam-analysis", &beam(300.0, 600.0, span), &with_compliance())
                    .unwrap()
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(d.registry().constructions(), 1);
    assert!(d.registry().is_loaded(Discipline::Civil));
    // same span, same answer
    assert_eq!(results[0], results[3]);
}
