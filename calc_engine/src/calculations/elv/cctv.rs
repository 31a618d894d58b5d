//! Camera field of view, pixel-density range, camera count and the
//! aggregated PoE and storage load of the camera schedule.

use serde::{Deserialize, Serialize};

use super::{aggregate, default_quantity};
use crate::calculations::{count_total, whole_count, ComplianceCheck, InputRecord, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineError, EngineResult, FieldError};
use crate::validation::FieldChecks;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDevice {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub poe_w: f64,
    pub bitrate_mbps: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CctvCoverageInput {
    pub focal_length_mm: f64,
    #[serde(default = "default_sensor")]
    pub sensor_format: String,
    #[serde(default = "default_resolution")]
    pub horizontal_resolution_px: f64,
    /// Pixels per metre at the target: 250 identify, 125 recognise, 62 observe, 25 detect
    #[serde(default = "default_ppm")]
    pub target_pixels_per_m: f64,
    #[serde(default)]
    pub area_m2: Option<f64>,
    #[serde(default = "default_overlap")]
    pub overlap_percent: f64,
    #[serde(default)]
    pub devices: Vec<CameraDevice>,
    #[serde(default = "default_retention")]
    pub retention_days: f64,
    #[serde(default = "default_hours")]
    pub recording_hours_per_day: f64,
    #[serde(default)]
    pub switch_poe_budget_w: Option<f64>,
}

fn default_sensor() -> String {
    "1/2.8".to_string()
}

fn default_resolution() -> f64 {
    1920.0
}

fn default_ppm() -> f64 {
    125.0
}

fn default_overlap() -> f64 {
    20.0
}

fn default_retention() -> f64 {
    30.0
}

fn default_hours() -> f64 {
    24.0
}

impl InputRecord for CctvCoverageInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks
            .in_range("focal_length_mm", self.focal_length_mm, 1.0, 300.0)
            .positive("horizontal_resolution_px", self.horizontal_resolution_px)
            .positive("target_pixels_per_m", self.target_pixels_per_m)
            .positive_opt("area_m2", self.area_m2)
            .in_range("overlap_percent", self.overlap_percent, 0.0, 75.0)
            .positive("retention_days", self.retention_days)
            .in_range("recording_hours_per_day", self.recording_hours_per_day, 0.0, 24.0)
            .positive_opt("switch_poe_budget_w", self.switch_poe_budget_w);
        for (i, d) in self.devices.iter().enumerate() {
            checks
                .non_negative(format!("devices[{}].poe_w", i), d.poe_w)
                .non_negative(format!("devices[{}].bitrate_mbps", i), d.bitrate_mbps);
        }
        checks.known(
            "sensor_format",
            "camera sensor",
            &self.sensor_format,
            ctx.data.elv.sensor_width(&self.sensor_format),
        );
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CctvCoverageResult {
    pub sensor_width_mm: f64,
    pub horizontal_fov_deg: f64,
    pub max_distance_m: f64,
    pub scene_width_m: f64,
    pub coverage_per_camera_m2: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cameras_required: Option<u32>,
    pub scheduled_cameras: u32,
    pub total_poe_w: f64,
    pub total_bandwidth_mbps: f64,
    pub storage_tb: f64,
}

pub fn coverage(ctx: &EngineContext, input: &CctvCoverageInput) -> EngineResult<CctvCoverageResult> {
    let sensor = ctx.data.elv.sensor_width(&input.sensor_format).ok_or_else(|| {
        EngineError::invalid_field("sensor_format", format!("no camera sensor entry for '{}'", input.sensor_format))
    })?;
    let half_angle = (sensor / (2.0 * input.focal_length_mm)).atan();
    // Scene width at the target density, and the distance where the lens frames it
    let scene_width = input.horizontal_resolution_px / input.target_pixels_per_m;
    let distance = scene_width / (2.0 * half_angle.tan());
    let wedge = 0.5 * distance * scene_width;
    let effective = wedge * (1.0 - input.overlap_percent / 100.0);
    let cameras = input
        .area_m2
        .map(|a| whole_count((a / effective).ceil().max(1.0), "cameras required"))
        .transpose()?;

    let bandwidth = aggregate(&input.devices, |d| d.quantity, |d| d.bitrate_mbps);
    let seconds = input.recording_hours_per_day * 3600.0 * input.retention_days;

    Ok(CctvCoverageResult {
        sensor_width_mm: sensor,
        horizontal_fov_deg: (2.0 * half_angle).to_degrees(),
        max_distance_m: distance,
        scene_width_m: scene_width,
        coverage_per_camera_m2: wedge,
        cameras_required: cameras,
        scheduled_cameras: count_total(input.devices.iter().map(|d| d.quantity), "scheduled cameras")?,
        total_poe_w: aggregate(&input.devices, |d| d.quantity, |d| d.poe_w),
        total_bandwidth_mbps: bandwidth,
        // Mbit -> MB -> TB
        storage_tb: bandwidth * seconds / 8.0 / 1e6,
    })
}

pub(crate) fn calculate(ctx: &EngineContext, input: &CctvCoverageInput) -> EngineResult<Outcome> {
    let r = coverage(ctx, input)?;
    let mut outcome = Outcome::new(&r)?.standards(&[
        "IEC 62676-4 - Video surveillance systems, application guidelines",
        "SBC 801 - Fire and life safety, security provisions",
    ]);
    if let Some(required) = r.cameras_required {
        if r.scheduled_cameras > 0 {
            outcome = outcome.check(
                "camera_count",
                ComplianceCheck::flag(
                    r.scheduled_cameras >= required,
                    format!("{} scheduled, {} required for the area", r.scheduled_cameras, required),
                ),
            );
        }
        outcome = outcome.recommend(format!(
            "{} camera(s) at up to {:.1} m for {:.0} px/m",
            required, r.max_distance_m, input.target_pixels_per_m
        ));
    }
    if let Some(budget) = input.switch_poe_budget_w {
        outcome = outcome.check(
            "poe_budget",
            ComplianceCheck::ratio(
                r.total_poe_w / budget,
                format!("{:.0} W of {:.0} W PoE budget", r.total_poe_w, budget),
            ),
        );
    }
    Ok(outcome.recommend_if(
        r.storage_tb > 0.0,
        format!("Provision {:.1} TB of recording storage", r.storage_tb),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::test_support::context;
    use serde_json::json;

    #[test]
    fn test_field_of_view_and_range() {
        let ctx = context();
        let input: CctvCoverageInput =
            serde_json::from_value(json!({"focal_length_mm": 4.0, "sensor_format": "1/3"})).unwrap();
        let r = coverage(&ctx, &input).unwrap();
        // 2·atan(4.8/8) = 61.93°
        assert!((r.horizontal_fov_deg - 61.93).abs() < 0.01);
        // 1920/125 = 15.36 m wide scene at 15.36·4/4.8 = 12.8 m
        assert!((r.scene_width_m - 15.36).abs() < 1e-9);
        assert!((r.max_distance_m - 12.8).abs() < 1e-9);
    }

    #[test]
    fn test_camera_count_and_storage() {
        let ctx = context();
        let input: CctvCoverageInput = serde_json::from_value(json!({
            "focal_length_mm": 4.0, "sensor_format": "1/3", "area_m2": 1000,
            "devices": [{"name": "dome", "quantity": 10, "poe_w": 6.5, "bitrate_mbps": 4}]
        }))
        .unwrap();
        let r = coverage(&ctx, &input).unwrap();
        // wedge 0.5·12.8·15.36 = 98.3 m², 78.6 m² after overlap -> 13 cameras
        assert_eq!(r.cameras_required, Some(13));
        assert!((r.total_poe_w - 65.0).abs() < 1e-9);
        // 40 Mbps for 30 days = 12.96 TB
        assert!((r.storage_tb - 12.96).abs() < 1e-9);
    }

    #[test]
    fn test_schedule_overflow_is_an_error() {
        let ctx = context();
        let input: CctvCoverageInput = serde_json::from_value(json!({
            "focal_length_mm": 4.0,
            "devices": [
                {"name": "dome", "quantity": 4_000_000_000u32, "poe_w": 6.5, "bitrate_mbps": 4},
                {"name": "bullet", "quantity": 4_000_000_000u32, "poe_w": 8.0, "bitrate_mbps": 6}
            ]
        }))
        .unwrap();
        assert!(input.check(&ctx).is_empty());
        let err = coverage(&ctx, &input).unwrap_err();
        assert!(err.to_string().contains("scheduled cameras"));
    }

    #[test]
    fn test_uncountable_area_is_an_error() {
        let ctx = context();
        let input: CctvCoverageInput =
            serde_json::from_value(json!({"focal_length_mm": 4.0, "area_m2": 1e300})).unwrap();
        let err = coverage(&ctx, &input).unwrap_err();
        assert_eq!(err.error_code(), "CALCULATION_ERROR");
    }
}
