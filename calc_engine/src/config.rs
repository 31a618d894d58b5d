//! # Engine Configuration
//!
//! Policy constants (compliance thresholds, score weights, design margins)
//! and runtime settings. Sources in increasing precedence: built-in
//! defaults, a TOML file, `CALC_ENGINE_*` environment variables.
//!
//! | Variable                           | Field                               | Default |
//! |------------------------------------|-------------------------------------|---------|
//! | `CALC_ENGINE_LOG_LEVEL`            | `log_level`                         | `info`  |
//! | `CALC_ENGINE_SIGNIFICANT_FIGURES`  | `significant_figures`               | `6`     |
//! | `CALC_ENGINE_REFERENCE_DATA_DIR`   | `reference_data_dir`                | unset   |
//! | `CALC_ENGINE_ADVISORY_RATIO`       | `compliance.advisory_ratio`         | `0.9`   |
//! | `CALC_ENGINE_BLOCKING_RATIO`       | `compliance.blocking_ratio`         | `1.0`   |
//! | `CALC_ENGINE_MAX_BASE_SHEAR`       | `design.max_base_shear_coefficient` | `0.20`  |
//!
//! ## Example
//!
//! ```rust
//! use calc_engine::config::EngineConfig;
//!
//! let cfg = EngineConfig::from_toml_str("[compliance]\nadvisory_ratio = 0.85\n").unwrap();
//! assert_eq!(cfg.compliance.advisory_ratio, 0.85);
//! assert_eq!(cfg.compliance.blocking_ratio, 1.0);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};
use crate::units::DEFAULT_SIGNIFICANT_FIGURES;

const ENV_PREFIX: &str = "CALC_ENGINE_";

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tracing filter string, e.g. `"calc_engine=debug,info"`
    pub log_level: String,
    /// Significant figures used when formatting converted quantities
    pub significant_figures: u32,
    /// Directory holding replacement reference-data documents
    pub reference_data_dir: Option<PathBuf>,
    pub compliance: ComplianceThresholds,
    pub scoring: ScoringWeights,
    pub design: DesignPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            log_level: "info".to_string(),
            significant_figures: DEFAULT_SIGNIFICANT_FIGURES,
            reference_data_dir: None,
            compliance: ComplianceThresholds::default(),
            scoring: ScoringWeights::default(),
            design: DesignPolicy::default(),
        }
    }
}

/// Utilization ratio thresholds read by the evaluators' ratio rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceThresholds {
    /// Ratios above this raise an advisory finding
    pub advisory_ratio: f64,
    /// Ratios above this raise a blocking finding
    pub blocking_ratio: f64,
}

impl Default for ComplianceThresholds {
    fn default() -> Self {
        ComplianceThresholds {
            advisory_ratio: 0.9,
            blocking_ratio: 1.0,
        }
    }
}

/// Weights of the evaluator score.
///
/// `score = 100 - ratio_weight * clamp((worst - floor) / (ceiling - floor), 0, 1)
///        - documentation_weight * missing / required
///        - blocking_penalty * blocking - advisory_penalty * advisory`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub ratio_weight: f64,
    pub ratio_floor: f64,
    pub ratio_ceiling: f64,
    pub documentation_weight: f64,
    pub blocking_penalty: f64,
    pub advisory_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        ScoringWeights {
            ratio_weight: 40.0,
            ratio_floor: 0.5,
            ratio_ceiling: 1.5,
            documentation_weight: 20.0,
            blocking_penalty: 25.0,
            advisory_penalty: 5.0,
        }
    }
}

/// Design policy constants used by the calculators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignPolicy {
    /// Ceiling on the seismic response coefficient Cs
    pub max_base_shear_coefficient: f64,
    /// Multiplier on the cooling-load subtotal
    pub cooling_safety_factor: f64,
    /// Multiplier on fire-alarm battery capacity
    pub battery_safety_margin: f64,
    /// Future-growth multiplier on UPS sizing
    pub ups_growth_margin: f64,
    /// I_eff / I_g for deflection of cracked concrete sections
    pub cracked_inertia_factor: f64,
    /// Default deflection limit as span / divisor
    pub deflection_limit_divisor: f64,
    /// Spare capacity multiplier on maximum demand
    pub spare_capacity_factor: f64,
}

impl Default for DesignPolicy {
    fn default() -> Self {
        DesignPolicy {
            max_base_shear_coefficient: 0.20,
            cooling_safety_factor: 1.10,
            battery_safety_margin: 1.25,
            ups_growth_margin: 1.25,
            cracked_inertia_factor: 0.5,
            deflection_limit_divisor: 250.0,
            spare_capacity_factor: 1.25,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let cfg: EngineConfig =
            toml::from_str(text).map_err(|e| EngineError::config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a TOML file
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| EngineError::config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Defaults, then the optional file, then the process environment.
    pub fn load(path: Option<&Path>) -> EngineResult<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env_with(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `CALC_ENGINE_*` overrides from an arbitrary variable source.
    ///
    /// A present but unparseable value is a `Config` error rather than
    /// being silently ignored.
    pub fn apply_env_with<F>(&mut self, var: F) -> EngineResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| var(&format!("{}{}", ENV_PREFIX, name));

        if let Some(v) = get("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = get("SIGNIFICANT_FIGURES") {
            self.significant_figures = parse_env("SIGNIFICANT_FIGURES", &v)?;
        }
        if let Some(v) = get("REFERENCE_DATA_DIR") {
            self.reference_data_dir = if v.is_empty() { None } else { Some(PathBuf::from(v)) };
        }
        if let Some(v) = get("ADVISORY_RATIO") {
            self.compliance.advisory_ratio = parse_env("ADVISORY_RATIO", &v)?;
        }
        if let Some(v) = get("BLOCKING_RATIO") {
            self.compliance.blocking_ratio = parse_env("BLOCKING_RATIO", &v)?;
        }
        if let Some(v) = get("MAX_BASE_SHEAR") {
            self.design.max_base_shear_coefficient = parse_env("MAX_BASE_SHEAR", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !(1..=15).contains(&self.significant_figures) {
            return Err(EngineError::config(format!(
                "significant_figures must be between 1 and 15, got {}",
                self.significant_figures
            )));
        }
        let c = &self.compliance;
        require_positive("compliance.advisory_ratio", c.advisory_ratio)?;
        require_positive("compliance.blocking_ratio", c.blocking_ratio)?;
        if c.advisory_ratio > c.blocking_ratio {
            return Err(EngineError::config(format!(
                "compliance.advisory_ratio ({}) must not exceed blocking_ratio ({})",
                c.advisory_ratio, c.blocking_ratio
            )));
        }

        let s = &self.scoring;
        for (name, value) in [
            ("scoring.ratio_weight", s.ratio_weight),
            ("scoring.documentation_weight", s.documentation_weight),
            ("scoring.blocking_penalty", s.blocking_penalty),
            ("scoring.advisory_penalty", s.advisory_penalty),
            ("scoring.ratio_floor", s.ratio_floor),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::config(format!("{} must be non-negative", name)));
            }
        }
        if !(s.ratio_ceiling.is_finite() && s.ratio_ceiling > s.ratio_floor) {
            return Err(EngineError::config(
                "scoring.ratio_ceiling must be greater than scoring.ratio_floor",
            ));
        }

        let d = &self.design;
        require_positive("design.max_base_shear_coefficient", d.max_base_shear_coefficient)?;
        require_positive("design.cooling_safety_factor", d.cooling_safety_factor)?;
        require_positive("design.battery_safety_margin", d.battery_safety_margin)?;
        require_positive("design.ups_growth_margin", d.ups_growth_margin)?;
        require_positive("design.cracked_inertia_factor", d.cracked_inertia_factor)?;
        require_positive("design.deflection_limit_divisor", d.deflection_limit_divisor)?;
        require_positive("design.spare_capacity_factor", d.spare_capacity_factor)?;
        Ok(())
    }
}

fn require_positive(name: &str, value: f64) -> EngineResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::config(format!("{} must be positive, got {}", name, value)))
    }
}

fn parse_env<T: FromStr>(name: &str, raw: &str) -> EngineResult<T> {
    raw.trim().parse().map_err(|_| {
        EngineError::config(format!("{}{}: cannot parse {:?}", ENV_PREFIX, name, raw))
    })
}
