//! # Error Types
//!
//! Structured error types for calc_engine. Every error carries enough context
//! (discipline, calculation type, offending field where known) for a host to
//! render a user-facing message without parsing strings.
//!
//! ## Taxonomy
//!
//! | Variant                   | Raised when                                              |
//! |---------------------------|----------------------------------------------------------|
//! | `Validation`              | Input record is missing fields or holds bad values       |
//! | `UnknownModule`           | Discipline name does not resolve to a calculator         |
//! | `UnsupportedCalculation`  | Known discipline, unknown calculation type               |
//! | `Unit`                    | Invalid unit, unknown dimension, dimension mismatch      |
//! | `Calculation`             | Arithmetic failure inside an otherwise valid computation |
//! | `Evaluation`              | A compliance evaluator cannot even attempt the input     |
//!
//! A compliance check that *fails* is not an error: it is a normal verdict
//! with `passed = false`.
//!
//! ## Example
//!
//! ```rust
//! use calc_engine::errors::{EngineError, EngineResult, FieldError};
//!
//! fn validate_span(span_m: f64) -> EngineResult<()> {
//!     if span_m <= 0.0 {
//!         return Err(EngineError::validation(
//!             "civil",
//!             "beam-analysis",
//!             vec![FieldError::new("span_m", "must be positive")],
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert_eq!(validate_span(-1.0).unwrap_err().error_code(), "VALIDATION_ERROR");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for calc_engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Input key (dotted path for nested records, e.g. `elements[2].area_m2`)
    pub field: String,
    /// Why the value was rejected
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Build from a serde decoding failure.
    ///
    /// serde_json reports missing and duplicate fields with the key in
    /// backticks; that key becomes the field name. Other decode failures
    /// (wrong type, unknown variant) are attributed to `inputs`.
    pub fn from_decode(err: &serde_json::Error) -> Self {
        let message = err.to_string();
        let names_field = message.starts_with("missing field") || message.starts_with("duplicate field");
        let field = message
            .split('`')
            .nth(1)
            .filter(|name| names_field && !name.is_empty())
            .unwrap_or("inputs")
            .to_string();
        FieldError {
            field,
            reason: message,
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Errors from the unit converter.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum UnitError {
    /// Unit is not known in the requested dimension (nor any other)
    #[error("Invalid unit '{unit}' for dimension {dimension}")]
    InvalidUnit { unit: String, dimension: String },

    /// Dimension name is not recognised
    #[error("Unknown dimension '{dimension}'")]
    UnknownDimension { dimension: String },

    /// Unit exists, but belongs to a different dimension
    #[error("Dimension mismatch: '{unit}' is a {found} unit, expected {expected}")]
    DimensionMismatch {
        unit: String,
        expected: String,
        found: String,
    },

    /// NaN or infinite value handed to the converter
    #[error("Cannot convert non-finite value {value}")]
    NonFiniteValue { value: String },
}

/// Structured error type for engine operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum EngineError {
    /// One or more input fields are missing or invalid (raised before computation)
    #[error("Invalid input for {discipline}/{calculation_type}: {}", join_errors(.errors))]
    Validation {
        discipline: String,
        calculation_type: String,
        errors: Vec<FieldError>,
    },

    /// Discipline name does not resolve to a registered calculator
    #[error("Unknown module '{discipline}' (available: {})", .available.join(", "))]
    UnknownModule {
        discipline: String,
        available: Vec<String>,
    },

    /// Known discipline asked for a calculation it does not offer
    #[error("Unsupported calculation '{calculation_type}' for {discipline} (available: {})", .available.join(", "))]
    UnsupportedCalculation {
        discipline: String,
        calculation_type: String,
        available: Vec<String>,
    },

    /// Unit conversion failure
    #[error(transparent)]
    Unit(#[from] UnitError),

    /// Arithmetic failure during a pure computation
    #[error("Calculation failed: {discipline}/{calculation_type} - {reason}")]
    Calculation {
        discipline: String,
        calculation_type: String,
        reason: String,
    },

    /// Material not found in the material database
    #[error("Material not found: {category}/{subcategory}/{grade}")]
    MaterialNotFound {
        category: String,
        subcategory: String,
        grade: String,
    },

    /// A compliance evaluator cannot attempt the given discipline/type pair
    #[error("Evaluator '{evaluator}' cannot evaluate {discipline}/{calculation_type}: {reason}")]
    Evaluation {
        evaluator: String,
        discipline: String,
        calculation_type: String,
        reason: String,
    },

    /// Reference table failed to load or validate
    #[error("Reference data error in {source_name}: {reason}")]
    ReferenceData { source_name: String, reason: String },

    /// Configuration failed to load or validate
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl EngineError {
    /// Create a Validation error
    pub fn validation(
        discipline: impl Into<String>,
        calculation_type: impl Into<String>,
        errors: Vec<FieldError>,
    ) -> Self {
        EngineError::Validation {
            discipline: discipline.into(),
            calculation_type: calculation_type.into(),
            errors,
        }
    }

    /// Create a single-field Validation error with the routing context left
    /// blank; calculators fill it in via [`EngineError::in_context`].
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Validation {
            discipline: String::new(),
            calculation_type: String::new(),
            errors: vec![FieldError::new(field, reason)],
        }
    }

    /// Create a Calculation error with the routing context left blank.
    pub fn calculation(reason: impl Into<String>) -> Self {
        EngineError::Calculation {
            discipline: String::new(),
            calculation_type: String::new(),
            reason: reason.into(),
        }
    }

    /// Create an UnsupportedCalculation error
    pub fn unsupported(
        discipline: impl Into<String>,
        calculation_type: impl Into<String>,
        available: &[&str],
    ) -> Self {
        EngineError::UnsupportedCalculation {
            discipline: discipline.into(),
            calculation_type: calculation_type.into(),
            available: available.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a MaterialNotFound error
    pub fn material_not_found(
        category: impl Into<String>,
        subcategory: impl Into<String>,
        grade: impl Into<String>,
    ) -> Self {
        EngineError::MaterialNotFound {
            category: category.into(),
            subcategory: subcategory.into(),
            grade: grade.into(),
        }
    }

    /// Create a ReferenceData error
    pub fn reference_data(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::ReferenceData {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Create a Config error
    pub fn config(reason: impl Into<String>) -> Self {
        EngineError::Config {
            reason: reason.into(),
        }
    }

    /// Create an Evaluation error
    pub fn evaluation(
        evaluator: impl Into<String>,
        discipline: impl Into<String>,
        calculation_type: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        EngineError::Evaluation {
            evaluator: evaluator.into(),
            discipline: discipline.into(),
            calculation_type: calculation_type.into(),
            reason: reason.into(),
        }
    }

    /// Fill in blank discipline/calculation-type context.
    ///
    /// Already-populated context is never overwritten, so the innermost
    /// caller that knew the routing wins.
    pub fn in_context(mut self, discipline: &str, calc_type: &str) -> Self {
        match &mut self {
            EngineError::Validation {
                discipline: d,
                calculation_type: c,
                ..
            }
            | EngineError::Calculation {
                discipline: d,
                calculation_type: c,
                ..
            } => {
                if d.is_empty() {
                    *d = discipline.to_string();
                }
                if c.is_empty() {
                    *c = calc_type.to_string();
                }
            }
            _ => {}
        }
        self
    }

    /// Whether the error was caused by the caller's request (as opposed to
    /// an engine-side data or configuration problem).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EngineError::Validation { .. }
                | EngineError::UnknownModule { .. }
                | EngineError::UnsupportedCalculation { .. }
                | EngineError::Unit(_)
                | EngineError::Calculation { .. }
                | EngineError::MaterialNotFound { .. }
                | EngineError::Evaluation { .. }
                | EngineError::Serialization { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::Validation { .. } => "VALIDATION_ERROR",
            EngineError::UnknownModule { .. } => "UNKNOWN_MODULE",
            EngineError::UnsupportedCalculation { .. } => "UNSUPPORTED_CALCULATION",
            EngineError::Unit(_) => "UNIT_ERROR",
            EngineError::Calculation { .. } => "CALCULATION_ERROR",
            EngineError::MaterialNotFound { .. } => "MATERIAL_NOT_FOUND",
            EngineError::Evaluation { .. } => "EVALUATION_ERROR",
            EngineError::ReferenceData { .. } => "REFERENCE_DATA_ERROR",
            EngineError::Config { .. } => "CONFIG_ERROR",
            EngineError::Serialization { .. } => "SERIALIZATION_ERROR",
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization {
            reason: err.to_string(),
        }
    }
}
