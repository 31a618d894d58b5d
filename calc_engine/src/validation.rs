//! Field-by-field input checks.
//!
//! [`FieldChecks`] collects every rejected field instead of stopping at the
//! first, so `validate_inputs` can report the whole record at once.
//!
//! ```rust
//! use calc_engine::validation::FieldChecks;
//!
//! let mut checks = FieldChecks::new();
//! checks.positive("span_m", -2.0).in_range("cover_mm", 10.0, 20.0, 100.0);
//! let errors = checks.finish();
//! assert_eq!(errors.len(), 2);
//! assert_eq!(errors[0].field, "span_m");
//! ```

use crate::errors::{EngineError, EngineResult, FieldError};

#[derive(Debug, Default)]
pub struct FieldChecks {
    errors: Vec<FieldError>,
}

impl FieldChecks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) -> &mut Self {
        self.errors.push(FieldError::new(field, reason));
        self
    }

    /// Record `reason` against `field` unless `ok`
    pub fn require(&mut self, ok: bool, field: impl Into<String>, reason: impl Into<String>) -> &mut Self {
        if !ok {
            self.push(field, reason);
        }
        self
    }

    pub fn finite(&mut self, field: impl Into<String>, value: f64) -> &mut Self {
        self.require(value.is_finite(), field, "must be a finite number")
    }

    pub fn positive(&mut self, field: impl Into<String>, value: f64) -> &mut Self {
        self.require(value.is_finite() && value > 0.0, field, "must be greater than zero")
    }

    pub fn non_negative(&mut self, field: impl Into<String>, value: f64) -> &mut Self {
        self.require(value.is_finite() && value >= 0.0, field, "must not be negative")
    }

    /// Inclusive range check
    pub fn in_range(&mut self, field: impl Into<String>, value: f64, min: f64, max: f64) -> &mut Self {
        self.require(
            value.is_finite() && value >= min && value <= max,
            field,
            format!("must be between {} and {}", min, max),
        )
    }

    pub fn positive_opt(&mut self, field: impl Into<String>, value: Option<f64>) -> &mut Self {
        match value {
            Some(v) => self.positive(field, v),
            None => self,
        }
    }

    pub fn in_range_opt(
        &mut self,
        field: impl Into<String>,
        value: Option<f64>,
        min: f64,
        max: f64,
    ) -> &mut Self {
        match value {
            Some(v) => self.in_range(field, v, min, max),
            None => self,
        }
    }

    pub fn not_blank(&mut self, field: impl Into<String>, value: &str) -> &mut Self {
        self.require(!value.trim().is_empty(), field, "must not be empty")
    }

    pub fn non_empty<T>(&mut self, field: impl Into<String>, items: &[T]) -> &mut Self {
        self.require(!items.is_empty(), field, "must contain at least one entry")
    }

    /// Case-insensitive membership in a closed set of names
    pub fn one_of(&mut self, field: impl Into<String>, value: &str, allowed: &[&str]) -> &mut Self {
        let ok = allowed.iter().any(|a| a.eq_ignore_ascii_case(value));
        self.require(
            ok,
            field,
            format!("unknown value '{}', expected one of: {}", value, allowed.join(", ")),
        )
    }

    /// Record an "unknown key" error when a table lookup came back empty
    pub fn known<T>(
        &mut self,
        field: impl Into<String>,
        what: &str,
        key: &str,
        found: Option<T>,
    ) -> Option<T> {
        if found.is_none() {
            self.push(field, format!("no {} entry for '{}'", what, key));
        }
        found
    }

    pub fn extend(&mut self, errors: Vec<FieldError>) -> &mut Self {
        self.errors.extend(errors);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Vec<FieldError> {
        self.errors
    }

    /// `Ok(())` when nothing was rejected, otherwise a `Validation` error
    /// with blank routing context.
    pub fn into_result(self) -> EngineResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::validation("", "", self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_all_errors() {
        let mut c = FieldChecks::new();
        c.positive("a", 0.0)
            .non_negative("b", -1.0)
            .non_negative("c", 0.0)
            .positive("d", f64::NAN)
            .one_of("e", "Conduit", &["conduit", "tray"])
            .one_of("f", "ladder", &["conduit", "tray"]);
        let fields: Vec<String> = c.finish().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["a", "b", "d", "f"]);
    }

    #[test]
    fn test_known_reports_missing_key() {
        let mut c = FieldChecks::new();
        let hit = c.known("location", "wind speed", "riyadh", Some(40.0));
        let miss: Option<f64> = c.known("location", "wind speed", "atlantis", None);
        assert_eq!(hit, Some(40.0));
        assert!(miss.is_none());
        let errors = c.finish();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].reason.contains("atlantis"));
    }

    #[test]
    fn test_into_result() {
        assert!(FieldChecks::new().into_result().is_ok());
        let mut c = FieldChecks::new();
        c.in_range("power_factor", 1.2, 0.1, 1.0);
        let err = c.into_result().unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }
}
