//! # Discipline Calculations
//!
//! One [`Calculator`] per engineering discipline, each a closed menu of
//! named calculations. Every calculation follows the same pattern:
//!
//! - `*Input` - typed input record, decoded from the request's input map
//!   (unknown extra keys are ignored) and checked field by field
//! - `*Result` - typed result record, flattened into `results`
//! - a pure function `(context, input) -> EngineResult<Outcome>`
//!
//! Inline utilization checks (`applied / allowable`, failing above 1.0) are
//! reported in `compliance` independently of the external evaluators.
//!
//! ## Available Calculators
//!
//! - [`civil`] - beams, columns, foundations, slabs, quantities, loads
//! - [`electrical`] - cables, voltage drop, demand, fault level, lighting
//! - [`hvac`] - cooling load, ventilation, ducts, chilled water pipes
//! - [`sewerage`] - gravity pipes, storm drainage, septic tanks, fixture units
//! - [`elv`] - CCTV, fire alarm batteries, power budgets, cabling, detectors

pub mod civil;
pub mod electrical;
pub mod elv;
pub mod hvac;
pub mod sewerage;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::compliance::ComplianceReport;
use crate::context::EngineContext;
use crate::errors::{EngineError, EngineResult, FieldError};

pub use civil::CivilCalculator;
pub use electrical::ElectricalCalculator;
pub use elv::ElvCalculator;
pub use hvac::HvacCalculator;
pub use sewerage::SewerageCalculator;

// ============================================================================
// Disciplines
// ============================================================================

/// Engineering specialty served by one calculator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discipline {
    #[serde(alias = "structural")]
    Civil,
    Electrical,
    Hvac,
    #[serde(alias = "plumbing", alias = "drainage")]
    Sewerage,
    Elv,
}

impl Discipline {
    pub const ALL: [Discipline; 5] = [
        Discipline::Civil,
        Discipline::Electrical,
        Discipline::Hvac,
        Discipline::Sewerage,
        Discipline::Elv,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Discipline::Civil => "civil",
            Discipline::Electrical => "electrical",
            Discipline::Hvac => "hvac",
            Discipline::Sewerage => "sewerage",
            Discipline::Elv => "elv",
        }
    }

    /// Position in [`Discipline::ALL`]
    pub fn index(&self) -> usize {
        match self {
            Discipline::Civil => 0,
            Discipline::Electrical => 1,
            Discipline::Hvac => 2,
            Discipline::Sewerage => 3,
            Discipline::Elv => 4,
        }
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Discipline {
    type Err = EngineError;

    /// Case-insensitive, accepting `structural`, `plumbing` and `drainage` aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "civil" | "structural" => Ok(Discipline::Civil),
            "electrical" => Ok(Discipline::Electrical),
            "hvac" => Ok(Discipline::Hvac),
            "sewerage" | "plumbing" | "drainage" => Ok(Discipline::Sewerage),
            "elv" => Ok(Discipline::Elv),
            _ => Err(EngineError::UnknownModule {
                discipline: s.to_string(),
                available: Discipline::ALL.iter().map(|d| d.name().to_string()).collect(),
            }),
        }
    }
}

/// Closed calculation menu of a discipline, in declaration order
pub fn menu(discipline: Discipline) -> &'static [&'static str] {
    match discipline {
        Discipline::Civil => civil::CALCULATIONS,
        Discipline::Electrical => electrical::CALCULATIONS,
        Discipline::Hvac => hvac::CALCULATIONS,
        Discipline::Sewerage => sewerage::CALCULATIONS,
        Discipline::Elv => elv::CALCULATIONS,
    }
}

// ============================================================================
// Request / result records
// ============================================================================

/// Per-call options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalculationOptions {
    /// Run the compliance evaluators and attach the merged report
    pub check_compliance: bool,
    /// Passthrough context for role-conditioned advisory text
    pub actor_role: Option<String>,
    pub actor_id: Option<String>,
}

/// A decoded calculation request
///
/// ## JSON Example
///
/// ```json
/// {
///   "discipline": "civil",
///   "calculationType": "beam-analysis",
///   "inputs": { "width_mm": 300, "depth_mm": 600, "span_m": 5,
///               "concrete_grade": "C30", "uniform_load_kn_m": 25 },
///   "options": { "checkCompliance": true, "actorRole": "site_engineer" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRequest {
    pub discipline: String,
    pub calculation_type: String,
    #[serde(default = "empty_object")]
    pub inputs: Value,
    #[serde(default)]
    pub options: CalculationOptions,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Inline pass/fail entry embedded in a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl ComplianceCheck {
    /// Utilization check: passes while `ratio <= 1.0`
    pub fn ratio(ratio: f64, note: impl Into<String>) -> Self {
        ComplianceCheck {
            passed: ratio <= 1.0,
            ratio: Some(ratio),
            notes: vec![note.into()],
        }
    }

    /// Boolean check with no ratio
    pub fn flag(passed: bool, note: impl Into<String>) -> Self {
        ComplianceCheck {
            passed,
            ratio: None,
            notes: vec![note.into()],
        }
    }
}

/// Output of one calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub discipline: Discipline,
    pub calculation_type: String,
    /// Echo of the request inputs
    pub inputs: Value,
    pub results: Map<String, Value>,
    pub compliance: BTreeMap<String, ComplianceCheck>,
    pub recommendations: Vec<String>,
    pub standards: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_report: Option<ComplianceReport>,
}

impl CalculationResult {
    /// Look up a result value by dotted path (`"forces_kn.windward"`)
    pub fn value(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.results.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn number(&self, path: &str) -> Option<f64> {
        self.value(path).and_then(Value::as_f64)
    }

    /// Ratio of an inline compliance entry
    pub fn ratio(&self, check: &str) -> Option<f64> {
        self.compliance.get(check).and_then(|c| c.ratio)
    }

    /// Largest inline ratio, if any entry carries one
    pub fn worst_ratio(&self) -> Option<f64> {
        self.compliance
            .values()
            .filter_map(|c| c.ratio)
            .fold(None, |acc, r| Some(acc.map_or(r, |a: f64| a.max(r))))
    }
}

/// Outcome of `validate_inputs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<FieldError>) -> Self {
        ValidationReport {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

// ============================================================================
// Calculator interface
// ============================================================================

/// A discipline module: a closed, ordered menu of calculations.
///
/// Implementations hold only shared read-only context, so a single instance
/// serves any number of concurrent callers.
pub trait Calculator: Send + Sync {
    fn discipline(&self) -> Discipline;

    fn available_calculations(&self) -> &'static [&'static str];

    /// Decode and check inputs without computing anything.
    fn validate_inputs(&self, calculation_type: &str, inputs: &Value) -> EngineResult<ValidationReport>;

    /// Run one calculation. Invalid inputs fail with `Validation` before any
    /// arithmetic; unknown names fail with `UnsupportedCalculation`.
    fn calculate(
        &self,
        calculation_type: &str,
        inputs: &Value,
        options: &CalculationOptions,
    ) -> EngineResult<CalculationResult>;

    fn supports(&self, calculation_type: &str) -> bool {
        self.available_calculations().contains(&calculation_type)
    }
}

/// Input record for one `(discipline, calculationType)` pair
pub trait InputRecord: DeserializeOwned {
    /// Every rejected field; empty when the record is usable.
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError>;
}

pub(crate) fn decode<T: DeserializeOwned>(inputs: &Value) -> Result<T, Vec<FieldError>> {
    if !inputs.is_object() {
        return Err(vec![FieldError::new("inputs", "must be a JSON object")]);
    }
    T::deserialize(inputs).map_err(|e| vec![FieldError::from_decode(&e)])
}

/// Field errors for `inputs` decoded as `T`
pub(crate) fn check_record<T: InputRecord>(ctx: &EngineContext, inputs: &Value) -> Vec<FieldError> {
    match decode::<T>(inputs) {
        Ok(record) => record.check(ctx),
        Err(errors) => errors,
    }
}

/// Decode and check, failing fast with a `Validation` error
pub(crate) fn parse_record<T: InputRecord>(ctx: &EngineContext, inputs: &Value) -> EngineResult<T> {
    let record = decode::<T>(inputs).map_err(|errors| EngineError::validation("", "", errors))?;
    let errors = record.check(ctx);
    if errors.is_empty() {
        Ok(record)
    } else {
        Err(EngineError::validation("", "", errors))
    }
}

/// Results, inline checks and references produced by one calculation
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    results: Map<String, Value>,
    compliance: BTreeMap<String, ComplianceCheck>,
    recommendations: Vec<String>,
    standards: Vec<String>,
}

impl Outcome {
    /// Flatten a typed result record into the results map.
    ///
    /// serde_json writes NaN and infinities as `null`, so any `null` in the
    /// serialized record is treated as a non-finite number and rejected.
    pub fn new<R: Serialize>(record: &R) -> EngineResult<Self> {
        let value = serde_json::to_value(record)?;
        if let Some(path) = first_null(&value, "") {
            return Err(EngineError::calculation(format!(
                "result field '{}' is not a finite number",
                path
            )));
        }
        match value {
            Value::Object(results) => Ok(Outcome {
                results,
                ..Outcome::default()
            }),
            _ => Err(EngineError::Serialization {
                reason: "result record must serialize to an object".to_string(),
            }),
        }
    }

    pub fn check(mut self, name: &str, check: ComplianceCheck) -> Self {
        self.compliance.insert(name.to_string(), check);
        self
    }

    pub fn recommend(mut self, text: impl Into<String>) -> Self {
        self.recommendations.push(text.into());
        self
    }

    pub fn recommend_if(self, condition: bool, text: impl Into<String>) -> Self {
        if condition {
            self.recommend(text)
        } else {
            self
        }
    }

    pub fn standards(mut self, refs: &[&str]) -> Self {
        for r in refs {
            if !self.standards.iter().any(|s| s == r) {
                self.standards.push(r.to_string());
            }
        }
        self
    }

    pub(crate) fn finish(
        self,
        discipline: Discipline,
        calculation_type: &str,
        inputs: &Value,
    ) -> EngineResult<CalculationResult> {
        if let Some((name, _)) = self
            .compliance
            .iter()
            .find(|(_, c)| c.ratio.is_some_and(|r| !r.is_finite()))
        {
            return Err(EngineError::calculation(format!(
                "compliance ratio '{}' is not a finite number",
                name
            )));
        }
        Ok(CalculationResult {
            discipline,
            calculation_type: calculation_type.to_string(),
            inputs: inputs.clone(),
            results: self.results,
            compliance: self.compliance,
            recommendations: self.recommendations,
            standards: self.standards,
            compliance_report: None,
        })
    }
}

fn first_null(value: &Value, path: &str) -> Option<String> {
    let join = |key: &str| {
        if path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", path, key)
        }
    };
    match value {
        Value::Null => Some(path.to_string()),
        Value::Object(map) => map.iter().find_map(|(k, v)| first_null(v, &join(k))),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, v)| first_null(v, &join(&i.to_string()))),
        _ => None,
    }
}

/// Guarded division for caller-supplied denominators
pub(crate) fn divide(numerator: f64, denominator: f64, what: &str) -> EngineResult<f64> {
    let q = numerator / denominator;
    if denominator == 0.0 || !q.is_finite() {
        return Err(EngineError::calculation(format!("{}: division by zero or overflow", what)));
    }
    Ok(q)
}

/// Convert an already rounded quantity to a whole count.
///
/// Rejects negative, non-finite and out-of-range values instead of letting
/// the `as` cast saturate.
pub(crate) fn whole_count(value: f64, what: &str) -> EngineResult<u32> {
    if !(0.0..=f64::from(u32::MAX)).contains(&value) {
        return Err(EngineError::calculation(format!(
            "{}: {} is not a representable count",
            what, value
        )));
    }
    Ok(value as u32)
}

pub(crate) fn count_product(a: u32, b: u32, what: &str) -> EngineResult<u32> {
    a.checked_mul(b)
        .ok_or_else(|| EngineError::calculation(format!("{}: {} x {} overflows the count", what, a, b)))
}

pub(crate) fn count_total(counts: impl IntoIterator<Item = u32>, what: &str) -> EngineResult<u32> {
    counts
        .into_iter()
        .try_fold(0u32, |acc, n| acc.checked_add(n))
        .ok_or_else(|| EngineError::calculation(format!("{}: total overflows the count", what)))
}

/// Route a calculation name through a discipline's validate/calculate pair.
///
/// Each discipline module expands this with its own menu so the `match`
/// stays closed over the declared names.
macro_rules! discipline_menu {
    (
        $calc:ty, $discipline:expr,
        { $( $name:literal => $input:ty => $run:path ),+ $(,)? }
    ) => {
        /// Calculation names in menu order
        pub const CALCULATIONS: &[&str] = &[ $( $name ),+ ];

        impl $crate::calculations::Calculator for $calc {
            fn discipline(&self) -> $crate::calculations::Discipline {
                $discipline
            }

            fn available_calculations(&self) -> &'static [&'static str] {
                CALCULATIONS
            }

            fn validate_inputs(
                &self,
                calculation_type: &str,
                inputs: &serde_json::Value,
            ) -> $crate::errors::EngineResult<$crate::calculations::ValidationReport> {
                let errors = match calculation_type {
                    $( $name => $crate::calculations::check_record::<$input>(&self.ctx, inputs), )+
                    other => {
                        return Err($crate::errors::EngineError::unsupported(
                            $discipline.name(),
                            other,
                            CALCULATIONS,
                        ))
                    }
                };
                Ok($crate::calculations::ValidationReport::from_errors(errors))
            }

            fn calculate(
                &self,
                calculation_type: &str,
                inputs: &serde_json::Value,
                _options: &$crate::calculations::CalculationOptions,
            ) -> $crate::errors::EngineResult<$crate::calculations::CalculationResult> {
                let discipline = $discipline;
                let outcome = match calculation_type {
                    $(
                        $name => $crate::calculations::parse_record::<$input>(&self.ctx, inputs)
                            .and_then(|input| $run(&self.ctx, &input)),
                    )+
                    other => {
                        return Err($crate::errors::EngineError::unsupported(
                            discipline.name(),
                            other,
                            CALCULATIONS,
                        ))
                    }
                };
                outcome
                    .and_then(|o| o.finish(discipline, calculation_type, inputs))
                    .map_err(|e| e.in_context(discipline.name(), calculation_type))
            }
        }
    };
}

pub(crate) use discipline_menu;
