//! # Unit Converter
//!
//! Stateless conversion between unit systems for the dimensions used by the
//! calculators. Every multiplicative dimension has one base unit (SI) and a
//! table of factors to it; conversion is `value * factor[from] / factor[to]`.
//!
//! Temperature is affine, not multiplicative, and goes through its own path:
//! each scale stores a `(scale, offset)` pair such that
//! `celsius = value * scale + offset`, and conversion always passes through
//! Celsius. There is deliberately no temperature "factor".
//!
//! Rounding happens only when formatting ([`format_significant`]); converted
//! values are never rounded internally, so chained conversions do not
//! accumulate rounding error.
//!
//! ## Example
//!
//! ```rust
//! use calc_engine::units::{convert, Dimension};
//!
//! let mm = convert(1.5, "m", "mm", Dimension::Length).unwrap();
//! assert!((mm - 1500.0).abs() < 1e-9);
//!
//! let f = convert(100.0, "C", "F", Dimension::Temperature).unwrap();
//! assert!((f - 212.0).abs() < 1e-9);
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::UnitError;

// ============================================================================
// Dimensions
// ============================================================================

/// Physical dimension of a quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Length,
    Area,
    Volume,
    Force,
    Pressure,
    Moment,
    Mass,
    Density,
    Temperature,
}

impl Dimension {
    /// All dimensions in declaration order
    pub const ALL: [Dimension; 9] = [
        Dimension::Length,
        Dimension::Area,
        Dimension::Volume,
        Dimension::Force,
        Dimension::Pressure,
        Dimension::Moment,
        Dimension::Mass,
        Dimension::Density,
        Dimension::Temperature,
    ];

    /// Lowercase name used on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Length => "length",
            Dimension::Area => "area",
            Dimension::Volume => "volume",
            Dimension::Force => "force",
            Dimension::Pressure => "pressure",
            Dimension::Moment => "moment",
            Dimension::Mass => "mass",
            Dimension::Density => "density",
            Dimension::Temperature => "temperature",
        }
    }

    /// SI base unit the factor table is expressed against
    pub fn base_unit(&self) -> &'static str {
        match self {
            Dimension::Length => "m",
            Dimension::Area => "m2",
            Dimension::Volume => "m3",
            Dimension::Force => "N",
            Dimension::Pressure => "Pa",
            Dimension::Moment => "Nm",
            Dimension::Mass => "kg",
            Dimension::Density => "kg/m3",
            Dimension::Temperature => "C",
        }
    }

    /// Whether conversion is a pure scale factor
    pub fn is_multiplicative(&self) -> bool {
        !matches!(self, Dimension::Temperature)
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Dimension {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Dimension::ALL
            .iter()
            .copied()
            .find(|d| d.name() == wanted)
            .ok_or(UnitError::UnknownDimension {
                dimension: s.to_string(),
            })
    }
}

// ============================================================================
// Factor Tables (factor = size of one unit in the base unit)
// ============================================================================

const LENGTH: &[(&str, f64)] = &[
    ("mm", 0.001),
    ("cm", 0.01),
    ("m", 1.0),
    ("km", 1000.0),
    ("in", 0.0254),
    ("ft", 0.3048),
    ("yd", 0.9144),
    ("mi", 1609.344),
];

const AREA: &[(&str, f64)] = &[
    ("mm2", 1e-6),
    ("cm2", 1e-4),
    ("m2", 1.0),
    ("ha", 1e4),
    ("km2", 1e6),
    ("in2", 6.4516e-4),
    ("ft2", 0.09290304),
    ("yd2", 0.83612736),
    ("acre", 4046.8564224),
];

const VOLUME: &[(&str, f64)] = &[
    ("mm3", 1e-9),
    ("cm3", 1e-6),
    ("ml", 1e-6),
    ("l", 1e-3),
    ("m3", 1.0),
    ("in3", 1.6387064e-5),
    ("ft3", 0.028316846592),
    ("yd3", 0.764554857984),
    ("gal", 0.003785411784),
];

const FORCE: &[(&str, f64)] = &[
    ("N", 1.0),
    ("kN", 1e3),
    ("MN", 1e6),
    ("kgf", 9.80665),
    ("tf", 9806.65),
    ("lbf", 4.4482216152605),
    ("kip", 4448.2216152605),
];

const PRESSURE: &[(&str, f64)] = &[
    ("Pa", 1.0),
    ("kPa", 1e3),
    ("MPa", 1e6),
    ("GPa", 1e9),
    ("N/mm2", 1e6),
    ("kN/m2", 1e3),
    ("bar", 1e5),
    ("atm", 101_325.0),
    ("psf", 47.880258980336),
    ("psi", 6894.757293168),
    ("ksi", 6_894_757.293168),
];

const MOMENT: &[(&str, f64)] = &[
    ("Nmm", 1e-3),
    ("Nm", 1.0),
    ("kNm", 1e3),
    ("MNm", 1e6),
    ("lbf-in", 0.1129848290276167),
    ("lbf-ft", 1.3558179483314),
    ("kip-in", 112.98482902761),
    ("kip-ft", 1355.8179483314),
];

const MASS: &[(&str, f64)] = &[
    ("g", 1e-3),
    ("kg", 1.0),
    ("t", 1e3),
    ("oz", 0.028349523125),
    ("lb", 0.45359237),
    ("ton", 907.18474),
];

const DENSITY: &[(&str, f64)] = &[
    ("kg/m3", 1.0),
    ("g/cm3", 1e3),
    ("t/m3", 1e3),
    ("lb/ft3", 16.018463373960138),
    ("lb/in3", 27_679.904710203),
];

/// Temperature scales: `celsius = value * scale + offset`
const TEMPERATURE: &[(&str, f64, f64)] = &[
    ("C", 1.0, 0.0),
    ("F", 5.0 / 9.0, -32.0 * 5.0 / 9.0),
    ("K", 1.0, -273.15),
    ("R", 5.0 / 9.0, -273.15),
];

fn factor_table(dimension: Dimension) -> Option<&'static [(&'static str, f64)]> {
    match dimension {
        Dimension::Length => Some(LENGTH),
        Dimension::Area => Some(AREA),
        Dimension::Volume => Some(VOLUME),
        Dimension::Force => Some(FORCE),
        Dimension::Pressure => Some(PRESSURE),
        Dimension::Moment => Some(MOMENT),
        Dimension::Mass => Some(MASS),
        Dimension::Density => Some(DENSITY),
        Dimension::Temperature => None,
    }
}

/// Exact match first, then a case-insensitive match in table order.
fn find_in<T: Copy>(table: &[T], unit: &str, name: impl Fn(&T) -> &'static str) -> Option<T> {
    table
        .iter()
        .find(|row| name(*row) == unit)
        .or_else(|| table.iter().find(|row| name(*row).eq_ignore_ascii_case(unit)))
        .copied()
}

fn unit_in(dimension: Dimension, unit: &str) -> bool {
    match factor_table(dimension) {
        Some(table) => find_in(table, unit, |r| r.0).is_some(),
        None => find_in(TEMPERATURE, unit, |r| r.0).is_some(),
    }
}

/// Find which dimension a unit name belongs to (first match in [`Dimension::ALL`] order)
pub fn dimension_of(unit: &str) -> Option<Dimension> {
    Dimension::ALL.iter().copied().find(|d| unit_in(*d, unit))
}

fn unknown_unit(unit: &str, dimension: Dimension) -> UnitError {
    match dimension_of(unit) {
        Some(found) if found != dimension => UnitError::DimensionMismatch {
            unit: unit.to_string(),
            expected: dimension.name().to_string(),
            found: found.name().to_string(),
        },
        _ => UnitError::InvalidUnit {
            unit: unit.to_string(),
            dimension: dimension.name().to_string(),
        },
    }
}

fn factor_of(unit: &str, dimension: Dimension, table: &[(&'static str, f64)]) -> Result<f64, UnitError> {
    find_in(table, unit, |r| r.0)
        .map(|(_, f)| f)
        .ok_or_else(|| unknown_unit(unit, dimension))
}

fn temperature_scale(unit: &str) -> Result<(f64, f64), UnitError> {
    find_in(TEMPERATURE, unit, |r| r.0)
        .map(|(_, scale, offset)| (scale, offset))
        .ok_or_else(|| unknown_unit(unit, Dimension::Temperature))
}

// ============================================================================
// Conversion
// ============================================================================

/// Convert `value` from one unit to another within a dimension.
///
/// # Errors
///
/// - `InvalidUnit` for a unit that exists in no dimension
/// - `DimensionMismatch` for a unit that belongs to a different dimension
/// - `NonFiniteValue` for NaN or infinite input
pub fn convert(value: f64, from: &str, to: &str, dimension: Dimension) -> Result<f64, UnitError> {
    if !value.is_finite() {
        return Err(UnitError::NonFiniteValue {
            value: value.to_string(),
        });
    }

    match factor_table(dimension) {
        Some(table) => {
            let from_factor = factor_of(from, dimension, table)?;
            let to_factor = factor_of(to, dimension, table)?;
            Ok(value * from_factor / to_factor)
        }
        None => {
            let (from_scale, from_offset) = temperature_scale(from)?;
            let (to_scale, to_offset) = temperature_scale(to)?;
            let celsius = value * from_scale + from_offset;
            Ok((celsius - to_offset) / to_scale)
        }
    }
}

/// Same as [`convert`] with the dimension given by name.
pub fn convert_named(value: f64, from: &str, to: &str, dimension: &str) -> Result<f64, UnitError> {
    convert(value, from, to, dimension.parse()?)
}

/// Units available for a dimension, in table order.
pub fn available_units(dimension: Dimension) -> Vec<&'static str> {
    match factor_table(dimension) {
        Some(table) => table.iter().map(|(name, _)| *name).collect(),
        None => TEMPERATURE.iter().map(|(name, _, _)| *name).collect(),
    }
}

/// Multiplicative factor from one unit to another.
///
/// Returns `Ok(None)` for temperature, which has no single factor. Unit
/// names are still validated for temperature so a bad unit is never
/// silently accepted.
pub fn conversion_factor(from: &str, to: &str, dimension: Dimension) -> Result<Option<f64>, UnitError> {
    match factor_table(dimension) {
        Some(table) => {
            let from_factor = factor_of(from, dimension, table)?;
            let to_factor = factor_of(to, dimension, table)?;
            Ok(Some(from_factor / to_factor))
        }
        None => {
            temperature_scale(from)?;
            temperature_scale(to)?;
            Ok(None)
        }
    }
}

// ============================================================================
// Quantities
// ============================================================================

/// A value tagged with its unit and dimension.
///
/// Construction validates that the unit belongs to the dimension, so a
/// `UnitQuantity` can never hold a mismatched pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitQuantity {
    pub value: f64,
    pub unit: String,
    pub dimension: Dimension,
}

impl UnitQuantity {
    pub fn new(value: f64, unit: impl Into<String>, dimension: Dimension) -> Result<Self, UnitError> {
        let unit = unit.into();
        if !unit_in(dimension, &unit) {
            return Err(unknown_unit(&unit, dimension));
        }
        Ok(UnitQuantity { value, unit, dimension })
    }

    /// Convert to another unit of the same dimension
    pub fn to_unit(&self, unit: &str) -> Result<UnitQuantity, UnitError> {
        let value = convert(self.value, &self.unit, unit, self.dimension)?;
        UnitQuantity::new(value, unit, self.dimension)
    }

    /// Express in the dimension's SI base unit
    pub fn to_base(&self) -> Result<UnitQuantity, UnitError> {
        self.to_unit(self.dimension.base_unit())
    }

    /// Format as `"<value> <unit>"` with the given significant figures
    pub fn format(&self, significant_figures: u32) -> String {
        format!("{} {}", format_significant(self.value, significant_figures), self.unit)
    }
}

// ============================================================================
// Formatting
// ============================================================================

/// Default significant figures for formatted output
pub const DEFAULT_SIGNIFICANT_FIGURES: u32 = 6;

/// An f64 carries at most 17 significant decimal digits.
fn significant_digits(significant_figures: u32) -> i32 {
    significant_figures.clamp(1, 17) as i32
}

/// Round to `significant_figures` significant digits.
pub fn round_significant(value: f64, significant_figures: u32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let sig = significant_digits(significant_figures);
    let magnitude = value.abs().log10().floor() as i32;
    let exponent = sig - 1 - magnitude;
    if exponent >= 0 {
        let scale = 10f64.powi(exponent);
        if !scale.is_finite() {
            // subnormal input, already below any displayable precision
            return value;
        }
        (value * scale).round() / scale
    } else {
        let divisor = 10f64.powi(-exponent);
        (value / divisor).round() * divisor
    }
}

/// Format with `significant_figures` significant digits, trailing zeros trimmed.
pub fn format_significant(value: f64, significant_figures: u32) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = round_significant(value, significant_figures);
    if rounded == 0.0 {
        return "0".to_string();
    }
    let magnitude = rounded.abs().log10().floor() as i32;
    let decimals = (significant_digits(significant_figures) - 1 - magnitude).max(0) as usize;
    let text = format!("{:.*}", decimals, rounded);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn test_length_conversion() {
        assert!(close(convert(1.0, "ft", "in", Dimension::Length).unwrap(), 12.0));
        assert!(close(convert(5.0, "m", "mm", Dimension::Length).unwrap(), 5000.0));
    }

    #[test]
    fn test_pressure_conversion() {
        assert!(close(convert(1.0, "MPa", "N/mm2", Dimension::Pressure).unwrap(), 1.0));
        assert!(close(convert(1.0, "ksi", "psi", Dimension::Pressure).unwrap(), 1000.0));
    }

    #[test]
    fn test_temperature_spot_values() {
        assert!(close(convert(0.0, "C", "F", Dimension::Temperature).unwrap(), 32.0));
        assert!(close(convert(100.0, "C", "F", Dimension::Temperature).unwrap(), 212.0));
        assert!(close(convert(0.0, "C", "K", Dimension::Temperature).unwrap(), 273.15));
        assert!(close(convert(491.67, "R", "C", Dimension::Temperature).unwrap(), 0.0));
        assert!(close(convert(-40.0, "F", "C", Dimension::Temperature).unwrap(), -40.0));
    }

    #[test]
    fn test_temperature_has_no_factor() {
        assert_eq!(conversion_factor("C", "F", Dimension::Temperature).unwrap(), None);
        assert!(conversion_factor("C", "X", Dimension::Temperature).is_err());
    }

    #[test]
    fn test_conversion_factor() {
        let f = conversion_factor("kN", "N", Dimension::Force).unwrap().unwrap();
        assert!(close(f, 1000.0));
    }

    #[test]
    fn test_invalid_unit() {
        let err = convert(1.0, "furlong", "m", Dimension::Length).unwrap_err();
        assert!(matches!(err, UnitError::InvalidUnit { .. }));
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = convert(1.0, "kN", "m", Dimension::Length).unwrap_err();
        match err {
            UnitError::DimensionMismatch { expected, found, .. } => {
                assert_eq!(expected, "length");
                assert_eq!(found, "force");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_dimension() {
        assert!(matches!(
            "speed".parse::<Dimension>(),
            Err(UnitError::UnknownDimension { .. })
        ));
        assert_eq!("Pressure".parse::<Dimension>().unwrap(), Dimension::Pressure);
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(convert(f64::NAN, "m", "mm", Dimension::Length).is_err());
    }

    #[test]
    fn test_case_insensitive_fallback() {
        assert!(close(convert(1.0, "KN", "n", Dimension::Force).unwrap(), 1000.0));
    }

    #[test]
    fn test_available_units_order() {
        let units = available_units(Dimension::Temperature);
        assert_eq!(units, vec!["C", "F", "K", "R"]);
        assert_eq!(available_units(Dimension::Length)[0], "mm");
    }

    #[test]
    fn test_quantity_rejects_mismatched_unit() {
        assert!(UnitQuantity::new(1.0, "kPa", Dimension::Force).is_err());
        let q = UnitQuantity::new(2.5, "kNm", Dimension::Moment).unwrap();
        let base = q.to_base().unwrap();
        assert_eq!(base.unit, "Nm");
        assert!(close(base.value, 2500.0));
    }

    #[test]
    fn test_format_significant() {
        assert_eq!(format_significant(1234.56789, 6), "1234.57");
        assert_eq!(format_significant(0.000123456789, 3), "0.000123");
        assert_eq!(format_significant(1_234_567.0, 3), "1230000");
        assert_eq!(format_significant(0.0, 6), "0");
        assert_eq!(format_significant(2.5, 6), "2.5");
    }

    #[test]
    fn test_significant_figure_extremes() {
        assert_eq!(format_significant(2.5, u32::MAX), "2.5");
        assert_eq!(round_significant(2.5, u32::MAX), 2.5);
        assert_eq!(round_significant(5e-324, 6), 5e-324);
    }

    #[test]
    fn test_serialization() {
        let q = UnitQuantity::new(12.5, "m", Dimension::Length).unwrap();
        let json = serde_json::to_string(&q).unwrap();
        assert!(json.contains("\"dimension\":\"length\""));
        let roundtrip: UnitQuantity = serde_json::from_str(&json).unwrap();
        assert_eq!(q, roundtrip);
    }
}
