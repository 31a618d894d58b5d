//! # calc_engine - Engineering Calculation & Compliance Engine
//!
//! `calc_engine` performs discipline-specific engineering calculations
//! (civil, electrical, HVAC, sewerage, ELV) and evaluates the results
//! against national, international and safety standards. All inputs and
//! outputs are JSON-serializable, so a host (HTTP layer, CLI, job runner)
//! only has to decode a request and serialize the result.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: calculations and evaluators are pure functions of their input
//! - **JSON-First**: every request, result, verdict and error implements Serialize
//! - **Rich Errors**: structured error types with stable codes, not strings
//! - **Table-Driven**: reference data and compliance rules live in audited tables
//!
//! ## Quick Start
//!
//! ```rust
//! use calc_engine::{CalculationRequest, Dispatcher, EngineConfig};
//!
//! let dispatcher = Dispatcher::new(EngineConfig::default()).unwrap();
//! let request: CalculationRequest = serde_json::from_str(r#"{
//!     "discipline": "electrical",
//!     "calculationType": "cable-sizing",
//!     "inputs": {"design_current_a": 63, "length_m": 40},
//!     "options": {"checkCompliance": true}
//! }"#).unwrap();
//!
//! let result = dispatcher.execute(&request).unwrap();
//! println!("{}", serde_json::to_string_pretty(&result).unwrap());
//! ```
//!
//! ## Modules
//!
//! - [`registry`] - Module registry and the [`Dispatcher`] entry point
//! - [`calculations`] - Discipline calculators and the request/result records
//! - [`compliance`] - National code, international standard and safety evaluators
//! - [`loads`] - Dead, live, wind, seismic loads and load combinations
//! - [`units`] - Unit conversion across nine physical dimensions
//! - [`materials`] - Material database keyed by category, subcategory and grade
//! - [`reference`] - Versioned reference tables loaded from TOML
//! - [`safety`] - Construction safety thresholds and the risk matrix
//! - [`config`] - Engine configuration (defaults, TOML file, environment)
//! - [`errors`] - Structured error types

pub mod calculations;
pub mod compliance;
pub mod config;
pub mod context;
pub mod errors;
pub mod loads;
pub mod materials;
pub mod reference;
pub mod registry;
pub mod safety;
pub mod units;
pub mod validation;

// Re-export commonly used types at crate root for convenience
pub use calculations::{CalculationOptions, CalculationRequest, CalculationResult, Calculator, Discipline};
pub use compliance::{ComplianceReport, ComplianceVerdict};
pub use config::EngineConfig;
pub use errors::{EngineError, EngineResult};
pub use registry::Dispatcher;
