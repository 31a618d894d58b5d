//! # Module Registry and Dispatcher
//!
//! [`ModuleRegistry`] maps each [`Discipline`] to a factory from a static
//! table, checked once at construction, and caches one calculator per
//! discipline on first request. The cache is the only process-wide state
//! in the engine and is never invalidated: calculators are stateless.
//!
//! [`Dispatcher`] is the public entry point. It owns the shared
//! [`EngineContext`], the registry and the compliance evaluators, and is
//! `Send + Sync`, so one instance behind an `Arc` serves every thread.
//!
//! ## Example
//!
//! ```rust
//! use calc_engine::calculations::CalculationOptions;
//! use calc_engine::config::EngineConfig;
//! use calc_engine::registry::Dispatcher;
//! use serde_json::json;
//!
//! let dispatcher = Dispatcher::new(EngineConfig::default()).unwrap();
//! let result = dispatcher
//!     .perform_calculation(
//!         "civil",
//!         "beam-analysis",
//!         &json!({"width_mm": 300, "depth_mm": 600, "span_m": 5,
//!                 "concrete_grade": "C30", "uniform_load_kn_m": 25}),
//!         &CalculationOptions { check_compliance: true, ..Default::default() },
//!     )
//!     .unwrap();
//! assert!(result.ratio("deflection").unwrap() < 1.0);
//! assert!(result.compliance_report.unwrap().passed);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::calculations::{
    menu, CalculationOptions, CalculationRequest, CalculationResult, Calculator, CivilCalculator, Discipline,
    ElectricalCalculator, ElvCalculator, HvacCalculator, SewerageCalculator, ValidationReport,
};
use crate::compliance::{standard_evaluators, ActorRole, ComplianceEvaluator, ComplianceReport, Subject};
use crate::config::EngineConfig;
use crate::context::EngineContext;
use crate::errors::{EngineError, EngineResult};
use crate::units::{self, Dimension};

/// Builds the calculator for one discipline
pub type Factory = fn(Arc<EngineContext>) -> Arc<dyn Calculator>;

fn civil(ctx: Arc<EngineContext>) -> Arc<dyn Calculator> {
    Arc::new(CivilCalculator::new(ctx))
}

fn electrical(ctx: Arc<EngineContext>) -> Arc<dyn Calculator> {
    Arc::new(ElectricalCalculator::new(ctx))
}

fn hvac(ctx: Arc<EngineContext>) -> Arc<dyn Calculator> {
    Arc::new(HvacCalculator::new(ctx))
}

fn sewerage(ctx: Arc<EngineContext>) -> Arc<dyn Calculator> {
    Arc::new(SewerageCalculator::new(ctx))
}

fn elv(ctx: Arc<EngineContext>) -> Arc<dyn Calculator> {
    Arc::new(ElvCalculator::new(ctx))
}

/// Discipline → factory
pub static FACTORIES: &[(Discipline, Factory)] = &[
    (Discipline::Civil, civil),
    (Discipline::Electrical, electrical),
    (Discipline::Hvac, hvac),
    (Discipline::Sewerage, sewerage),
    (Discipline::Elv, elv),
];

// ============================================================================
// Registry
// ============================================================================

/// Lazily built, at-most-once calculator cache
pub struct ModuleRegistry {
    ctx: Arc<EngineContext>,
    /// Indexed by [`Discipline::index`]
    factories: Vec<Factory>,
    slots: [OnceCell<Arc<dyn Calculator>>; 5],
    constructions: AtomicUsize,
}

impl ModuleRegistry {
    pub fn new(ctx: Arc<EngineContext>) -> EngineResult<Self> {
        Self::with_factories(ctx, FACTORIES)
    }

    /// Build from an explicit factory table, failing unless every
    /// discipline has exactly one factory that passes [`validate`](Self::validate).
    pub fn with_factories(ctx: Arc<EngineContext>, table: &[(Discipline, Factory)]) -> EngineResult<Self> {
        let mut by_index: [Option<Factory>; 5] = [None; 5];
        for (discipline, factory) in table {
            if by_index[discipline.index()].replace(*factory).is_some() {
                return Err(EngineError::config(format!(
                    "module registry: duplicate factory for '{}'",
                    discipline
                )));
            }
        }
        let factories = Discipline::ALL
            .iter()
            .map(|d| {
                by_index[d.index()]
                    .ok_or_else(|| EngineError::config(format!("module registry: no factory for '{}'", d)))
            })
            .collect::<EngineResult<Vec<_>>>()?;

        let registry = ModuleRegistry {
            ctx,
            factories,
            slots: Default::default(),
            constructions: AtomicUsize::new(0),
        };
        registry.validate()?;
        Ok(registry)
    }

    /// Check each factory against its key: right discipline, a non-empty
    /// duplicate-free menu matching the declared one. Probe instances are
    /// discarded and not counted.
    pub fn validate(&self) -> EngineResult<()> {
        for discipline in Discipline::ALL {
            let probe = (self.factories[discipline.index()])(Arc::clone(&self.ctx));
            let fail = |reason: String| EngineError::config(format!("module registry: {}: {}", discipline, reason));
            if probe.discipline() != discipline {
                return Err(fail(format!("factory builds a {} calculator", probe.discipline())));
            }
            let calculations = probe.available_calculations();
            if calculations.is_empty() {
                return Err(fail("empty calculation menu".to_string()));
            }
            if let Some((i, name)) = calculations
                .iter()
                .enumerate()
                .find(|&(i, name)| calculations[..i].contains(name))
            {
                return Err(fail(format!("'{}' listed twice (position {})", name, i)));
            }
            if calculations != menu(discipline) {
                return Err(fail("menu differs from the declared calculation list".to_string()));
            }
        }
        Ok(())
    }

    /// The cached calculator, built on first request
    pub fn get(&self, discipline: Discipline) -> Arc<dyn Calculator> {
        let calculator = self.slots[discipline.index()].get_or_init(|| {
            self.constructions.fetch_add(1, Ordering::SeqCst);
            debug!(%discipline, "constructing calculator");
            (self.factories[discipline.index()])(Arc::clone(&self.ctx))
        });
        Arc::clone(calculator)
    }

    /// Resolve a discipline name, failing with `UnknownModule`
    pub fn get_module(&self, name: &str) -> EngineResult<Arc<dyn Calculator>> {
        Ok(self.get(name.parse()?))
    }

    /// Calculators constructed so far
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    pub fn is_loaded(&self, discipline: Discipline) -> bool {
        self.slots[discipline.index()].get().is_some()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loaded: Vec<&str> = Discipline::ALL
            .iter()
            .filter(|d| self.is_loaded(**d))
            .map(|d| d.name())
            .collect();
        f.debug_struct("ModuleRegistry")
            .field("loaded", &loaded)
            .field("constructions", &self.constructions())
            .finish()
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Outcome of [`Dispatcher::convert_units`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub value: f64,
    pub from: String,
    pub to: String,
    pub dimension: Dimension,
    /// `None` for temperature
    pub factor: Option<f64>,
    /// Value and unit at the configured significant figures
    pub formatted: String,
}

pub struct Dispatcher {
    ctx: Arc<EngineContext>,
    registry: ModuleRegistry,
    evaluators: Vec<Box<dyn ComplianceEvaluator>>,
}

impl Dispatcher {
    /// Validate config, load reference data, build the registry and the
    /// national, international and safety evaluators (in that order).
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        Self::with_context(Arc::new(EngineContext::new(config)?))
    }

    pub fn with_context(ctx: Arc<EngineContext>) -> EngineResult<Self> {
        let registry = ModuleRegistry::new(Arc::clone(&ctx))?;
        info!(modules = Discipline::ALL.len(), "dispatcher ready");
        Ok(Dispatcher {
            ctx,
            registry,
            evaluators: standard_evaluators(),
        })
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn get_module(&self, name: &str) -> EngineResult<Arc<dyn Calculator>> {
        self.registry.get_module(name)
    }

    pub fn available_modules(&self) -> Vec<&'static str> {
        Discipline::ALL.iter().map(|d| d.name()).collect()
    }

    pub fn available_calculations(&self, discipline: &str) -> EngineResult<&'static [&'static str]> {
        Ok(menu(discipline.parse()?))
    }

    pub fn validate_inputs(
        &self,
        discipline: &str,
        calculation_type: &str,
        inputs: &Value,
    ) -> EngineResult<ValidationReport> {
        self.get_module(discipline)?.validate_inputs(calculation_type, inputs)
    }

    /// Route one calculation, attaching the merged compliance report when
    /// `options.check_compliance` is set.
    #[tracing::instrument(level = "info", skip(self, inputs, options), fields(actor_id = ?options.actor_id))]
    pub fn perform_calculation(
        &self,
        discipline: &str,
        calculation_type: &str,
        inputs: &Value,
        options: &CalculationOptions,
    ) -> EngineResult<CalculationResult> {
        let module = self.get_module(discipline)?;
        let mut result = module.calculate(calculation_type, inputs, options)?;
        info!(checks = result.compliance.len(), "calculation complete");

        if options.check_compliance {
            let report = self.evaluate_compliance(&result, options)?;
            if !report.passed {
                warn!(score = report.score, "compliance blocked");
            }
            result.compliance_report = Some(report);
        }
        Ok(result)
    }

    /// Run every evaluator, in order, over a finished result
    pub fn evaluate_compliance(
        &self,
        result: &CalculationResult,
        options: &CalculationOptions,
    ) -> EngineResult<ComplianceReport> {
        let actor = options.actor_role.as_deref().and_then(|role| {
            let parsed = ActorRole::parse(role);
            if parsed.is_none() {
                debug!(role, "unrecognised actor role; no role-specific advice");
            }
            parsed
        });
        let subject = Subject::of(result);
        let verdicts = self
            .evaluators
            .iter()
            .map(|e| e.check(&subject, &self.ctx.config, actor))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(ComplianceReport::merge(verdicts))
    }

    pub fn execute(&self, request: &CalculationRequest) -> EngineResult<CalculationResult> {
        self.perform_calculation(
            &request.discipline,
            &request.calculation_type,
            &request.inputs,
            &request.options,
        )
    }

    /// Decode a JSON request body and execute it
    pub fn execute_json(&self, body: &str) -> EngineResult<CalculationResult> {
        let request: CalculationRequest = serde_json::from_str(body)?;
        self.execute(&request)
    }

    pub fn convert_units(&self, value: f64, from: &str, to: &str, dimension: &str) -> EngineResult<Conversion> {
        let dimension: Dimension = dimension.parse()?;
        let converted = units::convert(value, from, to, dimension)?;
        let factor = units::conversion_factor(from, to, dimension)?;
        Ok(Conversion {
            value: converted,
            from: from.to_string(),
            to: to.to_string(),
            dimension,
            factor,
            formatted: format!(
                "{} {}",
                units::format_significant(converted, self.ctx.config.significant_figures),
                to
            ),
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field(
                "evaluators",
                &self.evaluators.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::test_support::context;
    use serde_json::json;
    use std::sync::Barrier;

    fn dispatcher() -> Dispatcher {
        Dispatcher::with_context(context()).unwrap()
    }

    #[test]
    fn test_dispatcher_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Dispatcher>();
        assert_send_sync::<ModuleRegistry>();
    }

    #[test]
    fn test_lazy_single_construction() {
        let d = dispatcher();
        assert_eq!(d.registry().constructions(), 0);
        let a = d.get_module("civil").unwrap();
        let b = d.get_module("structural").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(d.registry().constructions(), 1);
        assert!(!d.registry().is_loaded(Discipline::Hvac));
    }

    #[test]
    fn test_concurrent_first_access_builds_once() {
        let d = dispatcher();
        let threads = 16;
        let barrier = Barrier::new(threads);
        let modules: Vec<Arc<dyn Calculator>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        d.get_module("sewerage").unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(d.registry().constructions(), 1);
        assert!(modules.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_bad_factory_tables_rejected() {
        let missing = &FACTORIES[..4];
        assert_eq!(
            ModuleRegistry::with_factories(context(), missing).unwrap_err().error_code(),
            "CONFIG_ERROR"
        );

        let duplicate: Vec<(Discipline, Factory)> =
            FACTORIES.iter().copied().chain(std::iter::once((Discipline::Civil, civil as Factory))).collect();
        assert!(ModuleRegistry::with_factories(context(), &duplicate).is_err());

        let swapped: Vec<(Discipline, Factory)> = FACTORIES
            .iter()
            .map(|(d, f)| if *d == Discipline::Hvac { (*d, electrical as Factory) } else { (*d, *f) })
            .collect();
        let err = ModuleRegistry::with_factories(context(), &swapped).unwrap_err();
        assert!(err.to_string().contains("hvac"));
    }

    #[test]
    fn test_routing_errors() {
        let d = dispatcher();
        let err = d
            .perform_calculation("geotechnical", "bearing", &json!({}), &CalculationOptions::default())
            .unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_MODULE");
        let err = d
            .perform_calculation("civil", "nonexistent-calc", &json!({}), &CalculationOptions::default())
            .unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_CALCULATION");
    }

    #[test]
    fn test_available_lists() {
        let d = dispatcher();
        assert_eq!(d.available_modules(), vec!["civil", "electrical", "hvac", "sewerage", "elv"]);
        assert!(d.available_calculations("hvac").unwrap().contains(&"cooling-load"));
        assert!(d.available_calculations("mining").is_err());
    }

    #[test]
    fn test_validate_inputs_reports_fields() {
        let d = dispatcher();
        let report = d
            .validate_inputs("electrical", "lighting-design", &json!({"length_m": -3}))
            .unwrap();
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.field == "length_m" || e.field == "width_m"));
    }

    #[test]
    fn test_compliance_attached_only_on_request() {
        let d = dispatcher();
        let inputs = json!({"outlets": 24, "average_run_m": 35});
        let plain = d
            .perform_calculation("elv", "structured-cabling", &inputs, &CalculationOptions::default())
            .unwrap();
        assert!(plain.compliance_report.is_none());

        let options = CalculationOptions {
            check_compliance: true,
            ..Default::default()
        };
        let checked = d.perform_calculation("elv", "structured-cabling", &inputs, &options).unwrap();
        let report = checked.compliance_report.unwrap();
        assert_eq!(report.verdicts.len(), 3);
        assert_eq!(report.verdicts[0].evaluator, "national-code");
        assert_eq!(report.verdicts[2].evaluator, "safety-regulation");
    }

    #[test]
    fn test_convert_units() {
        let d = dispatcher();
        let c = d.convert_units(100.0, "C", "F", "temperature").unwrap();
        assert!((c.value - 212.0).abs() < 1e-9);
        assert_eq!(c.factor, None);
        let c = d.convert_units(1.0, "m", "mm", "length").unwrap();
        assert_eq!(c.formatted, "1000 mm");
        assert_eq!(d.convert_units(1.0, "m", "kN", "length").unwrap_err().error_code(), "UNIT_ERROR");
    }

    #[test]
    fn test_execute_json() {
        let d = dispatcher();
        let result = d
            .execute_json(
                r#"{"discipline": "hvac", "calculationType": "chilled-water-pipe",
                    "inputs": {"load_kw": 350}}"#,
            )
            .unwrap();
        assert_eq!(result.discipline, Discipline::Hvac);
        assert_eq!(d.execute_json("{").unwrap_err().error_code(), "SERIALIZATION_ERROR");
    }
}
