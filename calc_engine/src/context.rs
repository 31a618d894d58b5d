//! Shared, read-only state handed to every calculator and evaluator.

use crate::config::EngineConfig;
use crate::errors::EngineResult;
use crate::loads::LoadCalculator;
use crate::reference::ReferenceData;

/// Configuration plus the reference tables it selected.
///
/// Built once per dispatcher and shared behind an `Arc`; nothing in it is
/// mutated after construction.
#[derive(Debug, Clone)]
pub struct EngineContext {
    pub config: EngineConfig,
    pub data: ReferenceData,
}

impl EngineContext {
    /// Validate `config` and load reference data (honouring `reference_data_dir`).
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let data = ReferenceData::load(config.reference_data_dir.as_deref())?;
        Ok(EngineContext { config, data })
    }

    /// Use already-loaded reference data
    pub fn with_data(config: EngineConfig, data: ReferenceData) -> EngineResult<Self> {
        config.validate()?;
        Ok(EngineContext { config, data })
    }

    pub fn load_calculator(&self) -> LoadCalculator<'_> {
        LoadCalculator::new(&self.data.loads, self.config.design.max_base_shear_coefficient)
    }
}
