//! Domain-specific configuration modules

pub mod logging;
pub mod worker;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main Anvil configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnvilConfig {
    /// Worker execution configuration
    #[serde(default)]
    pub worker: worker::WorkerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl AnvilConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.worker.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

pub(crate) fn default_false() -> bool {
    false
}
