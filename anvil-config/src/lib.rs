//! Domain-driven configuration management for Anvil
//!
//! Configuration is split by functional domain (worker execution, logging),
//! loaded from YAML with `ANVIL_*` environment overrides and validated per
//! domain before use.

pub mod domains;
pub mod error;
pub mod loader;
pub mod validation;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, CONFIG_FILE_ENV};
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    logging::{LogFormat, LogLevel, LoggingConfig},
    worker::{IsolationMode, WorkerConfig},
    AnvilConfig,
};
