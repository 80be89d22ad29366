//! Configuration loading and environment variable handling

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::domains::logging::{LogFormat, LogLevel, LoggingConfig};
use crate::domains::worker::{IsolationMode, WorkerConfig};
use crate::domains::AnvilConfig;
use crate::error::{ConfigError, ConfigResult};

/// Prefix of every environment override
const ENV_PREFIX: &str = "ANVIL";

/// Environment variable naming a YAML file to load before applying overrides
pub const CONFIG_FILE_ENV: &str = "ANVIL_CONFIG_FILE";

/// Loads [`AnvilConfig`] from YAML and `ANVIL_*` environment overrides
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<AnvilConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AnvilConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<AnvilConfig> {
        let mut config = AnvilConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load `config_path` if given, otherwise the environment alone
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<AnvilConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    fn apply_env_overrides(&self, config: &mut AnvilConfig) -> ConfigResult<()> {
        self.apply_worker_overrides(&mut config.worker)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    fn apply_worker_overrides(&self, config: &mut WorkerConfig) -> ConfigResult<()> {
        if let Ok(mode) = self.get_env_var("WORKER_ISOLATION_MODE") {
            config.isolation_mode = IsolationMode::from_str(&mode).map_err(|_| {
                ConfigError::EnvError(format!("Invalid WORKER_ISOLATION_MODE: {}", mode))
            })?;
        }

        if let Ok(program) = self.get_env_var("WORKER_PROGRAM") {
            config.program = Some(PathBuf::from(program));
        }

        if let Ok(threads) = self.get_env_var("WORKER_MAX_BLOCKING_THREADS") {
            config.max_blocking_threads = threads.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid WORKER_MAX_BLOCKING_THREADS: {}", e))
            })?;
        }

        Ok(())
    }

    fn apply_logging_overrides(&self, config: &mut LoggingConfig) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", ENV_PREFIX, name))
    }
}
