//! Configuration errors

use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// An `ANVIL_*` variable holds a value that does not parse
    #[error("Environment variable error: {0}")]
    EnvError(String),

    /// A section parsed but failed validation
    #[error("Invalid {domain} configuration: {message}")]
    DomainError { domain: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_names_section() {
        let error = ConfigError::DomainError {
            domain: "worker".to_string(),
            message: "process isolation requires a worker program".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid worker configuration: process isolation requires a worker program"
        );
    }
}
