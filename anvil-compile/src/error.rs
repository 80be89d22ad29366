//! Errors raised by compilers

use anvil_execution::BoxError;
use thiserror::Error;

/// Error raised by a compiler while compiling
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Invalid compile spec: {0}")]
    InvalidSpec(String),

    #[error("Compiler state codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl CompileError {
    pub fn failed(message: impl Into<String>) -> Self {
        CompileError::Failed {
            message: message.into(),
            source: None,
        }
    }

    pub fn failed_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        CompileError::Failed {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}
