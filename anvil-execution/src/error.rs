//! Error types for worker execution

use std::fmt;

use anvil_ipc::{IpcError, WorkerError};
use thiserror::Error;
use tokio::task::JoinError;

use crate::action::BoxError;

/// Errors surfaced to callers of the execution service
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The work cannot be described in self-contained, transferable form
    #[error("Not transferable to a worker: {0}")]
    NotTransferable(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A submitted unit failed at or beyond the worker boundary
    #[error("Worker execution of '{unit}' failed: {source}")]
    WorkerFailure {
        unit: String,
        #[source]
        source: WorkFailure,
    },
}

impl ExecutionError {
    /// Check if this error was raised before any work was submitted
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ExecutionError::NotTransferable(_) | ExecutionError::ConfigurationError(_)
        )
    }
}

impl From<anvil_config::ConfigError> for ExecutionError {
    fn from(err: anvil_config::ConfigError) -> Self {
        Self::ConfigurationError(err.to_string())
    }
}

/// What went wrong with one unit of work
#[derive(Error, Debug)]
pub enum WorkFailure {
    #[error("Failed to encode work parameters: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode work parameters: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("No work action registered as '{0}'")]
    UnknownAction(String),

    /// The action itself raised; `source` is the original error
    #[error("Work action '{action}' failed: {source}")]
    ActionFailed {
        action: String,
        #[source]
        source: BoxError,
    },

    /// The action raised inside a worker process
    #[error("Work action '{action}' failed in worker process: {source}")]
    Remote {
        action: String,
        #[source]
        source: RemoteError,
    },

    #[error("Worker communication failed: {0}")]
    Ipc(#[from] IpcError),

    #[error("Failed to start worker process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Worker process exited with {status} before reporting completion")]
    Crashed { status: String },

    #[error("Worker panicked: {0}")]
    Panicked(String),
}

impl WorkFailure {
    /// Rebuild a failure reported by a worker process
    pub fn from_worker_error(error: WorkerError) -> Self {
        match error {
            WorkerError::WorkFailed {
                action,
                error,
                causes,
            } => WorkFailure::Remote {
                action,
                source: RemoteError::from_chain(error, causes),
            },
            WorkerError::UnknownAction { action } => WorkFailure::UnknownAction(action),
            WorkerError::WorkerPanic { error } => WorkFailure::Panicked(error),
            other => WorkFailure::Ipc(IpcError::WorkerError(other)),
        }
    }

    /// Turn a failed blocking task into a failure, keeping the panic message
    pub fn from_join_error(error: JoinError) -> Self {
        if !error.is_panic() {
            return WorkFailure::Panicked(format!("worker task cancelled: {}", error));
        }
        let panic = error.into_panic();
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        WorkFailure::Panicked(message)
    }
}

/// An error chain reconstructed from the messages a worker process reported
#[derive(Debug)]
pub struct RemoteError {
    message: String,
    source: Option<Box<RemoteError>>,
}

impl RemoteError {
    /// Build a chain from the outermost message followed by its causes
    pub fn from_chain(message: String, causes: Vec<String>) -> Self {
        let source = causes
            .into_iter()
            .rev()
            .fold(None, |source, message| {
                Some(Box::new(RemoteError { message, source }))
            });
        RemoteError { message, source }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RemoteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn std::error::Error + 'static))
    }
}

/// Collect the messages of an error and all of its sources, outermost first
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut messages = vec![error.to_string()];
    let mut current = error.source();
    while let Some(source) = current {
        messages.push(source.to_string());
        current = source.source();
    }
    messages
}
