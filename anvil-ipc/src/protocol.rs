//! IPC protocol definitions and message types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

/// IPC protocol version for compatibility checking
pub const IPC_PROTOCOL_VERSION: u32 = 1;

/// Parameters of one unit of work, in the form that crosses the worker boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferPayload {
    /// Name of the work action registered in the worker
    pub action: String,
    /// Self-contained arguments decoded by that action
    pub arguments: JsonValue,
}

impl TransferPayload {
    pub fn new(action: impl Into<String>, arguments: JsonValue) -> Self {
        Self {
            action: action.into(),
            arguments,
        }
    }
}

/// Messages sent from coordinator to worker processes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// Run one unit of work
    RunWork {
        correlation_id: Uuid,
        display_name: String,
        payload: TransferPayload,
    },

    /// Health check ping
    Ping { correlation_id: Uuid },

    /// Shutdown signal
    Shutdown,
}

/// Messages sent from worker processes to coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinatorMessage {
    /// The unit of work ran to completion without raising
    WorkCompleted {
        correlation_id: Uuid,
        duration_ms: u64,
    },

    /// Health check response
    Pong {
        correlation_id: Uuid,
        worker_id: String,
        status: WorkerStatus,
    },

    /// Worker error
    Error {
        correlation_id: Option<Uuid>,
        error: WorkerError,
    },

    /// Worker ready for work
    Ready { worker_id: String },
}

/// Worker status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub worker_id: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub units_executed: u64,
    pub units_failed: u64,
}

impl WorkerStatus {
    /// Create a new worker status
    pub fn new(worker_id: String, pid: u32) -> Self {
        let now = Utc::now();
        Self {
            worker_id,
            pid,
            started_at: now,
            last_activity: now,
            units_executed: 0,
            units_failed: 0,
        }
    }

    /// Update activity timestamp
    pub fn update_activity(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Record one executed unit of work
    pub fn record_unit(&mut self, success: bool) {
        self.units_executed += 1;
        if !success {
            self.units_failed += 1;
        }
        self.update_activity();
    }
}

/// Worker error types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "error_type", rename_all = "snake_case")]
pub enum WorkerError {
    /// The work action raised an error; `causes` holds the source chain, outermost first
    WorkFailed {
        action: String,
        error: String,
        #[serde(default)]
        causes: Vec<String>,
    },

    /// No action with this name is registered in the worker
    UnknownAction { action: String },

    /// The worker program could not start serving, e.g. bad configuration
    InitializationFailed { error: String },

    /// Worker panic/crash
    WorkerPanic { error: String },

    /// Message parse error
    MessageParseError { error: String },
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::WorkFailed { action, error, .. } => {
                write!(f, "Work action '{}' failed: {}", action, error)
            }
            WorkerError::UnknownAction { action } => {
                write!(f, "Unknown work action: {}", action)
            }
            WorkerError::InitializationFailed { error } => {
                write!(f, "Worker initialization failed: {}", error)
            }
            WorkerError::WorkerPanic { error } => {
                write!(f, "Worker panic: {}", error)
            }
            WorkerError::MessageParseError { error } => {
                write!(f, "Message parse error: {}", error)
            }
        }
    }
}

impl std::error::Error for WorkerError {}

/// Message envelope for all IPC communications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope<T> {
    pub protocol_version: u32,
    pub timestamp: DateTime<Utc>,
    pub message: T,
}

impl<T> MessageEnvelope<T> {
    /// Create a new message envelope
    pub fn new(message: T) -> Self {
        Self {
            protocol_version: IPC_PROTOCOL_VERSION,
            timestamp: Utc::now(),
            message,
        }
    }

    /// Check if protocol version is compatible
    pub fn is_compatible(&self) -> bool {
        self.protocol_version == IPC_PROTOCOL_VERSION
    }
}
