//! Anvil Worker Execution Service
//!
//! Runs self-contained units of work in an isolated worker, either on a
//! dedicated thread of the host process or in a separate worker process,
//! and lets a synchronous caller block until the units it submitted finish.
//!
//! A unit is described by a [`WorkerConfiguration`]: the isolation mode,
//! the [`TransferPayload`] naming a registered [`WorkAction`], and the
//! process-level settings used when the unit runs out of process.

pub mod action;
pub mod configuration;
pub mod error;
pub mod executor;
pub mod process;
pub mod worker;

// Re-export main types
pub use action::{BoxError, WorkAction, WorkRegistry};
pub use configuration::{ProcessOptions, WorkerConfiguration};
pub use error::{error_chain, ExecutionError, RemoteError, WorkFailure};
pub use executor::{DefaultWorkerExecutor, WorkerExecutor};
pub use process::ProcessLauncher;
pub use worker::{reject_stdio, report_startup_failure, serve_stdio, WorkerServer};

pub use anvil_config::{IsolationMode, WorkerConfig};
pub use anvil_ipc::{IpcError, TransferPayload, WorkerError};
