//! Running a unit of work in a separate worker process

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anvil_ipc::{
    ChildProcessTransport, CoordinatorMessage, IpcError, IpcTransport, MessageEnvelope,
    TransferPayload, WorkerMessage,
};
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::configuration::ProcessOptions;
use crate::error::WorkFailure;

/// Initial heap size requested for the worker
pub const MIN_HEAP_ENV: &str = "ANVIL_WORKER_MIN_HEAP";
/// Maximum heap size requested for the worker
pub const MAX_HEAP_ENV: &str = "ANVIL_WORKER_MAX_HEAP";
/// Extra classpath entries, joined with the platform path separator
pub const CLASSPATH_ENV: &str = "ANVIL_WORKER_CLASSPATH";

/// Spawns worker processes and drives one unit of work through each
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Build the worker command for the given per-unit settings
    pub fn command(
        &self,
        options: &ProcessOptions,
        classpath: &[PathBuf],
    ) -> Result<Command, WorkFailure> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .args(&options.args)
            .envs(&options.environment)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(dir) = &options.working_dir {
            command.current_dir(dir);
        }
        if let Some(min_heap) = &options.min_heap {
            command.env(MIN_HEAP_ENV, min_heap);
        }
        if let Some(max_heap) = &options.max_heap {
            command.env(MAX_HEAP_ENV, max_heap);
        }
        if !classpath.is_empty() {
            let joined = std::env::join_paths(classpath)
                .map_err(|e| WorkFailure::Spawn(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
            command.env(CLASSPATH_ENV, joined);
        }

        Ok(command)
    }

    /// Spawn a worker, run one unit in it and wait for the process to exit
    pub async fn run_unit(
        &self,
        id: Uuid,
        display_name: &str,
        payload: TransferPayload,
        options: &ProcessOptions,
        classpath: &[PathBuf],
    ) -> Result<(), WorkFailure> {
        let mut child = self
            .command(options, classpath)?
            .spawn()
            .map_err(WorkFailure::Spawn)?;

        let stdin = child.stdin.take().ok_or_else(|| {
            WorkFailure::Spawn(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "worker stdin was not captured",
            ))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            WorkFailure::Spawn(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "worker stdout was not captured",
            ))
        })?;

        debug!(
            "Started worker process {:?} for unit {} '{}'",
            child.id(),
            id,
            display_name
        );

        let mut transport = ChildProcessTransport::for_child(stdout, stdin);
        let outcome = exchange(&mut transport, id, display_name, payload).await;

        // The worker may already be gone
        let _ = transport
            .send(&MessageEnvelope::new(WorkerMessage::Shutdown))
            .await;
        let _ = transport.close().await;

        let status = child.wait().await.map_err(WorkFailure::Spawn)?;

        match outcome {
            Err(WorkFailure::Ipc(e)) if e.is_disconnect() => {
                warn!("Worker for unit {} exited early ({}): {}", id, status, e);
                Err(WorkFailure::Crashed {
                    status: status.to_string(),
                })
            }
            Err(e) => Err(e),
            Ok(()) => {
                if !status.success() {
                    warn!("Worker for unit {} completed but exited with {}", id, status);
                }
                Ok(())
            }
        }
    }
}

/// Send one unit and wait for its reply
pub async fn exchange<T: IpcTransport>(
    transport: &mut T,
    id: Uuid,
    display_name: &str,
    payload: TransferPayload,
) -> Result<(), WorkFailure> {
    transport
        .send(&MessageEnvelope::new(WorkerMessage::RunWork {
            correlation_id: id,
            display_name: display_name.to_string(),
            payload,
        }))
        .await?;

    loop {
        let envelope: MessageEnvelope<CoordinatorMessage> = match transport.receive().await {
            Ok(envelope) => envelope,
            // Stray output on the worker's stdout, e.g. a banner
            Err(e) if !e.is_fatal() => {
                warn!("Skipping unreadable reply for unit {}: {}", id, e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        match envelope.message {
            CoordinatorMessage::WorkCompleted {
                correlation_id,
                duration_ms,
            } if correlation_id == id => {
                debug!("Unit {} completed in worker after {}ms", id, duration_ms);
                return Ok(());
            }
            CoordinatorMessage::Error {
                correlation_id,
                error,
            } if correlation_id.map_or(true, |c| c == id) => {
                return Err(WorkFailure::from_worker_error(error));
            }
            CoordinatorMessage::Ready { worker_id } => {
                debug!("Worker {} ready", worker_id);
            }
            other => {
                return Err(WorkFailure::Ipc(IpcError::InvalidMessage(format!(
                    "unexpected reply for unit {}: {:?}",
                    id, other
                ))));
            }
        }
    }
}
