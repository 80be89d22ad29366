//! Worker side of process isolation
//!
//! A worker program builds a [`WorkRegistry`] with the actions it supports
//! and hands it to [`serve_stdio`]. The coordinator then drives it through
//! the IPC protocol on stdin/stdout, so the program must log to stderr.

use std::sync::Arc;
use std::time::Instant;

use anvil_ipc::{
    CoordinatorMessage, IpcError, IpcTransport, MessageEnvelope, StdioTransport, TransferPayload,
    WorkerError, WorkerMessage, WorkerStatus,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::action::WorkRegistry;
use crate::error::{error_chain, WorkFailure};

/// Serves units of work received over an IPC transport
pub struct WorkerServer {
    registry: Arc<WorkRegistry>,
    status: WorkerStatus,
}

impl WorkerServer {
    pub fn new(worker_id: impl Into<String>, registry: WorkRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            status: WorkerStatus::new(worker_id.into(), std::process::id()),
        }
    }

    pub fn status(&self) -> &WorkerStatus {
        &self.status
    }

    /// Handle messages until shutdown or until the coordinator goes away
    pub async fn serve<T: IpcTransport>(&mut self, transport: &mut T) -> Result<(), IpcError> {
        info!("Worker {} serving", self.status.worker_id);

        transport
            .send(&MessageEnvelope::new(CoordinatorMessage::Ready {
                worker_id: self.status.worker_id.clone(),
            }))
            .await?;

        loop {
            let envelope: MessageEnvelope<WorkerMessage> = match transport.receive().await {
                Ok(envelope) => envelope,
                Err(IpcError::ConnectionClosed) => {
                    debug!("Coordinator closed the connection");
                    break;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Dropping unreadable message: {}", e);
                    transport
                        .send(&MessageEnvelope::new(CoordinatorMessage::Error {
                            correlation_id: None,
                            error: WorkerError::MessageParseError {
                                error: e.to_string(),
                            },
                        }))
                        .await?;
                    continue;
                }
            };

            match envelope.message {
                WorkerMessage::RunWork {
                    correlation_id,
                    display_name,
                    payload,
                } => {
                    let reply = self.run_unit(correlation_id, &display_name, payload).await;
                    transport.send(&MessageEnvelope::new(reply)).await?;
                }
                WorkerMessage::Ping { correlation_id } => {
                    self.status.update_activity();
                    transport
                        .send(&MessageEnvelope::new(CoordinatorMessage::Pong {
                            correlation_id,
                            worker_id: self.status.worker_id.clone(),
                            status: self.status.clone(),
                        }))
                        .await?;
                }
                WorkerMessage::Shutdown => {
                    debug!("Shutdown requested");
                    break;
                }
            }
        }

        transport.close().await?;
        info!(
            "Worker {} stopped after {} unit(s)",
            self.status.worker_id, self.status.units_executed
        );
        Ok(())
    }

    async fn run_unit(
        &mut self,
        correlation_id: Uuid,
        display_name: &str,
        payload: TransferPayload,
    ) -> CoordinatorMessage {
        debug!("Running unit {} '{}'", correlation_id, display_name);

        let started = Instant::now();
        let registry = Arc::clone(&self.registry);
        let action = payload.action.clone();
        let result = tokio::task::spawn_blocking(move || registry.run(&payload)).await;

        let outcome = result.unwrap_or_else(|e| Err(WorkFailure::from_join_error(e)));

        self.status.record_unit(outcome.is_ok());

        match outcome {
            Ok(()) => CoordinatorMessage::WorkCompleted {
                correlation_id,
                duration_ms: started.elapsed().as_millis() as u64,
            },
            Err(failure) => {
                error!("Unit {} '{}' failed: {}", correlation_id, display_name, failure);
                CoordinatorMessage::Error {
                    correlation_id: Some(correlation_id),
                    error: worker_error(&action, failure),
                }
            }
        }
    }
}

/// Describe a failure so the coordinator can rebuild its cause chain
fn worker_error(action: &str, failure: WorkFailure) -> WorkerError {
    match failure {
        WorkFailure::UnknownAction(action) => WorkerError::UnknownAction { action },
        WorkFailure::Panicked(error) => WorkerError::WorkerPanic { error },
        WorkFailure::ActionFailed { source, .. } => {
            let mut chain = error_chain(source.as_ref());
            let error = chain.remove(0);
            WorkerError::WorkFailed {
                action: action.to_string(),
                error,
                causes: chain,
            }
        }
        other => WorkerError::WorkFailed {
            action: action.to_string(),
            error: other.to_string(),
            causes: Vec::new(),
        },
    }
}

/// Serve the coordinator over this process's stdin/stdout
pub async fn serve_stdio(registry: WorkRegistry) -> Result<(), IpcError> {
    let worker_id = format!("worker-{}", std::process::id());
    let mut server = WorkerServer::new(worker_id, registry);
    let mut transport = StdioTransport::stdio();
    server.serve(&mut transport).await
}

/// Tell the coordinator this worker cannot serve, then close the link
///
/// Whatever unit the coordinator already sent fails with
/// [`WorkerError::InitializationFailed`] instead of a bare crash.
pub async fn report_startup_failure<T: IpcTransport>(
    transport: &mut T,
    error: impl Into<String>,
) -> Result<(), IpcError> {
    transport
        .send(&MessageEnvelope::new(CoordinatorMessage::Error {
            correlation_id: None,
            error: WorkerError::InitializationFailed {
                error: error.into(),
            },
        }))
        .await?;
    transport.close().await
}

/// [`report_startup_failure`] over this process's stdout
pub async fn reject_stdio(error: impl Into<String>) -> Result<(), IpcError> {
    report_startup_failure(&mut StdioTransport::stdio(), error).await
}
