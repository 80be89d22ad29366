//! Execution service contract and the default thread/process implementation

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::ThreadId;

use anvil_config::{IsolationMode, Validatable, WorkerConfig};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::action::WorkRegistry;
use crate::configuration::WorkerConfiguration;
use crate::error::{ExecutionError, WorkFailure};
use crate::process::ProcessLauncher;

/// Service that runs units of work in isolated workers
///
/// `submit` never blocks. `await_completion` blocks the calling thread until
/// every unit the same caller submitted has finished and reports the first
/// failure among them.
pub trait WorkerExecutor: Send + Sync {
    /// Enqueue one unit of work
    fn submit(&self, configuration: WorkerConfiguration) -> Result<(), ExecutionError>;

    /// Block until all units submitted by the calling thread complete
    fn await_completion(&self) -> Result<(), ExecutionError>;
}

struct PendingUnit {
    id: Uuid,
    display_name: String,
    handle: JoinHandle<Result<(), WorkFailure>>,
}

/// Default execution service backed by a private tokio runtime
///
/// Thread-isolated units run on the runtime's blocking pool after their
/// parameters went through the transfer codec; process-isolated units run in
/// a freshly spawned worker program. Completion is tracked per submitting
/// thread.
///
/// Units whose own isolation mode is `Auto` take the configured
/// [`WorkerConfig::isolation_mode`] instead; only a configured `Auto` leaves
/// the choice to the unit's process settings.
///
/// Units stay registered under the submitting thread until that thread calls
/// `await_completion`. A thread that submits and never awaits (for example
/// because it panicked in between) leaves its units running and registered
/// until the executor is dropped; they are never reported to other threads.
///
/// The blocking methods must not be called from inside an async context.
pub struct DefaultWorkerExecutor {
    runtime: Runtime,
    default_isolation: IsolationMode,
    registry: Arc<WorkRegistry>,
    launcher: Option<ProcessLauncher>,
    pending: Mutex<HashMap<ThreadId, Vec<PendingUnit>>>,
}

impl DefaultWorkerExecutor {
    /// Create an executor from validated worker configuration
    pub fn new(config: &WorkerConfig, registry: WorkRegistry) -> Result<Self, ExecutionError> {
        config.validate()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .max_blocking_threads(config.max_blocking_threads)
            .thread_name("anvil-worker")
            .enable_all()
            .build()
            .map_err(|e| {
                ExecutionError::ConfigurationError(format!("Failed to start worker runtime: {}", e))
            })?;

        let launcher = config
            .program
            .as_ref()
            .map(|program| ProcessLauncher::new(program.clone(), config.args.clone()));

        info!(
            "Worker executor started ({} isolation, process workers: {})",
            config.isolation_mode,
            launcher.is_some()
        );

        Ok(Self {
            runtime,
            default_isolation: config.isolation_mode,
            registry: Arc::new(registry),
            launcher,
            pending: Mutex::new(HashMap::new()),
        })
    }

    /// Create an executor that only runs thread-isolated work
    pub fn with_defaults(registry: WorkRegistry) -> Result<Self, ExecutionError> {
        Self::new(&WorkerConfig::default(), registry)
    }

    /// Number of units submitted by the calling thread and not yet awaited
    pub fn pending_count(&self) -> usize {
        self.lock_pending()
            .get(&std::thread::current().id())
            .map_or(0, Vec::len)
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<ThreadId, Vec<PendingUnit>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_thread_unit(
        &self,
        display_name: &str,
        encoded: Result<Vec<u8>, serde_json::Error>,
    ) -> JoinHandle<Result<(), WorkFailure>> {
        let registry = Arc::clone(&self.registry);
        match encoded {
            Ok(bytes) => {
                let display_name = display_name.to_string();
                self.runtime.spawn_blocking(move || {
                    let payload = serde_json::from_slice(&bytes).map_err(WorkFailure::Decode)?;
                    debug!("Running '{}' on worker thread", display_name);
                    registry.run(&payload)
                })
            }
            // Surface codec failures at the wait step like any other unit failure
            Err(e) => self.runtime.spawn(async move { Err(WorkFailure::Encode(e)) }),
        }
    }
}

impl WorkerExecutor for DefaultWorkerExecutor {
    fn submit(&self, mut configuration: WorkerConfiguration) -> Result<(), ExecutionError> {
        if configuration.isolation_mode == IsolationMode::Auto {
            configuration.isolation_mode = self.default_isolation;
        }
        let mode = configuration.resolve_isolation(self.launcher.is_some());
        let WorkerConfiguration {
            display_name,
            params,
            process,
            classpath,
            ..
        } = configuration;

        let payload = params.ok_or_else(|| {
            ExecutionError::ConfigurationError(format!(
                "Unit '{}' has no work parameters",
                display_name
            ))
        })?;

        let id = Uuid::new_v4();

        let handle = match mode {
            IsolationMode::Process => {
                let launcher = self.launcher.clone().ok_or_else(|| {
                    ExecutionError::ConfigurationError(
                        "Process isolation requested but no worker program is configured"
                            .to_string(),
                    )
                })?;
                let name = display_name.clone();
                self.runtime.spawn(async move {
                    launcher
                        .run_unit(id, &name, payload, &process, &classpath)
                        .await
                })
            }
            _ => self.spawn_thread_unit(&display_name, serde_json::to_vec(&payload)),
        };

        debug!("Submitted unit {} '{}' ({} isolation)", id, display_name, mode);

        self.lock_pending()
            .entry(std::thread::current().id())
            .or_default()
            .push(PendingUnit {
                id,
                display_name,
                handle,
            });

        Ok(())
    }

    fn await_completion(&self) -> Result<(), ExecutionError> {
        let units = self
            .lock_pending()
            .remove(&std::thread::current().id())
            .unwrap_or_default();

        if units.is_empty() {
            return Ok(());
        }

        debug!("Awaiting {} unit(s)", units.len());

        let outcomes = self.runtime.block_on(async move {
            let mut outcomes = Vec::with_capacity(units.len());
            for unit in units {
                let outcome = match unit.handle.await {
                    Ok(result) => result,
                    Err(e) => Err(WorkFailure::from_join_error(e)),
                };
                outcomes.push((unit.id, unit.display_name, outcome));
            }
            outcomes
        });

        let mut first_failure = None;
        for (id, display_name, outcome) in outcomes {
            match outcome {
                Ok(()) => debug!("Unit {} '{}' completed", id, display_name),
                Err(source) => {
                    warn!("Unit {} '{}' failed: {}", id, display_name, source);
                    if first_failure.is_none() {
                        first_failure = Some(ExecutionError::WorkerFailure {
                            unit: display_name,
                            source,
                        });
                    }
                }
            }
        }

        match first_failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
