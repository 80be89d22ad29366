//! Blocking compiler facade over the execution service

use std::sync::Arc;

use anvil_execution::{
    ExecutionError, IsolationMode, TransferPayload, WorkFailure, WorkerConfiguration,
    WorkerExecutor,
};
use tracing::{debug, warn};

use crate::compiler::{Compiler, DelegateState, WorkResult};
use crate::configurator::WorkerConfigurator;
use crate::entry::{action_name, CompileWorkParams};
use crate::error::CompileError;
use crate::spec::CompileSpec;

/// Runs a delegate compiler as one unit of isolated work per call
///
/// Each [`execute`](WorkerCompiler::execute) builds a fresh worker
/// configuration, lets the configurator adjust it, submits exactly one unit
/// and blocks until that unit completes. Errors raised by the delegate come
/// back as the source of the returned error; nothing is retried.
///
/// The [`WorkResult`] the delegate produces inside the worker is not sent
/// back. When no error is raised, `execute` reports success even if the
/// delegate returned `success: false`. Callers relying on the delegate's
/// reported outcome will not see it.
pub struct WorkerCompiler<S: CompileSpec> {
    delegate: Arc<dyn Compiler<S>>,
    delegate_state: DelegateState,
    executor: Arc<dyn WorkerExecutor>,
    isolation_mode: IsolationMode,
    configurator: Box<dyn WorkerConfigurator<S>>,
}

impl<S: CompileSpec> WorkerCompiler<S> {
    /// Wrap `delegate`, which must be transferable to a worker
    ///
    /// Fails with [`ExecutionError::NotTransferable`] before anything is
    /// submitted to `executor`.
    pub fn new(
        delegate: Arc<dyn Compiler<S>>,
        executor: Arc<dyn WorkerExecutor>,
        isolation_mode: IsolationMode,
        configurator: impl WorkerConfigurator<S> + 'static,
    ) -> Result<Self, ExecutionError> {
        let delegate_state = DelegateState::capture(delegate.as_ref())?;
        debug!(
            "Worker compiler created for delegate '{}' ({} isolation)",
            delegate_state.kind, isolation_mode
        );

        Ok(Self {
            delegate,
            delegate_state,
            executor,
            isolation_mode,
            configurator: Box::new(configurator),
        })
    }

    pub fn delegate(&self) -> &Arc<dyn Compiler<S>> {
        &self.delegate
    }

    pub fn isolation_mode(&self) -> IsolationMode {
        self.isolation_mode
    }

    /// Compile `spec` in a worker and wait for it to finish
    pub fn execute(&self, spec: &S) -> Result<WorkResult, ExecutionError> {
        let display_name = spec.display_name();
        let arguments = encode_params(&self.delegate_state, spec).map_err(|e| {
            ExecutionError::WorkerFailure {
                unit: display_name.clone(),
                source: WorkFailure::Encode(e),
            }
        })?;

        let mut configuration = WorkerConfiguration::new(display_name.clone());
        configuration.isolation_mode = self.isolation_mode;
        configuration.set_params(TransferPayload::new(
            action_name(&self.delegate_state.kind),
            arguments,
        ));
        self.configurator.apply(spec, &mut configuration);

        debug!("Submitting {}", display_name);
        self.executor.submit(configuration)?;
        self.executor.await_completion().map_err(|e| {
            warn!("{} failed: {}", display_name, e);
            e
        })?;

        Ok(WorkResult::success())
    }
}

fn encode_params<S: CompileSpec>(
    delegate: &DelegateState,
    spec: &S,
) -> Result<serde_json::Value, serde_json::Error> {
    let params = CompileWorkParams {
        delegate: delegate.clone(),
        spec: serde_json::to_value(spec)?,
    };
    serde_json::to_value(params)
}

impl<S: CompileSpec> Compiler<S> for WorkerCompiler<S> {
    fn execute(&self, spec: &S) -> Result<WorkResult, CompileError> {
        WorkerCompiler::execute(self, spec)
            .map_err(|e| CompileError::failed_with("Compilation in worker failed", e))
    }
}
