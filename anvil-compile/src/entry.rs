//! Worker entry point: rebuilds a delegate compiler and runs it

use std::marker::PhantomData;

use anvil_execution::{BoxError, WorkAction, WorkRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::compiler::{Compiler, DelegateState, TransferableCompiler};
use crate::error::CompileError;
use crate::spec::CompileSpec;

/// Name of the work action that runs delegates of `kind`
pub fn action_name(kind: &str) -> String {
    format!("compile:{}", kind)
}

/// Parameters of one compile unit: the delegate and the spec it compiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileWorkParams {
    pub delegate: DelegateState,
    pub spec: JsonValue,
}

/// Work action that decodes a `C` and compiles an `S` with it
pub struct CompilerWorkAction<S, C> {
    _marker: PhantomData<fn() -> (S, C)>,
}

impl<S, C> CompilerWorkAction<S, C> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<S, C> Default for CompilerWorkAction<S, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, C> WorkAction for CompilerWorkAction<S, C>
where
    S: CompileSpec,
    C: TransferableCompiler + Compiler<S>,
{
    fn execute(&self, arguments: &JsonValue) -> Result<(), BoxError> {
        let params = CompileWorkParams::deserialize(arguments).map_err(CompileError::from)?;
        if params.delegate.kind != C::KIND {
            return Err(Box::new(CompileError::InvalidSpec(format!(
                "expected delegate of kind '{}', got '{}'",
                C::KIND,
                params.delegate.kind
            ))));
        }

        let compiler = C::deserialize(params.delegate.state).map_err(CompileError::from)?;
        let spec = S::deserialize(params.spec).map_err(CompileError::from)?;

        // Only a raised error reaches the caller; the reported outcome stops here.
        let outcome = compiler.execute(&spec)?;
        debug!(
            "Delegate '{}' finished {}: success={}",
            C::KIND,
            spec.display_name(),
            outcome.success
        );
        Ok(())
    }
}

/// Make delegates of type `C` runnable inside workers built from `registry`
pub fn register_compiler<S, C>(registry: &mut WorkRegistry)
where
    S: CompileSpec,
    C: TransferableCompiler + Compiler<S>,
{
    registry.register(action_name(C::KIND), CompilerWorkAction::<S, C>::new());
}
