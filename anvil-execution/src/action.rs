//! Work actions: the code that runs inside a worker

use std::collections::HashMap;
use std::sync::Arc;

use anvil_ipc::TransferPayload;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::WorkFailure;

/// Boxed error raised by a work action
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A unit of work the worker knows how to run
///
/// Implementations decode everything they need from `arguments`; they must
/// not rely on state of the process that submitted the work.
pub trait WorkAction: Send + Sync {
    fn execute(&self, arguments: &JsonValue) -> Result<(), BoxError>;
}

impl<F> WorkAction for F
where
    F: Fn(&JsonValue) -> Result<(), BoxError> + Send + Sync,
{
    fn execute(&self, arguments: &JsonValue) -> Result<(), BoxError> {
        self(arguments)
    }
}

/// Named work actions available inside a worker
#[derive(Clone, Default)]
pub struct WorkRegistry {
    actions: HashMap<String, Arc<dyn WorkAction>>,
}

impl WorkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action, replacing any previous action with the same name
    pub fn register(&mut self, name: impl Into<String>, action: impl WorkAction + 'static) {
        let name = name.into();
        debug!("Registering work action: {}", name);
        self.actions.insert(name, Arc::new(action));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run the action named by `payload`
    pub fn run(&self, payload: &TransferPayload) -> Result<(), WorkFailure> {
        let action = self
            .actions
            .get(&payload.action)
            .ok_or_else(|| WorkFailure::UnknownAction(payload.action.clone()))?;

        action
            .execute(&payload.arguments)
            .map_err(|source| WorkFailure::ActionFailed {
                action: payload.action.clone(),
                source,
            })
    }
}

impl std::fmt::Debug for WorkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkRegistry")
            .field("actions", &self.names())
            .finish()
    }
}
