//! Per-unit worker configuration

use std::collections::BTreeMap;
use std::path::PathBuf;

use anvil_config::IsolationMode;
use anvil_ipc::TransferPayload;

/// Settings applied when a unit runs in its own worker process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Initial heap size, e.g. `256m`
    pub min_heap: Option<String>,
    /// Maximum heap size, e.g. `1g`
    pub max_heap: Option<String>,
    /// Extra arguments for the worker program
    pub args: Vec<String>,
    pub environment: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
}

impl ProcessOptions {
    /// Whether no process-level setting was requested
    pub fn is_default(&self) -> bool {
        *self == ProcessOptions::default()
    }

    /// Merge the settings of `other` over these, keeping existing values it leaves unset
    ///
    /// Merging the same options twice has no further effect.
    pub fn merge(&mut self, other: &ProcessOptions) {
        if other.min_heap.is_some() {
            self.min_heap = other.min_heap.clone();
        }
        if other.max_heap.is_some() {
            self.max_heap = other.max_heap.clone();
        }
        for arg in &other.args {
            if !self.args.contains(arg) {
                self.args.push(arg.clone());
            }
        }
        self.environment.extend(
            other
                .environment
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        if other.working_dir.is_some() {
            self.working_dir = other.working_dir.clone();
        }
    }
}

/// Describes one unit of work submitted to a [`crate::WorkerExecutor`]
///
/// A configuration is built fresh for every unit and is not reused once
/// submitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerConfiguration {
    /// Human readable name used in logs and errors
    pub display_name: String,
    pub isolation_mode: IsolationMode,
    /// Transferred parameters; a unit without parameters cannot be submitted
    pub params: Option<TransferPayload>,
    pub process: ProcessOptions,
    /// Extra classpath entries made available to the worker
    pub classpath: Vec<PathBuf>,
}

impl WorkerConfiguration {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Default::default()
        }
    }

    pub fn set_params(&mut self, payload: TransferPayload) {
        self.params = Some(payload);
    }

    /// Add extra classpath entries, skipping ones already present
    pub fn add_classpath<I>(&mut self, entries: I)
    where
        I: IntoIterator,
        I::Item: Into<PathBuf>,
    {
        for entry in entries {
            let entry = entry.into();
            if !self.classpath.contains(&entry) {
                self.classpath.push(entry);
            }
        }
    }

    /// Whether this unit asks for settings only a separate process can honour
    pub fn requests_process_settings(&self) -> bool {
        !self.process.is_default() || !self.classpath.is_empty()
    }

    /// Resolve `Auto` into a concrete isolation mode
    pub fn resolve_isolation(&self, process_available: bool) -> IsolationMode {
        match self.isolation_mode {
            IsolationMode::Auto if process_available && self.requests_process_settings() => {
                IsolationMode::Process
            }
            IsolationMode::Auto => IsolationMode::Thread,
            mode => mode,
        }
    }
}
