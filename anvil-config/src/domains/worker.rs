//! Worker execution configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};

/// How strongly a unit of work is isolated from the host process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IsolationMode {
    /// Let the execution service decide per unit of work
    #[default]
    Auto,
    /// Run on an isolated worker thread inside the host process
    Thread,
    /// Run in a separate worker process
    Process,
}

impl fmt::Display for IsolationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IsolationMode::Auto => "auto",
            IsolationMode::Thread => "thread",
            IsolationMode::Process => "process",
        };
        f.write_str(name)
    }
}

impl FromStr for IsolationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(IsolationMode::Auto),
            "thread" | "never" => Ok(IsolationMode::Thread),
            "process" | "always" => Ok(IsolationMode::Process),
            _ => Err(format!("Invalid isolation mode: {}", s)),
        }
    }
}

/// Worker execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Isolation mode for units that leave theirs at `Auto`
    #[serde(default)]
    pub isolation_mode: IsolationMode,

    /// Worker program spawned for process isolation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,

    /// Arguments always passed to the worker program
    #[serde(default)]
    pub args: Vec<String>,

    /// Upper bound on threads running thread-isolated work
    #[serde(default = "default_max_blocking_threads")]
    pub max_blocking_threads: usize,

    /// Async runtime threads driving worker processes
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            isolation_mode: IsolationMode::default(),
            program: None,
            args: Vec::new(),
            max_blocking_threads: default_max_blocking_threads(),
            worker_threads: default_worker_threads(),
        }
    }
}

impl Validatable for WorkerConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(
            self.max_blocking_threads,
            "max_blocking_threads",
            self.domain_name(),
        )?;
        validate_positive(self.worker_threads, "worker_threads", self.domain_name())?;

        if let Some(program) = &self.program {
            validate_required_string(&program.to_string_lossy(), "program", self.domain_name())?;
        }

        if self.isolation_mode == IsolationMode::Process && self.program.is_none() {
            return Err(self.validation_error("process isolation requires a worker program"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "worker"
    }
}

fn default_max_blocking_threads() -> usize {
    16
}

fn default_worker_threads() -> usize {
    2
}
