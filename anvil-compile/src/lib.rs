//! Worker-isolated compilation for Anvil
//!
//! [`WorkerCompiler`] wraps a transferable delegate [`Compiler`] and runs
//! each compilation as one unit of work in an isolated worker, while its
//! callers keep seeing a plain blocking `execute(spec)`.
//!
//! ```no_run
//! use std::sync::Arc;
//! use anvil_compile::{register_compiler, JavaCompileSpec, JavaWorkerConfigurator, WorkerCompiler};
//! use anvil_execution::{DefaultWorkerExecutor, IsolationMode, WorkRegistry};
//! # use anvil_compile::{Compiler, CompileError, Transferable, TransferableCompiler, WorkResult};
//! # #[derive(serde::Serialize, serde::Deserialize)]
//! # struct Javac;
//! # impl TransferableCompiler for Javac { const KIND: &'static str = "javac"; }
//! # impl Compiler<JavaCompileSpec> for Javac {
//! #     fn execute(&self, _: &JavaCompileSpec) -> Result<WorkResult, CompileError> {
//! #         Ok(WorkResult::success())
//! #     }
//! #     fn transferable(&self) -> Option<&dyn Transferable> { Some(self) }
//! # }
//!
//! let mut registry = WorkRegistry::new();
//! register_compiler::<JavaCompileSpec, Javac>(&mut registry);
//! let executor = Arc::new(DefaultWorkerExecutor::with_defaults(registry)?);
//!
//! let compiler = WorkerCompiler::new(
//!     Arc::new(Javac),
//!     executor,
//!     IsolationMode::Auto,
//!     JavaWorkerConfigurator,
//! )?;
//! let result = compiler.execute(&JavaCompileSpec::new("build/classes"))?;
//! assert!(result.success);
//! # Ok::<(), anvil_execution::ExecutionError>(())
//! ```

pub mod compiler;
pub mod configurator;
pub mod entry;
pub mod error;
pub mod spec;
pub mod worker_compiler;
pub mod worker_main;

pub use compiler::{Compiler, DelegateState, Transferable, TransferableCompiler, WorkResult};
pub use configurator::{
    GroovyWorkerConfigurator, JavaWorkerConfigurator, NoopConfigurator, ScalaWorkerConfigurator,
    WorkerConfigurator,
};
pub use entry::{action_name, register_compiler, CompileWorkParams, CompilerWorkAction};
pub use error::CompileError;
pub use spec::{
    CompileOptions, CompileSpec, ForkOptions, GroovyCompileSpec, JavaCompileSpec,
    ScalaCompileSpec,
};
pub use worker_compiler::WorkerCompiler;
pub use worker_main::run_worker;
