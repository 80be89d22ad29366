//! Runs compilers in a real worker process
//!
//! The test binary doubles as the worker program: the coordinator spawns it
//! again with a filter selecting `worker_process_entry`, which serves the
//! protocol over stdio through `run_worker`.

use std::path::PathBuf;
use std::sync::Arc;

use anvil_compile::{
    register_compiler, run_worker, CompileError, Compiler, JavaCompileSpec, Transferable,
    TransferableCompiler, WorkResult, WorkerCompiler,
};
use anvil_execution::{
    error_chain, DefaultWorkerExecutor, ExecutionError, IpcError, IsolationMode, WorkFailure,
    WorkRegistry, WorkerConfig, WorkerConfiguration, WorkerError,
};
use serde::{Deserialize, Serialize};

/// Set only in the environment of spawned workers
const WORKER_ROLE_ENV: &str = "ANVIL_COMPILE_TEST_WORKER";

/// Records the id of the process it runs in
#[derive(Serialize, Deserialize)]
struct PidRecorder;

impl TransferableCompiler for PidRecorder {
    const KIND: &'static str = "pid-recorder";
}

impl Compiler<JavaCompileSpec> for PidRecorder {
    fn execute(&self, spec: &JavaCompileSpec) -> Result<WorkResult, CompileError> {
        std::fs::write(
            spec.destination_dir.join("pid"),
            std::process::id().to_string(),
        )
        .map_err(|e| CompileError::failed_with("cannot record pid", e))?;
        Ok(WorkResult::success())
    }

    fn transferable(&self) -> Option<&dyn Transferable> {
        Some(self)
    }
}

#[derive(Serialize, Deserialize)]
struct ThrowingCompiler {
    message: String,
}

impl TransferableCompiler for ThrowingCompiler {
    const KIND: &'static str = "throwing";
}

impl Compiler<JavaCompileSpec> for ThrowingCompiler {
    fn execute(&self, _spec: &JavaCompileSpec) -> Result<WorkResult, CompileError> {
        Err(CompileError::failed(self.message.clone()))
    }

    fn transferable(&self) -> Option<&dyn Transferable> {
        Some(self)
    }
}

#[derive(Serialize, Deserialize)]
struct PanickingCompiler;

impl TransferableCompiler for PanickingCompiler {
    const KIND: &'static str = "panicking";
}

impl Compiler<JavaCompileSpec> for PanickingCompiler {
    fn execute(&self, _spec: &JavaCompileSpec) -> Result<WorkResult, CompileError> {
        panic!("compiler crashed")
    }

    fn transferable(&self) -> Option<&dyn Transferable> {
        Some(self)
    }
}

fn registry() -> WorkRegistry {
    let mut registry = WorkRegistry::new();
    register_compiler::<JavaCompileSpec, PidRecorder>(&mut registry);
    register_compiler::<JavaCompileSpec, ThrowingCompiler>(&mut registry);
    register_compiler::<JavaCompileSpec, PanickingCompiler>(&mut registry);
    registry
}

#[test]
fn worker_process_entry() {
    if std::env::var_os(WORKER_ROLE_ENV).is_none() {
        return;
    }
    // Exit before the harness reports on this test over the protocol stream
    let code = match run_worker(registry()) {
        Ok(()) => 0,
        Err(_) => 1,
    };
    std::process::exit(code);
}

/// A compiler that forks this test binary as its worker
fn forked(
    delegate: Arc<dyn Compiler<JavaCompileSpec>>,
    extra_env: &'static [(&'static str, &'static str)],
) -> WorkerCompiler<JavaCompileSpec> {
    let config = WorkerConfig {
        isolation_mode: IsolationMode::Process,
        program: Some(std::env::current_exe().unwrap()),
        args: vec![
            "worker_process_entry".to_string(),
            "--exact".to_string(),
            "--nocapture".to_string(),
            "--test-threads=1".to_string(),
        ],
        ..Default::default()
    };
    // The coordinator side never runs units in-process
    let executor = Arc::new(DefaultWorkerExecutor::new(&config, WorkRegistry::new()).unwrap());

    let configurator = move |_spec: &JavaCompileSpec, unit: &mut WorkerConfiguration| {
        unit.process
            .environment
            .insert(WORKER_ROLE_ENV.to_string(), "1".to_string());
        for (key, value) in extra_env {
            unit.process
                .environment
                .insert(key.to_string(), value.to_string());
        }
    };
    WorkerCompiler::new(delegate, executor, IsolationMode::Process, configurator).unwrap()
}

fn spec(destination: impl Into<PathBuf>) -> JavaCompileSpec {
    JavaCompileSpec::new(destination).with_sources(["App.java"])
}

#[test]
fn test_delegate_runs_in_separate_process() {
    let out = tempfile::tempdir().unwrap();
    let compiler = forked(Arc::new(PidRecorder), &[]);

    compiler.execute(&spec(out.path())).unwrap();

    let recorded: u32 = std::fs::read_to_string(out.path().join("pid"))
        .unwrap()
        .parse()
        .unwrap();
    assert_ne!(recorded, std::process::id());
}

#[test]
fn test_delegate_error_crosses_process_boundary() {
    let compiler = forked(
        Arc::new(ThrowingCompiler {
            message: "x".to_string(),
        }),
        &[],
    );

    let error = compiler.execute(&spec("build/classes")).unwrap_err();
    assert!(matches!(
        error,
        ExecutionError::WorkerFailure {
            source: WorkFailure::Remote { .. },
            ..
        }
    ));
    assert!(error_chain(&error).iter().any(|message| message == "x"));
}

#[test]
fn test_delegate_panic_message_crosses_process_boundary() {
    let compiler = forked(Arc::new(PanickingCompiler), &[]);

    let error = compiler.execute(&spec("build/classes")).unwrap_err();
    match error {
        ExecutionError::WorkerFailure {
            source: WorkFailure::Panicked(message),
            ..
        } => assert!(message.contains("compiler crashed"), "got {}", message),
        other => panic!("expected panic failure, got {:?}", other),
    }
}

#[test]
fn test_misconfigured_worker_reports_initialization_failure() {
    let compiler = forked(
        Arc::new(PidRecorder),
        &[("ANVIL_WORKER_ISOLATION_MODE", "sideways")],
    );

    let error = compiler.execute(&spec("build/classes")).unwrap_err();
    match error {
        ExecutionError::WorkerFailure {
            source: WorkFailure::Ipc(IpcError::WorkerError(failure)),
            ..
        } => match failure {
            WorkerError::InitializationFailed { error } => {
                assert!(error.contains("sideways"), "got {}", error)
            }
            other => panic!("expected initialization failure, got {:?}", other),
        },
        other => panic!("expected initialization failure, got {:?}", other),
    }
}
