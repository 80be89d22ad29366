//! Process isolation against small shell workers that speak the wire protocol

#![cfg(unix)]

use std::path::PathBuf;

use anvil_config::{IsolationMode, WorkerConfig};
use anvil_execution::{
    error_chain, DefaultWorkerExecutor, ExecutionError, TransferPayload, WorkFailure,
    WorkRegistry, WorkerConfiguration, WorkerExecutor,
};
use serde_json::json;

const EXTRACT_ID: &str = concat!(
    r#"IFS= read -r line; "#,
    r#"id=$(printf '%s' "$line" | sed 's/.*"correlation_id":"\([^"]*\)".*/\1/')"#,
);

const ENVELOPE_HEAD: &str =
    r#"{"protocol_version":1,"timestamp":"2024-01-01T00:00:00Z","message":"#;

const COMPLETED: &str = r#"{"type":"work_completed","correlation_id":"%s","duration_ms":1}"#;

/// Fails with the worker's max heap as message and "x" as cause
const FAILED: &str = concat!(
    r#"{"type":"error","correlation_id":"%s","error":{"error_type":"work_failed","#,
    r#""action":"javac","error":"max heap %s","causes":["x"]}}"#,
);

/// Answers one request with `message`; `%s` placeholders take `$id` then `printf_args`
fn replying_script(message: &str, printf_args: &str) -> String {
    format!(
        "{}; printf '{}{}}}\\n' \"$id\"{}",
        EXTRACT_ID, ENVELOPE_HEAD, message, printf_args
    )
}

fn shell_executor(script: &str) -> DefaultWorkerExecutor {
    shell_executor_with_mode(script, IsolationMode::Auto)
}

fn shell_executor_with_mode(
    script: &str,
    isolation_mode: IsolationMode,
) -> DefaultWorkerExecutor {
    let config = WorkerConfig {
        isolation_mode,
        program: Some(PathBuf::from("sh")),
        args: vec!["-c".to_string(), script.to_string()],
        ..Default::default()
    };
    DefaultWorkerExecutor::new(&config, WorkRegistry::new()).unwrap()
}

fn forked_unit(name: &str) -> WorkerConfiguration {
    let mut config = WorkerConfiguration::new(name);
    config.isolation_mode = IsolationMode::Process;
    config.set_params(TransferPayload::new("javac", json!({"sources": ["Main.java"]})));
    config
}

#[test]
fn test_worker_process_completes_unit() {
    let script = replying_script(COMPLETED, "");
    let executor = shell_executor(&script);

    executor.submit(forked_unit("compile in process")).unwrap();
    assert!(executor.await_completion().is_ok());
}

#[test]
fn test_worker_process_failure_keeps_remote_chain() {
    let script = replying_script(FAILED, r#" "$ANVIL_WORKER_MAX_HEAP""#);
    let executor = shell_executor(&script);

    let mut unit = forked_unit("compile with heap");
    unit.process.max_heap = Some("768m".to_string());
    executor.submit(unit).unwrap();

    let error = executor.await_completion().unwrap_err();
    let chain = error_chain(&error);
    assert!(chain.iter().any(|m| m == "max heap 768m"), "{:?}", chain);
    assert_eq!(chain.last().map(String::as_str), Some("x"));
    assert!(matches!(
        error,
        ExecutionError::WorkerFailure {
            source: WorkFailure::Remote { .. },
            ..
        }
    ));
}

#[test]
fn test_worker_process_crash_is_reported() {
    let executor = shell_executor("exit 3");
    executor.submit(forked_unit("crashing worker")).unwrap();

    match executor.await_completion() {
        Err(ExecutionError::WorkerFailure {
            unit,
            source: WorkFailure::Crashed { status },
        }) => {
            assert_eq!(unit, "crashing worker");
            assert!(status.contains('3'), "unexpected status: {}", status);
        }
        other => panic!("expected crash, got {:?}", other),
    }

    // The executor stays usable after a crashed unit
    executor.submit(forked_unit("crashing again")).unwrap();
    assert!(executor.await_completion().is_err());
}

#[test]
fn test_auto_isolation_forks_when_process_settings_requested() {
    let script = replying_script(COMPLETED, "");
    let executor = shell_executor(&script);

    // "javac" is not registered in-process, so success proves the unit forked
    let mut unit = forked_unit("auto unit");
    unit.isolation_mode = IsolationMode::Auto;
    unit.process.min_heap = Some("64m".to_string());
    executor.submit(unit).unwrap();
    assert!(executor.await_completion().is_ok());

    // Without process settings the same unit stays in-process and finds no action
    let mut unit = forked_unit("auto unit in thread");
    unit.isolation_mode = IsolationMode::Auto;
    executor.submit(unit).unwrap();
    assert!(matches!(
        executor.await_completion(),
        Err(ExecutionError::WorkerFailure {
            source: WorkFailure::UnknownAction(_),
            ..
        })
    ));
}

#[test]
fn test_configured_process_isolation_applies_to_auto_units() {
    let executor = shell_executor_with_mode("exit 3", IsolationMode::Process);

    // No process settings, yet the configured mode sends the unit to a worker
    let mut unit = forked_unit("auto unit under process config");
    unit.isolation_mode = IsolationMode::Auto;
    executor.submit(unit).unwrap();

    assert!(matches!(
        executor.await_completion(),
        Err(ExecutionError::WorkerFailure {
            source: WorkFailure::Crashed { .. },
            ..
        })
    ));
}

#[test]
fn test_configured_thread_isolation_applies_to_auto_units() {
    let executor = shell_executor_with_mode("exit 3", IsolationMode::Thread);

    let mut unit = forked_unit("auto unit under thread config");
    unit.isolation_mode = IsolationMode::Auto;
    unit.process.max_heap = Some("1g".to_string());
    executor.submit(unit).unwrap();

    // Stayed in-process, where "javac" is not registered
    assert!(matches!(
        executor.await_completion(),
        Err(ExecutionError::WorkerFailure {
            source: WorkFailure::UnknownAction(_),
            ..
        })
    ));

    // An explicit unit mode still wins over the configured one
    executor.submit(forked_unit("explicit process unit")).unwrap();
    assert!(matches!(
        executor.await_completion(),
        Err(ExecutionError::WorkerFailure {
            source: WorkFailure::Crashed { .. },
            ..
        })
    ));
}
