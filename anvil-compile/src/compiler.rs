//! The compiler contract and the transfer codec for delegates

use anvil_execution::ExecutionError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::CompileError;
use crate::spec::CompileSpec;

/// Outcome of a compilation as reported to the build task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkResult {
    pub success: bool,
    pub failure: Option<String>,
}

impl WorkResult {
    pub fn success() -> Self {
        Self {
            success: true,
            failure: None,
        }
    }

    pub fn failed(failure: impl Into<String>) -> Self {
        Self {
            success: false,
            failure: Some(failure.into()),
        }
    }
}

/// Something that compiles a spec
pub trait Compiler<S: CompileSpec>: Send + Sync {
    fn execute(&self, spec: &S) -> Result<WorkResult, CompileError>;

    /// The transfer codec of this compiler, if it can be rebuilt inside a worker
    ///
    /// Compilers that hold handles to the running process (caches, open
    /// connections, shared mutable state) keep the default and cannot be
    /// used as a worker delegate.
    fn transferable(&self) -> Option<&dyn Transferable> {
        None
    }
}

/// Object-safe view of a [`TransferableCompiler`]
pub trait Transferable {
    fn kind(&self) -> &'static str;

    fn encode_state(&self) -> Result<JsonValue, serde_json::Error>;
}

/// A compiler rebuilt from its own serialized state inside a worker
///
/// `KIND` names the worker entry point that decodes it, see
/// [`crate::register_compiler`].
pub trait TransferableCompiler: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: &'static str;
}

impl<T: TransferableCompiler> Transferable for T {
    fn kind(&self) -> &'static str {
        T::KIND
    }

    fn encode_state(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// A delegate compiler in its transferred form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegateState {
    pub kind: String,
    pub state: JsonValue,
}

impl DelegateState {
    /// Encode a delegate, failing if it cannot cross the worker boundary
    pub fn capture<S: CompileSpec>(delegate: &dyn Compiler<S>) -> Result<Self, ExecutionError> {
        let transferable = delegate.transferable().ok_or_else(|| {
            ExecutionError::NotTransferable(
                "delegate compiler must be transferable to a worker".to_string(),
            )
        })?;

        let kind = transferable.kind();
        let state = transferable.encode_state().map_err(|e| {
            ExecutionError::NotTransferable(format!(
                "state of delegate compiler '{}' cannot be encoded: {}",
                kind, e
            ))
        })?;

        Ok(Self {
            kind: kind.to_string(),
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::JavaCompileSpec;
    use std::sync::{Arc, Mutex};

    #[derive(Serialize, Deserialize)]
    struct Javac {
        executable: String,
    }

    impl TransferableCompiler for Javac {
        const KIND: &'static str = "javac";
    }

    impl Compiler<JavaCompileSpec> for Javac {
        fn execute(&self, _spec: &JavaCompileSpec) -> Result<WorkResult, CompileError> {
            Ok(WorkResult::success())
        }

        fn transferable(&self) -> Option<&dyn Transferable> {
            Some(self)
        }
    }

    struct CachingCompiler {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Compiler<JavaCompileSpec> for CachingCompiler {
        fn execute(&self, spec: &JavaCompileSpec) -> Result<WorkResult, CompileError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(spec.display_name());
            }
            Ok(WorkResult::success())
        }
    }

    struct UnencodableCompiler;

    impl Transferable for UnencodableCompiler {
        fn kind(&self) -> &'static str {
            "unencodable"
        }

        fn encode_state(&self) -> Result<JsonValue, serde_json::Error> {
            Err(<serde_json::Error as serde::ser::Error>::custom(
                "socket handle cannot be serialized",
            ))
        }
    }

    impl Compiler<JavaCompileSpec> for UnencodableCompiler {
        fn execute(&self, _spec: &JavaCompileSpec) -> Result<WorkResult, CompileError> {
            Ok(WorkResult::success())
        }

        fn transferable(&self) -> Option<&dyn Transferable> {
            Some(self)
        }
    }

    #[test]
    fn test_capture_transferable_delegate() {
        let javac = Javac {
            executable: "/usr/bin/javac".to_string(),
        };
        let state = DelegateState::capture(&javac).unwrap();

        assert_eq!(state.kind, "javac");
        assert_eq!(state.state["executable"], "/usr/bin/javac");
    }

    #[test]
    fn test_capture_rejects_plain_compiler() {
        let compiler = CachingCompiler {
            seen: Arc::new(Mutex::new(Vec::new())),
        };
        let error = DelegateState::capture(&compiler).unwrap_err();
        assert!(matches!(error, ExecutionError::NotTransferable(_)));
    }

    #[test]
    fn test_capture_rejects_unencodable_state() {
        let error = DelegateState::capture(&UnencodableCompiler).unwrap_err();
        assert!(error.to_string().contains("socket handle cannot be serialized"));
    }

    #[test]
    fn test_work_result_constructors() {
        assert_eq!(
            WorkResult::success(),
            WorkResult {
                success: true,
                failure: None
            }
        );
        let failed = WorkResult::failed("2 errors");
        assert!(!failed.success);
        assert_eq!(failed.failure.as_deref(), Some("2 errors"));
    }
}
