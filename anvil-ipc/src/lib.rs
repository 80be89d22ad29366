//! Inter-process communication for Anvil
//!
//! This crate provides the protocol and transport abstractions used between
//! the build process (coordinator) and isolated worker processes.

pub mod error;
pub mod protocol;
pub mod transport;

// Re-export commonly used types
pub use error::IpcError;
pub use protocol::{
    CoordinatorMessage, MessageEnvelope, TransferPayload, WorkerError, WorkerMessage,
    WorkerStatus, IPC_PROTOCOL_VERSION,
};
pub use transport::{ChildProcessTransport, IpcTransport, LineTransport, StdioTransport};
