//! Failures of the coordinator/worker link

use thiserror::Error;

use crate::protocol::WorkerError;

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// A line arrived that is not a valid envelope
    #[error("Unreadable message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Transport failed: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed its end before sending another message
    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    ProtocolVersionMismatch { expected: u32, actual: u32 },

    /// The worker answered with an error that is not about a unit of work
    #[error("Worker reported: {0}")]
    WorkerError(WorkerError),

    #[error("Unexpected message: {0}")]
    InvalidMessage(String),
}

impl IpcError {
    /// Whether the link is unusable and reading further messages is pointless
    ///
    /// A single unreadable line is not fatal; the next line may be fine.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IpcError::Io(_) | IpcError::ConnectionClosed | IpcError::ProtocolVersionMismatch { .. }
        )
    }

    /// Whether the other end went away
    pub fn is_disconnect(&self) -> bool {
        matches!(self, IpcError::ConnectionClosed | IpcError::Io(_))
    }

    pub(crate) fn closed_half(which: &str) -> Self {
        IpcError::Io(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            format!("{} already closed", which),
        ))
    }
}
