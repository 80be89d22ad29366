//! IPC transport implementations

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::IpcError;
use crate::protocol::{MessageEnvelope, IPC_PROTOCOL_VERSION};

/// IPC transport trait for different communication mechanisms
#[async_trait]
pub trait IpcTransport: Send {
    /// Send a message to the other end
    async fn send<T: Serialize + Send + Sync>(
        &mut self,
        message: &MessageEnvelope<T>,
    ) -> Result<(), IpcError>;

    /// Receive a message from the other end
    async fn receive<T: for<'de> Deserialize<'de> + Send>(
        &mut self,
    ) -> Result<MessageEnvelope<T>, IpcError>;

    /// Close the transport
    async fn close(&mut self) -> Result<(), IpcError>;
}

/// Newline-delimited JSON over any byte stream pair
pub struct LineTransport<R, W> {
    reader: Option<BufReader<R>>,
    writer: Option<W>,
}

/// Transport a worker process uses to talk to its coordinator
pub type StdioTransport = LineTransport<tokio::io::Stdin, tokio::io::Stdout>;

/// Transport a coordinator uses to talk to a spawned worker process
pub type ChildProcessTransport =
    LineTransport<tokio::process::ChildStdout, tokio::process::ChildStdin>;

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Some(BufReader::new(reader)),
            writer: Some(writer),
        }
    }
}

impl StdioTransport {
    /// Create a transport over this process's stdin/stdout
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl ChildProcessTransport {
    /// Create a transport over a spawned child's piped stdio
    pub fn for_child(
        stdout: tokio::process::ChildStdout,
        stdin: tokio::process::ChildStdin,
    ) -> Self {
        Self::new(stdout, stdin)
    }
}

#[async_trait]
impl<R, W> IpcTransport for LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send<T: Serialize + Send + Sync>(
        &mut self,
        message: &MessageEnvelope<T>,
    ) -> Result<(), IpcError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| IpcError::closed_half("writer"))?;

        let mut line = serde_json::to_string(message).map_err(IpcError::Encode)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;

        Ok(())
    }

    async fn receive<T: for<'de> Deserialize<'de> + Send>(
        &mut self,
    ) -> Result<MessageEnvelope<T>, IpcError> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| IpcError::closed_half("reader"))?;

        let mut line = String::new();
        reader.read_line(&mut line).await?;

        if line.is_empty() {
            return Err(IpcError::ConnectionClosed);
        }

        line.truncate(line.trim_end().len());

        let envelope: MessageEnvelope<T> =
            serde_json::from_str(&line).map_err(IpcError::Decode)?;

        if envelope.protocol_version != IPC_PROTOCOL_VERSION {
            return Err(IpcError::ProtocolVersionMismatch {
                expected: IPC_PROTOCOL_VERSION,
                actual: envelope.protocol_version,
            });
        }

        Ok(envelope)
    }

    async fn close(&mut self) -> Result<(), IpcError> {
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await?;
        }
        let _ = self.reader.take();
        Ok(())
    }
}
