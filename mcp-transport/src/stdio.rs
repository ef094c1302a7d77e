//! Line-delimited JSON over a pair of byte streams (spec §4.2.1).
//!
//! Two constructors are offered: [`StdioTransport::spawn`], which launches a
//! child process and talks over its stdin/stdout (the pattern a peer in the
//! `Client` role uses), and [`StdioTransport::from_process_streams`], which
//! wraps the current process's own stdin/stdout (the pattern a peer in the
//! `Server` role uses when it *is* the spawned process).

use std::process::Stdio as StdStdio;
use std::sync::Arc;

use async_trait::async_trait;
use mcp_protocol::Error;
use mcp_protocol::InboundEvent;
use mcp_protocol::ReadBuffer;
use mcp_protocol::Transport;
use mcp_types::JSONRPCMessage;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::process::Child;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::warn;

const CHANNEL_CAPACITY: usize = 128;

struct Inner {
    writer: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    reader: Mutex<Option<Box<dyn AsyncRead + Send + Unpin>>>,
    child: Mutex<Option<Child>>,
}

/// Stdio transport: one byte stream in, one byte stream out.
pub struct StdioTransport {
    inner: Arc<Inner>,
}

impl StdioTransport {
    /// Spawn `program` with `args` and communicate over its stdin/stdout.
    /// Mirrors the subprocess bootstrap a client-role peer performs to talk
    /// to a locally-launched MCP server.
    pub fn spawn(program: &str, args: &[String]) -> std::io::Result<Self> {
        let mut command = Command::new(program);
        command.args(args);
        command.stdin(StdStdio::piped());
        command.stdout(StdStdio::piped());
        command.stderr(StdStdio::null());
        command.kill_on_drop(true);

        let mut child = command.spawn()?;
        let stdin = child.stdin.take().ok_or_else(|| {
            std::io::Error::other("failed to capture child stdin")
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            std::io::Error::other("failed to capture child stdout")
        })?;

        Ok(Self {
            inner: Arc::new(Inner {
                writer: Mutex::new(Box::new(stdin)),
                reader: Mutex::new(Some(Box::new(stdout))),
                child: Mutex::new(Some(child)),
            }),
        })
    }

    /// Wrap this process's own stdin/stdout, for a peer that *is* the
    /// spawned server.
    pub fn from_process_streams() -> Self {
        Self {
            inner: Arc::new(Inner {
                writer: Mutex::new(Box::new(tokio::io::stdout())),
                reader: Mutex::new(Some(Box::new(tokio::io::stdin()))),
                child: Mutex::new(None),
            }),
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn start(&self) -> Result<mpsc::Receiver<InboundEvent>, Error> {
        let mut stream = self
            .inner
            .reader
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::Handshake("stdio transport already started".to_string()))?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let mut read_buffer = ReadBuffer::default();
            let mut chunk = [0u8; 8192];
            loop {
                match stream.read(&mut chunk).await {
                    Ok(0) => {
                        let _ = tx.send(InboundEvent::Closed).await;
                        break;
                    }
                    Ok(n) => {
                        for message in read_buffer.feed(&chunk[..n]) {
                            if matches!(&message, JSONRPCMessage::Unknown(_)) {
                                warn!("stdio transport dropped unrecognized line");
                            }
                            if tx.send(InboundEvent::Message(message)).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(InboundEvent::Error(Error::transport(err))).await;
                        let _ = tx.send(InboundEvent::Closed).await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, message: JSONRPCMessage) -> Result<(), Error> {
        let json = serde_json::to_string(&message)?;
        let mut writer = self.inner.writer.lock().await;
        writer
            .write_all(json.as_bytes())
            .await
            .map_err(Error::transport)?;
        writer.write_all(b"\n").await.map_err(Error::transport)?;
        writer.flush().await.map_err(Error::transport)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        if let Some(mut child) = self.inner.child.lock().await.take() {
            let _ = child.start_kill();
            debug!("stdio transport killed child process");
        }
        Ok(())
    }
}
