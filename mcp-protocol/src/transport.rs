use async_trait::async_trait;
use mcp_types::JSONRPCMessage;
use tokio::sync::mpsc;

use crate::error::Error;

/// One event the background reader delivers upward: an idiomatic Rust
/// shape for the `on_message`/`on_error`/`on_close` callbacks a transport
/// would otherwise invoke directly — a stream the engine's reader task
/// consumes instead.
#[derive(Debug)]
pub enum InboundEvent {
    Message(JSONRPCMessage),
    Error(Error),
    Closed,
}

/// A concrete delivery mechanism for JSON-RPC messages.
///
/// Lifecycle: `created → started (once) → open ↔ closed (once)`. The engine
/// holds the sole [`Transport`] instance for a connection and drives its
/// full lifecycle; `send` may be called concurrently by many in-flight
/// requests, so implementations must serialize their own writes (the
/// contract guarantees two concurrent `send` calls never interleave their
/// message bodies on the wire).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the underlying I/O and begin a background reader. Returns
    /// the channel the engine will poll for inbound events. At-most-once:
    /// implementations must fail if called twice.
    async fn start(&self) -> Result<mpsc::Receiver<InboundEvent>, Error>;

    /// Write one message. Must only be called between `start` and `close`.
    async fn send(&self, message: JSONRPCMessage) -> Result<(), Error>;

    /// Tear down the I/O and stop the reader. Idempotent in effect.
    async fn close(&self) -> Result<(), Error>;
}
