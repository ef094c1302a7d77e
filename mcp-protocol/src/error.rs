use mcp_types::ErrorCode;

/// Error taxonomy the engine distinguishes at the call site.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The peer replied with a JSON-RPC error object.
    #[error("peer returned error {code}: {message}")]
    Protocol {
        code: ErrorCode,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// The request's deadline elapsed before a response arrived.
    #[error("request timed out")]
    RequestTimeout,

    /// The caller's cancel token fired before a response arrived.
    #[error("request was cancelled")]
    Cancelled,

    /// The transport closed while the request was still pending.
    #[error("transport disconnected")]
    Disconnected,

    /// The local capability gate rejected the method before any I/O.
    #[error("local peer lacks capability required for `{method}`")]
    Capability { method: String },

    /// An I/O failure at the transport boundary (connect/send/close).
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Unparseable bytes past the framing layer's recovery rule.
    #[error("framing error: {0}")]
    Framing(String),

    /// `initialize` failed: unsupported protocol version, or the handshake
    /// otherwise could not complete.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Failure to serialize/deserialize a message or params/result payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Transport(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
