//! Wire types for the Model Context Protocol's JSON-RPC 2.0 envelope.
//!
//! This crate covers exactly the envelope and the method catalog named in
//! the protocol runtime's scope: `initialize`/`ping`/`list*`/`call`/`read`/
//! `subscribe`/`notifications/*`/`progress`/`cancelled`. It does not attempt
//! to model every content block a tool result or prompt message may carry —
//! those are left as raw [`serde_json::Value`] since validating or
//! interpreting them is outside the protocol runtime (see crate `mcp-protocol`
//! for the engine that drives these types over the wire).

mod capabilities;
mod envelope;
mod error_code;
pub mod methods;
mod model;
mod notifications;
mod request_id;
mod requests;

pub use capabilities::*;
pub use envelope::*;
pub use error_code::ErrorCode;
pub use model::*;
pub use notifications::*;
pub use request_id::ProgressToken;
pub use request_id::RequestId;
pub use requests::*;

/// The protocol version this crate speaks by default.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

/// Every protocol version this crate can negotiate down to, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] =
    &[LATEST_PROTOCOL_VERSION, "2025-03-26", "2024-11-05"];
