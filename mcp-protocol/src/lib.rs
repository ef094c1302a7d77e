//! Peer-symmetric JSON-RPC 2.0 engine for the Model Context Protocol.
//!
//! This crate has no notion of "client" or "server": [`engine::Engine`]
//! correlates requests and responses, dispatches inbound requests and
//! notifications to registered handlers, enforces the capability gating
//! table, and drives a [`transport::Transport`] through its lifecycle. The
//! `mcp-client` and `mcp-server` crates each wrap an `Engine` with a
//! direction-specific [`capability::CapabilityGate`] and their own handler
//! registrations.

mod capability;
mod engine;
mod error;
mod framing;
mod options;
mod transport;

pub use capability::required_capability;
pub use capability::AllowAll;
pub use capability::Capability;
pub use capability::CapabilityGate;
pub use capability::Direction;
pub use engine::Engine;
pub use engine::NotificationHandler;
pub use engine::RequestHandler;
pub use error::Error;
pub use error::Result;
pub use framing::ReadBuffer;
pub use options::EngineOptions;
pub use options::RequestOptions;
pub use transport::InboundEvent;
pub use transport::Transport;
