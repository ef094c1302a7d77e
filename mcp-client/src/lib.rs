//! The `Client` role for the Model Context Protocol: typed request
//! wrappers, a roots registry, and handler hooks for the requests a server
//! may send back, layered over [`mcp_protocol::Engine`] and any
//! [`mcp_transport`] adapter.

mod capability_gate;
mod client;
mod roots;

pub use client::Client;
pub use client::ClientBuilder;
pub use client::TypedHandler;
