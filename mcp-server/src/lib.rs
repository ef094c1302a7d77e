//! Server role for the Model Context Protocol: a [`Server`] holds the
//! shared tool/prompt/resource registries, and [`Server::serve`] binds a
//! transport to a fresh [`ServerSession`] that runs the `initialize`
//! handshake and answers data-plane requests against those registries.

mod capability_gate;
mod registry;
mod server;
mod session;

pub use registry::PromptHandler;
pub use registry::ResourceHandler;
pub use registry::ToolHandler;
pub use server::Server;
pub use server::ServerBuilder;
pub use session::OnInitialized;
pub use session::ServerSession;
