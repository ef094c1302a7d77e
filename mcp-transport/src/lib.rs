//! Concrete [`mcp_protocol::Transport`] adapters: stdio, legacy SSE,
//! Streamable HTTP, and WebSocket.

mod sse;
mod stdio;
mod streamable_http;
mod websocket;

pub use sse::SseTransport;
pub use stdio::StdioTransport;
pub use streamable_http::OnEventId;
pub use streamable_http::StreamableHttpTransport;
pub use websocket::WebSocketTransport;
