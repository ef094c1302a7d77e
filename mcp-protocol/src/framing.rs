//! Turns byte streams into discrete JSON-RPC messages.
//!
//! [`ReadBuffer`] handles line-delimited stdio framing. SSE framing is left
//! to `eventsource-stream`, which both the legacy SSE transport and the
//! Streamable HTTP transport's inline/GET SSE paths use directly.

use bytes::BytesMut;
use mcp_types::JSONRPCMessage;
use tracing::debug;
use tracing::warn;

/// Accumulates bytes read from a stdio-style stream and yields one decoded
/// [`JSONRPCMessage`] per newline-terminated line.
///
/// A line that fails to parse as JSON-RPC is retried from its first `{`
/// (best-effort recovery from non-JSON banner noise some subprocesses print
/// on stdout); a line that still fails to parse is logged and dropped
/// without tearing down the connection.
#[derive(Default)]
pub struct ReadBuffer {
    buf: BytesMut,
}

impl ReadBuffer {
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    /// Feed newly read bytes and return every complete message they
    /// produced, in order. Bytes after the last newline remain buffered for
    /// the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<JSONRPCMessage> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line = self.buf.split_to(pos + 1);
            line.truncate(line.len() - 1); // drop '\n'
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            if let Some(message) = Self::decode_line(&line) {
                out.push(message);
            }
        }

        out
    }

    fn decode_line(line: &[u8]) -> Option<JSONRPCMessage> {
        if line.is_empty() {
            return None;
        }
        if let Ok(message) = serde_json::from_slice::<JSONRPCMessage>(line) {
            return Some(message);
        }

        // Best-effort recovery: some subprocesses print a banner before they
        // start speaking JSON-RPC. Retry from the first '{' on the line.
        if let Some(brace) = line.iter().position(|&b| b == b'{') {
            if brace > 0 {
                if let Ok(message) = serde_json::from_slice::<JSONRPCMessage>(&line[brace..]) {
                    debug!("recovered JSON-RPC message after leading banner noise");
                    return Some(message);
                }
            }
        }

        warn!(
            line = %String::from_utf8_lossy(line),
            "dropping line that does not parse as JSON-RPC"
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_types::RequestId;
    use pretty_assertions::assert_eq;

    #[test]
    fn feeds_two_messages_split_across_chunks() {
        let mut buf = ReadBuffer::new();
        let whole = b"{\"jsonrpc\":\"2.0\",\"method\":\"ping\"}\n{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n";
        let mut all = Vec::new();
        for byte in whole {
            all.extend(buf.feed(&[*byte]));
        }
        assert_eq!(all.len(), 2);
        match &all[1] {
            JSONRPCMessage::Request(req) => assert_eq!(req.id, RequestId::Integer(1)),
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn recovers_from_banner_noise() {
        let mut buf = ReadBuffer::new();
        let msgs = buf.feed(b"garbage\n{\"jsonrpc\":\"2.0\",\"method\":\"ping\"}\n");
        assert_eq!(msgs.len(), 1);
    }

    #[test]
    fn recovers_from_banner_prefix_on_same_line() {
        let mut buf = ReadBuffer::new();
        let msgs = buf.feed(b"LOG: starting up {\"jsonrpc\":\"2.0\",\"method\":\"ping\"}\n");
        assert_eq!(msgs.len(), 1);
    }

    #[test]
    fn tolerates_crlf() {
        let mut buf = ReadBuffer::new();
        let msgs = buf.feed(b"{\"jsonrpc\":\"2.0\",\"method\":\"ping\"}\r\n");
        assert_eq!(msgs.len(), 1);
    }
}
