//! End-to-end: a real `Client` against a real `Server`/`ServerSession`,
//! connected over an in-memory duplex transport instead of a socket.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use mcp_client::ClientBuilder;
use mcp_protocol::InboundEvent;
use mcp_protocol::Transport;
use mcp_server::Server;
use mcp_types::Implementation;
use mcp_types::JSONRPCMessage;
use mcp_types::ServerCapabilities;
use mcp_types::Tool;
use mcp_types::ToolsCapability;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One half of an in-process pipe: writes go to the peer's `inbound`
/// sender, reads come from this end's own receiver.
struct DuplexTransport {
    peer_inbound: mpsc::Sender<JSONRPCMessage>,
    my_inbound: Mutex<Option<mpsc::Receiver<JSONRPCMessage>>>,
}

#[async_trait]
impl Transport for DuplexTransport {
    async fn start(&self) -> Result<mpsc::Receiver<InboundEvent>, mcp_protocol::Error> {
        let mut raw = self
            .my_inbound
            .lock()
            .expect("duplex transport lock poisoned")
            .take()
            .expect("DuplexTransport::start called twice");
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            while let Some(message) = raw.recv().await {
                if tx.send(InboundEvent::Message(message)).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(InboundEvent::Closed).await;
        });
        Ok(rx)
    }

    async fn send(&self, message: JSONRPCMessage) -> Result<(), mcp_protocol::Error> {
        self.peer_inbound
            .send(message)
            .await
            .map_err(|_| mcp_protocol::Error::Disconnected)
    }

    async fn close(&self) -> Result<(), mcp_protocol::Error> {
        Ok(())
    }
}

fn duplex_pair() -> (Arc<dyn Transport>, Arc<dyn Transport>) {
    let (client_to_server, server_reads) = mpsc::channel(32);
    let (server_to_client, client_reads) = mpsc::channel(32);
    let client_side = Arc::new(DuplexTransport {
        peer_inbound: client_to_server,
        my_inbound: Mutex::new(Some(client_reads)),
    });
    let server_side = Arc::new(DuplexTransport {
        peer_inbound: server_to_client,
        my_inbound: Mutex::new(Some(server_reads)),
    });
    (client_side, server_side)
}

#[tokio::test]
async fn list_tools_happy_path() {
    let server = Server::builder("weather-server", "1.0.0")
        .with_capabilities(ServerCapabilities {
            tools: Some(ToolsCapability { list_changed: None }),
            ..Default::default()
        })
        .tool(
            Tool {
                name: "get_weather".to_string(),
                description: Some("Look up the current weather".to_string()),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": { "location": { "type": "string" } },
                    "required": ["location"],
                }),
                output_schema: None,
            },
            |_arguments| {
                Box::pin(async move {
                    Ok(mcp_types::CallToolResult {
                        content: vec![serde_json::json!({ "type": "text", "text": "sunny" })],
                        is_error: None,
                    })
                }) as BoxFuture<'static, mcp_protocol::Result<mcp_types::CallToolResult>>
            },
        )
        .build();

    let (client_transport, server_transport) = duplex_pair();
    let _session = server.serve(server_transport).await.expect("server session starts");

    let client = ClientBuilder::new(Implementation {
        name: "test-client".to_string(),
        version: "1.0.0".to_string(),
    })
    .connect(client_transport)
    .await
    .expect("client connects and completes the handshake");

    let tools = client.list_tools(None).await.expect("tools/list succeeds");
    assert_eq!(tools.tools.len(), 1);
    assert_eq!(tools.tools[0].name, "get_weather");
    assert_eq!(
        tools.tools[0].input_schema["required"],
        serde_json::json!(["location"])
    );

    let result = client
        .call_tool("get_weather", Some(serde_json::Map::new()))
        .await
        .expect("tools/call succeeds");
    assert_eq!(result.is_error, None);
}

#[tokio::test]
async fn tools_call_rejected_without_server_tools_capability() {
    let server = Server::builder("bare-server", "1.0.0").build();

    let (client_transport, server_transport) = duplex_pair();
    let _session = server.serve(server_transport).await.expect("server session starts");

    let client = ClientBuilder::new(Implementation {
        name: "test-client".to_string(),
        version: "1.0.0".to_string(),
    })
    .connect(client_transport)
    .await
    .expect("client connects and completes the handshake");

    let result = client.list_tools(None).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn ping_succeeds_both_ways() {
    let server = Server::builder("ping-server", "1.0.0").build();
    let (client_transport, server_transport) = duplex_pair();
    let session = server.serve(server_transport).await.expect("server session starts");

    let client = ClientBuilder::new(Implementation {
        name: "test-client".to_string(),
        version: "1.0.0".to_string(),
    })
    .connect(client_transport)
    .await
    .expect("client connects and completes the handshake");

    client.ping().await.expect("client-initiated ping succeeds");
    session.ping().await.expect("server-initiated ping succeeds");
}
