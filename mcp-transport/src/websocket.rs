//! The WebSocket transport (spec §4.2.4): one full-duplex connection using
//! the `mcp` subprotocol, one JSON-RPC message per text frame.

use futures::SinkExt;
use futures::StreamExt;
use mcp_protocol::Error;
use mcp_protocol::InboundEvent;
use mcp_protocol::Transport;
use mcp_types::JSONRPCMessage;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::WebSocketStream;
use tracing::warn;

const MCP_SUBPROTOCOL: &str = "mcp";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = futures::stream::SplitSink<WsStream, WsMessage>;

pub struct WebSocketTransport {
    stream: Mutex<Option<WsStream>>,
    sink: Mutex<Option<WsSink>>,
}

impl WebSocketTransport {
    /// Connect and negotiate the `mcp` subprotocol, but don't start reading
    /// yet — `start` owns the reader task, mirroring every other adapter in
    /// this crate's `created -> started -> open` lifecycle.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let mut request = url.into_client_request().map_err(Error::transport)?;
        request.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            MCP_SUBPROTOCOL
                .parse()
                .expect("static protocol name is a valid header value"),
        );

        let (stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(Error::transport)?;

        Ok(Self {
            stream: Mutex::new(Some(stream)),
            sink: Mutex::new(None),
        })
    }
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    async fn start(&self) -> Result<mpsc::Receiver<InboundEvent>, Error> {
        let stream = self
            .stream
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::Handshake("WebSocket transport already started".to_string()))?;
        let (sink, mut source) = stream.split();
        *self.sink.lock().await = Some(sink);

        let (tx, rx) = mpsc::channel(128);
        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => match serde_json::from_str::<JSONRPCMessage>(&text) {
                        Ok(message) => {
                            if tx.send(InboundEvent::Message(message)).await.is_err() {
                                return;
                            }
                        }
                        Err(err) => {
                            let _ = tx
                                .send(InboundEvent::Error(Error::Framing(err.to_string())))
                                .await;
                            break;
                        }
                    },
                    Ok(WsMessage::Binary(_)) => {
                        let _ = tx
                            .send(InboundEvent::Error(Error::Framing(
                                "unexpected binary frame on MCP WebSocket transport".to_string(),
                            )))
                            .await;
                        break;
                    }
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {
                        // Ping/Pong/Frame: transparently handled by tungstenite.
                    }
                    Err(err) => {
                        let _ = tx.send(InboundEvent::Error(Error::transport(err))).await;
                        break;
                    }
                }
            }
            let _ = tx.send(InboundEvent::Closed).await;
        });

        Ok(rx)
    }

    async fn send(&self, message: JSONRPCMessage) -> Result<(), Error> {
        let json = serde_json::to_string(&message)?;
        let mut guard = self.sink.lock().await;
        let sink = guard
            .as_mut()
            .ok_or_else(|| Error::Handshake("WebSocket transport not started".to_string()))?;
        sink.send(WsMessage::Text(json)).await.map_err(Error::transport)
    }

    async fn close(&self) -> Result<(), Error> {
        if let Some(mut sink) = self.sink.lock().await.take() {
            if let Err(err) = sink.close().await {
                warn!(%err, "error closing WebSocket sink");
            }
        }
        Ok(())
    }
}
