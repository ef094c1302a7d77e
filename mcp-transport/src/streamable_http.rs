//! The Streamable HTTP transport: one URL, where each POST response may come
//! back as a bare 202, a single JSON body, or an inline SSE stream; a
//! background GET opens after `notifications/initialized` to receive
//! server-initiated messages, and a caller-supplied resumption token reopens
//! that GET with `Last-Event-Id` instead of POSTing. Every inbound SSE
//! event's `id` is retained as the last-event-id and handed to an optional
//! callback so a caller can checkpoint it for a later reconnect.

use std::sync::Arc;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use mcp_protocol::Error;
use mcp_protocol::InboundEvent;
use mcp_protocol::Transport;
use mcp_types::methods;
use mcp_types::JSONRPCMessage;
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tracing::debug;
use tracing::warn;
use url::Url;

const PROTOCOL_VERSION_HEADER: &str = "Mcp-Protocol-Version";
const SESSION_ID_HEADER: &str = "Mcp-Session-Id";
const LAST_EVENT_ID_HEADER: &str = "Last-Event-Id";

/// Invoked with each inbound SSE event's `id` field, in arrival order, so a
/// caller can checkpoint it for a later `Last-Event-Id` reconnect.
pub type OnEventId = Arc<dyn Fn(&str) + Send + Sync>;

pub struct StreamableHttpTransport {
    url: Url,
    http: reqwest::Client,
    protocol_version: Option<String>,
    session_id: Arc<RwLock<Option<String>>>,
    sender: Arc<RwLock<Option<mpsc::Sender<InboundEvent>>>>,
    last_event_id: Arc<RwLock<Option<String>>>,
    on_event_id: Arc<RwLock<Option<OnEventId>>>,
}

impl StreamableHttpTransport {
    pub fn new(url: Url, protocol_version: Option<String>) -> Self {
        Self {
            url,
            http: reqwest::Client::new(),
            protocol_version,
            session_id: Arc::new(RwLock::new(None)),
            sender: Arc::new(RwLock::new(None)),
            last_event_id: Arc::new(RwLock::new(None)),
            on_event_id: Arc::new(RwLock::new(None)),
        }
    }

    /// Register a callback invoked with each inbound SSE event's `id`.
    pub async fn on_event_id(&self, callback: impl Fn(&str) + Send + Sync + 'static) {
        *self.on_event_id.write().await = Some(Arc::new(callback));
    }

    /// The last SSE event `id` seen so far, suitable for resuming
    /// `open_event_stream` after a disconnect.
    pub async fn last_event_id(&self) -> Option<String> {
        self.last_event_id.read().await.clone()
    }

    async fn apply_common_headers(&self, mut builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(version) = &self.protocol_version {
            builder = builder.header(PROTOCOL_VERSION_HEADER, version);
        }
        if let Some(session_id) = self.session_id.read().await.clone() {
            builder = builder.header(SESSION_ID_HEADER, session_id);
        }
        builder
    }

    async fn capture_session_id(&self, response: &reqwest::Response) {
        if let Some(value) = response.headers().get(SESSION_ID_HEADER) {
            if let Ok(value) = value.to_str() {
                *self.session_id.write().await = Some(value.to_string());
            }
        }
    }

    /// Reopen (or open for the first time) the background GET stream that
    /// carries server-initiated messages, optionally resuming from
    /// `last_event_id`. Pass `None` to resume from whatever id was last
    /// tracked from a prior stream, if any.
    pub async fn open_event_stream(&self, last_event_id: Option<String>) -> Result<(), Error> {
        let sender = self.sender.read().await.clone();
        let Some(sender) = sender else {
            return Err(Error::Handshake(
                "transport must be started before opening the event stream".to_string(),
            ));
        };

        let resume_from = match last_event_id {
            Some(id) => Some(id),
            None => self.last_event_id.read().await.clone(),
        };

        let mut builder = self
            .http
            .get(self.url.clone())
            .header("Accept", "text/event-stream");
        builder = self.apply_common_headers(builder).await;
        if let Some(id) = &resume_from {
            builder = builder.header(LAST_EVENT_ID_HEADER, id);
        }

        let response = builder.send().await.map_err(Error::transport)?;
        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            debug!("server does not support the GET event stream");
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(Error::Handshake(format!(
                "GET event stream returned status {}",
                response.status()
            )));
        }
        self.capture_session_id(&response).await;

        tokio::spawn(stream_sse_body(
            response,
            sender,
            Arc::clone(&self.last_event_id),
            Arc::clone(&self.on_event_id),
        ));
        Ok(())
    }
}

async fn stream_sse_body(
    response: reqwest::Response,
    sender: mpsc::Sender<InboundEvent>,
    last_event_id: Arc<RwLock<Option<String>>>,
    on_event_id: Arc<RwLock<Option<OnEventId>>>,
) {
    let mut events = response.bytes_stream().eventsource();
    while let Some(event) = events.next().await {
        match event {
            Ok(event) => {
                if !event.id.is_empty() {
                    *last_event_id.write().await = Some(event.id.clone());
                    if let Some(callback) = on_event_id.read().await.as_ref() {
                        callback(&event.id);
                    }
                }
                let data = event.data.trim();
                if data.is_empty() {
                    continue;
                }
                match serde_json::from_str::<JSONRPCMessage>(data) {
                    Ok(message) => {
                        if sender.send(InboundEvent::Message(message)).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => warn!(%err, "dropping undecodable event-stream payload"),
                }
            }
            Err(err) => {
                let _ = sender.send(InboundEvent::Error(Error::transport(err))).await;
                break;
            }
        }
    }
}

#[async_trait]
impl Transport for StreamableHttpTransport {
    async fn start(&self) -> Result<mpsc::Receiver<InboundEvent>, Error> {
        let (tx, rx) = mpsc::channel(128);
        let mut guard = self.sender.write().await;
        if guard.is_some() {
            return Err(Error::Handshake(
                "Streamable HTTP transport already started".to_string(),
            ));
        }
        *guard = Some(tx);
        Ok(rx)
    }

    async fn send(&self, message: JSONRPCMessage) -> Result<(), Error> {
        let is_initialized_notification = matches!(
            &message,
            JSONRPCMessage::Notification(note) if note.method == methods::NOTIFICATIONS_INITIALIZED
        );

        let body = serde_json::to_string(&message)?;
        let mut builder = self
            .http
            .post(self.url.clone())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream")
            .body(body);
        builder = self.apply_common_headers(builder).await;

        let response = builder.send().await.map_err(Error::transport)?;
        self.capture_session_id(&response).await;

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            if is_initialized_notification {
                self.open_event_stream(None).await?;
            }
            return Ok(());
        }

        if !status.is_success() {
            return Err(Error::transport(std::io::Error::other(format!(
                "Streamable HTTP POST failed with status {status}"
            ))));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.starts_with("application/json") {
            let text = response.text().await.map_err(Error::transport)?;
            let message: JSONRPCMessage = serde_json::from_str(&text)?;
            if let Some(sender) = self.sender.read().await.clone() {
                let _ = sender.send(InboundEvent::Message(message)).await;
            }
            return Ok(());
        }

        if content_type.starts_with("text/event-stream") {
            if let Some(sender) = self.sender.read().await.clone() {
                tokio::spawn(stream_sse_body(
                    response,
                    sender,
                    Arc::clone(&self.last_event_id),
                    Arc::clone(&self.on_event_id),
                ));
            }
            return Ok(());
        }

        debug!(%content_type, "ignoring Streamable HTTP response with unrecognized content type");
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        let session_id = self.session_id.read().await.clone();
        let Some(session_id) = session_id else {
            return Ok(());
        };

        let mut builder = self.http.delete(self.url.clone());
        builder = self.apply_common_headers(builder).await;
        match builder.send().await {
            Ok(response) if response.status() == StatusCode::METHOD_NOT_ALLOWED => {
                debug!("server does not support session termination");
            }
            Ok(response) if !response.status().is_success() => {
                warn!(status = %response.status(), "DELETE session termination failed");
            }
            Err(err) => warn!(%err, "failed to send DELETE for session termination"),
            Ok(_) => {}
        }

        *self.session_id.write().await = None;
        let _ = session_id;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::RwLock as StdRwLock;

    use pretty_assertions::assert_eq;
    use wiremock::matchers::body_json;
    use wiremock::matchers::header;
    use wiremock::matchers::method;
    use wiremock::matchers::path;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;

    #[tokio::test]
    async fn posts_and_decodes_a_json_response() {
        let server = MockServer::start().await;
        let request_body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "ping",
        });
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(body_json(&request_body))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .insert_header("Mcp-Session-Id", "sess-1")
                    .set_body_json(serde_json::json!({
                        "jsonrpc": "2.0",
                        "id": 1,
                        "result": {},
                    })),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/mcp", server.uri())).unwrap();
        let transport = StreamableHttpTransport::new(url, Some("2025-06-18".to_string()));
        let mut rx = transport.start().await.unwrap();

        transport
            .send(JSONRPCMessage::Request(mcp_types::JSONRPCRequest {
                jsonrpc: mcp_types::JSONRPC_VERSION.to_string(),
                id: mcp_types::RequestId::Integer(1),
                method: "ping".to_string(),
                params: None,
            }))
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            InboundEvent::Message(JSONRPCMessage::Response(resp)) => {
                assert_eq!(resp.id, mcp_types::RequestId::Integer(1));
            }
            other => panic!("expected a response message, got {other:?}"),
        }
        assert_eq!(
            transport.session_id.read().await.as_deref(),
            Some("sess-1")
        );
    }

    #[tokio::test]
    async fn tracks_last_event_id_and_invokes_callback() {
        let server = MockServer::start().await;
        let body = "id: e1\ndata: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}\n\n\
                     id: e2\ndata: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}\n\n";
        Mock::given(method("GET"))
            .and(path("/mcp"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_raw(body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/mcp", server.uri())).unwrap();
        let transport = StreamableHttpTransport::new(url, None);
        let mut rx = transport.start().await.unwrap();

        let seen = Arc::new(StdRwLock::new(Vec::new()));
        let seen_for_callback = Arc::clone(&seen);
        transport
            .on_event_id(move |id| seen_for_callback.write().unwrap().push(id.to_string()))
            .await;

        transport.open_event_stream(None).await.unwrap();

        for _ in 0..2 {
            match rx.recv().await.unwrap() {
                InboundEvent::Message(JSONRPCMessage::Notification(_)) => {}
                other => panic!("expected a notification message, got {other:?}"),
            }
        }

        assert_eq!(*seen.read().unwrap(), vec!["e1".to_string(), "e2".to_string()]);
        assert_eq!(transport.last_event_id().await, Some("e2".to_string()));
    }

    #[tokio::test]
    async fn accepted_response_completes_without_a_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(header("Accept", "application/json, text/event-stream"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/mcp", server.uri())).unwrap();
        let transport = StreamableHttpTransport::new(url, None);
        let _rx = transport.start().await.unwrap();

        transport
            .send(JSONRPCMessage::Notification(mcp_types::JSONRPCNotification {
                jsonrpc: mcp_types::JSONRPC_VERSION.to_string(),
                method: "notifications/progress".to_string(),
                params: None,
            }))
            .await
            .unwrap();
    }
}
