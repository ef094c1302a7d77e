//! The legacy two-channel SSE transport (spec §4.2.2): a long-lived GET
//! stream for inbound messages, paired with one HTTP POST per outbound
//! message to an `endpoint` the server announces as the stream's first
//! event.

use std::sync::Arc;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use mcp_protocol::Error;
use mcp_protocol::InboundEvent;
use mcp_protocol::Transport;
use mcp_types::JSONRPCMessage;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::warn;
use url::Url;

pub struct SseTransport {
    stream_url: Url,
    http: reqwest::Client,
    endpoint: Arc<RwLock<Option<Url>>>,
    reader: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SseTransport {
    pub fn new(stream_url: Url) -> Self {
        Self {
            stream_url,
            http: reqwest::Client::new(),
            endpoint: Arc::new(RwLock::new(None)),
            reader: tokio::sync::Mutex::new(None),
        }
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn start(&self) -> Result<mpsc::Receiver<InboundEvent>, Error> {
        let response = self
            .http
            .get(self.stream_url.clone())
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(Error::transport)?;

        if !response.status().is_success() {
            return Err(Error::Handshake(format!(
                "SSE stream returned status {}",
                response.status()
            )));
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        let (tx, rx) = mpsc::channel(128);
        let endpoint = Arc::clone(&self.endpoint);
        let resolver_base = self.stream_url.clone();

        let handle = tokio::spawn(async move {
            let mut events = response.bytes_stream().eventsource();
            let mut ready_tx = Some(ready_tx);

            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        let _ = tx.send(InboundEvent::Error(Error::transport(err))).await;
                        break;
                    }
                };

                if event.event == "endpoint" {
                    let resolved = resolve_against(&resolver_base, &event.data);
                    match resolved {
                        Ok(url) => {
                            *endpoint.write().await = Some(url);
                            if let Some(tx) = ready_tx.take() {
                                let _ = tx.send(Ok(()));
                            }
                        }
                        Err(err) => {
                            if let Some(tx) = ready_tx.take() {
                                let _ = tx.send(Err(err));
                            }
                            break;
                        }
                    }
                    continue;
                }

                let data = event.data.trim();
                if data.is_empty() {
                    continue;
                }
                match serde_json::from_str::<JSONRPCMessage>(data) {
                    Ok(message) => {
                        if tx.send(InboundEvent::Message(message)).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => warn!(%err, "dropping undecodable SSE event"),
                }
            }

            if let Some(tx) = ready_tx.take() {
                let _ = tx.send(Err(Error::Handshake(
                    "SSE stream closed before endpoint event".to_string(),
                )));
            }
            let _ = tx.send(InboundEvent::Closed).await;
        });

        *self.reader.lock().await = Some(handle);

        ready_rx
            .await
            .map_err(|_| Error::Handshake("SSE reader task ended unexpectedly".to_string()))??;

        Ok(rx)
    }

    async fn send(&self, message: JSONRPCMessage) -> Result<(), Error> {
        let endpoint = self
            .endpoint
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::Handshake("SSE endpoint not yet known".to_string()))?;

        let body = serde_json::to_string(&message)?;
        let response = self
            .http
            .post(endpoint)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(Error::transport)?;

        if !response.status().is_success() {
            return Err(Error::transport(std::io::Error::other(format!(
                "SSE POST failed with status {}",
                response.status()
            ))));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }
}

fn resolve_against(stream_url: &Url, data: &str) -> Result<Url, Error> {
    if let Ok(absolute) = Url::parse(data) {
        return Ok(absolute);
    }
    let mut base = stream_url.clone();
    let path = base.path().to_string();
    let truncated = match path.rfind('/') {
        Some(idx) => path[..=idx].to_string(),
        None => "/".to_string(),
    };
    base.set_path(&truncated);
    base.join(data)
        .map_err(|err| Error::Handshake(format!("invalid endpoint URL `{data}`: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolves_relative_endpoint_against_stream_base() {
        let base = Url::parse("https://example.com/mcp/sse").unwrap();
        let resolved = resolve_against(&base, "/mcp/messages?session=abc").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/mcp/messages?session=abc");
    }

    #[test]
    fn resolves_bare_relative_endpoint() {
        let base = Url::parse("https://example.com/mcp/sse").unwrap();
        let resolved = resolve_against(&base, "messages").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/mcp/messages");
    }

    #[test]
    fn keeps_absolute_endpoint_untouched() {
        let base = Url::parse("https://example.com/mcp/sse").unwrap();
        let resolved = resolve_against(&base, "https://other.example.com/rpc").unwrap();
        assert_eq!(resolved.as_str(), "https://other.example.com/rpc");
    }
}
