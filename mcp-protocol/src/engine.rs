use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use mcp_types::methods;
use mcp_types::CancelledNotificationParams;
use mcp_types::JSONRPCError;
use mcp_types::JSONRPCMessage;
use mcp_types::JSONRPCNotification;
use mcp_types::JSONRPCRequest;
use mcp_types::JSONRPCResponse;
use mcp_types::JsonRpcErrorObject;
use mcp_types::ModelContextProtocolNotification;
use mcp_types::ModelContextProtocolRequest;
use mcp_types::ProgressNotificationParams;
use mcp_types::ProgressToken;
use mcp_types::RequestId;
use mcp_types::JSONRPC_VERSION;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::sync::Mutex;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use crate::capability::AllowAll;
use crate::capability::CapabilityGate;
use crate::error::Error;
use crate::error::Result;
use crate::options::EngineOptions;
use crate::options::RequestOptions;
use crate::transport::InboundEvent;
use crate::transport::Transport;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Inbound request handler: given the raw `params` and a cancellation token
/// fired if a matching `notifications/cancelled` arrives, produce a result
/// or a JSON-RPC error.
pub type RequestHandler =
    Arc<dyn Fn(Option<Value>, CancellationToken) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// Inbound notification handler.
pub type NotificationHandler = Arc<dyn Fn(Option<Value>) -> BoxFuture<'static, ()> + Send + Sync>;

struct PendingRequest {
    completion: oneshot::Sender<Result<Value>>,
    deadline: Arc<Mutex<Instant>>,
}

struct ProgressEntry {
    callback: Box<dyn Fn(f64, Option<f64>) + Send + Sync>,
    deadline: Arc<Mutex<Instant>>,
    reset_on_progress: bool,
    timeout: std::time::Duration,
}

/// The peer-symmetric JSON-RPC engine.
///
/// There is no notion of client or server here: both roles wrap the same
/// `Engine`, installing a different set of request/notification handlers
/// and a direction-specific [`CapabilityGate`].
pub struct Engine {
    transport: Arc<dyn Transport>,
    options: EngineOptions,
    next_id: AtomicI64,
    pending: Arc<Mutex<HashMap<RequestId, PendingRequest>>>,
    progress_callbacks: Arc<Mutex<HashMap<ProgressToken, ProgressEntry>>>,
    request_handlers: Arc<RwLock<HashMap<String, RequestHandler>>>,
    notification_handlers: Arc<RwLock<HashMap<String, NotificationHandler>>>,
    running_handlers: Arc<Mutex<HashMap<RequestId, CancellationToken>>>,
    capability_gate: Arc<RwLock<Arc<dyn CapabilityGate>>>,
    close_observers: Arc<StdMutex<Vec<Box<dyn Fn() + Send + Sync>>>>,
    error_observers: Arc<StdMutex<Vec<Box<dyn Fn(&Error) + Send + Sync>>>>,
    started: AtomicBool,
}

impl Engine {
    pub fn new(transport: Arc<dyn Transport>, options: EngineOptions) -> Arc<Self> {
        Arc::new(Self {
            transport,
            options,
            next_id: AtomicI64::new(1),
            pending: Arc::new(Mutex::new(HashMap::new())),
            progress_callbacks: Arc::new(Mutex::new(HashMap::new())),
            request_handlers: Arc::new(RwLock::new(HashMap::new())),
            notification_handlers: Arc::new(RwLock::new(HashMap::new())),
            running_handlers: Arc::new(Mutex::new(HashMap::new())),
            capability_gate: Arc::new(RwLock::new(Arc::new(AllowAll))),
            close_observers: Arc::new(StdMutex::new(Vec::new())),
            error_observers: Arc::new(StdMutex::new(Vec::new())),
            started: AtomicBool::new(false),
        })
    }

    /// Install (or replace) the capability gate consulted before every
    /// outbound send. Defaults to [`AllowAll`] until the role layer installs
    /// its own after the handshake negotiates capabilities.
    pub async fn set_capability_gate(&self, gate: Arc<dyn CapabilityGate>) {
        *self.capability_gate.write().await = gate;
    }

    pub async fn set_request_handler(&self, method: impl Into<String>, handler: RequestHandler) {
        self.request_handlers.write().await.insert(method.into(), handler);
    }

    pub async fn set_notification_handler(
        &self,
        method: impl Into<String>,
        handler: NotificationHandler,
    ) {
        self.notification_handlers
            .write()
            .await
            .insert(method.into(), handler);
    }

    pub fn on_close(&self, observer: impl Fn() + Send + Sync + 'static) {
        self.close_observers
            .lock()
            .expect("close observer lock poisoned")
            .push(Box::new(observer));
    }

    pub fn on_error(&self, observer: impl Fn(&Error) + Send + Sync + 'static) {
        self.error_observers
            .lock()
            .expect("error observer lock poisoned")
            .push(Box::new(observer));
    }

    /// Start the transport and the reader loop. At-most-once.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::Handshake("engine already started".to_string()));
        }
        let mut inbound = self.transport.start().await?;
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = inbound.recv().await {
                match event {
                    InboundEvent::Message(message) => engine.dispatch(message).await,
                    InboundEvent::Error(err) => engine.fire_error(&err).await,
                    InboundEvent::Closed => {
                        engine.fail_all_pending(Error::Disconnected).await;
                        engine.cancel_all_running().await;
                        engine.fire_close().await;
                        break;
                    }
                }
            }
        });
        Ok(())
    }

    async fn dispatch(self: &Arc<Self>, message: JSONRPCMessage) {
        match message {
            JSONRPCMessage::Request(req) => self.dispatch_request(req).await,
            JSONRPCMessage::Response(resp) => self.complete_pending(resp.id, Ok(resp.result)).await,
            JSONRPCMessage::Error(err) => {
                if let Some(id) = err.id {
                    let e = err.error;
                    self.complete_pending(
                        id,
                        Err(Error::Protocol {
                            code: e.code,
                            message: e.message,
                            data: e.data,
                        }),
                    )
                    .await;
                }
            }
            JSONRPCMessage::Notification(note) => self.dispatch_notification(note).await,
            JSONRPCMessage::Unknown(value) => {
                warn!(?value, "dropping message of unrecognized shape");
            }
        }
    }

    async fn dispatch_request(self: &Arc<Self>, req: JSONRPCRequest) {
        if req.method == methods::PING {
            self.send_response(req.id, serde_json::json!({})).await;
            return;
        }

        let handler = self.request_handlers.read().await.get(&req.method).cloned();
        let Some(handler) = handler else {
            self.send_error_response(
                req.id,
                JsonRpcErrorObject {
                    code: mcp_types::ErrorCode::METHOD_NOT_FOUND,
                    message: format!("method not found: {}", req.method),
                    data: None,
                },
            )
            .await;
            return;
        };

        let cancel = CancellationToken::new();
        self.running_handlers
            .lock()
            .await
            .insert(req.id.clone(), cancel.clone());

        let engine = Arc::clone(self);
        let id = req.id.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                result = handler(req.params, cancel.clone()) => Some(result),
                _ = cancel.cancelled() => None,
            };
            engine.running_handlers.lock().await.remove(&id);

            match result {
                // The peer cancelled the request; we must not reply at all.
                None => {}
                Some(Ok(value)) => engine.send_response(id, value).await,
                Some(Err(Error::Protocol { code, message, data })) => {
                    engine
                        .send_error_response(id, JsonRpcErrorObject { code, message, data })
                        .await;
                }
                Some(Err(other)) => {
                    let message = other.to_string();
                    engine.fire_error(&other).await;
                    engine
                        .send_error_response(
                            id,
                            JsonRpcErrorObject {
                                code: mcp_types::ErrorCode::INTERNAL_ERROR,
                                message,
                                data: None,
                            },
                        )
                        .await;
                }
            }
        });
    }

    async fn dispatch_notification(self: &Arc<Self>, note: JSONRPCNotification) {
        if note.method == methods::NOTIFICATIONS_PROGRESS {
            if let Some(params) = note.params {
                if let Ok(progress) = serde_json::from_value::<ProgressNotificationParams>(params) {
                    if let Some(entry) = self.progress_callbacks.lock().await.get(&progress.progress_token) {
                        (entry.callback)(progress.progress, progress.total);
                        if entry.reset_on_progress {
                            let mut deadline = entry.deadline.lock().await;
                            let extended = Instant::now() + entry.timeout;
                            if extended > *deadline {
                                *deadline = extended;
                            }
                        }
                    }
                }
            }
            return;
        }

        if note.method == methods::NOTIFICATIONS_CANCELLED {
            if let Some(params) = note.params {
                if let Ok(cancelled) = serde_json::from_value::<CancelledNotificationParams>(params) {
                    if let Some(token) = self.running_handlers.lock().await.get(&cancelled.request_id) {
                        token.cancel();
                    }
                }
            }
            return;
        }

        let handler = self.notification_handlers.read().await.get(&note.method).cloned();
        if let Some(handler) = handler {
            tokio::spawn(handler(note.params));
        }
    }

    async fn complete_pending(&self, id: RequestId, result: Result<Value>) {
        let pending = self.pending.lock().await.remove(&id);
        match pending {
            Some(pending) => {
                let _ = pending.completion.send(result);
            }
            None => {
                debug!(%id, "dropping response/error for unknown or already-completed request");
            }
        }
    }

    async fn fail_all_pending(&self, error_factory: Error) {
        let mut pending = self.pending.lock().await;
        for (_, record) in pending.drain() {
            let err = match &error_factory {
                Error::Disconnected => Error::Disconnected,
                other => Error::Transport(Box::new(std::io::Error::other(other.to_string()))),
            };
            let _ = record.completion.send(Err(err));
        }
    }

    async fn cancel_all_running(&self) {
        for (_, token) in self.running_handlers.lock().await.drain() {
            token.cancel();
        }
    }

    async fn fire_close(&self) {
        for observer in self.close_observers.lock().expect("close observer lock poisoned").iter() {
            observer();
        }
    }

    async fn fire_error(&self, error: &Error) {
        for observer in self.error_observers.lock().expect("error observer lock poisoned").iter() {
            observer(error);
        }
    }

    async fn send_response(&self, id: RequestId, result: Value) {
        let message = JSONRPCMessage::Response(JSONRPCResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
        });
        if let Err(err) = self.transport.send(message).await {
            warn!(%err, "failed to send response");
        }
    }

    async fn send_error_response(&self, id: RequestId, error: JsonRpcErrorObject) {
        let message = JSONRPCMessage::Error(JSONRPCError {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            error,
        });
        if let Err(err) = self.transport.send(message).await {
            warn!(%err, "failed to send error response");
        }
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::Integer(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Raw, untyped request. `call` below is the typed wrapper built on top.
    pub async fn request(&self, method: &str, params: Option<Value>, opts: RequestOptions) -> Result<Value> {
        if self.options.enforce_capabilities {
            self.capability_gate.read().await.check(method)?;
        }

        let id = self.next_request_id();
        let mut params = params;

        let timeout = opts.timeout.unwrap_or(self.options.default_timeout);
        let deadline = Arc::new(Mutex::new(Instant::now() + timeout));
        let reset_on_progress = opts.reset_on_progress.unwrap_or(self.options.reset_on_progress_default);

        let progress_token = if let Some(on_progress) = opts.on_progress {
            let token = opts.progress_token.unwrap_or_else(|| id.clone());
            self.progress_callbacks.lock().await.insert(
                token.clone(),
                ProgressEntry {
                    callback: on_progress,
                    deadline: Arc::clone(&deadline),
                    reset_on_progress,
                    timeout,
                },
            );
            params = Some(inject_progress_token(params, &token));
            Some(token)
        } else {
            None
        };

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(
            id.clone(),
            PendingRequest {
                completion: tx,
                deadline: Arc::clone(&deadline),
            },
        );

        let message = JSONRPCMessage::Request(JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.clone(),
            method: method.to_string(),
            params,
        });

        if let Err(err) = self.transport.send(message).await {
            self.pending.lock().await.remove(&id);
            self.forget_progress_token(&progress_token).await;
            return Err(err);
        }

        let cancel_token = opts.cancel_token.unwrap_or_default();
        let outcome = await_completion(rx, deadline, cancel_token).await;
        self.forget_progress_token(&progress_token).await;

        match outcome {
            Outcome::Completed(result) => result,
            Outcome::TimedOut => {
                self.pending.lock().await.remove(&id);
                self.send_cancelled_notification(&id, "timeout").await;
                Err(Error::RequestTimeout)
            }
            Outcome::Cancelled => {
                self.pending.lock().await.remove(&id);
                self.send_cancelled_notification(&id, "cancelled").await;
                Err(Error::Cancelled)
            }
        }
    }

    async fn forget_progress_token(&self, token: &Option<ProgressToken>) {
        if let Some(token) = token {
            self.progress_callbacks.lock().await.remove(token);
        }
    }

    async fn send_cancelled_notification(&self, id: &RequestId, reason: &str) {
        let params = serde_json::to_value(CancelledNotificationParams {
            request_id: id.clone(),
            reason: Some(reason.to_string()),
        })
        .ok();
        let message = JSONRPCMessage::Notification(JSONRPCNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: methods::NOTIFICATIONS_CANCELLED.to_string(),
            params,
        });
        // Best-effort: failure to deliver the courtesy notification is
        // swallowed.
        let _ = self.transport.send(message).await;
    }

    /// Raw, untyped notification.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        if self.options.enforce_capabilities {
            self.capability_gate.read().await.check(method)?;
        }
        let message = JSONRPCMessage::Notification(JSONRPCNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
        });
        self.transport.send(message).await
    }

    /// Typed request wrapper over [`Engine::request`].
    pub async fn call<R>(&self, params: R::Params, opts: RequestOptions) -> Result<R::Result>
    where
        R: ModelContextProtocolRequest,
    {
        let params_value = serde_json::to_value(&params)?;
        let params = if params_value.is_null() { None } else { Some(params_value) };
        let result = self.request(R::METHOD, params, opts).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Typed notification wrapper over [`Engine::notify`].
    pub async fn emit<N>(&self, params: N::Params) -> Result<()>
    where
        N: ModelContextProtocolNotification,
    {
        let params_value = serde_json::to_value(&params)?;
        let params = if params_value.is_null() { None } else { Some(params_value) };
        self.notify(N::METHOD, params).await
    }

    pub async fn close(&self) -> Result<()> {
        self.transport.close().await?;
        self.fail_all_pending(Error::Disconnected).await;
        self.cancel_all_running().await;
        self.fire_close().await;
        Ok(())
    }
}

enum Outcome {
    Completed(Result<Value>),
    TimedOut,
    Cancelled,
}

async fn await_completion(
    mut rx: oneshot::Receiver<Result<Value>>,
    deadline: Arc<Mutex<Instant>>,
    cancel_token: CancellationToken,
) -> Outcome {
    loop {
        let sleep_until = *deadline.lock().await;
        tokio::select! {
            res = &mut rx => {
                return Outcome::Completed(res.unwrap_or(Err(Error::Disconnected)));
            }
            _ = tokio::time::sleep_until(sleep_until) => {
                if Instant::now() >= *deadline.lock().await {
                    return Outcome::TimedOut;
                }
                // deadline was pushed out by a progress notification; loop.
            }
            _ = cancel_token.cancelled() => {
                return Outcome::Cancelled;
            }
        }
    }
}

fn inject_progress_token(params: Option<Value>, token: &ProgressToken) -> Value {
    let mut params = params.unwrap_or_else(|| serde_json::json!({}));
    if !params.is_object() {
        params = serde_json::json!({});
    }
    let obj = params.as_object_mut().expect("just ensured object");
    let meta = obj.entry("_meta").or_insert_with(|| serde_json::json!({}));
    if let Some(meta_obj) = meta.as_object_mut() {
        meta_obj.insert(
            "progressToken".to_string(),
            serde_json::to_value(token).expect("RequestId serializes"),
        );
    }
    params
}
