//! The `Client` role: typed request wrappers over an [`Engine`], a roots
//! registry the connected server can query, and installable handlers for
//! the two requests a server may send a client (`sampling/createMessage`,
//! `elicitation/create`).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use mcp_protocol::Engine;
use mcp_protocol::EngineOptions;
use mcp_protocol::Error;
use mcp_protocol::RequestOptions;
use mcp_protocol::Result;
use mcp_protocol::Transport;
use mcp_types::methods;
use mcp_types::CallToolRequest;
use mcp_types::CallToolRequestParams;
use mcp_types::CallToolResult;
use mcp_types::ClientCapabilities;
use mcp_types::CompleteRequest;
use mcp_types::CompleteRequestParams;
use mcp_types::CompleteResult;
use mcp_types::CreateMessageRequestParams;
use mcp_types::CreateMessageResult;
use mcp_types::ElicitRequestParams;
use mcp_types::ElicitResult;
use mcp_types::EmptyResult;
use mcp_types::GetPromptRequest;
use mcp_types::GetPromptRequestParams;
use mcp_types::GetPromptResult;
use mcp_types::Implementation;
use mcp_types::InitializeRequest;
use mcp_types::InitializeRequestParams;
use mcp_types::InitializedNotification;
use mcp_types::ListPromptsRequest;
use mcp_types::ListPromptsRequestParams;
use mcp_types::ListPromptsResult;
use mcp_types::ListResourceTemplatesRequest;
use mcp_types::ListResourceTemplatesRequestParams;
use mcp_types::ListResourceTemplatesResult;
use mcp_types::ListResourcesRequest;
use mcp_types::ListResourcesRequestParams;
use mcp_types::ListResourcesResult;
use mcp_types::ListRootsResult;
use mcp_types::ListToolsRequest;
use mcp_types::ListToolsRequestParams;
use mcp_types::ListToolsResult;
use mcp_types::LoggingLevel;
use mcp_types::ReadResourceRequest;
use mcp_types::ReadResourceRequestParams;
use mcp_types::ReadResourceResult;
use mcp_types::Root;
use mcp_types::RootsListChangedNotification;
use mcp_types::ServerCapabilities;
use mcp_types::SetLevelRequest;
use mcp_types::SetLevelRequestParams;
use mcp_types::SubscribeRequest;
use mcp_types::SubscribeRequestParams;
use mcp_types::UnsubscribeRequest;
use mcp_types::UnsubscribeRequestParams;
use mcp_types::LATEST_PROTOCOL_VERSION;
use mcp_types::SUPPORTED_PROTOCOL_VERSIONS;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::capability_gate::ClientCapabilityGate;
use crate::roots::RootsRegistry;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Installable handler for a server-initiated `elicitation/create` or
/// `sampling/createMessage` request.
pub type TypedHandler<P, R> = Arc<dyn Fn(P) -> BoxFuture<'static, Result<R>> + Send + Sync>;

/// A connected MCP client: one [`Engine`] bound to one transport, past the
/// `initialize`/`notifications/initialized` handshake.
pub struct Client {
    engine: Arc<Engine>,
    roots: Arc<RootsRegistry>,
    server_info: Implementation,
    server_capabilities: ServerCapabilities,
    server_instructions: Option<String>,
}

/// Assembles a [`Client`] from a transport, client identity, declared
/// capabilities, an initial roots set, and optional handler overrides for
/// the two server-initiated requests.
pub struct ClientBuilder {
    client_info: Implementation,
    capabilities: ClientCapabilities,
    protocol_version: String,
    roots: Vec<Root>,
    engine_options: EngineOptions,
    sampling_handler: Option<TypedHandler<CreateMessageRequestParams, CreateMessageResult>>,
    elicitation_handler: Option<TypedHandler<ElicitRequestParams, ElicitResult>>,
}

impl ClientBuilder {
    pub fn new(client_info: Implementation) -> Self {
        Self {
            client_info,
            capabilities: ClientCapabilities::default(),
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            roots: Vec::new(),
            engine_options: EngineOptions::default(),
            sampling_handler: None,
            elicitation_handler: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: ClientCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    pub fn with_roots(mut self, roots: Vec<Root>) -> Self {
        self.roots = roots;
        self
    }

    pub fn with_engine_options(mut self, options: EngineOptions) -> Self {
        self.engine_options = options;
        self
    }

    pub fn with_sampling_handler(
        mut self,
        handler: impl Fn(CreateMessageRequestParams) -> BoxFuture<'static, Result<CreateMessageResult>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.sampling_handler = Some(Arc::new(handler));
        self
    }

    pub fn with_elicitation_handler(
        mut self,
        handler: impl Fn(ElicitRequestParams) -> BoxFuture<'static, Result<ElicitResult>> + Send + Sync + 'static,
    ) -> Self {
        self.elicitation_handler = Some(Arc::new(handler));
        self
    }

    /// Connect over `transport` and run the `initialize` handshake: send
    /// `initialize`, validate the negotiated protocol version, install the
    /// capability gate, then emit `notifications/initialized`.
    pub async fn connect(self, transport: Arc<dyn Transport>) -> Result<Client> {
        let engine = Engine::new(transport, self.engine_options);
        engine.start().await?;

        let roots = Arc::new(RootsRegistry::new(self.roots));
        register_roots_handler(&engine, Arc::clone(&roots)).await;
        if let Some(handler) = self.sampling_handler {
            engine
                .set_request_handler(
                    methods::SAMPLING_CREATE_MESSAGE,
                    wrap_typed_handler(handler),
                )
                .await;
        }
        if let Some(handler) = self.elicitation_handler {
            engine
                .set_request_handler(methods::ELICITATION_CREATE, wrap_typed_handler(handler))
                .await;
        }

        let init_result = engine
            .call::<InitializeRequest>(
                InitializeRequestParams {
                    protocol_version: self.protocol_version.clone(),
                    capabilities: self.capabilities.clone(),
                    client_info: self.client_info.clone(),
                    meta: None,
                },
                RequestOptions::default(),
            )
            .await;

        let init_result = match init_result {
            Ok(result) => result,
            Err(err) => {
                let _ = engine.close().await;
                return Err(err);
            }
        };

        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&init_result.protocol_version.as_str()) {
            let _ = engine.close().await;
            return Err(Error::Handshake(format!(
                "server negotiated unsupported protocol version `{}`",
                init_result.protocol_version
            )));
        }

        engine
            .set_capability_gate(Arc::new(ClientCapabilityGate::new(
                init_result.capabilities.clone(),
                self.capabilities,
            )))
            .await;

        engine.emit::<InitializedNotification>(None).await?;

        Ok(Client {
            engine,
            roots,
            server_info: init_result.server_info,
            server_capabilities: init_result.capabilities,
            server_instructions: init_result.instructions,
        })
    }
}

async fn register_roots_handler(engine: &Arc<Engine>, roots: Arc<RootsRegistry>) {
    let handler: mcp_protocol::RequestHandler = Arc::new(move |_params: Option<Value>, _cancel: CancellationToken| {
        let roots = Arc::clone(&roots);
        Box::pin(async move {
            let result = ListRootsResult {
                roots: roots.snapshot().await,
            };
            Ok(serde_json::to_value(result)?)
        }) as BoxFuture<'static, Result<Value>>
    });
    engine.set_request_handler(methods::ROOTS_LIST, handler).await;
}

fn wrap_typed_handler<P, R>(handler: TypedHandler<P, R>) -> mcp_protocol::RequestHandler
where
    P: serde::de::DeserializeOwned + Send + Sync + 'static,
    R: serde::Serialize + Send + Sync + 'static,
{
    Arc::new(move |params: Option<Value>, _cancel: CancellationToken| {
        let handler = Arc::clone(&handler);
        Box::pin(async move {
            let params: P = serde_json::from_value(params.unwrap_or(Value::Null))?;
            let result = handler(params).await?;
            Ok(serde_json::to_value(result)?)
        }) as BoxFuture<'static, Result<Value>>
    })
}

impl Client {
    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    pub fn server_capabilities(&self) -> &ServerCapabilities {
        &self.server_capabilities
    }

    pub fn server_instructions(&self) -> Option<&str> {
        self.server_instructions.as_deref()
    }

    pub async fn close(&self) -> Result<()> {
        self.engine.close().await
    }

    pub async fn ping(&self) -> Result<EmptyResult> {
        self.engine.call::<mcp_types::PingRequest>(None, RequestOptions::default()).await
    }

    pub async fn complete(&self, params: CompleteRequestParams) -> Result<CompleteResult> {
        self.engine.call::<CompleteRequest>(params, RequestOptions::default()).await
    }

    pub async fn set_logging_level(&self, level: LoggingLevel) -> Result<EmptyResult> {
        self.engine
            .call::<SetLevelRequest>(SetLevelRequestParams { level, meta: None }, RequestOptions::default())
            .await
    }

    pub async fn get_prompt(
        &self,
        name: impl Into<String>,
        arguments: Option<std::collections::BTreeMap<String, String>>,
    ) -> Result<GetPromptResult> {
        self.engine
            .call::<GetPromptRequest>(
                GetPromptRequestParams {
                    name: name.into(),
                    arguments,
                    meta: None,
                },
                RequestOptions::default(),
            )
            .await
    }

    pub async fn list_prompts(&self, cursor: Option<String>) -> Result<ListPromptsResult> {
        self.engine
            .call::<ListPromptsRequest>(Some(ListPromptsRequestParams { cursor, meta: None }), RequestOptions::default())
            .await
    }

    pub async fn list_resources(&self, cursor: Option<String>) -> Result<ListResourcesResult> {
        self.engine
            .call::<ListResourcesRequest>(
                Some(ListResourcesRequestParams { cursor, meta: None }),
                RequestOptions::default(),
            )
            .await
    }

    pub async fn list_resource_templates(&self, cursor: Option<String>) -> Result<ListResourceTemplatesResult> {
        self.engine
            .call::<ListResourceTemplatesRequest>(
                Some(ListResourceTemplatesRequestParams { cursor, meta: None }),
                RequestOptions::default(),
            )
            .await
    }

    pub async fn read_resource(&self, uri: impl Into<String>) -> Result<ReadResourceResult> {
        self.engine
            .call::<ReadResourceRequest>(
                ReadResourceRequestParams { uri: uri.into(), meta: None },
                RequestOptions::default(),
            )
            .await
    }

    pub async fn subscribe_resource(&self, uri: impl Into<String>) -> Result<EmptyResult> {
        self.engine
            .call::<SubscribeRequest>(
                SubscribeRequestParams { uri: uri.into(), meta: None },
                RequestOptions::default(),
            )
            .await
    }

    pub async fn unsubscribe_resource(&self, uri: impl Into<String>) -> Result<EmptyResult> {
        self.engine
            .call::<UnsubscribeRequest>(
                UnsubscribeRequestParams { uri: uri.into(), meta: None },
                RequestOptions::default(),
            )
            .await
    }

    pub async fn call_tool(
        &self,
        name: impl Into<String>,
        arguments: Option<serde_json::Map<String, Value>>,
    ) -> Result<CallToolResult> {
        self.engine
            .call::<CallToolRequest>(
                CallToolRequestParams {
                    name: name.into(),
                    arguments,
                    meta: None,
                },
                RequestOptions::default(),
            )
            .await
    }

    pub async fn list_tools(&self, cursor: Option<String>) -> Result<ListToolsResult> {
        self.engine
            .call::<ListToolsRequest>(Some(ListToolsRequestParams { cursor, meta: None }), RequestOptions::default())
            .await
    }

    pub async fn add_root(&self, root: Root) {
        self.roots.add(root).await;
    }

    pub async fn add_roots(&self, roots: Vec<Root>) {
        self.roots.add_many(roots).await;
    }

    pub async fn remove_root(&self, uri: &str) {
        self.roots.remove(uri).await;
    }

    pub async fn remove_roots(&self, uris: &[String]) {
        self.roots.remove_many(uris).await;
    }

    /// Tell the server the roots set changed. Gated on the client's own
    /// declared `roots.listChanged` capability.
    pub async fn send_roots_list_changed(&self) -> Result<()> {
        if let Err(err) = self.engine.emit::<RootsListChangedNotification>(None).await {
            warn!(%err, "failed to send roots/list_changed");
            return Err(err);
        }
        Ok(())
    }
}
