//! One [`mcp_protocol::Engine`] bound to one transport. A session answers
//! only `initialize`/`ping`/`notifications/initialized` until the handshake
//! completes, then exposes the session's outbound operations, each gated
//! by the capabilities negotiated during that handshake.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::RwLock as StdRwLock;

use mcp_protocol::Engine;
use mcp_protocol::EngineOptions;
use mcp_protocol::Error;
use mcp_protocol::NotificationHandler;
use mcp_protocol::RequestHandler;
use mcp_protocol::RequestOptions;
use mcp_protocol::Result;
use mcp_protocol::Transport;
use mcp_types::methods;
use mcp_types::CallToolRequestParams;
use mcp_types::CallToolResult;
use mcp_types::ClientCapabilities;
use mcp_types::CreateMessageRequest;
use mcp_types::CreateMessageRequestParams;
use mcp_types::CreateMessageResult;
use mcp_types::ElicitRequest;
use mcp_types::ElicitRequestParams;
use mcp_types::ElicitResult;
use mcp_types::EmptyResult;
use mcp_types::ErrorCode;
use mcp_types::GetPromptRequestParams;
use mcp_types::GetPromptResult;
use mcp_types::Implementation;
use mcp_types::InitializeRequestParams;
use mcp_types::InitializeResult;
use mcp_types::ListPromptsRequestParams;
use mcp_types::ListPromptsResult;
use mcp_types::ListResourceTemplatesRequestParams;
use mcp_types::ListResourceTemplatesResult;
use mcp_types::ListResourcesRequestParams;
use mcp_types::ListResourcesResult;
use mcp_types::ListRootsRequest;
use mcp_types::ListRootsResult;
use mcp_types::ListToolsRequestParams;
use mcp_types::ListToolsResult;
use mcp_types::LoggingLevel;
use mcp_types::LoggingMessageNotification;
use mcp_types::LoggingMessageNotificationParams;
use mcp_types::PromptListChangedNotification;
use mcp_types::ReadResourceRequestParams;
use mcp_types::ReadResourceResult;
use mcp_types::ResourceListChangedNotification;
use mcp_types::ResourceUpdatedNotification;
use mcp_types::ResourceUpdatedNotificationParams;
use mcp_types::ServerCapabilities;
use mcp_types::ToolListChangedNotification;
use mcp_types::SUPPORTED_PROTOCOL_VERSIONS;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::capability_gate::ServerCapabilityGate;
use crate::registry::Registries;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Invoked once `notifications/initialized` arrives, with the negotiated
/// client identity/capabilities, once the handshake completes.
pub type OnInitialized = Arc<dyn Fn(&Implementation, &ClientCapabilities) + Send + Sync>;

pub struct ServerSession {
    engine: Arc<Engine>,
    initialized: Arc<AtomicBool>,
    client_info: Arc<StdRwLock<Option<Implementation>>>,
    client_capabilities: Arc<StdRwLock<Option<ClientCapabilities>>>,
}

pub(crate) struct HandshakeConfig {
    pub server_info: Implementation,
    pub server_capabilities: ServerCapabilities,
    pub instructions: Option<String>,
    pub on_initialized: Option<OnInitialized>,
}

impl ServerSession {
    pub(crate) async fn start(
        transport: Arc<dyn Transport>,
        registries: Arc<Registries>,
        handshake: HandshakeConfig,
        engine_options: EngineOptions,
    ) -> Result<Arc<Self>> {
        let engine = Engine::new(transport, engine_options);
        let initialized = Arc::new(AtomicBool::new(false));
        let client_info: Arc<StdRwLock<Option<Implementation>>> = Arc::new(StdRwLock::new(None));
        let client_capabilities: Arc<StdRwLock<Option<ClientCapabilities>>> = Arc::new(StdRwLock::new(None));

        register_initialize_handler(
            &engine,
            Arc::clone(&initialized),
            Arc::clone(&client_info),
            Arc::clone(&client_capabilities),
            handshake,
        )
        .await;
        register_data_handlers(&engine, registries, Arc::clone(&initialized)).await;

        engine.start().await?;

        Ok(Arc::new(Self {
            engine,
            initialized,
            client_info,
            client_capabilities,
        }))
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn client_info(&self) -> Option<Implementation> {
        self.client_info.read().expect("client info lock poisoned").clone()
    }

    pub fn client_capabilities(&self) -> Option<ClientCapabilities> {
        self.client_capabilities
            .read()
            .expect("client capabilities lock poisoned")
            .clone()
    }

    pub fn on_close(&self, observer: impl Fn() + Send + Sync + 'static) {
        self.engine.on_close(observer);
    }

    pub fn on_error(&self, observer: impl Fn(&Error) + Send + Sync + 'static) {
        self.engine.on_error(observer);
    }

    pub async fn close(&self) -> Result<()> {
        self.engine.close().await
    }

    pub async fn ping(&self) -> Result<EmptyResult> {
        self.engine.call::<mcp_types::PingRequest>(None, RequestOptions::default()).await
    }

    pub async fn create_message(&self, params: CreateMessageRequestParams) -> Result<CreateMessageResult> {
        self.engine.call::<CreateMessageRequest>(params, RequestOptions::default()).await
    }

    pub async fn list_roots(&self) -> Result<ListRootsResult> {
        self.engine.call::<ListRootsRequest>(None, RequestOptions::default()).await
    }

    pub async fn create_elicitation(&self, params: ElicitRequestParams) -> Result<ElicitResult> {
        self.engine.call::<ElicitRequest>(params, RequestOptions::default()).await
    }

    pub async fn send_logging_message(&self, level: LoggingLevel, logger: Option<String>, data: Value) -> Result<()> {
        self.engine
            .emit::<LoggingMessageNotification>(LoggingMessageNotificationParams { level, logger, data })
            .await
    }

    pub async fn send_resource_updated(&self, uri: impl Into<String>) -> Result<()> {
        self.engine
            .emit::<ResourceUpdatedNotification>(ResourceUpdatedNotificationParams { uri: uri.into() })
            .await
    }

    pub async fn send_resource_list_changed(&self) -> Result<()> {
        self.engine.emit::<ResourceListChangedNotification>(None).await
    }

    pub async fn send_tool_list_changed(&self) -> Result<()> {
        self.engine.emit::<ToolListChangedNotification>(None).await
    }

    pub async fn send_prompt_list_changed(&self) -> Result<()> {
        self.engine.emit::<PromptListChangedNotification>(None).await
    }
}

/// Reject everything but `initialize`/`ping`/`notifications/initialized`
/// until the handshake completes: no other method may be answered from the
/// client side before `initialize` has completed.
fn guard_until_initialized(initialized: Arc<AtomicBool>, handler: RequestHandler) -> RequestHandler {
    Arc::new(move |params: Option<Value>, cancel: CancellationToken| {
        let initialized = Arc::clone(&initialized);
        let handler = Arc::clone(&handler);
        Box::pin(async move {
            if !initialized.load(Ordering::SeqCst) {
                return Err(Error::Protocol {
                    code: ErrorCode::INVALID_REQUEST,
                    message: "session has not completed initialization".to_string(),
                    data: None,
                });
            }
            handler(params, cancel).await
        }) as BoxFuture<'static, Result<Value>>
    })
}

async fn register_initialize_handler(
    engine: &Arc<Engine>,
    initialized: Arc<AtomicBool>,
    client_info: Arc<StdRwLock<Option<Implementation>>>,
    client_capabilities: Arc<StdRwLock<Option<ClientCapabilities>>>,
    handshake: HandshakeConfig,
) {
    let HandshakeConfig {
        server_info,
        server_capabilities,
        instructions,
        on_initialized,
    } = handshake;

    let engine_for_gate = Arc::clone(engine);
    let client_capabilities_for_init = Arc::clone(&client_capabilities);
    let init_handler: RequestHandler = Arc::new(move |params: Option<Value>, _cancel: CancellationToken| {
        let engine = Arc::clone(&engine_for_gate);
        let client_info = Arc::clone(&client_info);
        let client_capabilities = Arc::clone(&client_capabilities_for_init);
        let server_info = server_info.clone();
        let server_capabilities = server_capabilities.clone();
        let instructions = instructions.clone();
        Box::pin(async move {
            let request: InitializeRequestParams = serde_json::from_value(params.unwrap_or(Value::Null))?;

            let negotiated_version = if SUPPORTED_PROTOCOL_VERSIONS.contains(&request.protocol_version.as_str()) {
                request.protocol_version.clone()
            } else {
                mcp_types::LATEST_PROTOCOL_VERSION.to_string()
            };

            let gate = Arc::new(ServerCapabilityGate::new(
                server_capabilities.clone(),
                request.capabilities.clone(),
            ));
            engine.set_capability_gate(gate).await;
            *client_info.write().expect("client info lock poisoned") = Some(request.client_info.clone());
            *client_capabilities.write().expect("client capabilities lock poisoned") = Some(request.capabilities.clone());

            let result = InitializeResult {
                protocol_version: negotiated_version,
                capabilities: server_capabilities,
                server_info,
                instructions,
            };
            Ok(serde_json::to_value(result)?)
        }) as BoxFuture<'static, Result<Value>>
    });
    engine.set_request_handler(methods::INITIALIZE, init_handler).await;

    let initialized_for_notification = Arc::clone(&initialized);
    let client_info_for_notification = Arc::clone(&client_info);
    let client_capabilities_for_notification = Arc::clone(&client_capabilities);
    let initialized_handler: NotificationHandler = Arc::new(move |_params: Option<Value>| {
        let initialized = Arc::clone(&initialized_for_notification);
        let on_initialized = on_initialized.clone();
        let client_info = Arc::clone(&client_info_for_notification);
        let client_capabilities = Arc::clone(&client_capabilities_for_notification);
        Box::pin(async move {
            initialized.store(true, Ordering::SeqCst);
            if let Some(cb) = on_initialized {
                let info = client_info.read().expect("client info lock poisoned").clone();
                let capabilities = client_capabilities
                    .read()
                    .expect("client capabilities lock poisoned")
                    .clone();
                if let (Some(info), Some(capabilities)) = (info, capabilities) {
                    cb(&info, &capabilities);
                }
            }
        }) as BoxFuture<'static, ()>
    });
    engine
        .set_notification_handler(methods::NOTIFICATIONS_INITIALIZED, initialized_handler)
        .await;
}

async fn register_data_handlers(engine: &Arc<Engine>, registries: Arc<Registries>, initialized: Arc<AtomicBool>) {
    let tools_list = Arc::clone(&registries);
    let handler: RequestHandler = Arc::new(move |params: Option<Value>, _cancel: CancellationToken| {
        let registries = Arc::clone(&tools_list);
        Box::pin(async move {
            let _params: Option<ListToolsRequestParams> = match params {
                Some(value) => serde_json::from_value(value)?,
                None => None,
            };
            let result = ListToolsResult {
                tools: registries.list_tools().await,
                next_cursor: None,
            };
            Ok(serde_json::to_value(result)?)
        }) as BoxFuture<'static, Result<Value>>
    });
    engine
        .set_request_handler(methods::TOOLS_LIST, guard_until_initialized(Arc::clone(&initialized), handler))
        .await;

    let tools_call = Arc::clone(&registries);
    let handler: RequestHandler = Arc::new(move |params: Option<Value>, _cancel: CancellationToken| {
        let registries = Arc::clone(&tools_call);
        Box::pin(async move {
            let params: CallToolRequestParams = serde_json::from_value(params.unwrap_or(Value::Null))?;
            let Some(tool_handler) = registries.find_tool(&params.name).await else {
                return Err(Error::Protocol {
                    code: ErrorCode::INVALID_PARAMS,
                    message: format!("unknown tool `{}`", params.name),
                    data: None,
                });
            };
            let result: CallToolResult = tool_handler(params.arguments).await?;
            Ok(serde_json::to_value(result)?)
        }) as BoxFuture<'static, Result<Value>>
    });
    engine
        .set_request_handler(methods::TOOLS_CALL, guard_until_initialized(Arc::clone(&initialized), handler))
        .await;

    let prompts_list = Arc::clone(&registries);
    let handler: RequestHandler = Arc::new(move |params: Option<Value>, _cancel: CancellationToken| {
        let registries = Arc::clone(&prompts_list);
        Box::pin(async move {
            let _params: Option<ListPromptsRequestParams> = match params {
                Some(value) => serde_json::from_value(value)?,
                None => None,
            };
            let result = ListPromptsResult {
                prompts: registries.list_prompts().await,
                next_cursor: None,
            };
            Ok(serde_json::to_value(result)?)
        }) as BoxFuture<'static, Result<Value>>
    });
    engine
        .set_request_handler(methods::PROMPTS_LIST, guard_until_initialized(Arc::clone(&initialized), handler))
        .await;

    let prompts_get = Arc::clone(&registries);
    let handler: RequestHandler = Arc::new(move |params: Option<Value>, _cancel: CancellationToken| {
        let registries = Arc::clone(&prompts_get);
        Box::pin(async move {
            let params: GetPromptRequestParams = serde_json::from_value(params.unwrap_or(Value::Null))?;
            let Some(prompt_handler) = registries.find_prompt(&params.name).await else {
                return Err(Error::Protocol {
                    code: ErrorCode::INVALID_PARAMS,
                    message: format!("unknown prompt `{}`", params.name),
                    data: None,
                });
            };
            let result: GetPromptResult = prompt_handler(params.arguments).await?;
            Ok(serde_json::to_value(result)?)
        }) as BoxFuture<'static, Result<Value>>
    });
    engine
        .set_request_handler(methods::PROMPTS_GET, guard_until_initialized(Arc::clone(&initialized), handler))
        .await;

    let resources_list = Arc::clone(&registries);
    let handler: RequestHandler = Arc::new(move |params: Option<Value>, _cancel: CancellationToken| {
        let registries = Arc::clone(&resources_list);
        Box::pin(async move {
            let _params: Option<ListResourcesRequestParams> = match params {
                Some(value) => serde_json::from_value(value)?,
                None => None,
            };
            let result = ListResourcesResult {
                resources: registries.list_resources().await,
                next_cursor: None,
            };
            Ok(serde_json::to_value(result)?)
        }) as BoxFuture<'static, Result<Value>>
    });
    engine
        .set_request_handler(
            methods::RESOURCES_LIST,
            guard_until_initialized(Arc::clone(&initialized), handler),
        )
        .await;

    let resources_read = Arc::clone(&registries);
    let handler: RequestHandler = Arc::new(move |params: Option<Value>, _cancel: CancellationToken| {
        let registries = Arc::clone(&resources_read);
        Box::pin(async move {
            let params: ReadResourceRequestParams = serde_json::from_value(params.unwrap_or(Value::Null))?;
            let Some(resource_handler) = registries.find_resource(&params.uri).await else {
                return Err(Error::Protocol {
                    code: ErrorCode::INVALID_PARAMS,
                    message: format!("unknown resource `{}`", params.uri),
                    data: None,
                });
            };
            let result: ReadResourceResult = resource_handler(params.uri).await?;
            Ok(serde_json::to_value(result)?)
        }) as BoxFuture<'static, Result<Value>>
    });
    engine
        .set_request_handler(
            methods::RESOURCES_READ,
            guard_until_initialized(Arc::clone(&initialized), handler),
        )
        .await;

    let resource_templates = Arc::clone(&registries);
    let handler: RequestHandler = Arc::new(move |params: Option<Value>, _cancel: CancellationToken| {
        let registries = Arc::clone(&resource_templates);
        Box::pin(async move {
            let _params: Option<ListResourceTemplatesRequestParams> = match params {
                Some(value) => serde_json::from_value(value)?,
                None => None,
            };
            let result = ListResourceTemplatesResult {
                resource_templates: registries.list_resource_templates().await,
                next_cursor: None,
            };
            Ok(serde_json::to_value(result)?)
        }) as BoxFuture<'static, Result<Value>>
    });
    engine
        .set_request_handler(
            methods::RESOURCES_TEMPLATES_LIST,
            guard_until_initialized(initialized, handler),
        )
        .await;
}
