//! The `Server` role: a factory holding the shared tool/prompt/resource
//! registries and server-wide capabilities. Each accepted transport
//! produces a new [`ServerSession`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use mcp_protocol::EngineOptions;
use mcp_protocol::Result;
use mcp_protocol::Transport;
use mcp_types::CallToolResult;
use mcp_types::ClientCapabilities;
use mcp_types::GetPromptResult;
use mcp_types::Implementation;
use mcp_types::Prompt;
use mcp_types::ReadResourceResult;
use mcp_types::Resource;
use mcp_types::ResourceTemplate;
use mcp_types::ServerCapabilities;
use mcp_types::Tool;
use serde_json::Map;
use serde_json::Value;

use crate::registry::PromptEntry;
use crate::registry::PromptHandler;
use crate::registry::Registries;
use crate::registry::ResourceEntry;
use crate::registry::ResourceHandler;
use crate::registry::ToolEntry;
use crate::registry::ToolHandler;
use crate::session::HandshakeConfig;
use crate::session::OnInitialized;
use crate::session::ServerSession;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A server identity plus its shared registries — one per process, serving
/// as many sessions as transports connect to it.
pub struct Server {
    server_info: Implementation,
    capabilities: ServerCapabilities,
    instructions: Option<String>,
    on_initialized: Option<OnInitialized>,
    engine_options: EngineOptions,
    registries: Arc<Registries>,
}

impl Server {
    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> ServerBuilder {
        ServerBuilder::new(name, version)
    }

    /// Bind a new [`ServerSession`] to `transport` and start it; the
    /// `initialize` handshake runs as soon as the client sends it.
    pub async fn serve(self: &Arc<Self>, transport: Arc<dyn Transport>) -> Result<Arc<ServerSession>> {
        let handshake = HandshakeConfig {
            server_info: self.server_info.clone(),
            server_capabilities: self.capabilities.clone(),
            instructions: self.instructions.clone(),
            on_initialized: self.on_initialized.clone(),
        };
        ServerSession::start(
            transport,
            Arc::clone(&self.registries),
            handshake,
            self.engine_options.clone(),
        )
        .await
    }

    pub async fn register_tool(
        &self,
        tool: Tool,
        handler: impl Fn(Option<Map<String, Value>>) -> BoxFuture<'static, Result<CallToolResult>> + Send + Sync + 'static,
    ) {
        self.registries
            .add_tool(ToolEntry {
                tool,
                handler: Arc::new(handler),
            })
            .await;
    }

    pub async fn register_prompt(
        &self,
        prompt: Prompt,
        handler: impl Fn(Option<std::collections::BTreeMap<String, String>>) -> BoxFuture<'static, Result<GetPromptResult>>
            + Send
            + Sync
            + 'static,
    ) {
        self.registries
            .add_prompt(PromptEntry {
                prompt,
                handler: Arc::new(handler),
            })
            .await;
    }

    pub async fn register_resource(
        &self,
        resource: Resource,
        handler: impl Fn(String) -> BoxFuture<'static, Result<ReadResourceResult>> + Send + Sync + 'static,
    ) {
        self.registries
            .add_resource(ResourceEntry {
                resource,
                handler: Arc::new(handler),
            })
            .await;
    }
}

pub struct ServerBuilder {
    server_info: Option<Implementation>,
    capabilities: ServerCapabilities,
    instructions: Option<String>,
    on_initialized: Option<OnInitialized>,
    engine_options: EngineOptions,
    tools: Vec<ToolEntry>,
    prompts: Vec<PromptEntry>,
    resources: Vec<ResourceEntry>,
    resource_templates: Vec<ResourceTemplate>,
}

impl ServerBuilder {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            server_info: Some(Implementation {
                name: name.into(),
                version: version.into(),
            }),
            capabilities: ServerCapabilities::default(),
            instructions: None,
            on_initialized: None,
            engine_options: EngineOptions::default(),
            tools: Vec::new(),
            prompts: Vec::new(),
            resources: Vec::new(),
            resource_templates: Vec::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: ServerCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_engine_options(mut self, options: EngineOptions) -> Self {
        self.engine_options = options;
        self
    }

    pub fn on_initialized(
        mut self,
        callback: impl Fn(&Implementation, &ClientCapabilities) + Send + Sync + 'static,
    ) -> Self {
        self.on_initialized = Some(Arc::new(callback));
        self
    }

    pub fn tool(
        mut self,
        tool: Tool,
        handler: impl Fn(Option<Map<String, Value>>) -> BoxFuture<'static, Result<CallToolResult>> + Send + Sync + 'static,
    ) -> Self {
        self.tools.push(ToolEntry {
            tool,
            handler: Arc::new(handler) as ToolHandler,
        });
        self
    }

    pub fn prompt(
        mut self,
        prompt: Prompt,
        handler: impl Fn(Option<std::collections::BTreeMap<String, String>>) -> BoxFuture<'static, Result<GetPromptResult>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.prompts.push(PromptEntry {
            prompt,
            handler: Arc::new(handler) as PromptHandler,
        });
        self
    }

    pub fn resource(
        mut self,
        resource: Resource,
        handler: impl Fn(String) -> BoxFuture<'static, Result<ReadResourceResult>> + Send + Sync + 'static,
    ) -> Self {
        self.resources.push(ResourceEntry {
            resource,
            handler: Arc::new(handler) as ResourceHandler,
        });
        self
    }

    pub fn resource_template(mut self, template: ResourceTemplate) -> Self {
        self.resource_templates.push(template);
        self
    }

    pub fn build(self) -> Arc<Server> {
        Arc::new(Server {
            server_info: self.server_info.expect("ServerBuilder::new always sets server_info"),
            capabilities: self.capabilities,
            instructions: self.instructions,
            on_initialized: self.on_initialized,
            engine_options: self.engine_options,
            registries: Arc::new(Registries::new(self.tools, self.prompts, self.resources, self.resource_templates)),
        })
    }
}
