//! The shared tool/prompt/resource registries a [`crate::Server`] holds and
//! every [`crate::ServerSession`] it spawns reads from. Registration order
//! is preserved since `tools/list` etc. enumerate tools in the order they
//! were registered.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use mcp_protocol::Result;
use mcp_types::CallToolResult;
use mcp_types::GetPromptResult;
use mcp_types::ReadResourceResult;
use mcp_types::Resource;
use mcp_types::ResourceTemplate;
use mcp_types::Prompt;
use mcp_types::Tool;
use serde_json::Map;
use serde_json::Value;
use tokio::sync::RwLock;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type ToolHandler = Arc<dyn Fn(Option<Map<String, Value>>) -> BoxFuture<'static, Result<CallToolResult>> + Send + Sync>;
pub type PromptHandler =
    Arc<dyn Fn(Option<BTreeMap<String, String>>) -> BoxFuture<'static, Result<GetPromptResult>> + Send + Sync>;
pub type ResourceHandler = Arc<dyn Fn(String) -> BoxFuture<'static, Result<ReadResourceResult>> + Send + Sync>;

pub(crate) struct ToolEntry {
    pub tool: Tool,
    pub handler: ToolHandler,
}

pub(crate) struct PromptEntry {
    pub prompt: Prompt,
    pub handler: PromptHandler,
}

pub(crate) struct ResourceEntry {
    pub resource: Resource,
    pub handler: ResourceHandler,
}

#[derive(Default)]
pub(crate) struct Registries {
    tools: RwLock<Vec<ToolEntry>>,
    prompts: RwLock<Vec<PromptEntry>>,
    resources: RwLock<Vec<ResourceEntry>>,
    resource_templates: RwLock<Vec<ResourceTemplate>>,
}

impl Registries {
    pub(crate) fn new(
        tools: Vec<ToolEntry>,
        prompts: Vec<PromptEntry>,
        resources: Vec<ResourceEntry>,
        resource_templates: Vec<ResourceTemplate>,
    ) -> Self {
        Self {
            tools: RwLock::new(tools),
            prompts: RwLock::new(prompts),
            resources: RwLock::new(resources),
            resource_templates: RwLock::new(resource_templates),
        }
    }

    pub(crate) async fn list_tools(&self) -> Vec<Tool> {
        self.tools.read().await.iter().map(|e| e.tool.clone()).collect()
    }

    pub(crate) async fn find_tool(&self, name: &str) -> Option<ToolHandler> {
        self.tools
            .read()
            .await
            .iter()
            .find(|e| e.tool.name == name)
            .map(|e| Arc::clone(&e.handler))
    }

    pub(crate) async fn list_prompts(&self) -> Vec<Prompt> {
        self.prompts.read().await.iter().map(|e| e.prompt.clone()).collect()
    }

    pub(crate) async fn find_prompt(&self, name: &str) -> Option<PromptHandler> {
        self.prompts
            .read()
            .await
            .iter()
            .find(|e| e.prompt.name == name)
            .map(|e| Arc::clone(&e.handler))
    }

    pub(crate) async fn list_resources(&self) -> Vec<Resource> {
        self.resources.read().await.iter().map(|e| e.resource.clone()).collect()
    }

    pub(crate) async fn find_resource(&self, uri: &str) -> Option<ResourceHandler> {
        self.resources
            .read()
            .await
            .iter()
            .find(|e| e.resource.uri == uri)
            .map(|e| Arc::clone(&e.handler))
    }

    pub(crate) async fn list_resource_templates(&self) -> Vec<ResourceTemplate> {
        self.resource_templates.read().await.clone()
    }

    pub(crate) async fn add_tool(&self, entry: ToolEntry) {
        self.tools.write().await.push(entry);
    }

    pub(crate) async fn add_prompt(&self, entry: PromptEntry) {
        self.prompts.write().await.push(entry);
    }

    pub(crate) async fn add_resource(&self, entry: ResourceEntry) {
        self.resources.write().await.push(entry);
    }
}
