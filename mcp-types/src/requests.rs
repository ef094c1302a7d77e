use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::capabilities::ClientCapabilities;
use crate::capabilities::Implementation;
use crate::capabilities::ServerCapabilities;
use crate::methods;
use crate::model::LoggingLevel;
use crate::model::Prompt;
use crate::model::Resource;
use crate::model::ResourceTemplate;
use crate::model::Root;
use crate::model::Tool;
use crate::request_id::ProgressToken;

/// A typed JSON-RPC request/result pair, keyed by its wire method name.
///
/// Mirrors the shape used throughout the MCP Rust ecosystem: a zero-sized
/// marker type names the method and pins down `Params`/`Result`, so a caller
/// writes `client.send_request::<ListToolsRequest>(params)` instead of
/// juggling a loose `(&str, Value)` pair.
pub trait ModelContextProtocolRequest {
    const METHOD: &'static str;
    type Params: Serialize + DeserializeOwned + Send + Sync;
    type Result: Serialize + DeserializeOwned + Send + Sync;
}

/// `_meta` carried by every request's params, used to attach a progress
/// token the callee should report progress against.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RequestMeta {
    #[serde(rename = "progressToken", default, skip_serializing_if = "Option::is_none")]
    pub progress_token: Option<ProgressToken>,
}

/// The empty `{}` result returned by requests that acknowledge without data
/// (`ping`, `resources/subscribe`, `resources/unsubscribe`,
/// `logging/setLevel`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmptyResult {}

// ---- initialize ------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitializeRequestParams {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ClientCapabilities,
    #[serde(rename = "clientInfo")]
    pub client_info: Implementation,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: Implementation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

pub struct InitializeRequest;
impl ModelContextProtocolRequest for InitializeRequest {
    const METHOD: &'static str = methods::INITIALIZE;
    type Params = InitializeRequestParams;
    type Result = InitializeResult;
}

// ---- ping --------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PingRequestParams {
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
}

pub struct PingRequest;
impl ModelContextProtocolRequest for PingRequest {
    const METHOD: &'static str = methods::PING;
    type Params = Option<PingRequestParams>;
    type Result = EmptyResult;
}

// ---- tools/list ----------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListToolsRequestParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
    #[serde(rename = "nextCursor", default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

pub struct ListToolsRequest;
impl ModelContextProtocolRequest for ListToolsRequest {
    const METHOD: &'static str = methods::TOOLS_LIST;
    type Params = Option<ListToolsRequestParams>;
    type Result = ListToolsResult;
}

// ---- tools/call ----------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallToolRequestParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Map<String, Value>>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallToolResult {
    pub content: Vec<Value>,
    #[serde(rename = "isError", default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

pub struct CallToolRequest;
impl ModelContextProtocolRequest for CallToolRequest {
    const METHOD: &'static str = methods::TOOLS_CALL;
    type Params = CallToolRequestParams;
    type Result = CallToolResult;
}

// ---- prompts/list ----------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListPromptsRequestParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListPromptsResult {
    pub prompts: Vec<Prompt>,
    #[serde(rename = "nextCursor", default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

pub struct ListPromptsRequest;
impl ModelContextProtocolRequest for ListPromptsRequest {
    const METHOD: &'static str = methods::PROMPTS_LIST;
    type Params = Option<ListPromptsRequestParams>;
    type Result = ListPromptsResult;
}

// ---- prompts/get -------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GetPromptRequestParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<std::collections::BTreeMap<String, String>>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GetPromptResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<Value>,
}

pub struct GetPromptRequest;
impl ModelContextProtocolRequest for GetPromptRequest {
    const METHOD: &'static str = methods::PROMPTS_GET;
    type Params = GetPromptRequestParams;
    type Result = GetPromptResult;
}

// ---- resources/list -------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListResourcesRequestParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListResourcesResult {
    pub resources: Vec<Resource>,
    #[serde(rename = "nextCursor", default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

pub struct ListResourcesRequest;
impl ModelContextProtocolRequest for ListResourcesRequest {
    const METHOD: &'static str = methods::RESOURCES_LIST;
    type Params = Option<ListResourcesRequestParams>;
    type Result = ListResourcesResult;
}

// ---- resources/read ----------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadResourceRequestParams {
    pub uri: String,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadResourceResult {
    pub contents: Vec<Value>,
}

pub struct ReadResourceRequest;
impl ModelContextProtocolRequest for ReadResourceRequest {
    const METHOD: &'static str = methods::RESOURCES_READ;
    type Params = ReadResourceRequestParams;
    type Result = ReadResourceResult;
}

// ---- resources/templates/list -----------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListResourceTemplatesRequestParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListResourceTemplatesResult {
    #[serde(rename = "resourceTemplates")]
    pub resource_templates: Vec<ResourceTemplate>,
    #[serde(rename = "nextCursor", default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

pub struct ListResourceTemplatesRequest;
impl ModelContextProtocolRequest for ListResourceTemplatesRequest {
    const METHOD: &'static str = methods::RESOURCES_TEMPLATES_LIST;
    type Params = Option<ListResourceTemplatesRequestParams>;
    type Result = ListResourceTemplatesResult;
}

// ---- resources/subscribe / unsubscribe ---------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscribeRequestParams {
    pub uri: String,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
}

pub struct SubscribeRequest;
impl ModelContextProtocolRequest for SubscribeRequest {
    const METHOD: &'static str = methods::RESOURCES_SUBSCRIBE;
    type Params = SubscribeRequestParams;
    type Result = EmptyResult;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnsubscribeRequestParams {
    pub uri: String,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
}

pub struct UnsubscribeRequest;
impl ModelContextProtocolRequest for UnsubscribeRequest {
    const METHOD: &'static str = methods::RESOURCES_UNSUBSCRIBE;
    type Params = UnsubscribeRequestParams;
    type Result = EmptyResult;
}

// ---- completion/complete -----------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionArgument {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompleteRequestParams {
    #[serde(rename = "ref")]
    pub reference: Value,
    pub argument: CompletionArgument,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionResultData {
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(rename = "hasMore", default, skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompleteResult {
    pub completion: CompletionResultData,
}

pub struct CompleteRequest;
impl ModelContextProtocolRequest for CompleteRequest {
    const METHOD: &'static str = methods::COMPLETION_COMPLETE;
    type Params = CompleteRequestParams;
    type Result = CompleteResult;
}

// ---- logging/setLevel ---------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetLevelRequestParams {
    pub level: LoggingLevel,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
}

pub struct SetLevelRequest;
impl ModelContextProtocolRequest for SetLevelRequest {
    const METHOD: &'static str = methods::LOGGING_SET_LEVEL;
    type Params = SetLevelRequestParams;
    type Result = EmptyResult;
}

// ---- sampling/createMessage (server -> client) --------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateMessageRequestParams {
    pub messages: Vec<Value>,
    #[serde(rename = "modelPreferences", default, skip_serializing_if = "Option::is_none")]
    pub model_preferences: Option<Value>,
    #[serde(rename = "systemPrompt", default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(rename = "includeContext", default, skip_serializing_if = "Option::is_none")]
    pub include_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(rename = "maxTokens")]
    pub max_tokens: i64,
    #[serde(rename = "stopSequences", default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateMessageResult {
    pub role: String,
    pub content: Value,
    pub model: String,
    #[serde(rename = "stopReason", default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

pub struct CreateMessageRequest;
impl ModelContextProtocolRequest for CreateMessageRequest {
    const METHOD: &'static str = methods::SAMPLING_CREATE_MESSAGE;
    type Params = CreateMessageRequestParams;
    type Result = CreateMessageResult;
}

// ---- roots/list (server -> client) -------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListRootsRequestParams {
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListRootsResult {
    pub roots: Vec<Root>,
}

pub struct ListRootsRequest;
impl ModelContextProtocolRequest for ListRootsRequest {
    const METHOD: &'static str = methods::ROOTS_LIST;
    type Params = Option<ListRootsRequestParams>;
    type Result = ListRootsResult;
}

// ---- elicitation/create (server -> client) ------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElicitRequestParams {
    pub message: String,
    #[serde(rename = "requestedSchema")]
    pub requested_schema: Value,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RequestMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElicitResult {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

pub struct ElicitRequest;
impl ModelContextProtocolRequest for ElicitRequest {
    const METHOD: &'static str = methods::ELICITATION_CREATE;
    type Params = ElicitRequestParams;
    type Result = ElicitResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn list_tools_params_omit_meta_when_absent() {
        let params = ListToolsRequestParams::default();
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[test]
    fn call_tool_params_round_trip() {
        let mut args = Map::new();
        args.insert("location".to_string(), Value::String("nyc".to_string()));
        let params = CallToolRequestParams {
            name: "get_weather".to_string(),
            arguments: Some(args),
            meta: None,
        };
        let value = serde_json::to_value(&params).unwrap();
        let back: CallToolRequestParams = serde_json::from_value(value).unwrap();
        assert_eq!(params, back);
    }
}
