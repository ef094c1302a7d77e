use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::methods;
use crate::model::LoggingLevel;
use crate::request_id::ProgressToken;
use crate::request_id::RequestId;

/// A typed JSON-RPC notification, keyed by its wire method name. Unlike
/// [`crate::requests::ModelContextProtocolRequest`] there is no `Result` —
/// notifications never get a reply.
pub trait ModelContextProtocolNotification {
    const METHOD: &'static str;
    type Params: Serialize + serde::de::DeserializeOwned + Send + Sync;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InitializedNotificationParams {}

pub struct InitializedNotification;
impl ModelContextProtocolNotification for InitializedNotification {
    const METHOD: &'static str = methods::NOTIFICATIONS_INITIALIZED;
    type Params = Option<InitializedNotificationParams>;
}

/// Sent by either peer to stop producing a response to (or abandon waiting
/// on) a request it previously issued/received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancelledNotificationParams {
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub struct CancelledNotification;
impl ModelContextProtocolNotification for CancelledNotification {
    const METHOD: &'static str = methods::NOTIFICATIONS_CANCELLED;
    type Params = CancelledNotificationParams;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressNotificationParams {
    #[serde(rename = "progressToken")]
    pub progress_token: ProgressToken,
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub struct ProgressNotification;
impl ModelContextProtocolNotification for ProgressNotification {
    const METHOD: &'static str = methods::NOTIFICATIONS_PROGRESS;
    type Params = ProgressNotificationParams;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingMessageNotificationParams {
    pub level: LoggingLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    pub data: Value,
}

pub struct LoggingMessageNotification;
impl ModelContextProtocolNotification for LoggingMessageNotification {
    const METHOD: &'static str = methods::NOTIFICATIONS_MESSAGE;
    type Params = LoggingMessageNotificationParams;
}

macro_rules! empty_notification {
    ($marker:ident, $method:path) => {
        pub struct $marker;
        impl ModelContextProtocolNotification for $marker {
            const METHOD: &'static str = $method;
            type Params = Option<serde_json::Map<String, Value>>;
        }
    };
}

empty_notification!(ToolListChangedNotification, methods::NOTIFICATIONS_TOOLS_LIST_CHANGED);
empty_notification!(PromptListChangedNotification, methods::NOTIFICATIONS_PROMPTS_LIST_CHANGED);
empty_notification!(ResourceListChangedNotification, methods::NOTIFICATIONS_RESOURCES_LIST_CHANGED);
empty_notification!(RootsListChangedNotification, methods::NOTIFICATIONS_ROOTS_LIST_CHANGED);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceUpdatedNotificationParams {
    pub uri: String,
}

pub struct ResourceUpdatedNotification;
impl ModelContextProtocolNotification for ResourceUpdatedNotification {
    const METHOD: &'static str = methods::NOTIFICATIONS_RESOURCES_UPDATED;
    type Params = ResourceUpdatedNotificationParams;
}
