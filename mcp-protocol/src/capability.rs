//! The capability gating table: which declared/negotiated capability a
//! method requires before it may be sent. The engine is role-agnostic, so
//! this module only exposes the pure table lookup; the
//! `mcp-client`/`mcp-server` crates own the negotiated [`mcp_types::ClientCapabilities`]/
//! [`mcp_types::ServerCapabilities`] and implement [`CapabilityGate`] over
//! them.

use mcp_types::methods;

use crate::error::Error;

/// Which side is about to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

/// A capability named in the gating table. `None` means the method is
/// always allowed (`ping`, `initialize`, the handshake notification, and the
/// two correlation notifications).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ServerPrompts,
    ServerResources,
    ServerResourcesSubscribe,
    ServerTools,
    ServerLogging,
    ClientSampling,
    ClientRoots,
    ClientElicitation,
    ClientRootsListChanged,
    None,
}

/// Look up the capability required to send `method` in the given
/// `direction`.
pub fn required_capability(direction: Direction, method: &str) -> Capability {
    use Capability::*;
    use Direction::*;

    match (direction, method) {
        (_, methods::PING)
        | (_, methods::INITIALIZE)
        | (_, methods::NOTIFICATIONS_INITIALIZED)
        | (_, methods::NOTIFICATIONS_CANCELLED)
        | (_, methods::NOTIFICATIONS_PROGRESS) => None,

        (ClientToServer, methods::PROMPTS_GET)
        | (ClientToServer, methods::PROMPTS_LIST)
        | (ClientToServer, methods::COMPLETION_COMPLETE) => ServerPrompts,

        (ClientToServer, methods::RESOURCES_LIST)
        | (ClientToServer, methods::RESOURCES_TEMPLATES_LIST)
        | (ClientToServer, methods::RESOURCES_READ) => ServerResources,

        (ClientToServer, methods::RESOURCES_SUBSCRIBE)
        | (ClientToServer, methods::RESOURCES_UNSUBSCRIBE) => ServerResourcesSubscribe,

        (ClientToServer, methods::TOOLS_CALL) | (ClientToServer, methods::TOOLS_LIST) => {
            ServerTools
        }

        (ClientToServer, methods::LOGGING_SET_LEVEL) => ServerLogging,

        (ServerToClient, methods::SAMPLING_CREATE_MESSAGE) => ClientSampling,
        (ServerToClient, methods::ROOTS_LIST) => ClientRoots,
        (ServerToClient, methods::ELICITATION_CREATE) => ClientElicitation,

        (ServerToClient, methods::NOTIFICATIONS_TOOLS_LIST_CHANGED) => ServerTools,
        (ServerToClient, methods::NOTIFICATIONS_PROMPTS_LIST_CHANGED) => ServerPrompts,
        (ServerToClient, methods::NOTIFICATIONS_RESOURCES_LIST_CHANGED)
        | (ServerToClient, methods::NOTIFICATIONS_RESOURCES_UPDATED) => ServerResources,

        (ClientToServer, methods::NOTIFICATIONS_ROOTS_LIST_CHANGED) => ClientRootsListChanged,

        _ => None,
    }
}

/// Consulted by the engine before an outbound send, and by the role layer
/// before registering an inbound handler. A concrete gate already knows
/// which direction it represents (a `Client` always checks
/// `Direction::ClientToServer`) so the trait itself takes only the method
/// name; implementations hold whatever negotiated capabilities the
/// handshake produced and answer per the table above. A rejection must
/// happen before any bytes reach the transport.
pub trait CapabilityGate: Send + Sync {
    fn check(&self, method: &str) -> Result<(), Error>;
}

/// Gate that never rejects — installed by default, or when
/// `EngineOptions::enforce_capabilities` is false.
pub struct AllowAll;

impl CapabilityGate for AllowAll {
    fn check(&self, _method: &str) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tools_call_requires_server_tools() {
        assert_eq!(
            required_capability(Direction::ClientToServer, methods::TOOLS_CALL),
            Capability::ServerTools
        );
    }

    #[test]
    fn ping_requires_nothing() {
        assert_eq!(
            required_capability(Direction::ClientToServer, methods::PING),
            Capability::None
        );
        assert_eq!(
            required_capability(Direction::ServerToClient, methods::PING),
            Capability::None
        );
    }

    #[test]
    fn sampling_is_server_to_client_only() {
        assert_eq!(
            required_capability(Direction::ServerToClient, methods::SAMPLING_CREATE_MESSAGE),
            Capability::ClientSampling
        );
    }
}
