//! The client-side [`CapabilityGate`]: checks an outbound method against the
//! server's negotiated [`ServerCapabilities`] (for server-owned features) or
//! against the client's own declared [`ClientCapabilities`] (for the one
//! notification the client gates against itself, `roots/list_changed`).

use mcp_protocol::required_capability;
use mcp_protocol::Capability;
use mcp_protocol::CapabilityGate;
use mcp_protocol::Direction;
use mcp_protocol::Error;
use mcp_types::ClientCapabilities;
use mcp_types::ServerCapabilities;

pub(crate) struct ClientCapabilityGate {
    server: ServerCapabilities,
    declared: ClientCapabilities,
}

impl ClientCapabilityGate {
    pub(crate) fn new(server: ServerCapabilities, declared: ClientCapabilities) -> Self {
        Self { server, declared }
    }
}

impl CapabilityGate for ClientCapabilityGate {
    fn check(&self, method: &str) -> Result<(), Error> {
        let required = required_capability(Direction::ClientToServer, method);
        let allowed = match required {
            Capability::None => true,
            Capability::ServerPrompts => self.server.prompts.is_some(),
            Capability::ServerResources => self.server.resources.is_some(),
            Capability::ServerResourcesSubscribe => self
                .server
                .resources
                .as_ref()
                .and_then(|r| r.subscribe)
                .unwrap_or(false),
            Capability::ServerTools => self.server.tools.is_some(),
            Capability::ServerLogging => self.server.logging.is_some(),
            Capability::ClientRootsListChanged => self
                .declared
                .roots
                .as_ref()
                .and_then(|r| r.list_changed)
                .unwrap_or(false),
            // The remaining variants only ever come back for
            // `Direction::ServerToClient` and never reach this gate.
            Capability::ClientSampling | Capability::ClientRoots | Capability::ClientElicitation => true,
        };

        if allowed {
            Ok(())
        } else {
            Err(Error::Capability {
                method: method.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_types::methods;
    use mcp_types::ToolsCapability;

    #[test]
    fn rejects_tools_call_when_server_never_advertised_tools() {
        let gate = ClientCapabilityGate::new(ServerCapabilities::default(), ClientCapabilities::default());
        assert!(gate.check(methods::TOOLS_CALL).is_err());
    }

    #[test]
    fn allows_tools_call_once_server_advertises_tools() {
        let gate = ClientCapabilityGate::new(
            ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: None }),
                ..Default::default()
            },
            ClientCapabilities::default(),
        );
        assert!(gate.check(methods::TOOLS_CALL).is_ok());
    }

    #[test]
    fn ping_is_always_allowed() {
        let gate = ClientCapabilityGate::new(ServerCapabilities::default(), ClientCapabilities::default());
        assert!(gate.check(methods::PING).is_ok());
    }
}
