//! The server-side [`CapabilityGate`]: `server.*` rows are checked against
//! this server's own declared [`ServerCapabilities`] (a self-consistency
//! check — don't announce a list changed if you never advertised the list
//! in the first place), `client.*` rows against the [`ClientCapabilities`]
//! the connected peer declared during `initialize`.

use mcp_protocol::required_capability;
use mcp_protocol::Capability;
use mcp_protocol::CapabilityGate;
use mcp_protocol::Direction;
use mcp_protocol::Error;
use mcp_types::ClientCapabilities;
use mcp_types::ServerCapabilities;

pub(crate) struct ServerCapabilityGate {
    server: ServerCapabilities,
    client: ClientCapabilities,
}

impl ServerCapabilityGate {
    pub(crate) fn new(server: ServerCapabilities, client: ClientCapabilities) -> Self {
        Self { server, client }
    }
}

impl CapabilityGate for ServerCapabilityGate {
    fn check(&self, method: &str) -> Result<(), Error> {
        let required = required_capability(Direction::ServerToClient, method);
        let allowed = match required {
            Capability::None => true,
            Capability::ServerTools => self.server.tools.is_some(),
            Capability::ServerPrompts => self.server.prompts.is_some(),
            Capability::ServerResources => self.server.resources.is_some(),
            Capability::ClientSampling => self.client.sampling.is_some(),
            Capability::ClientRoots => self.client.roots.is_some(),
            Capability::ClientElicitation => self.client.elicitation.is_some(),
            // Never produced for `Direction::ServerToClient`.
            Capability::ServerResourcesSubscribe | Capability::ServerLogging | Capability::ClientRootsListChanged => {
                true
            }
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
    use mcp_types::RootsCapability;

    #[test]
    fn rejects_roots_list_when_client_never_advertised_roots() {
        let gate = ServerCapabilityGate::new(ServerCapabilities::default(), ClientCapabilities::default());
        assert!(gate.check(methods::ROOTS_LIST).is_err());
    }

    #[test]
    fn allows_roots_list_once_client_advertises_roots() {
        let gate = ServerCapabilityGate::new(
            ServerCapabilities::default(),
            ClientCapabilities {
                roots: Some(RootsCapability { list_changed: None }),
                ..Default::default()
            },
        );
        assert!(gate.check(methods::ROOTS_LIST).is_ok());
    }

    #[test]
    fn ping_is_always_allowed() {
        let gate = ServerCapabilityGate::new(ServerCapabilities::default(), ClientCapabilities::default());
        assert!(gate.check(methods::PING).is_ok());
    }
}
