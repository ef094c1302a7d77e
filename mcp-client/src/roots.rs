//! The client-held roots registry: the set of filesystem or workspace
//! roots this client grants the connected server access to.

use mcp_types::Root;
use tokio::sync::Mutex;

pub(crate) struct RootsRegistry {
    roots: Mutex<Vec<Root>>,
}

impl RootsRegistry {
    pub(crate) fn new(initial: Vec<Root>) -> Self {
        Self {
            roots: Mutex::new(initial),
        }
    }

    pub(crate) async fn snapshot(&self) -> Vec<Root> {
        self.roots.lock().await.clone()
    }

    pub(crate) async fn add(&self, root: Root) {
        let mut guard = self.roots.lock().await;
        if !guard.iter().any(|r| r.uri == root.uri) {
            guard.push(root);
        }
    }

    pub(crate) async fn add_many(&self, roots: Vec<Root>) {
        let mut guard = self.roots.lock().await;
        for root in roots {
            if !guard.iter().any(|r| r.uri == root.uri) {
                guard.push(root);
            }
        }
    }

    pub(crate) async fn remove(&self, uri: &str) {
        self.roots.lock().await.retain(|r| r.uri != uri);
    }

    pub(crate) async fn remove_many(&self, uris: &[String]) {
        self.roots
            .lock()
            .await
            .retain(|r| !uris.iter().any(|uri| uri == &r.uri));
    }
}
