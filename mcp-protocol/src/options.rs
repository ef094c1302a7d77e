use std::time::Duration;

use mcp_types::ProgressToken;
use tokio_util::sync::CancellationToken;

/// Engine-wide tunables.
#[derive(Clone)]
pub struct EngineOptions {
    /// Deadline for a request that does not specify its own timeout.
    pub default_timeout: Duration,
    /// Whether a received progress notification resets a request's deadline
    /// by default; a per-request [`RequestOptions::reset_on_progress`]
    /// overrides this.
    pub reset_on_progress_default: bool,
    /// Whether the engine enforces the installed capability gate before
    /// sending, or can be turned off for testing/trusted local peers.
    pub enforce_capabilities: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(60),
            reset_on_progress_default: false,
            enforce_capabilities: true,
        }
    }
}

/// Per-request overrides passed to `Engine::call`/`Engine::request`.
#[derive(Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub reset_on_progress: Option<bool>,
    pub on_progress: Option<Box<dyn Fn(f64, Option<f64>) + Send + Sync>>,
    pub cancel_token: Option<CancellationToken>,
    /// Caller-supplied progress token; if absent and `on_progress` is set,
    /// the engine allocates one from the same id space as request ids.
    pub progress_token: Option<ProgressToken>,
}

impl RequestOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_on_progress(
        mut self,
        callback: impl Fn(f64, Option<f64>) + Send + Sync + 'static,
    ) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }
}
