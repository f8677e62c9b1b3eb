//! Liveness scope handed to every async load.

use tokio_util::sync::CancellationToken;

/// Cancelled when the owning loader is torn down. Loads check it before
/// reporting back; nothing is aborted mid-flight.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    token: CancellationToken,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_alive(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn close(&self) {
        self.token.cancel();
    }

    /// Resolves once the scope is closed.
    pub async fn closed(&self) {
        self.token.cancelled().await
    }
}
