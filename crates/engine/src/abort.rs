use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Cloneable handle for aborting the engine's current job from another task
///
/// An abort interrupts any in-flight machine operation, after which the engine
/// moves the head to safe Z, discards held parts and becomes idle. Raised
/// between steps, only the token is cancelled: the safe-state cleanup is
/// deferred until the next `JobEngine::next` call. Use `JobEngine::abort` to
/// clean up immediately.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    token: Arc<Mutex<CancellationToken>>,
}

impl AbortHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.current().cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.current().is_cancelled()
    }

    /// Token of the run in progress
    pub(crate) fn token(&self) -> CancellationToken {
        self.current().clone()
    }

    /// Start a new run with a fresh token; earlier aborts do not carry over
    pub(crate) fn reset(&self) {
        *self.current() = CancellationToken::new();
    }

    fn current(&self) -> MutexGuard<'_, CancellationToken> {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
