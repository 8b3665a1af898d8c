//! Cooperative cancellation for rolling deploys.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cancellation flag shared between a running deploy and its controller.
///
/// Cloning yields a handle to the same flag, so a UI layer can keep one
/// clone wired to a cancel action while the engine polls the other.
/// Cancellation is cooperative: the engine checks at the top of each
/// per-pod iteration, inside health polling, and inside the drain
/// countdown; an in-flight network call is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; takes effect at the deploy's next
    /// poll point, and does nothing if no deploy holds this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
