//! Cooperative cancellation for running sessions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A handle for requesting disconnect from another thread or context.
///
/// Clones share the same flag. The session driver polls it at least once
/// per wait timeout, so a request is observed within one wait interval
/// plus one dispatch.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
