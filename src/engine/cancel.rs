//! Cooperative cancellation for promotion and health check runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A caller-supplied cancellation signal.
///
/// Cloning yields a handle to the same flag, so the caller keeps one
/// clone and hands another to the engine. The engine checks the flag at
/// its suspension points (immediately before each step's dispatch);
/// long-running runners are expected to check it at their own blocking
/// points.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Idempotent; cannot be undone.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
