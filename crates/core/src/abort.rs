//! Cooperative cancellation token shared between callers and the engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply-cloned flag that callers can hold onto and flip from outside the
/// engine (`abort_signal` in [`crate::config::BootstrapConfig`]), and that the
/// engine's own `abort()` also flips. Polled, never blocked on.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Idempotent — setting an already-set signal is a no-op.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
