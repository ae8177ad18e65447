//! Error types that can escape the public surface.
//!
//! Per-file failures (stat/read/decode) and cancellation are not represented
//! here — they are recovered locally or surfaced through [`crate::types::BootstrapStatus`]
//! instead of through `Result`. Only configuration mistakes, backend failures,
//! and reentrant `start()` calls are real `Err` returns.

use thiserror::Error;

/// Errors that can be returned from [`crate::engine::BootstrapEngine::start`].
#[derive(Debug, Error, Clone)]
pub enum BootstrapError {
    /// Rejected before Tier 0 starts — a config option was out of range or nonsensical.
    #[error("invalid bootstrap config: {0}")]
    Config(String),

    /// A backend upsert or read failed. The engine does not retry these itself.
    #[error("backend operation failed: {0}")]
    Backend(String),

    /// `start()` was called while a previous `start()` on the same engine was
    /// still in progress.
    #[error("bootstrap already in progress")]
    Reentrant,
}
