//! Tiered bootstrap engine for a code-intelligence knowledge store.
//!
//! Discovers a workspace's files, classifies them, extracts coarse
//! symbol/import information by textual scan, and upserts the results into a
//! pluggable [`Backend`] — surfacing feature-availability flags that flip on
//! as each tier (`None -> Immediate -> Fast -> Full`) completes.

pub mod abort;
pub mod backend;
pub mod classify;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod extract;
pub mod ids;
pub mod records;
pub mod types;

pub use abort::AbortSignal;
pub use backend::{Backend, InMemoryBackend};
pub use config::BootstrapConfig;
pub use engine::BootstrapEngine;
pub use error::BootstrapError;
pub use types::{
    BootstrapStatus, Category, DirectoryKnowledge, DiscoveredFile, Feature, FileKnowledge, ImportEdge, Symbol, SymbolKind,
    Tier, TierStats,
};
