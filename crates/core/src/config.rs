//! Closed, defaulted configuration for a bootstrap run.
//!
//! Construct directly with [`BootstrapConfig::new`], or load a project-local
//! `.bootstrap.toml` overlay with [`BootstrapConfig::load`] — the same
//! defaults-then-overlay convention the host repo uses for `.codescope.toml`,
//! with unknown keys ignored rather than rejected.

use crate::abort::AbortSignal;
use crate::error::BootstrapError;
use crate::types::{Tier, TierStats};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

pub type ProgressCallback = Arc<dyn Fn(Tier, f64) + Send + Sync>;
pub type TierCompleteCallback = Arc<dyn Fn(Tier, &TierStats) + Send + Sync>;

/// Directory segments stripped from every walk by default — VCS metadata,
/// dependency caches, and build outputs.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    "target",
    "dist",
    "build",
    ".next",
    "vendor",
];

#[derive(Clone)]
pub struct BootstrapConfig {
    pub root_path: PathBuf,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub max_file_size_bytes: u64,
    pub tier0_deadline_ms: u64,
    pub tier1_deadline_ms: u64,
    pub on_tier_complete: Option<TierCompleteCallback>,
    pub on_progress: Option<ProgressCallback>,
    pub abort_signal: Option<AbortSignal>,
}

impl BootstrapConfig {
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            include_patterns: vec!["**/*".to_string()],
            exclude_patterns: default_exclude_patterns(),
            max_file_size_bytes: 1_048_576,
            tier0_deadline_ms: 5_000,
            tier1_deadline_ms: 30_000,
            on_tier_complete: None,
            on_progress: None,
            abort_signal: None,
        }
    }

    pub fn with_include_patterns(mut self, patterns: Vec<String>) -> Self {
        self.include_patterns = patterns;
        self
    }

    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    pub fn with_max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.max_file_size_bytes = bytes;
        self
    }

    pub fn with_tier0_deadline_ms(mut self, ms: u64) -> Self {
        self.tier0_deadline_ms = ms;
        self
    }

    pub fn with_tier1_deadline_ms(mut self, ms: u64) -> Self {
        self.tier1_deadline_ms = ms;
        self
    }

    pub fn with_on_tier_complete(mut self, cb: TierCompleteCallback) -> Self {
        self.on_tier_complete = Some(cb);
        self
    }

    pub fn with_on_progress(mut self, cb: ProgressCallback) -> Self {
        self.on_progress = Some(cb);
        self
    }

    pub fn with_abort_signal(mut self, signal: AbortSignal) -> Self {
        self.abort_signal = Some(signal);
        self
    }

    /// Load a `.bootstrap.toml` overlay from `root_path` on top of the
    /// defaults. Missing file is not an error — defaults apply. A malformed
    /// file is a [`BootstrapError::Config`].
    pub fn load(root_path: impl Into<PathBuf>) -> Result<Self, BootstrapError> {
        let root_path = root_path.into();
        let mut config = Self::new(root_path.clone());

        let toml_path = root_path.join(".bootstrap.toml");
        let Ok(contents) = std::fs::read_to_string(&toml_path) else {
            return Ok(config);
        };

        let overlay: TomlOverlay =
            toml::from_str(&contents).map_err(|e| BootstrapError::Config(e.to_string()))?;

        if let Some(include) = overlay.include_patterns {
            config.include_patterns = include;
        }
        if let Some(exclude) = overlay.exclude_patterns {
            config.exclude_patterns = exclude;
        }
        if let Some(max) = overlay.max_file_size_bytes {
            config.max_file_size_bytes = max;
        }
        if let Some(ms) = overlay.tier0_deadline_ms {
            config.tier0_deadline_ms = ms;
        }
        if let Some(ms) = overlay.tier1_deadline_ms {
            config.tier1_deadline_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject nonsense options before Tier 0 starts.
    pub fn validate(&self) -> Result<(), BootstrapError> {
        if self.max_file_size_bytes == 0 {
            return Err(BootstrapError::Config("max_file_size_bytes must be > 0".into()));
        }
        if self.include_patterns.is_empty() {
            return Err(BootstrapError::Config("include_patterns must not be empty".into()));
        }
        Ok(())
    }

    /// Resolve `root_path` to an absolute path. A non-existent root is not an
    /// error — it simply discovers nothing.
    pub fn resolved_root(&self) -> PathBuf {
        std::fs::canonicalize(&self.root_path).unwrap_or_else(|_| self.root_path.clone())
    }
}

/// Mirrors [`BootstrapConfig`]'s data fields only — callbacks and the abort
/// signal are constructed in-process, never serialized.
/// Unknown keys are ignored (serde's default), so newer config files stay
/// forward-compatible with older engine versions.
#[derive(Debug, Deserialize, Default)]
struct TomlOverlay {
    include_patterns: Option<Vec<String>>,
    exclude_patterns: Option<Vec<String>>,
    max_file_size_bytes: Option<u64>,
    tier0_deadline_ms: Option<u64>,
    tier1_deadline_ms: Option<u64>,
}

fn default_exclude_patterns() -> Vec<String> {
    DEFAULT_SKIP_DIRS.iter().map(|d| format!("**/{d}/**")).collect()
}

/// Used by [`crate::discovery`] to strip the configured skip dirs by name as
/// well as by glob, matching the host repo's belt-and-suspenders approach in
/// `walk_files_parallel`.
pub fn skip_dir_names(exclude_patterns: &[String]) -> Vec<String> {
    exclude_patterns
        .iter()
        .filter_map(|p| {
            let trimmed = p.strip_prefix("**/")?.strip_suffix("/**")?;
            if trimmed.contains('/') || trimmed.contains('*') {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}
