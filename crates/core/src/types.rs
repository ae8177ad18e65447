//! Core data model: discovered files, persisted knowledge records, and the
//! tier/feature vocabulary the engine bootstraps through.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// File categories
// ---------------------------------------------------------------------------

/// Closed set of file categories a [`DiscoveredFile`] can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Code,
    Docs,
    Config,
    Test,
    Schema,
    Data,
    Other,
}

// ---------------------------------------------------------------------------
// Tiers and feature flags
// ---------------------------------------------------------------------------

/// Bootstrap progresses through these tiers in order; each is a strict
/// superset of the features of the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tier {
    None = 0,
    Immediate = 1,
    Fast = 2,
    Full = 3,
}

impl Tier {
    /// The feature set this tier contributes on top of the previous tier's.
    pub fn own_features(self) -> &'static [Feature] {
        match self {
            Tier::None => &[],
            Tier::Immediate => &[Feature::FileSearch, Feature::BasicNavigation],
            Tier::Fast => &[Feature::SymbolSearch, Feature::GoToDefinition, Feature::ImportGraph],
            Tier::Full => {
                &[Feature::FullAnalysis, Feature::PatternDetection, Feature::ArchitectureAnalysis]
            }
        }
    }

    /// Tier this one completes after, or `None` for the lowest tier.
    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::None => Some(Tier::Immediate),
            Tier::Immediate => Some(Tier::Fast),
            Tier::Fast => Some(Tier::Full),
            Tier::Full => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::None => "none",
            Tier::Immediate => "immediate",
            Tier::Fast => "fast",
            Tier::Full => "full",
        }
    }
}

/// Closed set of capability flags toggled on as tiers complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    FileSearch,
    BasicNavigation,
    SymbolSearch,
    GoToDefinition,
    ImportGraph,
    FullAnalysis,
    PatternDetection,
    ArchitectureAnalysis,
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// A workspace-relative path that survived include/exclude filtering and a
/// successful stat. Transient — never persisted, never mutated after Tier 0.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub absolute_path: PathBuf,
    pub relative_path: String,
    pub name: String,
    pub extension: String,
    /// Parent relative path, empty string if the file sits at the workspace root.
    pub directory: String,
    pub size_bytes: u64,
    pub category: Category,
    pub modified: chrono::DateTime<chrono::Utc>,
}

// ---------------------------------------------------------------------------
// Symbols and imports (Tier 1, transient)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    Variable,
    Type,
    Interface,
    Enum,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: PathBuf,
    /// 1-based line number.
    pub line: usize,
    pub is_exported: bool,
}

#[derive(Debug, Clone)]
pub struct ImportEdge {
    pub source_file: String,
    pub target_file: String,
    /// Named, default, and `* as X` imports; dynamic imports yield `["*"]`.
    pub imported_names: Vec<String>,
}

// ---------------------------------------------------------------------------
// Persisted knowledge records
// ---------------------------------------------------------------------------

/// Persistent, keyed by `file_id(relative_path)`. Inserted at Tier 0 with
/// minimal fields, patched at Tier 1 with symbol/import data. Never deleted
/// by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileKnowledge {
    pub file_id: String,
    pub absolute_path: PathBuf,
    pub relative_path: String,
    pub category: Category,

    pub purpose: Option<String>,
    pub role: Option<String>,
    pub summary: Option<String>,
    pub key_exports: Vec<String>,
    pub main_concepts: Vec<String>,

    pub line_count: usize,
    pub function_count: usize,
    pub class_count: usize,
    pub import_count: usize,
    pub export_count: usize,

    pub imports: Vec<String>,
    pub imported_by: Vec<String>,

    pub complexity: Option<String>,
    pub has_tests: bool,

    pub checksum: Option<String>,
    pub confidence: f32,
    pub last_indexed: chrono::DateTime<chrono::Utc>,
    pub last_modified: chrono::DateTime<chrono::Utc>,
}

/// Persistent, keyed by `dir_id(relative_path)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryKnowledge {
    pub dir_id: String,
    pub relative_path: String,
    pub depth: usize,
    pub file_count: usize,
    pub total_files: usize,
    pub has_readme: bool,
    pub has_index: bool,
    pub has_tests: bool,
    pub parent: Option<String>,
    pub confidence: f32,
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Per-tier stats captured when that tier completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierStats {
    pub tier: Tier,
    pub files_processed: usize,
    pub duration_ms: u64,
    pub enabled_features: Vec<Feature>,
    pub metrics: BTreeMap<String, f64>,
}

/// A defensive (owned) copy of the engine's current state, returned by
/// `get_status()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapStatus {
    pub current_tier: Tier,
    pub is_complete: bool,
    pub tier_stats: BTreeMap<String, TierStats>,
    pub enabled_features: Vec<Feature>,
    pub in_progress: bool,
    pub error: Option<String>,
}
