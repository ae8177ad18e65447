//! Construct and patch [`FileKnowledge`]/[`DirectoryKnowledge`] records.
//!
//! Tier 0 inserts minimal records at `confidence = 0.3`; Tier 1 patches them
//! with symbol/import data at `confidence = 0.5`. Counts only ever grow —
//! Tier 1 is additive over whatever Tier 0 already wrote.

use crate::extract::FileExtraction;
use crate::ids::{dir_id, file_id};
use crate::types::{DirectoryKnowledge, DiscoveredFile, FileKnowledge, SymbolKind};
use std::collections::{HashMap, HashSet};

const TIER0_CONFIDENCE: f32 = 0.3;
const TIER1_CONFIDENCE: f32 = 0.5;
const MAX_KEY_EXPORTS: usize = 10;

/// Build the initial Tier 0 record for a single discovered file.
pub fn initial_file_record(file: &DiscoveredFile, now: chrono::DateTime<chrono::Utc>) -> FileKnowledge {
    FileKnowledge {
        file_id: file_id(&file.relative_path),
        absolute_path: file.absolute_path.clone(),
        relative_path: file.relative_path.clone(),
        category: file.category,

        purpose: None,
        role: None,
        summary: None,
        key_exports: Vec::new(),
        main_concepts: Vec::new(),

        line_count: 0,
        function_count: 0,
        class_count: 0,
        import_count: 0,
        export_count: 0,

        imports: Vec::new(),
        imported_by: Vec::new(),

        complexity: None,
        has_tests: false,

        checksum: None,
        confidence: TIER0_CONFIDENCE,
        last_indexed: now,
        last_modified: file.modified,
    }
}

/// Build the initial Tier 0 record for a directory, given the discovered
/// files observed directly under it (`own_files`) and the full descendant
/// count (`total_files`).
pub fn initial_directory_record(
    relative_path: &str,
    own_files: &[&DiscoveredFile],
    total_files: usize,
    parent: Option<String>,
) -> DirectoryKnowledge {
    let depth = relative_path.matches('/').count() + 1;

    let has_readme = own_files.iter().any(|f| f.name.to_lowercase() == "readme.md");
    let has_index = own_files.iter().any(|f| {
        let stem = f.name.rsplit_once('.').map(|(s, _)| s).unwrap_or(&f.name);
        stem == "index" || stem == "main"
    });
    let has_tests = own_files.iter().any(|f| f.category == crate::types::Category::Test);

    DirectoryKnowledge {
        dir_id: dir_id(relative_path),
        relative_path: relative_path.to_string(),
        depth,
        file_count: own_files.len(),
        total_files,
        has_readme,
        has_index,
        has_tests,
        parent,
        confidence: TIER0_CONFIDENCE,
    }
}

/// Group discovered files by their parent directory, and return every
/// directory path that should get a record: every file's `directory` plus
/// every ancestor of that path up to (but not including) the workspace root.
pub fn directory_tree(files: &[DiscoveredFile]) -> HashMap<String, Vec<&DiscoveredFile>> {
    let mut by_dir: HashMap<String, Vec<&DiscoveredFile>> = HashMap::new();
    let mut all_dirs: HashSet<String> = HashSet::new();

    for file in files {
        by_dir.entry(file.directory.clone()).or_default().push(file);
        let mut current = file.directory.clone();
        loop {
            all_dirs.insert(current.clone());
            if current.is_empty() {
                break;
            }
            current = match current.rsplit_once('/') {
                Some((parent, _)) => parent.to_string(),
                None => String::new(),
            };
        }
    }

    for dir in all_dirs {
        by_dir.entry(dir).or_default();
    }

    by_dir
}

pub fn parent_of(relative_path: &str) -> Option<String> {
    if relative_path.is_empty() {
        return None;
    }
    match relative_path.rsplit_once('/') {
        Some((parent, _)) => Some(parent.to_string()),
        None => Some(String::new()),
    }
}

pub fn total_files_under(dir: &str, files: &[DiscoveredFile]) -> usize {
    files
        .iter()
        .filter(|f| {
            if dir.is_empty() {
                true
            } else {
                f.directory == dir || f.directory.starts_with(&format!("{dir}/"))
            }
        })
        .count()
}

/// Patch a Tier 0 file record in place with Tier 1 extraction results.
/// `imported_by` must be computed separately (it depends on the full graph)
/// and passed in.
pub fn patch_file_record(record: &mut FileKnowledge, extraction: &FileExtraction, line_count: usize, imported_by: Vec<String>) {
    let function_count = extraction.symbols.iter().filter(|s| s.kind == SymbolKind::Function).count();
    let class_count = extraction.symbols.iter().filter(|s| s.kind == SymbolKind::Class).count();

    let key_exports: Vec<String> = extraction
        .symbols
        .iter()
        .filter(|s| s.is_exported)
        .map(|s| s.name.clone())
        .take(MAX_KEY_EXPORTS)
        .collect();
    let export_count = extraction.symbols.iter().filter(|s| s.is_exported).count();

    let imports: Vec<String> = extraction.imports.iter().map(|e| e.target_file.clone()).collect();

    record.line_count = record.line_count.max(line_count);
    record.function_count = record.function_count.max(function_count);
    record.class_count = record.class_count.max(class_count);
    record.export_count = record.export_count.max(export_count);
    record.key_exports = key_exports;
    record.import_count = record.import_count.max(imports.len());
    record.imports = imports;
    record.imported_by = imported_by;
    record.confidence = TIER1_CONFIDENCE;
}

/// Patch a file record that wasn't itself scanned this tier (not an
/// extractable extension, too large, or dropped under deadline pressure) but
/// still advances to Tier 1 confidence and may have picked up inbound edges
/// from files that were scanned.
pub fn patch_minimal(record: &mut FileKnowledge, imported_by: Vec<String>) {
    record.imported_by = imported_by;
    record.confidence = TIER1_CONFIDENCE;
}
