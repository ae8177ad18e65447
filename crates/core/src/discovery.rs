//! Tier 0 — glob the workspace under include/exclude patterns and stat each
//! hit in bounded, deadline-checked batches.
//!
//! The directory walk itself follows the host repo's `walk_files_parallel`
//! shape (an `ignore::WalkBuilder` with git-ignore handling turned off, since
//! inclusion here is governed entirely by the configured glob patterns, not
//! VCS state), with matching delegated to a compiled `globset::GlobSet`.

use crate::classify::categorize;
use crate::config::{skip_dir_names, BootstrapConfig};
use crate::types::DiscoveredFile;
use crate::AbortSignal;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Number of stat operations batched together between deadline/abort checks.
pub const DISCOVERY_BATCH_SIZE: usize = 100;

/// Walk `config.root_path`, stat matching files in batches, and return
/// whatever was collected before either the abort signal or `deadline` tripped.
///
/// `on_progress` is called with values in `[0.0, 0.8]`; the caller is
/// responsible for the `1.0` emitted after the storage upsert.
pub async fn discover(
    config: &BootstrapConfig,
    deadline: Instant,
    abort: &AbortSignal,
    mut on_progress: impl FnMut(f64),
) -> Vec<DiscoveredFile> {
    on_progress(0.0);

    let root = config.resolved_root();
    let include = compile_globset(&config.include_patterns);
    let exclude = compile_globset(&config.exclude_patterns);
    let skip_dirs: std::collections::HashSet<String> = skip_dir_names(&config.exclude_patterns).into_iter().collect();
    let max_size = config.max_file_size_bytes;

    let root_for_walk = root.clone();
    let candidates =
        tokio::task::spawn_blocking(move || list_candidates(&root_for_walk, &include, &exclude, &skip_dirs))
            .await
            .unwrap_or_default();

    on_progress(0.3);

    let total_batches = candidates.len().div_ceil(DISCOVERY_BATCH_SIZE).max(1);
    let mut discovered = Vec::with_capacity(candidates.len());

    for (batch_idx, batch) in candidates.chunks(DISCOVERY_BATCH_SIZE).enumerate() {
        if abort.is_aborted() || Instant::now() >= deadline {
            break;
        }

        let root_for_stat = root.clone();
        let batch: Vec<PathBuf> = batch.to_vec();
        let max_size_for_stat = max_size;
        let stated = tokio::task::spawn_blocking(move || {
            stat_batch(&root_for_stat, &batch, max_size_for_stat)
        })
        .await
        .unwrap_or_default();

        discovered.extend(stated);

        let fraction = 0.3 + 0.5 * ((batch_idx + 1) as f64 / total_batches as f64);
        on_progress(fraction.min(0.8));
    }

    discovered
}

fn compile_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().unwrap_or_else(|_| GlobSetBuilder::new().build().unwrap())
}

/// Enumerate all files under `root` whose workspace-relative path matches
/// `include` and does not match `exclude`. Returns absolute paths.
///
/// `skip_dirs` prunes whole directory subtrees by plain name during the walk
/// itself (belt-and-suspenders alongside the glob `exclude` match), the same
/// `filter_entry` shape as the host repo's `walk_files_parallel` — this keeps
/// a `node_modules` tree from being descended into at all rather than merely
/// filtered out file-by-file afterward.
fn list_candidates(root: &Path, include: &GlobSet, exclude: &GlobSet, skip_dirs: &std::collections::HashSet<String>) -> Vec<PathBuf> {
    if !root.exists() {
        return Vec::new();
    }

    let skip_dirs = skip_dirs.clone();
    let mut out = Vec::new();
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                let name = entry.file_name().to_string_lossy();
                return !skip_dirs.contains(name.as_ref());
            }
            true
        })
        .build();

    for entry in walker.flatten() {
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let abs_path = entry.path();
        let rel_path = match abs_path.strip_prefix(root) {
            Ok(r) => r.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };
        if exclude.is_match(&rel_path) {
            continue;
        }
        if !include.is_match(&rel_path) {
            continue;
        }
        out.push(abs_path.to_path_buf());
    }

    out
}

/// Stat a batch of candidate paths in parallel, dropping any that fail or
/// exceed `max_size`. Per-file errors are silent (no fatal).
fn stat_batch(root: &Path, batch: &[PathBuf], max_size: u64) -> Vec<DiscoveredFile> {
    batch
        .par_iter()
        .filter_map(|abs_path| stat_one(root, abs_path, max_size))
        .collect()
}

fn stat_one(root: &Path, abs_path: &Path, max_size: u64) -> Option<DiscoveredFile> {
    let metadata = std::fs::metadata(abs_path).ok()?;
    if !metadata.is_file() {
        return None;
    }

    let rel_path = abs_path.strip_prefix(root).ok()?.to_string_lossy().replace('\\', "/");
    let name = abs_path.file_name()?.to_string_lossy().to_string();
    let extension = abs_path.extension().map(|e| e.to_string_lossy().to_string()).unwrap_or_default();
    let directory = rel_path.rsplit_once('/').map(|(d, _)| d.to_string()).unwrap_or_default();
    let size_bytes = metadata.len();
    let category = categorize(&rel_path);
    let modified = metadata
        .modified()
        .ok()
        .map(chrono::DateTime::<chrono::Utc>::from)
        .unwrap_or_else(chrono::Utc::now);

    // Oversized files are still discovered (they appear in listings and
    // storage) — they simply never reach the extractor.
    let _ = max_size;

    Some(DiscoveredFile {
        absolute_path: abs_path.to_path_buf(),
        relative_path: rel_path,
        name,
        extension,
        directory,
        size_bytes,
        category,
        modified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn discovers_all_files_by_default() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.ts", "export {}");
        write(dir.path(), "README.md", "hello");

        let config = BootstrapConfig::new(dir.path());
        let abort = AbortSignal::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        let files = discover(&config, deadline, &abort, |_| {}).await;

        let mut names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["README.md", "index.ts"]);
    }

    #[tokio::test]
    async fn respects_include_patterns() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.ts", "export {}");
        write(dir.path(), "README.md", "hello");

        let config = BootstrapConfig::new(dir.path()).with_include_patterns(vec!["**/*.ts".to_string()]);
        let abort = AbortSignal::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        let files = discover(&config, deadline, &abort, |_| {}).await;

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "index.ts");
    }

    #[tokio::test]
    async fn respects_exclude_patterns() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/__tests__/index.test.ts", "export {}");
        write(dir.path(), "src/index.ts", "export {}");

        let config = BootstrapConfig::new(dir.path())
            .with_exclude_patterns(vec!["**/__tests__/**".to_string()]);
        let abort = AbortSignal::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        let files = discover(&config, deadline, &abort, |_| {}).await;

        assert!(files.iter().all(|f| !f.relative_path.contains("__tests__")));
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn nonexistent_root_discovers_nothing() {
        let config = BootstrapConfig::new("/path/that/does/not/exist/at/all");
        let abort = AbortSignal::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        let files = discover(&config, deadline, &abort, |_| {}).await;
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn oversized_files_are_still_discovered() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "big.ts", &"x".repeat(200));

        let config = BootstrapConfig::new(dir.path()).with_max_file_size_bytes(10);
        let abort = AbortSignal::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        let files = discover(&config, deadline, &abort, |_| {}).await;

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size_bytes, 200);
    }
}
