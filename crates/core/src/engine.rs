//! Tier Runner — sequences Tier 0 → Tier 1 → Tier 2 over a [`Backend`],
//! exposing the waiter/status/feature-flag surface consumers poll or await.

use crate::abort::AbortSignal;
use crate::backend::Backend;
use crate::config::BootstrapConfig;
use crate::discovery;
use crate::error::BootstrapError;
use crate::extract;
use crate::records;
use crate::types::{BootstrapStatus, DiscoveredFile, Feature, FileKnowledge, ImportEdge, Symbol, Tier, TierStats};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tracing::Instrument;

const EXTRACTION_BATCH_SIZE: usize = 20;

struct InnerStatus {
    current_tier: Tier,
    is_complete: bool,
    tier_stats: BTreeMap<String, TierStats>,
    enabled_features: Vec<Feature>,
    in_progress: bool,
    error: Option<String>,
}

/// Owns a single bootstrap run. Cheap to hold in an `Arc` — `start` is
/// re-entrancy-guarded, and every read method takes `&self`.
pub struct BootstrapEngine {
    config: BootstrapConfig,
    backend: Arc<dyn Backend>,
    abort_signal: AbortSignal,
    running: AtomicBool,
    tier_tx: watch::Sender<Tier>,
    tier_rx: watch::Receiver<Tier>,
    status: RwLock<InnerStatus>,
    discovered_files: RwLock<Vec<DiscoveredFile>>,
    symbols: RwLock<Vec<Symbol>>,
    import_edges: RwLock<Vec<ImportEdge>>,
}

impl BootstrapEngine {
    pub fn new(config: BootstrapConfig, backend: Arc<dyn Backend>) -> Self {
        let abort_signal = config.abort_signal.clone().unwrap_or_default();
        let (tier_tx, tier_rx) = watch::channel(Tier::None);
        Self {
            config,
            backend,
            abort_signal,
            running: AtomicBool::new(false),
            tier_tx,
            tier_rx,
            status: RwLock::new(InnerStatus {
                current_tier: Tier::None,
                is_complete: false,
                tier_stats: BTreeMap::new(),
                enabled_features: Vec::new(),
                in_progress: false,
                error: None,
            }),
            discovered_files: RwLock::new(Vec::new()),
            symbols: RwLock::new(Vec::new()),
            import_edges: RwLock::new(Vec::new()),
        }
    }

    /// Idempotent: flips the shared cancel flag, whether internal or caller-supplied.
    pub fn abort(&self) {
        self.abort_signal.abort();
    }

    /// Resolves immediately for `Tier::None` or any tier already reached.
    pub async fn wait_for_tier(&self, tier: Tier) {
        let mut rx = self.tier_rx.clone();
        let _ = rx.wait_for(|current| *current >= tier).await;
    }

    pub async fn get_status(&self) -> BootstrapStatus {
        let status = self.status.read().await;
        BootstrapStatus {
            current_tier: status.current_tier,
            is_complete: status.is_complete,
            tier_stats: status.tier_stats.clone(),
            enabled_features: status.enabled_features.clone(),
            in_progress: status.in_progress,
            error: status.error.clone(),
        }
    }

    pub async fn is_feature_enabled(&self, feature: Feature) -> bool {
        self.status.read().await.enabled_features.contains(&feature)
    }

    pub async fn get_discovered_files(&self) -> Vec<DiscoveredFile> {
        self.discovered_files.read().await.clone()
    }

    pub async fn get_extracted_symbols(&self) -> Vec<Symbol> {
        self.symbols.read().await.clone()
    }

    pub async fn get_import_edges(&self) -> Vec<ImportEdge> {
        self.import_edges.read().await.clone()
    }

    /// Runs Tier 0, Tier 1, Tier 2 serially. Fails immediately with
    /// [`BootstrapError::Reentrant`] if a run is already in progress on this
    /// instance.
    pub async fn start(&self) -> Result<(), BootstrapError> {
        if self.running.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return Err(BootstrapError::Reentrant);
        }

        let result = self.run().await;

        if let Err(err) = &result {
            let mut status = self.status.write().await;
            status.error = Some(err.to_string());
            status.in_progress = false;
        }
        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn run(&self) -> Result<(), BootstrapError> {
        self.config.validate()?;
        {
            let mut status = self.status.write().await;
            status.in_progress = true;
            status.error = None;
        }

        self.run_tier0().instrument(tracing::info_span!("tier0")).await?;
        if self.abort_signal.is_aborted() {
            tracing::warn!("bootstrap aborted after tier0");
            return self.finish(false).await;
        }

        self.run_tier1().instrument(tracing::info_span!("tier1")).await?;
        if self.abort_signal.is_aborted() {
            tracing::warn!("bootstrap aborted after tier1");
            return self.finish(false).await;
        }

        self.run_tier2().instrument(tracing::info_span!("tier2")).await?;
        self.finish(true).await
    }

    async fn finish(&self, _completed_fully: bool) -> Result<(), BootstrapError> {
        let mut status = self.status.write().await;
        status.in_progress = false;
        Ok(())
    }

    async fn run_tier0(&self) -> Result<(), BootstrapError> {
        let start = Instant::now();
        let deadline = start + Duration::from_millis(self.config.tier0_deadline_ms);
        tracing::info!("discovery starting");

        let progress_cb = self.config.on_progress.clone();
        let files = discovery::discover(&self.config, deadline, &self.abort_signal, |fraction| {
            if let Some(cb) = &progress_cb {
                cb(Tier::Immediate, fraction);
            }
        })
        .await;

        tracing::info!(count = files.len(), "discovery finished");

        let now = chrono::Utc::now();
        let file_records: Vec<FileKnowledge> = files.iter().map(|f| records::initial_file_record(f, now)).collect();

        let directory_groups = records::directory_tree(&files);
        let mut directory_records = Vec::with_capacity(directory_groups.len());
        for (dir, own_files) in &directory_groups {
            let total = records::total_files_under(dir, &files);
            let parent = records::parent_of(dir);
            directory_records.push(records::initial_directory_record(dir, own_files, total, parent));
        }
        let directories_indexed = directory_records.len();

        self.backend.upsert_files(file_records).await?;
        self.backend.upsert_directories(directory_records).await?;

        if let Some(cb) = &self.config.on_progress {
            cb(Tier::Immediate, 1.0);
        }

        *self.discovered_files.write().await = files.clone();

        let mut metrics = BTreeMap::new();
        metrics.insert("files_discovered".to_string(), files.len() as f64);
        metrics.insert("directories_discovered".to_string(), directories_indexed as f64);

        self.complete_tier(Tier::Immediate, files.len(), start.elapsed(), metrics).await;
        Ok(())
    }

    async fn run_tier1(&self) -> Result<(), BootstrapError> {
        let start = Instant::now();
        let deadline = start + Duration::from_millis(self.config.tier1_deadline_ms);

        let files = self.discovered_files.read().await.clone();
        let known_relative_paths: Arc<HashSet<String>> = Arc::new(files.iter().map(|f| f.relative_path.clone()).collect());
        let entry_points = extract::read_entry_points(&self.config.resolved_root(), &known_relative_paths);
        let max_size = self.config.max_file_size_bytes;

        let prioritized: Vec<DiscoveredFile> = extract::prioritize(&files, &entry_points)
            .into_iter()
            .filter(|f| f.size_bytes <= max_size)
            .cloned()
            .collect();

        tracing::info!(eligible = prioritized.len(), "extraction starting");

        if let Some(cb) = &self.config.on_progress {
            cb(Tier::Fast, 0.0);
        }

        let mut per_file: HashMap<String, (extract::FileExtraction, usize)> = HashMap::new();
        let total_batches = prioritized.len().div_ceil(EXTRACTION_BATCH_SIZE).max(1);

        for (batch_idx, batch) in prioritized.chunks(EXTRACTION_BATCH_SIZE).enumerate() {
            if self.abort_signal.is_aborted() || Instant::now() >= deadline {
                tracing::warn!(batch = batch_idx, "tier1 stopping early");
                break;
            }

            let batch_owned: Vec<DiscoveredFile> = batch.to_vec();
            let known = known_relative_paths.clone();
            let scanned = tokio::task::spawn_blocking(move || scan_batch(&batch_owned, &known)).await.unwrap_or_default();

            for (relative_path, extraction, line_count) in scanned {
                per_file.insert(relative_path, (extraction, line_count));
            }

            if let Some(cb) = &self.config.on_progress {
                let fraction = 0.9 * ((batch_idx + 1) as f64 / total_batches as f64);
                cb(Tier::Fast, fraction.min(0.9));
            }
        }

        let forward_imports: HashMap<String, Vec<String>> = per_file
            .iter()
            .map(|(source, (extraction, _))| {
                (source.clone(), extraction.imports.iter().map(|e| e.target_file.clone()).collect())
            })
            .collect();
        let inverted = extract::invert_imports(&forward_imports);

        let mut updated_records = Vec::with_capacity(files.len());
        let mut all_symbols = Vec::new();
        let mut all_imports = Vec::new();

        for file in &files {
            let existing = self.backend.get_file_by_path(&file.absolute_path).await?;
            let mut record = existing.unwrap_or_else(|| records::initial_file_record(file, chrono::Utc::now()));
            let imported_by = inverted.get(&file.relative_path).cloned().unwrap_or_default();

            if let Some((extraction, line_count)) = per_file.get(&file.relative_path) {
                records::patch_file_record(&mut record, extraction, *line_count, imported_by);
                all_symbols.extend(extraction.symbols.clone());
                all_imports.extend(extraction.imports.clone());
            } else {
                records::patch_minimal(&mut record, imported_by);
            }

            updated_records.push(record);
        }

        self.backend.upsert_files(updated_records).await?;

        if let Some(cb) = &self.config.on_progress {
            cb(Tier::Fast, 1.0);
        }

        *self.symbols.write().await = all_symbols.clone();
        *self.import_edges.write().await = all_imports.clone();

        tracing::info!(files_extracted = per_file.len(), symbols = all_symbols.len(), imports = all_imports.len(), "extraction finished");

        let mut metrics = BTreeMap::new();
        metrics.insert("files_extracted".to_string(), per_file.len() as f64);
        metrics.insert("symbols_found".to_string(), all_symbols.len() as f64);
        metrics.insert("import_edges".to_string(), all_imports.len() as f64);

        self.complete_tier(Tier::Fast, per_file.len(), start.elapsed(), metrics).await;
        Ok(())
    }

    async fn run_tier2(&self) -> Result<(), BootstrapError> {
        let start = Instant::now();
        let files = self.discovered_files.read().await.clone();
        let directories = records::directory_tree(&files).len();

        if let Some(cb) = &self.config.on_progress {
            cb(Tier::Full, 0.0);
            cb(Tier::Full, 1.0);
        }

        let mut metrics = BTreeMap::new();
        metrics.insert("total_files".to_string(), files.len() as f64);
        metrics.insert("total_directories".to_string(), directories as f64);

        self.complete_tier(Tier::Full, files.len(), start.elapsed(), metrics).await;
        tracing::info!("bootstrap complete");
        Ok(())
    }

    async fn complete_tier(&self, tier: Tier, files_processed: usize, duration: Duration, metrics: BTreeMap<String, f64>) {
        let stats = TierStats {
            tier,
            files_processed,
            duration_ms: duration.as_millis() as u64,
            enabled_features: tier.own_features().to_vec(),
            metrics,
        };

        {
            let mut status = self.status.write().await;
            status.current_tier = tier;
            for feature in tier.own_features() {
                if !status.enabled_features.contains(feature) {
                    status.enabled_features.push(*feature);
                }
            }
            status.tier_stats.insert(tier.label().to_string(), stats.clone());
            if tier == Tier::Full {
                status.is_complete = true;
            }
        }

        let _ = self.tier_tx.send(tier);

        if let Some(cb) = &self.config.on_tier_complete {
            cb(tier, &stats);
        }
    }
}

/// Read and scan a batch of files on a blocking thread pool, parallelized
/// with `rayon`. Per-file read/decode failures are dropped silently.
fn scan_batch(batch: &[DiscoveredFile], known_relative_paths: &HashSet<String>) -> Vec<(String, extract::FileExtraction, usize)> {
    use rayon::prelude::*;

    batch
        .par_iter()
        .filter_map(|file| {
            let bytes = std::fs::read(&file.absolute_path).ok()?;
            let text = String::from_utf8_lossy(&bytes).into_owned();
            let line_count = text.lines().count();
            let extraction = extract::extract_from_text(&file.relative_path, &file.absolute_path, &text, known_relative_paths);
            Some((file.relative_path.clone(), extraction, line_count))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::config::BootstrapConfig;

    fn write(dir: &std::path::Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn runs_all_three_tiers_and_reaches_full() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.ts", "export function main() {}\n");
        write(dir.path(), "src/util.ts", "export const helper = 1;\n");
        write(dir.path(), "README.md", "docs");

        let config = BootstrapConfig::new(dir.path());
        let backend = Arc::new(InMemoryBackend::new());
        let engine = BootstrapEngine::new(config, backend.clone());

        engine.start().await.unwrap();

        let status = engine.get_status().await;
        assert_eq!(status.current_tier, Tier::Full);
        assert!(status.is_complete);
        assert!(!status.in_progress);
        assert!(engine.is_feature_enabled(Feature::FileSearch).await);
        assert!(engine.is_feature_enabled(Feature::SymbolSearch).await);
        assert!(engine.is_feature_enabled(Feature::FullAnalysis).await);

        assert_eq!(backend.file_count(), 3);
    }

    #[tokio::test]
    async fn symbol_search_reflects_extracted_imports() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.ts", "import { helper } from \"./util\";\nexport function main() { helper(); }\n");
        write(dir.path(), "src/util.ts", "export const helper = 1;\n");

        let config = BootstrapConfig::new(dir.path());
        let backend = Arc::new(InMemoryBackend::new());
        let engine = BootstrapEngine::new(config, backend.clone());
        engine.start().await.unwrap();

        let edges = engine.get_import_edges().await;
        assert!(edges.iter().any(|e| e.source_file == "src/index.ts" && e.target_file == "src/util.ts"));

        let util_record = backend.all_files().into_iter().find(|f| f.relative_path == "src/util.ts").unwrap();
        assert!(util_record.imported_by.contains(&"src/index.ts".to_string()));
        assert_eq!(util_record.confidence, 0.5);
    }

    #[tokio::test]
    async fn reentrant_start_fails() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.ts", "export const a = 1;\n");
        let config = BootstrapConfig::new(dir.path());
        let backend = Arc::new(InMemoryBackend::new());
        let engine = Arc::new(BootstrapEngine::new(config, backend));

        let e1 = engine.clone();
        let e2 = engine.clone();
        let (r1, r2) = tokio::join!(e1.start(), e2.start());
        let results = [r1, r2];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| matches!(r, Err(BootstrapError::Reentrant))));
    }

    #[tokio::test]
    async fn wait_for_tier_resolves_after_completion() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.ts", "export const a = 1;\n");
        let config = BootstrapConfig::new(dir.path());
        let backend = Arc::new(InMemoryBackend::new());
        let engine = Arc::new(BootstrapEngine::new(config, backend));

        let waiter_engine = engine.clone();
        let waiter = tokio::spawn(async move {
            waiter_engine.wait_for_tier(Tier::Full).await;
        });
        engine.start().await.unwrap();
        waiter.await.unwrap();

        assert_eq!(engine.get_status().await.current_tier, Tier::Full);
    }

    #[tokio::test]
    async fn abort_before_start_stops_after_tier0() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.ts", "export const a = 1;\n");
        let config = BootstrapConfig::new(dir.path());
        let backend = Arc::new(InMemoryBackend::new());
        let abort_signal = AbortSignal::new();
        abort_signal.abort();
        let config = config.with_abort_signal(abort_signal);
        let engine = BootstrapEngine::new(config, backend);

        engine.start().await.unwrap();

        let status = engine.get_status().await;
        assert_eq!(status.current_tier, Tier::Immediate);
        assert!(!status.is_complete);
    }

    #[tokio::test]
    async fn progress_callback_is_monotonic_within_tier0() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..250 {
            write(dir.path(), &format!("src/file{i}.ts"), "export const x = 1;\n");
        }

        let seen = Arc::new(std::sync::Mutex::new(Vec::<f64>::new()));
        let seen_clone = seen.clone();
        let config = BootstrapConfig::new(dir.path()).with_on_progress(Arc::new(move |tier, fraction| {
            if tier == Tier::Immediate {
                seen_clone.lock().unwrap().push(fraction);
            }
        }));
        let backend = Arc::new(InMemoryBackend::new());
        let engine = BootstrapEngine::new(config, backend);
        engine.start().await.unwrap();

        let values = seen.lock().unwrap().clone();
        assert_eq!(*values.first().unwrap(), 0.0);
        assert_eq!(*values.last().unwrap(), 1.0);
        for window in values.windows(2) {
            assert!(window[1] >= window[0]);
        }
    }
}
