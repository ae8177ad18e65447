//! The persistence contract the engine upserts through, plus an in-memory
//! reference implementation for tests and the CLI's default run.

use crate::error::BootstrapError;
use crate::types::{DirectoryKnowledge, FileKnowledge};
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::PathBuf;

/// Narrow storage contract — the only operations the engine needs.
/// Idempotent by design: re-running a tier on the same workspace must never
/// depend on a prior run having not happened.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn upsert_files(&self, records: Vec<FileKnowledge>) -> Result<(), BootstrapError>;
    async fn upsert_directories(&self, records: Vec<DirectoryKnowledge>) -> Result<(), BootstrapError>;
    async fn get_file_by_path(&self, absolute_path: &std::path::Path) -> Result<Option<FileKnowledge>, BootstrapError>;
}

/// Reference `Backend` keyed by `file_id`/`dir_id`, with a secondary index
/// from absolute path to `file_id` for `get_file_by_path`.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    files: DashMap<String, FileKnowledge>,
    directories: DashMap<String, DirectoryKnowledge>,
    path_index: DashMap<PathBuf, String>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    pub fn all_files(&self) -> Vec<FileKnowledge> {
        self.files.iter().map(|e| e.value().clone()).collect()
    }

    pub fn all_directories(&self) -> Vec<DirectoryKnowledge> {
        self.directories.iter().map(|e| e.value().clone()).collect()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn upsert_files(&self, records: Vec<FileKnowledge>) -> Result<(), BootstrapError> {
        for record in records {
            self.path_index.insert(record.absolute_path.clone(), record.file_id.clone());
            self.files.insert(record.file_id.clone(), record);
        }
        Ok(())
    }

    async fn upsert_directories(&self, records: Vec<DirectoryKnowledge>) -> Result<(), BootstrapError> {
        for record in records {
            self.directories.insert(record.dir_id.clone(), record);
        }
        Ok(())
    }

    async fn get_file_by_path(&self, absolute_path: &std::path::Path) -> Result<Option<FileKnowledge>, BootstrapError> {
        let Some(file_id) = self.path_index.get(absolute_path).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        Ok(self.files.get(&file_id).map(|e| e.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;

    fn sample(path: &str) -> FileKnowledge {
        FileKnowledge {
            file_id: crate::ids::file_id(path),
            absolute_path: format!("/workspace/{path}").into(),
            relative_path: path.to_string(),
            category: Category::Code,
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
            confidence: 0.3,
            last_indexed: chrono::Utc::now(),
            last_modified: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_then_get_by_path_round_trips() {
        let backend = InMemoryBackend::new();
        let record = sample("src/index.ts");
        let absolute_path = record.absolute_path.clone();
        backend.upsert_files(vec![record]).await.unwrap();

        let found = backend.get_file_by_path(&absolute_path).await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().relative_path, "src/index.ts");
    }

    #[tokio::test]
    async fn upsert_is_idempotent_by_file_id() {
        let backend = InMemoryBackend::new();
        let mut record = sample("src/index.ts");
        backend.upsert_files(vec![record.clone()]).await.unwrap();
        record.confidence = 0.5;
        backend.upsert_files(vec![record]).await.unwrap();

        assert_eq!(backend.file_count(), 1);
    }

    #[tokio::test]
    async fn unknown_path_returns_none() {
        let backend = InMemoryBackend::new();
        let found = backend.get_file_by_path(std::path::Path::new("/nope")).await.unwrap();
        assert!(found.is_none());
    }
}
