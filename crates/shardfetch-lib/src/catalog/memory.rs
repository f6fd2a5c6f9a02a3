use super::{FileCatalog, FileEntry};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Catalog kept entirely in memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    files: RwLock<HashMap<String, Arc<FileEntry>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = FileEntry>) -> Self {
        let files = entries
            .into_iter()
            .map(|entry| (entry.path.clone(), Arc::new(entry)))
            .collect();
        Self {
            files: RwLock::new(files),
        }
    }

    /// Adds or replaces the entry for `entry.path`.
    pub async fn insert(&self, entry: FileEntry) {
        tracing::debug!(path = %entry.path, size = entry.size, "Registering file");
        self.files
            .write()
            .await
            .insert(entry.path.clone(), Arc::new(entry));
    }

    pub async fn remove(&self, path: &str) -> Option<Arc<FileEntry>> {
        self.files.write().await.remove(path)
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

impl FileCatalog for MemoryCatalog {
    async fn resolve(&self, path: &str) -> Option<Arc<FileEntry>> {
        self.files.read().await.get(path).cloned()
    }
}
