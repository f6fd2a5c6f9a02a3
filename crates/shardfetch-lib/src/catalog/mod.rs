mod memory;
mod types;

pub use memory::MemoryCatalog;
pub use types::{ChunkLayout, FileEntry};

use std::future::Future;
use std::sync::Arc;

/// Maps logical file paths to their size and chunk layout.
pub trait FileCatalog: Send + Sync {
    fn resolve(&self, path: &str) -> impl Future<Output = Option<Arc<FileEntry>>> + Send;
}
