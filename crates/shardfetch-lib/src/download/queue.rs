use super::task::DownloadTask;
use super::types::{DownloadInfo, DownloadStatus};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Append-only record of every task admitted so far, oldest first.
///
/// The lock guards membership only. Task progress and outcome are read through the
/// tasks' own atomics, so a running transfer never holds this lock.
#[derive(Debug, Default)]
pub struct DownloadQueue {
    tasks: RwLock<Vec<Arc<DownloadTask>>>,
}

impl DownloadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, task: Arc<DownloadTask>) {
        self.tasks.write().await.push(task);
    }

    /// Status records for every task, most recent first.
    pub async fn snapshot(&self) -> Vec<DownloadInfo> {
        let tasks = self.tasks.read().await;
        tasks
            .iter()
            .rev()
            .map(|task| {
                let status = task.status();
                let error = match status {
                    DownloadStatus::Failed => task
                        .outcome()
                        .and_then(Result::err)
                        .map(|err| err.to_string()),
                    _ => None,
                };
                DownloadInfo {
                    path: task.path().to_string(),
                    destination: task.destination().to_string(),
                    filesize: task.length(),
                    offset: task.offset(),
                    start_time: task.start_time(),
                    received: task.received(),
                    status,
                    error,
                }
            })
            .collect()
    }
}
