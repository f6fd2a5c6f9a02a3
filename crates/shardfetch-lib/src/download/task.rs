use super::error::{CompletionError, TransferError};
use super::types::{DownloadSink, DownloadStatus};
use crate::catalog::FileEntry;
use crate::contracts::ContractSnapshot;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::SystemTime;
use tokio::sync::{Mutex, watch};

/// One file or section retrieval.
///
/// Identity fields are fixed at construction. The fetch engine drives the mutable part:
/// it claims the sink with [`DownloadTask::take_sink`], reports bytes with
/// [`DownloadTask::record_progress`] and finishes with a single
/// [`DownloadTask::complete`] call.
pub struct DownloadTask {
    file: Arc<FileEntry>,
    destination: String,
    offset: u64,
    length: u64,
    start_time: SystemTime,
    contracts: ContractSnapshot,
    sink: Mutex<Option<DownloadSink>>,
    /// Bytes written to the sink so far. Only ever increased, so any two loads observe
    /// non-decreasing values.
    received: AtomicU64,
    outcome: OnceLock<Result<(), TransferError>>,
    done: watch::Sender<bool>,
}

impl DownloadTask {
    pub fn new(
        file: Arc<FileEntry>,
        destination: impl Into<String>,
        sink: DownloadSink,
        contracts: ContractSnapshot,
        offset: u64,
        length: u64,
    ) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            file,
            destination: destination.into(),
            offset,
            length,
            start_time: SystemTime::now(),
            contracts,
            sink: Mutex::new(Some(sink)),
            received: AtomicU64::new(0),
            outcome: OnceLock::new(),
            done,
        }
    }

    pub fn path(&self) -> &str {
        &self.file.path
    }

    pub fn file(&self) -> &FileEntry {
        &self.file
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    /// Host contracts that were valid when the task was admitted.
    pub fn contracts(&self) -> &ContractSnapshot {
        &self.contracts
    }

    /// Hands the destination sink to the caller. Returns `None` once it has been taken.
    pub async fn take_sink(&self) -> Option<DownloadSink> {
        self.sink.lock().await.take()
    }

    pub fn record_progress(&self, bytes: u64) {
        self.received.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Publishes the terminal outcome and wakes every waiter.
    ///
    /// Only the first call has any effect; later calls return
    /// [`CompletionError::AlreadyCompleted`] and leave the stored outcome untouched.
    pub fn complete(&self, result: Result<(), TransferError>) -> Result<(), CompletionError> {
        self.outcome
            .set(result)
            .map_err(|_| CompletionError::AlreadyCompleted {
                path: self.path().to_string(),
            })?;
        self.done.send_replace(true);
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// Terminal outcome of the task. `None` until [`DownloadTask::complete`] has been
    /// called, then the stored result on every call.
    pub fn outcome(&self) -> Option<Result<(), TransferError>> {
        self.outcome.get().cloned()
    }

    /// Suspends until [`DownloadTask::complete`] has been called and returns its outcome.
    pub async fn wait(&self) -> Result<(), TransferError> {
        let mut done = self.done.subscribe();
        if done.wait_for(|fired| *fired).await.is_err() {
            return Err(TransferError::new("completion signal closed"));
        }
        self.outcome()
            .unwrap_or_else(|| Err(TransferError::new("completion signal fired without an outcome")))
    }

    pub fn status(&self) -> DownloadStatus {
        match self.outcome.get() {
            Some(Ok(())) => DownloadStatus::Succeeded,
            Some(Err(_)) => DownloadStatus::Failed,
            None if self.received() > 0 => DownloadStatus::Running,
            None => DownloadStatus::Pending,
        }
    }
}

impl fmt::Debug for DownloadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadTask")
            .field("path", &self.file.path)
            .field("destination", &self.destination)
            .field("offset", &self.offset)
            .field("length", &self.length)
            .field("received", &self.received())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
