use std::sync::Arc;
use thiserror::Error;

/// Failure reported by the fetch engine for a single download.
///
/// The queue never interprets these; they are handed back to the submitter as-is.
#[derive(Error, Debug, Clone)]
#[error(transparent)]
pub struct TransferError(Arc<dyn std::error::Error + Send + Sync + 'static>);

impl TransferError {
    pub fn new(error: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self(Arc::from(error.into()))
    }

    pub fn from_report(report: eyre::Report) -> Self {
        Self::new(format!("{report:#}"))
    }
}

#[derive(Error, Debug, Clone)]
pub enum DownloadError {
    #[error("no file with path {path}")]
    NotFound { path: String },

    #[error(
        "offset {offset} and length {length} are outside of file bounds (file size is {size} bytes)"
    )]
    Range { offset: u64, length: u64, size: u64 },

    #[error("download interrupted by shutdown")]
    Interrupted,

    #[error("fetch engine is not accepting downloads")]
    EngineUnavailable,

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("download task for {path} has already completed")]
    AlreadyCompleted { path: String },
}
