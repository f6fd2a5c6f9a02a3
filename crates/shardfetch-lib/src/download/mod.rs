mod error;
mod manager;
mod queue;
mod task;
mod types;

pub use error::{CompletionError, DownloadError, TransferError};
pub use manager::{DispatchReceiver, DownloadManager};
pub use queue::DownloadQueue;
pub use task::DownloadTask;
pub use types::{DownloadInfo, DownloadRequest, DownloadSink, DownloadStatus, RequestedLength};
