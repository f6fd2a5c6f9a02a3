use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;
use tokio::io::AsyncWrite;

/// Where downloaded bytes are written.
pub type DownloadSink = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestedLength {
    /// Everything from the requested offset up to the end of the file.
    RestOfFile,
    Bounded(u64),
}

pub struct DownloadRequest {
    pub path: String,
    /// Human-readable description of the sink, reported by listings.
    pub destination: String,
    pub sink: DownloadSink,
    pub offset: u64,
    pub length: RequestedLength,
}

impl DownloadRequest {
    pub fn whole_file(
        path: impl Into<String>,
        destination: impl Into<String>,
        sink: DownloadSink,
    ) -> Self {
        Self {
            path: path.into(),
            destination: destination.into(),
            sink,
            offset: 0,
            length: RequestedLength::RestOfFile,
        }
    }

    pub fn section(
        path: impl Into<String>,
        destination: impl Into<String>,
        sink: DownloadSink,
        offset: u64,
        length: u64,
    ) -> Self {
        Self {
            path: path.into(),
            destination: destination.into(),
            sink,
            offset,
            length: RequestedLength::Bounded(length),
        }
    }
}

impl fmt::Debug for DownloadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadRequest")
            .field("path", &self.path)
            .field("destination", &self.destination)
            .field("offset", &self.offset)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// Point-in-time status of one queued download.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadInfo {
    pub path: String,
    pub destination: String,
    /// Number of bytes requested.
    pub filesize: u64,
    pub offset: u64,
    pub start_time: SystemTime,
    pub received: u64,
    pub status: DownloadStatus,
    /// Failure reason, present only once the download has failed.
    pub error: Option<String>,
}
