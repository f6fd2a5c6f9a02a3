pub mod catalog;
pub mod cli;
pub mod config;
pub mod contracts;
pub mod download;
pub mod error;
pub mod fetch;
pub mod shutdown;
pub mod utils;
pub mod verification;

pub use crate::config::Config;
pub use download::{DownloadError, DownloadManager, DownloadRequest};
pub use error::ShardFetchError;
