use crate::download::DownloadError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShardFetchError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation failed: {details}")]
    ConfigValidation { details: String },

    #[error("Invalid command-line arguments: {details}")]
    CliArgumentValidation { details: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download of {path} failed: {source}")]
    Download {
        path: String,
        #[source]
        source: DownloadError,
    },

    #[error("{failed} of {total} downloads failed")]
    DownloadsFailed { failed: usize, total: usize },

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(#[from] eyre::Report),
}
