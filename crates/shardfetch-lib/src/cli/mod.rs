mod args;
mod download;
mod params;
mod resolved_command;
mod validate;

pub use args::{Args, Command, parse_args};
pub use download::{DownloadReport, download_all, run_download};
pub use params::{DownloadParams, ValidateParams};
pub use resolved_command::{ResolvedCommand, resolve_command};
pub use validate::run_validate;
