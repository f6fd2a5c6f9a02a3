use crate::config::Config;
use crate::download::RequestedLength;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DownloadParams {
    pub app_config: Config,
    pub paths: Vec<String>,
    pub output_dir: PathBuf,
    pub offset: u64,
    pub length: RequestedLength,
    pub print_status: bool,
}

#[derive(Debug, Clone)]
pub struct ValidateParams {
    pub config_path: PathBuf,
    pub app_config: Config,
}
