use crate::cli::args::Command;
use crate::cli::params::{DownloadParams, ValidateParams};
use crate::config::load_config;
use crate::download::RequestedLength;
use crate::error::ShardFetchError;
use itertools::Itertools;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub enum ResolvedCommand {
    Download(DownloadParams),
    Validate(ValidateParams),
}

pub fn resolve_command(command: Command) -> Result<ResolvedCommand, ShardFetchError> {
    match command {
        Command::Download {
            config_path,
            paths,
            output_dir,
            offset,
            length,
            print_status,
        } => {
            let paths: Vec<String> = paths
                .into_iter()
                .map(|path| path.trim().to_string())
                .filter(|path| !path.is_empty())
                .unique()
                .collect();
            if paths.is_empty() {
                return Err(ShardFetchError::CliArgumentValidation {
                    details: "No paths provided. Pass at least one --path.".to_string(),
                });
            }

            output_paths(&paths)?;

            let length = match length {
                Some(length) => RequestedLength::Bounded(length),
                None => RequestedLength::RestOfFile,
            };

            let app_config = load_config(&config_path)?;

            Ok(ResolvedCommand::Download(DownloadParams {
                app_config,
                paths,
                output_dir: PathBuf::from(output_dir),
                offset,
                length,
                print_status,
            }))
        }
        Command::Validate { config_path } => {
            let app_config = load_config(&config_path)?;

            Ok(ResolvedCommand::Validate(ValidateParams {
                config_path: PathBuf::from(config_path),
                app_config,
            }))
        }
    }
}

/// Location of the output file for catalog `path`, relative to the output directory.
///
/// Leading slashes are dropped. Any component other than a plain name (`..`, `.` at the
/// start, drive prefixes) is rejected so outputs never leave the output directory.
pub fn relative_output_path(path: &str) -> Result<PathBuf, ShardFetchError> {
    let invalid = || ShardFetchError::CliArgumentValidation {
        details: format!("Path {path} cannot be used as an output file name"),
    };

    let mut output = PathBuf::new();
    for component in Path::new(path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(name) => output.push(name),
            _ => return Err(invalid()),
        }
    }
    if output.as_os_str().is_empty() {
        return Err(invalid());
    }
    Ok(output)
}

/// Relative output paths for `paths`, in order. Fails if two paths would write the same
/// file.
pub fn output_paths(paths: &[String]) -> Result<Vec<PathBuf>, ShardFetchError> {
    let outputs = paths
        .iter()
        .map(|path| relative_output_path(path))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(duplicate) = outputs.iter().duplicates().next() {
        return Err(ShardFetchError::CliArgumentValidation {
            details: format!(
                "Several paths would be written to {}",
                duplicate.display()
            ),
        });
    }
    Ok(outputs)
}
