use crate::cli::params::ValidateParams;
use crate::error::ShardFetchError;

pub async fn run_validate(params: ValidateParams) -> Result<(), ShardFetchError> {
    let ValidateParams {
        config_path,
        app_config,
    } = params;

    let entries = app_config.file_entries()?;
    let contracts = app_config.contracts()?;
    let total_bytes: u64 = entries.iter().map(|entry| entry.size).sum();

    tracing::info!(
        hosts = app_config.hosts.len(),
        contracts = contracts.len(),
        files = entries.len(),
        total_bytes,
        "Configuration at {} is valid",
        config_path.display()
    );
    Ok(())
}
