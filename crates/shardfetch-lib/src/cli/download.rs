use crate::catalog::MemoryCatalog;
use crate::cli::params::DownloadParams;
use crate::cli::resolved_command::output_paths;
use crate::contracts::StaticContractManager;
use crate::download::{DownloadError, DownloadInfo, DownloadManager, DownloadRequest};
use crate::error::ShardFetchError;
use crate::fetch::FetchEngine;
use crate::shutdown::{ShutdownSignal, shutdown_channel};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::io::BufWriter;

/// Outcome of a batch of downloads.
#[derive(Debug)]
pub struct DownloadReport {
    /// Queue listing taken after every submit returned, newest first.
    pub downloads: Vec<DownloadInfo>,
    pub failures: Vec<(String, DownloadError)>,
}

pub async fn run_download(params: DownloadParams) -> Result<(), ShardFetchError> {
    let endpoints = params.app_config.endpoints()?;
    let engine = FetchEngine::from_endpoints(
        endpoints
            .iter()
            .map(|(address, endpoint)| (address, endpoint.as_str())),
        params.app_config.engine,
    )?;

    let (trigger, signal) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.trigger();
        }
    });

    let print_status = params.print_status;
    let total = params.paths.len();
    let report = download_all(params, engine, signal).await?;

    if print_status {
        println!("{}", serde_json::to_string_pretty(&report.downloads)?);
    }

    let mut failures = report.failures;
    match failures.len() {
        0 => {
            tracing::info!("Download completed successfully");
            Ok(())
        }
        1 => {
            let (path, source) = failures.remove(0);
            Err(ShardFetchError::Download { path, source })
        }
        failed => Err(ShardFetchError::DownloadsFailed { failed, total }),
    }
}

/// Submits every requested path to a fresh queue served by `engine` and waits for all of
/// them. Output files are created only for requests the catalog accepts, and removed again
/// if the download fails.
pub async fn download_all(
    params: DownloadParams,
    engine: FetchEngine,
    shutdown: ShutdownSignal,
) -> Result<DownloadReport, ShardFetchError> {
    let DownloadParams {
        app_config,
        paths,
        output_dir,
        offset,
        length,
        ..
    } = params;
    let outputs = output_paths(&paths)?;

    let catalog = Arc::new(MemoryCatalog::from_entries(app_config.file_entries()?));
    let contracts = Arc::new(StaticContractManager::new(app_config.contracts()?));
    let (manager, receiver) = DownloadManager::new(catalog, contracts, shutdown.clone());
    let engine = tokio::spawn(engine.run(receiver, shutdown));

    tracing::info!("Downloading {} files...", paths.len());
    let mut futs = FuturesUnordered::new();
    for (path, relative) in paths.into_iter().zip(outputs) {
        let output_path = output_dir.join(relative);
        let manager = &manager;
        futs.push(async move {
            // Rejected requests never touch the output directory.
            if let Err(err) = manager.resolve_section(&path, offset, length).await {
                return Ok::<_, ShardFetchError>((path, Err(err)));
            }

            if let Some(parent) = output_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let file = tokio::fs::File::create(&output_path).await?;
            let request = DownloadRequest {
                path: path.clone(),
                destination: output_path.display().to_string(),
                sink: Box::new(BufWriter::new(file)),
                offset,
                length,
            };

            let result = manager.submit(request).await;
            if result.is_err() {
                if let Err(err) = tokio::fs::remove_file(&output_path).await {
                    tracing::warn!(output = %output_path.display(), "Failed to remove partial download: {}", err);
                }
            }
            Ok((path, result))
        });
    }

    tracing::info!("Waiting for downloads to finish...");
    let mut failures = Vec::new();
    while let Some(outcome) = futs.next().await {
        let (path, result) = outcome?;
        if let Err(err) = result {
            tracing::warn!(path = %path, "Download failed: {}", err);
            failures.push((path, err));
        }
    }
    drop(futs);

    let downloads = manager.list().await;
    drop(manager);
    if let Err(err) = engine.await {
        tracing::warn!("Fetch engine terminated abnormally: {}", err);
    }

    Ok(DownloadReport {
        downloads,
        failures,
    })
}
