use super::types::FetchOptions;
use crate::catalog::ChunkLayout;
use crate::contracts::{ContractSnapshot, NetAddress};
use crate::download::{DispatchReceiver, DownloadTask, TransferError};
use crate::shutdown::ShutdownSignal;
use crate::utils::chunk_overlap;
use crate::verification::chunk_digest::ChunkDigestVerifier;
use eyre::{Result, WrapErr, eyre};
use futures::stream::{FuturesUnordered, StreamExt};
use itertools::Itertools;
use opendal::Operator;
use opendal::layers::{ConcurrentLimitLayer, RetryLayer};
use opendal::services::Http;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;

pub fn build_http_operator(
    endpoint: &str,
    max_in_flight: usize,
    max_retries: usize,
) -> Result<Operator> {
    // Chunk objects are fetched relative to the host's endpoint.
    let builder = Http::default().endpoint(endpoint);

    let op = Operator::new(builder)?
        .layer(RetryLayer::new().with_max_times(max_retries))
        .layer(ConcurrentLimitLayer::new(max_in_flight))
        .finish();
    Ok(op)
}

/// Reference fetch engine: pulls whole chunks from contracted hosts and writes the
/// requested part of each one into the task's sink.
pub struct FetchEngine {
    hosts: HashMap<NetAddress, Operator>,
    options: FetchOptions,
}

impl FetchEngine {
    pub fn new(hosts: HashMap<NetAddress, Operator>, options: FetchOptions) -> Self {
        Self { hosts, options }
    }

    /// Builds one HTTP operator per `(address, endpoint)` pair.
    pub fn from_endpoints<'a>(
        endpoints: impl IntoIterator<Item = (&'a NetAddress, &'a str)>,
        options: FetchOptions,
    ) -> Result<Self> {
        let mut hosts = HashMap::new();
        tracing::info!("Creating operators...");
        for (address, endpoint) in endpoints {
            let op = build_http_operator(
                endpoint,
                options.max_concurrency_per_host,
                options.max_retries,
            )
            .wrap_err_with(|| format!("Failed to create operator for host {}", address))?;
            hosts.insert(address.clone(), op);
        }
        Ok(Self::new(hosts, options))
    }

    /// Processes dispatched tasks until the manager goes away or shutdown is signalled.
    ///
    /// Transfers already in progress are allowed to finish; tasks still waiting in the
    /// channel at shutdown are left pending.
    pub async fn run(self, mut receiver: DispatchReceiver, shutdown: ShutdownSignal) {
        let hosts = Arc::new(self.hosts);
        let semaphore = Arc::new(Semaphore::new(self.options.workers.max(1)));
        let mut in_flight = FuturesUnordered::new();

        loop {
            tokio::select! {
                task = receiver.recv() => {
                    let Some(task) = task else {
                        tracing::debug!("Dispatch channel closed");
                        break;
                    };
                    in_flight.push(run_task(hosts.clone(), semaphore.clone(), task));
                }
                Some(()) = in_flight.next(), if !in_flight.is_empty() => {}
                () = shutdown.wait() => {
                    tracing::info!(in_flight = in_flight.len(), "Fetch engine stopping");
                    break;
                }
            }
        }

        while in_flight.next().await.is_some() {}
    }
}

async fn run_task(
    hosts: Arc<HashMap<NetAddress, Operator>>,
    semaphore: Arc<Semaphore>,
    task: Arc<DownloadTask>,
) {
    let outcome = match semaphore.acquire_owned().await {
        Ok(_permit) => transfer(&hosts, &task).await,
        Err(err) => Err(eyre::Report::new(err)),
    };

    if let Err(err) = &outcome {
        tracing::warn!(path = %task.path(), "Transfer failed: {:#}", err);
    }
    if let Err(err) = task.complete(outcome.map_err(TransferError::from_report)) {
        tracing::warn!("{}", err);
    }
}

async fn transfer(hosts: &HashMap<NetAddress, Operator>, task: &DownloadTask) -> Result<()> {
    let mut sink = task
        .take_sink()
        .await
        .ok_or_else(|| eyre!("Sink for {} was already claimed", task.path()))?;
    tracing::info!(
        path = %task.path(),
        offset = task.offset(),
        length = task.length(),
        "Downloading"
    );

    let mut written = 0u64;
    for chunk in &task.file().chunks {
        let Some(range) = chunk_overlap(chunk, task.offset(), task.length()) else {
            continue;
        };
        let bytes = fetch_chunk(hosts, task.contracts(), chunk).await?;
        let section = &bytes[range.start as usize..range.end as usize];

        sink.write_all(section)
            .await
            .wrap_err_with(|| format!("Failed to write to {}", task.destination()))?;
        written += section.len() as u64;
        task.record_progress(section.len() as u64);
    }

    sink.shutdown()
        .await
        .wrap_err_with(|| format!("Failed to flush {}", task.destination()))?;

    if written != task.length() {
        return Err(eyre!(
            "Chunk layout of {} covers {} of {} requested bytes",
            task.path(),
            written,
            task.length()
        ));
    }
    tracing::info!(path = %task.path(), destination = %task.destination(), "Downloaded and verified");
    Ok(())
}

/// Fetches and verifies one chunk, trying its contracted hosts in layout order.
async fn fetch_chunk(
    hosts: &HashMap<NetAddress, Operator>,
    contracts: &ContractSnapshot,
    chunk: &ChunkLayout,
) -> Result<Vec<u8>> {
    let mut last_error = None;

    for host in chunk.hosts.iter().filter(|host| contracts.contains(host)) {
        let Some(op) = hosts.get(host) else {
            tracing::trace!(host = %host, "No operator for contracted host");
            continue;
        };
        tracing::trace!(host = %host, object = %chunk.object, "Fetching chunk");

        let bytes = match op.read(&chunk.object).await {
            Ok(buffer) => buffer.to_vec(),
            Err(err) => {
                tracing::warn!(host = %host, object = %chunk.object, "Failed to fetch chunk: {}", err);
                last_error = Some(eyre::Report::new(err));
                continue;
            }
        };

        if bytes.len() as u64 != chunk.length {
            last_error = Some(eyre!(
                "Host {} returned {} bytes for chunk {}, expected {}",
                host,
                bytes.len(),
                chunk.object,
                chunk.length
            ));
            continue;
        }

        if let Some(expected) = &chunk.sha256 {
            let mut verifier = ChunkDigestVerifier::new(expected.clone());
            verifier.update(&bytes);
            if let Err(err) = verifier.verify() {
                tracing::warn!(host = %host, object = %chunk.object, "{}", err);
                last_error = Some(eyre::Report::new(err));
                continue;
            }
        }

        return Ok(bytes);
    }

    Err(last_error.unwrap_or_else(|| {
        eyre!(
            "No contracted host stores chunk {} (hosts: {})",
            chunk.object,
            chunk.hosts.iter().join(", ")
        )
    }))
    .wrap_err_with(|| format!("Failed to fetch chunk {}", chunk.object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FileEntry, MemoryCatalog};
    use crate::contracts::{Contract, ContractId, StaticContractManager};
    use crate::download::{DownloadError, DownloadManager, DownloadRequest, DownloadStatus};
    use crate::shutdown::shutdown_channel;
    use opendal::services::Memory;
    use sha2::{Digest, Sha256};
    use tokio::io::AsyncReadExt;

    fn content() -> Vec<u8> {
        (0..1000u32).map(|i| (i % 251) as u8).collect()
    }

    fn chunk(index: u64, host: &str, sha256: Option<Vec<u8>>) -> ChunkLayout {
        ChunkLayout {
            offset: index * 500,
            length: 500,
            object: format!("docs/{index}"),
            hosts: vec![host.into()],
            sha256,
        }
    }

    async fn memory_host(objects: &[(String, Vec<u8>)]) -> Operator {
        let op = Operator::new(Memory::default()).unwrap().finish();
        for (key, bytes) in objects {
            op.write(key, bytes.clone()).await.unwrap();
        }
        op
    }

    struct Setup {
        manager: DownloadManager<MemoryCatalog, StaticContractManager>,
    }

    async fn setup(chunks: Vec<ChunkLayout>, stored: &[(String, Vec<u8>)]) -> Setup {
        let catalog = Arc::new(MemoryCatalog::from_entries([FileEntry {
            path: "docs.txt".to_string(),
            size: 1000,
            chunks,
        }]));
        let contracts = Arc::new(StaticContractManager::new(vec![Contract {
            net_address: "host1:9982".into(),
            id: ContractId::new([1; 32]),
        }]));
        let (trigger, signal) = shutdown_channel();
        let (manager, receiver) = DownloadManager::new(catalog, contracts, signal.clone());

        let hosts = HashMap::from([(NetAddress::from("host1:9982"), memory_host(stored).await)]);
        let engine = FetchEngine::new(hosts, FetchOptions::default());
        tokio::spawn(async move {
            let _trigger = trigger;
            engine.run(receiver, signal).await;
        });

        Setup { manager }
    }

    fn stored_chunks() -> Vec<(String, Vec<u8>)> {
        let content = content();
        vec![
            ("docs/0".to_string(), content[..500].to_vec()),
            ("docs/1".to_string(), content[500..].to_vec()),
        ]
    }

    async fn download(
        manager: &DownloadManager<MemoryCatalog, StaticContractManager>,
        offset: u64,
        length: u64,
    ) -> (Result<(), DownloadError>, Vec<u8>) {
        let (writer, mut reader) = tokio::io::duplex(64 * 1024);
        let request = DownloadRequest::section("docs.txt", "memory", Box::new(writer), offset, length);
        let result = manager.submit(request).await;
        let mut output = Vec::new();
        reader.read_to_end(&mut output).await.unwrap();
        (result, output)
    }

    #[tokio::test]
    async fn test_section_spanning_two_chunks() {
        let s = setup(
            vec![chunk(0, "host1:9982", None), chunk(1, "host1:9982", None)],
            &stored_chunks(),
        )
        .await;

        let (result, output) = download(&s.manager, 400, 200).await;

        assert!(result.is_ok(), "download should succeed: {:?}", result);
        assert_eq!(output, content()[400..600].to_vec());
        assert_eq!(s.manager.list().await[0].received, 200);
    }

    #[tokio::test]
    async fn test_whole_file_with_verified_chunks() {
        let content = content();
        let digests: Vec<_> = [&content[..500], &content[500..]]
            .iter()
            .map(|part| Sha256::digest(part).to_vec())
            .collect();
        let s = setup(
            vec![
                chunk(0, "host1:9982", Some(digests[0].clone())),
                chunk(1, "host1:9982", Some(digests[1].clone())),
            ],
            &stored_chunks(),
        )
        .await;

        let (result, output) = download(&s.manager, 0, 1000).await;

        assert!(result.is_ok(), "download should succeed: {:?}", result);
        assert_eq!(output, content);
        let downloads = s.manager.list().await;
        assert_eq!(downloads[0].received, 1000);
        assert_eq!(downloads[0].status, DownloadStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_digest_mismatch_fails_transfer() {
        let s = setup(
            vec![
                chunk(0, "host1:9982", Some(vec![0; 32])),
                chunk(1, "host1:9982", None),
            ],
            &stored_chunks(),
        )
        .await;

        let (result, _) = download(&s.manager, 0, 1000).await;

        let Err(DownloadError::Transfer(err)) = &result else {
            panic!("expected transfer error, got {:?}", result);
        };
        assert!(err.to_string().contains("Verification failed"), "{}", err);
        let downloads = s.manager.list().await;
        assert_eq!(downloads[0].status, DownloadStatus::Failed);
        assert_eq!(downloads[0].received, 0);
    }

    #[tokio::test]
    async fn test_chunk_without_contracted_host_fails() {
        let s = setup(
            vec![chunk(0, "host1:9982", None), chunk(1, "host2:9982", None)],
            &stored_chunks(),
        )
        .await;

        let (result, output) = download(&s.manager, 0, 1000).await;

        let Err(DownloadError::Transfer(err)) = &result else {
            panic!("expected transfer error, got {:?}", result);
        };
        assert!(err.to_string().contains("No contracted host stores chunk docs/1"), "{}", err);
        // The first chunk was already written before the second one failed.
        assert_eq!(output.len(), 500);
        assert_eq!(s.manager.list().await[0].received, 500);
    }

    #[tokio::test]
    async fn test_missing_object_fails_transfer() {
        let s = setup(
            vec![chunk(0, "host1:9982", None), chunk(1, "host1:9982", None)],
            &stored_chunks()[..1],
        )
        .await;

        let (result, _) = download(&s.manager, 600, 100).await;

        assert!(matches!(result, Err(DownloadError::Transfer(_))));
    }
}
