use super::error::{DownloadError, TransferError};
use super::queue::DownloadQueue;
use super::task::DownloadTask;
use super::types::{DownloadInfo, DownloadRequest, RequestedLength};
use crate::catalog::{FileCatalog, FileEntry};
use crate::contracts::{ContractManager, ContractSnapshot};
use crate::shutdown::ShutdownSignal;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Receiving half of the dispatch channel, owned by the fetch engine.
pub type DispatchReceiver = mpsc::UnboundedReceiver<Arc<DownloadTask>>;

/// Admits download requests into the queue and hands them to the fetch engine.
pub struct DownloadManager<C, K> {
    catalog: Arc<C>,
    contracts: Arc<K>,
    queue: Arc<DownloadQueue>,
    dispatch: mpsc::UnboundedSender<Arc<DownloadTask>>,
    shutdown: ShutdownSignal,
}

impl<C: FileCatalog, K: ContractManager> DownloadManager<C, K> {
    pub fn new(
        catalog: Arc<C>,
        contracts: Arc<K>,
        shutdown: ShutdownSignal,
    ) -> (Self, DispatchReceiver) {
        Self::with_queue(catalog, contracts, Arc::new(DownloadQueue::new()), shutdown)
    }

    pub fn with_queue(
        catalog: Arc<C>,
        contracts: Arc<K>,
        queue: Arc<DownloadQueue>,
        shutdown: ShutdownSignal,
    ) -> (Self, DispatchReceiver) {
        let (dispatch, receiver) = mpsc::unbounded_channel();
        let manager = Self {
            catalog,
            contracts,
            queue,
            dispatch,
            shutdown,
        };
        (manager, receiver)
    }

    /// Downloads the requested file or section and waits for the result.
    ///
    /// Returns [`DownloadError::Interrupted`] as soon as shutdown is signalled. The
    /// task itself is not cancelled and stays in the queue.
    pub async fn submit(&self, request: DownloadRequest) -> Result<(), DownloadError> {
        let task = self.enqueue(request).await?;

        tokio::select! {
            result = task.wait() => {
                match &result {
                    Ok(()) => tracing::info!(path = %task.path(), received = task.received(), "Download finished"),
                    Err(err) => tracing::warn!(path = %task.path(), "Download failed: {}", err),
                }
                result.map_err(DownloadError::from)
            }
            () = self.shutdown.wait() => {
                tracing::debug!(path = %task.path(), "Stopped waiting for download due to shutdown");
                Err(DownloadError::Interrupted)
            }
        }
    }

    /// Validates and admits a request without waiting for it to finish.
    ///
    /// The task is visible in [`DownloadManager::list`] before the fetch engine can see it.
    pub async fn enqueue(
        &self,
        request: DownloadRequest,
    ) -> Result<Arc<DownloadTask>, DownloadError> {
        let DownloadRequest {
            path,
            destination,
            sink,
            offset,
            length,
        } = request;

        let (file, length) = self.resolve_section(&path, offset, length).await?;

        let contracts: ContractSnapshot =
            self.contracts.current_contracts().await.into_iter().collect();
        tracing::trace!(path = %path, contracts = contracts.len(), "Built contract snapshot");

        let task = Arc::new(DownloadTask::new(
            file,
            destination,
            sink,
            contracts,
            offset,
            length,
        ));
        self.queue.push(task.clone()).await;
        tracing::info!(
            path = %path,
            destination = %task.destination(),
            offset,
            length,
            "Queued download"
        );

        if self.dispatch.send(task.clone()).is_err() {
            tracing::warn!(path = %path, "Fetch engine is gone, failing download");
            if let Err(err) = task.complete(Err(TransferError::new(
                DownloadError::EngineUnavailable.to_string(),
            ))) {
                tracing::warn!("{}", err);
            }
            return Err(DownloadError::EngineUnavailable);
        }
        Ok(task)
    }

    /// Looks up `path` and checks the requested section against the file size, returning
    /// the catalog entry and the concrete section length.
    ///
    /// Nothing is queued, so callers can use it to reject a request before preparing its
    /// sink.
    pub async fn resolve_section(
        &self,
        path: &str,
        offset: u64,
        length: RequestedLength,
    ) -> Result<(Arc<FileEntry>, u64), DownloadError> {
        let file = self
            .catalog
            .resolve(path)
            .await
            .ok_or_else(|| DownloadError::NotFound {
                path: path.to_string(),
            })?;
        let length = resolve_length(file.size, offset, length)?;
        Ok((file, length))
    }

    /// Status of every download ever admitted, newest first.
    pub async fn list(&self) -> Vec<DownloadInfo> {
        self.queue.snapshot().await
    }
}

/// Turns the requested length into a concrete byte count within `0..size`.
fn resolve_length(
    size: u64,
    offset: u64,
    requested: RequestedLength,
) -> Result<u64, DownloadError> {
    match requested {
        RequestedLength::RestOfFile => {
            size.checked_sub(offset)
                .ok_or(DownloadError::Range {
                    offset,
                    length: 0,
                    size,
                })
        }
        RequestedLength::Bounded(length) => offset
            .checked_add(length)
            .filter(|end| *end <= size)
            .map(|_| length)
            .ok_or(DownloadError::Range {
                offset,
                length,
                size,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::contracts::{Contract, ContractId, StaticContractManager};
    use crate::download::DownloadStatus;
    use crate::shutdown::{ShutdownTrigger, shutdown_channel};
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    type TestManager = DownloadManager<MemoryCatalog, StaticContractManager>;

    struct Harness {
        manager: Arc<TestManager>,
        contracts: Arc<StaticContractManager>,
        trigger: ShutdownTrigger,
        receiver: Option<DispatchReceiver>,
    }

    fn harness() -> Harness {
        let catalog = Arc::new(MemoryCatalog::from_entries([FileEntry {
            path: "docs.txt".to_string(),
            size: 1000,
            chunks: vec![],
        }]));
        let contracts = Arc::new(StaticContractManager::new(vec![Contract {
            net_address: "host1:9982".into(),
            id: ContractId::new([1; 32]),
        }]));
        let (trigger, signal) = shutdown_channel();
        let (manager, receiver) = DownloadManager::new(catalog, contracts.clone(), signal);
        Harness {
            manager: Arc::new(manager),
            contracts,
            trigger,
            receiver: Some(receiver),
        }
    }

    /// Stand-in fetch engine that delivers every byte and completes with `outcome`.
    fn spawn_engine(
        mut receiver: DispatchReceiver,
        outcome: fn(&DownloadTask) -> Result<(), TransferError>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(task) = receiver.recv().await {
                task.record_progress(task.length());
                task.complete(outcome(&task)).unwrap();
            }
        })
    }

    fn succeed(_: &DownloadTask) -> Result<(), TransferError> {
        Ok(())
    }

    fn section(destination: &str, offset: u64, length: u64) -> DownloadRequest {
        DownloadRequest::section(
            "docs.txt",
            destination,
            Box::new(tokio::io::sink()),
            offset,
            length,
        )
    }

    #[tokio::test]
    async fn test_submit_successful_download() {
        let mut h = harness();
        spawn_engine(h.receiver.take().unwrap(), succeed);

        let result = h.manager.submit(section("out.txt", 0, 1000)).await;

        assert!(result.is_ok(), "submit should succeed: {:?}", result);
        let downloads = h.manager.list().await;
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].path, "docs.txt");
        assert_eq!(downloads[0].destination, "out.txt");
        assert_eq!(downloads[0].filesize, 1000);
        assert_eq!(downloads[0].received, 1000);
        assert_eq!(downloads[0].status, DownloadStatus::Succeeded);
        assert_eq!(downloads[0].error, None);
    }

    #[tokio::test]
    async fn test_submit_rejects_out_of_range_section() {
        let mut h = harness();
        spawn_engine(h.receiver.take().unwrap(), succeed);

        let result = h.manager.submit(section("out.txt", 900, 200)).await;

        assert!(matches!(
            result,
            Err(DownloadError::Range {
                offset: 900,
                length: 200,
                size: 1000
            })
        ));
        assert!(h.manager.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_submit_rejects_overflowing_section() {
        let h = harness();

        let result = h.manager.enqueue(section("out.txt", 1, u64::MAX)).await;

        assert!(matches!(result, Err(DownloadError::Range { .. })));
        assert!(h.manager.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_submit_unknown_path() {
        let h = harness();

        let result = h
            .manager
            .submit(DownloadRequest::whole_file(
                "missing.txt",
                "out.txt",
                Box::new(tokio::io::sink()),
            ))
            .await;

        assert!(matches!(
            result,
            Err(DownloadError::NotFound { path }) if path == "missing.txt"
        ));
        assert!(h.manager.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_whole_file_matches_full_section() {
        let h = harness();

        let whole = h
            .manager
            .enqueue(DownloadRequest::whole_file(
                "docs.txt",
                "whole.txt",
                Box::new(tokio::io::sink()),
            ))
            .await
            .unwrap();
        let full = h.manager.enqueue(section("full.txt", 0, 1000)).await.unwrap();

        assert_eq!(whole.offset(), full.offset());
        assert_eq!(whole.length(), 1000);
        assert_eq!(full.length(), 1000);
    }

    #[tokio::test]
    async fn test_rest_of_file_from_offset() {
        let h = harness();

        let request = |offset| DownloadRequest {
            path: "docs.txt".to_string(),
            destination: "tail.txt".to_string(),
            sink: Box::new(tokio::io::sink()),
            offset,
            length: RequestedLength::RestOfFile,
        };

        let task = h.manager.enqueue(request(400)).await.unwrap();
        assert_eq!(task.length(), 600);

        let result = h.manager.enqueue(request(1001)).await;
        assert!(matches!(result, Err(DownloadError::Range { .. })));
        assert_eq!(h.manager.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let mut h = harness();
        spawn_engine(h.receiver.take().unwrap(), succeed);

        for destination in ["a", "b", "c"] {
            h.manager.submit(section(destination, 0, 10)).await.unwrap();
        }

        let destinations: Vec<_> = h
            .manager
            .list()
            .await
            .into_iter()
            .map(|info| info.destination)
            .collect();
        assert_eq!(destinations, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_concurrent_submits_are_all_queued() {
        let mut h = harness();
        spawn_engine(h.receiver.take().unwrap(), succeed);

        let submits: Vec<_> = (0..32)
            .map(|i| {
                let manager = h.manager.clone();
                tokio::spawn(async move { manager.submit(section(&format!("out-{i}"), i, 1)).await })
            })
            .collect();
        for submit in submits {
            submit.await.unwrap().unwrap();
        }

        let downloads = h.manager.list().await;
        let destinations: HashSet<_> = downloads.iter().map(|d| d.destination.clone()).collect();
        assert_eq!(downloads.len(), 32);
        assert_eq!(destinations.len(), 32);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_waiting_submit() {
        let mut h = harness();
        // Keep the receiver alive but never complete anything.
        let _receiver = h.receiver.take().unwrap();

        let manager = h.manager.clone();
        let submit = tokio::spawn(async move { manager.submit(section("out.txt", 0, 10)).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.trigger.trigger();

        let result = tokio::time::timeout(Duration::from_secs(5), submit)
            .await
            .expect("submit should return after shutdown")
            .unwrap();

        assert!(matches!(result, Err(DownloadError::Interrupted)));
        let downloads = h.manager.list().await;
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].status, DownloadStatus::Pending);
    }

    #[tokio::test]
    async fn test_transfer_error_is_forwarded() {
        let mut h = harness();
        spawn_engine(h.receiver.take().unwrap(), |_| {
            Err(TransferError::new("host unreachable"))
        });

        let result = h.manager.submit(section("out.txt", 0, 10)).await;

        match result {
            Err(DownloadError::Transfer(err)) => assert_eq!(err.to_string(), "host unreachable"),
            other => panic!("expected transfer error, got {:?}", other),
        }
        let first = h.manager.list().await;
        let second = h.manager.list().await;
        assert_eq!(first[0].error.as_deref(), Some("host unreachable"));
        assert_eq!(first[0].status, DownloadStatus::Failed);
        assert_eq!(first[0].error, second[0].error);
    }

    #[tokio::test]
    async fn test_submit_without_engine() {
        let mut h = harness();
        drop(h.receiver.take());

        let result = h.manager.submit(section("out.txt", 0, 10)).await;

        assert!(matches!(result, Err(DownloadError::EngineUnavailable)));
        let downloads = h.manager.list().await;
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].status, DownloadStatus::Failed);
    }

    #[tokio::test]
    async fn test_contract_snapshot_taken_per_submit() {
        let h = harness();

        let first = h.manager.enqueue(section("first", 0, 10)).await.unwrap();
        h.contracts
            .upsert(Contract {
                net_address: "host2:9982".into(),
                id: ContractId::new([2; 32]),
            })
            .await;
        let second = h.manager.enqueue(section("second", 0, 10)).await.unwrap();

        assert_eq!(first.contracts().len(), 1);
        assert!(!first.contracts().contains(&"host2:9982".into()));
        assert_eq!(second.contracts().len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_section_does_not_queue() {
        let h = harness();

        let (file, length) = h
            .manager
            .resolve_section("docs.txt", 400, RequestedLength::RestOfFile)
            .await
            .unwrap();
        assert_eq!(file.size, 1000);
        assert_eq!(length, 600);

        let result = h
            .manager
            .resolve_section("docs.txt", 900, RequestedLength::Bounded(200))
            .await;
        assert!(matches!(result, Err(DownloadError::Range { .. })));
        assert!(h.manager.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_managers_can_share_a_queue() {
        let h = harness();
        let queue = Arc::new(DownloadQueue::new());
        let catalog = Arc::new(MemoryCatalog::from_entries([FileEntry {
            path: "docs.txt".to_string(),
            size: 1000,
            chunks: vec![],
        }]));
        let (_trigger, signal) = shutdown_channel();
        let (first, mut first_receiver) = DownloadManager::with_queue(
            catalog.clone(),
            h.contracts.clone(),
            queue.clone(),
            signal.clone(),
        );
        let (second, mut second_receiver) =
            DownloadManager::with_queue(catalog, h.contracts.clone(), queue.clone(), signal);

        first.enqueue(section("first", 0, 10)).await.unwrap();
        second.enqueue(section("second", 0, 10)).await.unwrap();

        let destinations: Vec<_> = first
            .list()
            .await
            .into_iter()
            .map(|info| info.destination)
            .collect();
        assert_eq!(destinations, vec!["second", "first"]);
        assert_eq!(second.list().await.len(), 2);
        assert_eq!(first_receiver.recv().await.unwrap().destination(), "first");
        assert_eq!(second_receiver.recv().await.unwrap().destination(), "second");
        // The independent harness manager keeps its own queue.
        assert!(h.manager.list().await.is_empty());
    }
}
