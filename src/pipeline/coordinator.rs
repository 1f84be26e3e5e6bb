//! Pipeline orchestration
//!
//! Builds the shared pipeline state, spawns the discovery producer and the
//! extraction workers, and runs the shutdown sequence: join the producer,
//! inject one stop sentinel per worker, join the workers, close out the run.

use crate::config::Config;
use crate::pipeline::producer::DiscoveryProducer;
use crate::pipeline::queue::{QueueEntry, WorkQueue};
use crate::pipeline::worker::ExtractionWorker;
use crate::extract::{DetailExtractor, JobCardExtractor, JobDetailExtractor};
use crate::render::RenderClientFactory;
use crate::storage::{RecordStore, RunStatus, SqliteStore};
use crate::MagpieError;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Cooperative cancellation flag
///
/// Observed at loop boundaries by the producer and every worker; in-flight
/// network operations are never interrupted. Worst-case observation latency
/// is bounded by the worker dequeue timeout.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Identifier for a live render client; never reused after retirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

/// Roster of live worker render clients
///
/// Mutated only under the pipeline critical section: registration at startup,
/// retire/register pairs during recovery, retirement at worker exit.
#[derive(Default)]
pub struct ClientRoster {
    next_id: u64,
    live: HashSet<ClientId>,
}

impl ClientRoster {
    pub fn register(&mut self) -> ClientId {
        let id = ClientId(self.next_id);
        self.next_id += 1;
        self.live.insert(id);
        id
    }

    pub fn retire(&mut self, id: ClientId) {
        self.live.remove(&id);
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

/// State that requires mutual exclusion across workers: the record store's
/// check-then-insert path and the client roster. One lock guards both.
pub struct CriticalSection {
    pub store: Box<dyn RecordStore>,
    pub roster: ClientRoster,
}

/// Progress counters shared across the pipeline
#[derive(Default)]
pub struct PipelineCounters {
    enqueued: AtomicU64,
    inserted: AtomicU64,
    duplicate: AtomicU64,
    dropped: AtomicU64,
    requeued: AtomicU64,
}

impl PipelineCounters {
    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_inserted(&self) {
        self.inserted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicate.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_requeued(&self) {
        self.requeued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineSummary {
        PipelineSummary {
            discovered: self.enqueued.load(Ordering::Relaxed),
            inserted: self.inserted.load(Ordering::Relaxed),
            duplicate: self.duplicate.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
        }
    }
}

/// Final accounting for a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Items the producer enqueued (requeues not included)
    pub discovered: u64,

    /// Records newly written to the store
    pub inserted: u64,

    /// Items skipped or rejected because their identity was already stored
    pub duplicate: u64,

    /// Items abandoned after permanent failure
    pub dropped: u64,

    /// Items put back on the queue by rate-limit recovery
    pub requeued: u64,
}

impl PipelineSummary {
    /// Items that reached a terminal outcome. Once discovery is exhausted and
    /// the queue has drained this equals `discovered`.
    pub fn total_processed(&self) -> u64 {
        self.inserted + self.duplicate + self.dropped
    }
}

/// Shared state handed to the producer and every worker at construction.
/// There are no globals; everything flows through this context.
pub struct PipelineContext {
    pub queue: WorkQueue,
    pub cancel: CancelToken,
    pub critical: Mutex<CriticalSection>,
    pub counters: PipelineCounters,
    pub config: Config,
}

/// Runs a complete harvest: discovery, extraction, persistence, shutdown.
///
/// Startup failures (store unreachable, no worker client provisioned) are
/// returned before any task is spawned. After startup, per-item failures are
/// contained inside the worker loop and only surface in the summary.
pub async fn run_pipeline(
    config: Config,
    factory: Arc<dyn RenderClientFactory>,
    cancel: CancelToken,
    config_hash: &str,
) -> crate::Result<PipelineSummary> {
    let mut store = SqliteStore::open(Path::new(&config.output.database_path))
        .map_err(|e| MagpieError::Startup(format!("cannot open record store: {}", e)))?;
    let run_id = store.create_run(config_hash)?;

    // The producer gets its own client, outside the worker roster.
    let producer_client = factory
        .provision()
        .await
        .map_err(|e| MagpieError::Startup(format!("cannot provision discovery client: {}", e)))?;

    let mut roster = ClientRoster::default();
    let mut worker_clients = Vec::new();
    for n in 0..config.pipeline.worker_count {
        match factory.provision().await {
            Ok(client) => worker_clients.push((roster.register(), client)),
            Err(e) => tracing::warn!("Failed to provision client for worker {}: {}", n, e),
        }
    }

    if worker_clients.is_empty() {
        return Err(MagpieError::Startup(
            "could not provision any worker render client".to_string(),
        ));
    }

    let worker_count = worker_clients.len();
    tracing::info!(
        "Starting harvest run {} with {} workers (queue capacity {})",
        run_id,
        worker_count,
        config.pipeline.queue_capacity
    );

    let ctx = Arc::new(PipelineContext {
        queue: WorkQueue::bounded(config.pipeline.queue_capacity),
        cancel,
        critical: Mutex::new(CriticalSection {
            store: Box::new(store),
            roster,
        }),
        counters: PipelineCounters::default(),
        config,
    });

    let producer = DiscoveryProducer::new(
        producer_client,
        Arc::new(JobCardExtractor::new()),
        Arc::clone(&ctx),
    );
    let producer_handle = tokio::spawn(producer.run());

    let detail_extractor: Arc<dyn DetailExtractor> = Arc::new(JobDetailExtractor::new());
    let mut worker_handles = Vec::with_capacity(worker_count);
    for (worker_id, (client_id, client)) in worker_clients.into_iter().enumerate() {
        let worker = ExtractionWorker::new(
            worker_id,
            client_id,
            client,
            Arc::clone(&factory),
            Arc::clone(&detail_extractor),
            Arc::clone(&ctx),
        );
        worker_handles.push(tokio::spawn(worker.run()));
    }

    // Discovery finishing (or bailing on cancellation) starts the drain.
    match producer_handle.await {
        Ok(total) => tracing::info!("Discovery finished with {} listings", total),
        Err(e) => tracing::error!("Discovery task failed: {}", e),
    }

    // One stop sentinel per worker guarantees every blocked dequeue wakes.
    for _ in 0..worker_count {
        if ctx.queue.enqueue(QueueEntry::Stop).await.is_err() {
            tracing::warn!("Work queue closed before all stop signals were sent");
            break;
        }
    }

    for handle in worker_handles {
        if let Err(e) = handle.await {
            tracing::error!("Worker task failed: {}", e);
        }
    }

    let summary = ctx.counters.snapshot();
    {
        let mut critical = ctx.critical.lock().await;
        let status = if ctx.cancel.is_cancelled() {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };
        if let Err(e) = critical.store.finish_run(run_id, status) {
            tracing::warn!("Failed to finalize run {}: {}", run_id, e);
        }

        let leaked = critical.roster.live_count();
        if leaked > 0 {
            tracing::warn!("{} render clients still registered after shutdown", leaked);
        }
    }

    tracing::info!(
        "Harvest complete: {} discovered, {} inserted, {} duplicates, {} dropped, {} requeued",
        summary.discovered,
        summary.inserted,
        summary.duplicate,
        summary.dropped,
        summary.requeued
    );

    // Dropping the context here closes the store connection and releases the
    // remaining clients.
    Ok(summary)
}
