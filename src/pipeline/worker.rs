//! Extraction worker
//!
//! Each worker owns one render client and loops over the work queue:
//! dedup check, render the detail page, parse with bounded retries, persist.
//! Rate-limit failures trigger client replacement and a requeue instead of
//! consuming the item.

use crate::extract::{identity_key, DetailExtractor, NOT_MENTIONED};
use crate::extract::normalize_relative_time;
use crate::pipeline::coordinator::{ClientId, PipelineContext};
use crate::pipeline::queue::{QueueEntry, WorkItem};
use crate::pipeline::recovery::{classify, RecoveryAction};
use crate::pipeline::retry::with_retry;
use crate::render::{RenderClient, RenderClientFactory, RenderError};
use crate::storage::JobRecord;
use chrono::Utc;
use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One attempt at turning the current page into a record
#[derive(Debug, thiserror::Error)]
enum ParseAttemptError {
    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("page is missing its required content")]
    NotReady,
}

/// Whether the worker keeps looping after processing an item
enum WorkerFlow {
    Continue,
    Shutdown,
}

pub struct ExtractionWorker {
    id: usize,
    client_id: ClientId,
    client: Box<dyn RenderClient>,
    factory: Arc<dyn RenderClientFactory>,
    extractor: Arc<dyn DetailExtractor>,
    ctx: Arc<PipelineContext>,
}

impl ExtractionWorker {
    pub fn new(
        id: usize,
        client_id: ClientId,
        client: Box<dyn RenderClient>,
        factory: Arc<dyn RenderClientFactory>,
        extractor: Arc<dyn DetailExtractor>,
        ctx: Arc<PipelineContext>,
    ) -> Self {
        Self {
            id,
            client_id,
            client,
            factory,
            extractor,
            ctx,
        }
    }

    /// Worker loop. Exits on a stop sentinel, on cancellation, after an
    /// unrecoverable client loss, or if no work ever arrives before the
    /// first-item deadline.
    pub async fn run(mut self) {
        let pipeline = self.ctx.config.pipeline.clone();
        let dequeue_timeout = Duration::from_millis(pipeline.dequeue_timeout_ms);
        // Discovery may take a while to produce its first item; a worker that
        // never sees any work gives up after this deadline.
        let first_deadline =
            Instant::now() + Duration::from_secs(pipeline.first_item_wait_secs);
        let mut received_any = false;

        loop {
            if self.ctx.cancel.is_cancelled() {
                tracing::info!("Worker {} observed cancellation", self.id);
                break;
            }

            match self.ctx.queue.dequeue(dequeue_timeout).await {
                Some(QueueEntry::Stop) => {
                    tracing::debug!("Worker {} received stop signal", self.id);
                    break;
                }
                Some(QueueEntry::Job(item)) => {
                    received_any = true;
                    match self.process(item).await {
                        WorkerFlow::Continue => {}
                        WorkerFlow::Shutdown => break,
                    }
                }
                None => {
                    // A timeout is routine once work has flowed; it only
                    // exists so the cancellation flag gets re-checked.
                    // Discovery can outpace its consumers between pages, so
                    // the worker keeps polling until a stop signal arrives.
                    if !received_any && Instant::now() >= first_deadline {
                        tracing::warn!(
                            "Worker {} saw no work before the deadline, exiting",
                            self.id
                        );
                        break;
                    }
                }
            }
        }

        self.ctx.critical.lock().await.roster.retire(self.client_id);
        tracing::debug!("Worker {} stopped", self.id);
    }

    async fn process(&mut self, item: WorkItem) -> WorkerFlow {
        let Some(identity) = identity_key(&item.url) else {
            tracing::warn!("Worker {}: no identity in URL {}, dropping", self.id, item.url);
            self.ctx.counters.record_dropped();
            return WorkerFlow::Continue;
        };

        // Skip known listings before spending a page load on them.
        {
            let critical = self.ctx.critical.lock().await;
            match critical.store.exists_by_identity(&identity) {
                Ok(true) => {
                    tracing::debug!("Worker {}: {} already stored", self.id, identity);
                    self.ctx.counters.record_duplicate();
                    return WorkerFlow::Continue;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!("Worker {}: dedup check failed: {}", self.id, e);
                    self.ctx.counters.record_dropped();
                    return WorkerFlow::Continue;
                }
            }
        }

        let worker_cfg = self.ctx.config.worker.clone();

        // Transient fetch failures get the same attempt budget as parsing;
        // a rate limit is fatal here so it never burns retries.
        let url = item.url.clone();
        let (_, navigated) = with_retry(
            worker_cfg.parse_attempts,
            Duration::from_millis(worker_cfg.reload_wait_ms),
            &mut self.client,
            |client, _| {
                let url = url.clone();
                async move {
                    let result = client.navigate(&url).await;
                    (client, result)
                }
            },
            RenderError::is_rate_limit,
        )
        .await;
        if let Err(e) = navigated {
            return self.handle_render_failure(item, e).await;
        }

        let settle_ms = {
            let mut rng = rand::thread_rng();
            rng.gen_range(worker_cfg.settle_min_ms..=worker_cfg.settle_max_ms)
        };
        tokio::time::sleep(Duration::from_millis(settle_ms)).await;

        let extractor = Arc::clone(&self.extractor);
        let reload_wait = Duration::from_millis(worker_cfg.reload_wait_ms);
        let (_, parsed) = with_retry(
            worker_cfg.parse_attempts,
            Duration::ZERO,
            &mut self.client,
            |client, attempt| {
                let extractor = Arc::clone(&extractor);
                async move {
                    if attempt > 1 {
                        if let Err(e) = client.reload().await {
                            return (client, Err(ParseAttemptError::Render(e)));
                        }
                        tokio::time::sleep(reload_wait).await;
                    }
                    let outcome = extractor.parse(client.rendered_content());
                    if outcome.ready {
                        (client, Ok(outcome))
                    } else {
                        (client, Err(ParseAttemptError::NotReady))
                    }
                }
            },
            |e| matches!(e, ParseAttemptError::Render(err) if err.is_rate_limit()),
        )
        .await;

        match parsed {
            Ok(outcome) => self.persist(item, identity, outcome.fields).await,
            Err(ParseAttemptError::NotReady) => {
                self.archive_page(&identity).await;
                tracing::warn!(
                    "Worker {}: {} never rendered required content, dropping",
                    self.id,
                    item.url
                );
                self.ctx.counters.record_dropped();
                WorkerFlow::Continue
            }
            Err(ParseAttemptError::Render(e)) => self.handle_render_failure(item, e).await,
        }
    }

    async fn persist(
        &mut self,
        item: WorkItem,
        identity: String,
        mut fields: Vec<(String, String)>,
    ) -> WorkerFlow {
        let scraped_at = Utc::now();
        let converted = fields
            .iter()
            .find(|(name, _)| name == "Post Time")
            .and_then(|(_, value)| normalize_relative_time(value, scraped_at))
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| NOT_MENTIONED.to_string());
        fields.push(("Post Converted Time".to_string(), converted));

        let record = JobRecord {
            identity: identity.clone(),
            url: item.url,
            type_hint: item.type_hint,
            scraped_at,
            fields,
        };

        let mut critical = self.ctx.critical.lock().await;
        match critical.store.insert_if_absent(&record) {
            Ok(true) => {
                tracing::info!("Worker {}: stored {}", self.id, identity);
                self.ctx.counters.record_inserted();
            }
            Ok(false) => {
                // Another worker finished the same listing first.
                tracing::debug!("Worker {}: {} raced to a duplicate", self.id, identity);
                self.ctx.counters.record_duplicate();
            }
            Err(e) => {
                tracing::error!("Worker {}: failed to store {}: {}", self.id, identity, e);
                self.ctx.counters.record_dropped();
            }
        }
        WorkerFlow::Continue
    }

    /// Applies the recovery policy after a render failure.
    ///
    /// A rate-limited client is retired and replaced under the pipeline lock;
    /// the item goes back on the queue only after the lock is released, so a
    /// full queue cannot wedge the pipeline.
    async fn handle_render_failure(&mut self, item: WorkItem, error: RenderError) -> WorkerFlow {
        match classify(&error) {
            RecoveryAction::DropAndContinue => {
                tracing::warn!("Worker {}: {} failed ({}), dropping", self.id, item.url, error);
                self.ctx.counters.record_dropped();
                WorkerFlow::Continue
            }
            RecoveryAction::Requeue => {
                tracing::warn!(
                    "Worker {}: rate limited on {}, replacing render client",
                    self.id,
                    item.url
                );

                let replaced = {
                    let mut critical = self.ctx.critical.lock().await;
                    critical.roster.retire(self.client_id);

                    let factory = Arc::clone(&self.factory);
                    let ((), provisioned) = with_retry(
                        3,
                        Duration::from_millis(500),
                        (),
                        |(), _| {
                            let factory = Arc::clone(&factory);
                            async move { ((), factory.provision().await) }
                        },
                        |_| false,
                    )
                    .await;

                    match provisioned {
                        Ok(client) => {
                            self.client = client;
                            self.client_id = critical.roster.register();
                            true
                        }
                        Err(e) => {
                            tracing::error!(
                                "Worker {}: could not provision a replacement client: {}",
                                self.id,
                                e
                            );
                            false
                        }
                    }
                };

                if !replaced {
                    self.ctx.counters.record_dropped();
                    return WorkerFlow::Shutdown;
                }

                if self
                    .ctx
                    .queue
                    .enqueue(QueueEntry::Job(item))
                    .await
                    .is_err()
                {
                    tracing::warn!("Worker {}: queue closed, cannot requeue", self.id);
                    self.ctx.counters.record_dropped();
                } else {
                    self.ctx.counters.record_requeued();
                }
                WorkerFlow::Continue
            }
        }
    }

    async fn archive_page(&mut self, identity: &str) {
        let dir = Path::new(&self.ctx.config.output.error_page_dir);
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            tracing::warn!("Cannot create error page directory: {}", e);
            return;
        }

        let path = dir.join(format!("{}.html", identity));
        match tokio::fs::write(&path, self.client.rendered_content()).await {
            Ok(()) => tracing::info!("Archived unparsable page to {}", path.display()),
            Err(e) => tracing::warn!("Failed to archive page for {}: {}", identity, e),
        }
    }
}
