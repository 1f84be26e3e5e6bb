//! Discovery producer
//!
//! Walks the paginated listing index, pulls job cards out of each rendered
//! page, and feeds the work queue. Runs as a single task; the bounded queue
//! provides backpressure when the workers fall behind.

use crate::extract::ListingExtractor;
use crate::pipeline::coordinator::PipelineContext;
use crate::pipeline::queue::{QueueEntry, WorkItem};
use crate::render::RenderClient;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Builds the listing-index URL for a pagination offset.
///
/// Replaces any existing `start` parameter; every other query parameter on
/// the configured URL is kept as-is.
pub fn paged_url(base: &Url, start: usize) -> Url {
    let mut url = base.clone();
    let kept: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != "start")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair("start", &start.to_string());
    }
    url
}

/// Single-task producer that discovers listings and enqueues them
pub struct DiscoveryProducer {
    client: Box<dyn RenderClient>,
    extractor: Arc<dyn ListingExtractor>,
    ctx: Arc<PipelineContext>,
}

impl DiscoveryProducer {
    pub fn new(
        client: Box<dyn RenderClient>,
        extractor: Arc<dyn ListingExtractor>,
        ctx: Arc<PipelineContext>,
    ) -> Self {
        Self {
            client,
            extractor,
            ctx,
        }
    }

    /// Runs discovery to completion and returns the number of enqueued items.
    ///
    /// Stops at the page cap, at the first page that renders no cards, at a
    /// navigation failure, or when cancellation is observed.
    pub async fn run(mut self) -> usize {
        let discovery = self.ctx.config.discovery.clone();
        let base = match Url::parse(&discovery.listing_url) {
            Ok(base) => base,
            Err(e) => {
                tracing::error!("Invalid listing URL {}: {}", discovery.listing_url, e);
                return 0;
            }
        };

        let mut total = 0usize;
        'pages: for page_idx in 0..discovery.max_pages {
            if self.ctx.cancel.is_cancelled() {
                tracing::info!("Discovery cancelled after {} pages", page_idx);
                break;
            }

            let page = paged_url(&base, page_idx * discovery.page_size);
            tracing::debug!("Discovering page {}: {}", page_idx, page);

            if let Err(e) = self.client.navigate(page.as_str()).await {
                // An unreachable index page ends discovery the same way an
                // empty one does.
                tracing::warn!("Listing page {} failed to load: {}", page, e);
                break;
            }
            tokio::time::sleep(Duration::from_millis(discovery.page_settle_ms)).await;

            let listings = self.reveal_page(&discovery, &base).await;
            if listings.is_empty() {
                tracing::info!("Listing page {} is empty, discovery done", page_idx);
                break;
            }

            tracing::info!("Page {}: {} listings", page_idx, listings.len());
            for listing in listings {
                if self.ctx.cancel.is_cancelled() {
                    break 'pages;
                }
                let entry = QueueEntry::Job(WorkItem {
                    url: listing.url,
                    type_hint: listing.type_hint,
                });
                if self.ctx.queue.enqueue(entry).await.is_err() {
                    tracing::warn!("Work queue closed during discovery");
                    return total;
                }
                self.ctx.counters.record_enqueued();
                total += 1;
            }
        }

        tracing::info!("Discovery enqueued {} listings", total);
        total
    }

    /// Re-renders the current page until a full card set shows up or the
    /// reveal budget runs out. Lazily-loading indexes render a partial list
    /// first; each reveal pass asks the client to load the remainder.
    async fn reveal_page(
        &mut self,
        discovery: &crate::config::DiscoveryConfig,
        base: &Url,
    ) -> Vec<crate::extract::DiscoveredListing> {
        let mut listings = self.extractor.listings(self.client.rendered_content(), base);

        let mut attempts = 0;
        while !listings.is_empty()
            && listings.len() < discovery.page_size
            && attempts < discovery.max_reveal_attempts
        {
            if let Err(e) = self.client.reveal_more().await {
                tracing::debug!("Reveal attempt failed: {}", e);
                break;
            }
            tokio::time::sleep(Duration::from_millis(discovery.reveal_wait_ms)).await;
            listings = self.extractor.listings(self.client.rendered_content(), base);
            attempts += 1;
        }
        listings
    }
}
