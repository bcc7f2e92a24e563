// src/crawl/mod.rs
// =============================================================================
// This module handles website crawling.
//
// Features:
// - Breadth-first crawling starting from the seed URL
// - Stays on the seed's host (doesn't crawl external sites)
// - Configurable depth limit and number of concurrent workers
// - Every page is fetched at most once
// - Stops cleanly on cancellation, keeping what was already fetched
//
// Pieces:
// - config:     validated crawl settings
// - job:        Job / Outcome, the units passed to and from workers
// - pool:       fixed-size pool of fetch workers
// - frontier:   visited set, pending jobs, outstanding count
// - dispatcher: the task that ties it all together
//
// Rust concepts:
// - Async programming: concurrent network requests on tokio
// - Trait objects: Arc<dyn PageFetcher> lets tests swap the network out
// =============================================================================

mod config;
mod dispatcher;
mod frontier;
mod job;
mod pool;

#[cfg(test)]
mod testing;

use std::io::Write;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub use config::{validate_output_file, validate_seed, CrawlConfig};
pub use config::{DEFAULT_MAX_DEPTH, DEFAULT_OUTPUT_FILE, DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS};
pub use dispatcher::CrawlSummary;

use crate::error::SitemapError;
use crate::fetch::PageFetcher;
use crate::progress::Progress;
use crate::sitemap::SitemapWriter;
use dispatcher::Dispatcher;
use pool::WorkerPool;

// Crawls the site described by `config` and streams every fetched page
// into `sitemap`
//
// Parameters:
//   config: seed, depth limit, worker count, timeouts
//   fetcher: how pages are fetched (HttpFetcher in production)
//   sitemap: where the <url> entries go
//   cancel: stops the crawl early; fetched pages are still written
//
// Returns the crawl summary and the sink the sitemap was written to.
// If the sitemap can't be written the token is cancelled so every worker
// stops, and the error is returned.
pub async fn crawl_website<W: Write>(
    config: &CrawlConfig,
    fetcher: Arc<dyn PageFetcher>,
    sitemap: SitemapWriter<W>,
    cancel: CancellationToken,
) -> Result<(CrawlSummary, W), SitemapError> {
    let (pool, submitter) =
        WorkerPool::new(fetcher, config.queue_capacity(), config.request_timeout);
    let events = pool.run(config.workers, cancel.clone());

    let dispatcher = Dispatcher::new(config.max_depth, sitemap, Progress::new(config.verbose));
    let result = dispatcher
        .run(config.seed.as_str(), submitter, events, cancel.clone())
        .await;

    if result.is_err() {
        cancel.cancel();
    }
    result
}
