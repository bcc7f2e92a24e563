// src/crawl/dispatcher.rs
// =============================================================================
// The single task that drives a crawl from the seed to the closed sitemap.
//
// State machine:
//
//   Running ──(outstanding reaches 0)──▶ Draining ──(pool done)──▶ Done
//      │                                     ▲
//      └───────────(cancellation)────────────┘
//
// In Running the dispatcher waits on three things at once:
// - the cancellation token
// - the next pool event (an outcome, or Done)
// - a free slot in the job queue, while jobs are pending
//
// Every job counts as outstanding from the moment it is created until its
// outcome arrives. Successful pages go to the sitemap writer and, below max
// depth, their unseen links become new jobs before the page itself is
// counted done. When the count reaches 0 the dispatcher closes the pool
// input and drains the pool until it reports Done.
//
// The frontier and the sitemap writer are owned here and only touched from
// this task.
// =============================================================================

use std::io::Write;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::frontier::Frontier;
use super::job::Outcome;
use super::pool::{PoolEvent, PoolEvents, Submitter};
use crate::error::SitemapError;
use crate::progress::{Counters, Progress};
use crate::sitemap::{PageRecord, SitemapWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Running,
    Draining,
    Done,
}

/// What a finished crawl did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Distinct URLs that became jobs
    pub urls_found: usize,
    /// Pages written to the sitemap
    pub pages_written: usize,
    /// Jobs whose fetch failed
    pub pages_failed: usize,
    /// Fetched pages that could not be encoded
    pub pages_skipped: usize,
    /// The crawl was stopped by the cancellation token
    pub cancelled: bool,
    pub elapsed: Duration,
}

// What woke the dispatcher up
enum Wakeup {
    Cancelled,
    Pool(PoolEvent),
    Submitted,
    InputLost,
}

pub struct Dispatcher<W: Write> {
    frontier: Frontier,
    sitemap: SitemapWriter<W>,
    progress: Progress,
    state: CrawlState,
    pages_failed: usize,
    pages_skipped: usize,
    cancelled: bool,
}

impl<W: Write> Dispatcher<W> {
    pub fn new(max_depth: u32, sitemap: SitemapWriter<W>, progress: Progress) -> Self {
        Self {
            frontier: Frontier::new(max_depth),
            sitemap,
            progress,
            state: CrawlState::Running,
            pages_failed: 0,
            pages_skipped: 0,
            cancelled: false,
        }
    }

    // Crawls from `seed` until no work remains (or the token fires), then
    // closes the sitemap and returns the underlying writer
    //
    // Only a sink error (the sitemap can't be written) ends the crawl early
    // with an error; failed pages are logged and skipped.
    pub async fn run(
        mut self,
        seed: &str,
        mut submitter: Submitter,
        mut events: PoolEvents,
        cancel: CancellationToken,
    ) -> Result<(CrawlSummary, W), SitemapError> {
        self.frontier.seed(seed);
        info!(seed, "crawl started");

        while self.state != CrawlState::Done {
            if self.state == CrawlState::Running && self.frontier.is_exhausted() {
                debug!("no work left, closing pool input");
                self.begin_draining(&mut submitter);
            }

            let running = self.state == CrawlState::Running;
            let can_submit = running && self.frontier.has_pending();

            let wakeup = tokio::select! {
                biased;
                _ = cancel.cancelled(), if running => Wakeup::Cancelled,
                event = events.next() => Wakeup::Pool(event),
                permit = submitter.reserve(), if can_submit => match permit {
                    Ok(permit) => match self.frontier.next_job() {
                        Some(job) => {
                            debug!(id = %job.id, url = %job.url, depth = job.depth, "submitting job");
                            permit.send(job);
                            Wakeup::Submitted
                        }
                        None => Wakeup::Submitted,
                    },
                    Err(_) => Wakeup::InputLost,
                },
            };

            match wakeup {
                Wakeup::Cancelled => {
                    let dropped = self.frontier.abandon_pending();
                    warn!(
                        dropped,
                        outstanding = self.frontier.outstanding(),
                        "crawl cancelled, writing pages already fetched"
                    );
                    self.cancelled = true;
                    self.begin_draining(&mut submitter);
                }
                Wakeup::Pool(PoolEvent::Outcome(outcome)) => self.handle_outcome(outcome)?,
                Wakeup::Pool(PoolEvent::Done) => {
                    debug!("worker pool finished");
                    self.state = CrawlState::Done;
                }
                Wakeup::Submitted => {}
                Wakeup::InputLost => {
                    // Every worker is gone, pending jobs can never run
                    let dropped = self.frontier.abandon_pending();
                    warn!(dropped, "worker pool stopped accepting jobs");
                    self.begin_draining(&mut submitter);
                }
            }

            self.progress.update(Counters {
                found: self.frontier.found(),
                processed: self.sitemap.entries(),
                queued: submitter.queue_depth(),
            });
        }

        let elapsed = self.progress.finish();
        let summary = CrawlSummary {
            urls_found: self.frontier.found(),
            pages_written: self.sitemap.entries(),
            pages_failed: self.pages_failed,
            pages_skipped: self.pages_skipped,
            cancelled: self.cancelled,
            elapsed,
        };
        info!(
            pages = summary.pages_written,
            failed = summary.pages_failed,
            "crawl finished"
        );

        let output = self.sitemap.finish()?;
        Ok((summary, output))
    }

    fn handle_outcome(&mut self, outcome: Outcome) -> Result<(), SitemapError> {
        debug!(id = %outcome.job_id(), ok = outcome.is_success(), "outcome received");

        let Outcome { job, result } = outcome;
        match result {
            Ok(record) => self.accept_page(record)?,
            Err(e) => {
                self.pages_failed += 1;
                warn!(url = %job.url, depth = job.depth, error = %e, "failed to fetch page");
            }
        }

        // Children are queued first, so outstanding can't touch 0 while
        // there is still work
        self.frontier.outcome_received();
        Ok(())
    }

    fn accept_page(&mut self, record: PageRecord) -> Result<(), SitemapError> {
        match self.sitemap.write_page(&record) {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.pages_skipped += 1;
                warn!(error = %e, "skipping page");
            }
        }

        // After cancellation pages are still written, but nothing new is queued
        if self.state == CrawlState::Running {
            let added = self.frontier.expand(&record);
            debug!(url = %record.location, depth = record.depth, added, "expanded page");
        }

        Ok(())
    }

    fn begin_draining(&mut self, submitter: &mut Submitter) {
        self.state = CrawlState::Draining;
        if submitter.close_input() {
            debug!("pool input closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;

    use url::Url;

    use super::*;
    use crate::crawl::config::CrawlConfig;
    use crate::crawl::crawl_website;
    use crate::crawl::testing::ScriptedFetcher;

    const SEED: &str = "http://example.com/";

    fn config(max_depth: u32, workers: usize) -> CrawlConfig {
        let mut config = CrawlConfig::new(Url::parse(SEED).unwrap());
        config.max_depth = max_depth;
        config.workers = workers;
        config.verbose = false;
        config
    }

    async fn crawl(
        fetcher: Arc<ScriptedFetcher>,
        max_depth: u32,
        workers: usize,
        cancel: CancellationToken,
    ) -> (CrawlSummary, String) {
        let config = config(max_depth, workers);
        let run = crawl_website(
            &config,
            fetcher,
            SitemapWriter::new(Vec::new()),
            cancel,
        );
        let (summary, output) = tokio::time::timeout(Duration::from_secs(10), run)
            .await
            .expect("crawl finished in time")
            .unwrap();
        (summary, String::from_utf8(output).unwrap())
    }

    fn url(path: &str) -> String {
        format!("http://example.com/{}", path)
    }

    #[tokio::test]
    async fn test_seed_only_at_depth_one() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .page(SEED, &["http://example.com/a"])
                .page("http://example.com/a", &[]),
        );

        let (summary, xml) = crawl(fetcher.clone(), 1, 3, CancellationToken::new()).await;

        assert_eq!(summary.pages_written, 1);
        assert_eq!(xml.matches("<url>").count(), 1);
        assert!(xml.contains("<loc>http://example.com/</loc><priority>1.0</priority>"));
        assert_eq!(fetcher.calls(), vec![SEED.to_string()]);
    }

    #[tokio::test]
    async fn test_depth_bound_is_inclusive() {
        // A chain: seed -> a -> b -> c -> d
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .page(SEED, &["http://example.com/a"])
                .page("http://example.com/a", &["http://example.com/b"])
                .page("http://example.com/b", &["http://example.com/c"])
                .page("http://example.com/c", &["http://example.com/d"])
                .page("http://example.com/d", &[]),
        );

        let (summary, xml) = crawl(fetcher.clone(), 3, 2, CancellationToken::new()).await;

        assert_eq!(summary.pages_written, 3);
        assert_eq!(fetcher.calls(), vec![SEED.to_string(), url("a"), url("b")]);
        assert!(xml.contains("<loc>http://example.com/b</loc><priority>0.8</priority>"));
        assert!(!xml.contains("http://example.com/c"));
        assert!(!xml.contains("<priority>0.7</priority>"));
    }

    #[tokio::test]
    async fn test_each_url_fetched_once() {
        // Every page links to every other page, including the seed
        let all = [
            "http://example.com/",
            "http://example.com/a",
            "http://example.com/b",
            "http://example.com/c",
        ];
        let mut fetcher = ScriptedFetcher::new();
        for page in all {
            fetcher = fetcher.page(page, &all);
        }
        let fetcher = Arc::new(fetcher);

        let (summary, xml) = crawl(fetcher.clone(), 5, 4, CancellationToken::new()).await;

        let mut calls = fetcher.calls();
        calls.sort();
        let mut expected: Vec<String> = all.iter().map(|u| u.to_string()).collect();
        expected.sort();

        assert_eq!(calls, expected);
        assert_eq!(summary.urls_found, 4);
        assert_eq!(summary.pages_written, 4);
        assert_eq!(xml.matches("<url>").count(), 4);
    }

    #[tokio::test]
    async fn test_failed_pages_are_skipped() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .page(SEED, &["http://example.com/broken", "http://example.com/away", "http://example.com/ok"])
                .failing("http://example.com/broken")
                .off_host("http://example.com/away")
                .page("http://example.com/ok", &[]),
        );

        let (summary, xml) = crawl(fetcher, 3, 3, CancellationToken::new()).await;

        assert_eq!(summary.pages_written, 2);
        assert_eq!(summary.pages_failed, 2);
        assert!(!xml.contains("broken"));
        assert!(!xml.contains("away"));
        assert!(xml.contains("<loc>http://example.com/ok</loc>"));
    }

    #[tokio::test]
    async fn test_off_host_page_has_no_children() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .page(SEED, &["http://example.com/away"])
                .off_host("http://example.com/away")
                .page("http://example.com/behind-away", &[]),
        );

        let (summary, _) = crawl(fetcher.clone(), 5, 2, CancellationToken::new()).await;

        assert_eq!(summary.pages_written, 1);
        assert_eq!(fetcher.calls(), vec![SEED.to_string(), url("away")]);
    }

    #[tokio::test]
    async fn test_large_fan_out_completes() {
        // 300 pages that all link to 20 of their neighbours; far more jobs
        // than the queues can hold at once
        let pages: Vec<String> = (0..300).map(|i| url(&format!("p{}", i))).collect();
        let seed_links: Vec<&str> = pages.iter().map(String::as_str).collect();

        let mut fetcher = ScriptedFetcher::new().page(SEED, &seed_links);
        for (i, page) in pages.iter().enumerate() {
            let links: Vec<&str> = (1..=20)
                .map(|step| pages[(i + step) % pages.len()].as_str())
                .collect();
            fetcher = fetcher.page(page, &links);
        }
        let fetcher = Arc::new(fetcher);

        let (summary, xml) = crawl(fetcher.clone(), 3, 3, CancellationToken::new()).await;

        assert_eq!(summary.pages_written, 301);
        assert_eq!(fetcher.calls().len(), 301);
        assert_eq!(xml.matches("<url>").count(), 301);
    }

    #[tokio::test]
    async fn test_cancel_with_jobs_outstanding() {
        let cancel = CancellationToken::new();
        let slow: Vec<String> = (0..5).map(|i| url(&format!("slow{}", i))).collect();

        let mut links: Vec<&str> = slow.iter().map(String::as_str).collect();
        links.push("http://example.com/later1");
        links.push("http://example.com/later2");

        let mut fetcher = ScriptedFetcher::new()
            .page(SEED, &links)
            .page("http://example.com/later1", &[])
            .page("http://example.com/later2", &[])
            .cancel_after_hung(5, cancel.clone());
        for page in &slow {
            fetcher = fetcher.hanging(page);
        }
        let fetcher = Arc::new(fetcher);

        let (summary, xml) = crawl(fetcher.clone(), 3, 5, cancel).await;

        assert!(summary.cancelled);
        // The seed outcome was already produced and still gets written
        assert_eq!(summary.pages_written, 1);
        // Five workers stuck on the slow pages; the rest never start
        assert_eq!(fetcher.calls().len(), 6);
        assert!(!xml.contains("later"));
        assert_eq!(xml.matches("<urlset").count(), 1);
        assert!(xml.trim_end().ends_with("</urlset>"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_writes_empty_sitemap() {
        let fetcher = Arc::new(ScriptedFetcher::new().page(SEED, &[]));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (summary, xml) = crawl(fetcher.clone(), 3, 2, cancel).await;

        assert!(summary.cancelled);
        assert_eq!(summary.pages_written, 0);
        assert!(fetcher.calls().is_empty());
        assert!(xml.contains("<urlset"));
        assert!(xml.trim_end().ends_with("</urlset>"));
        assert!(!xml.contains("<url>"));
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sink_error_aborts_crawl() {
        let fetcher = Arc::new(ScriptedFetcher::new().page(SEED, &["http://example.com/a"]));
        let cancel = CancellationToken::new();

        let result = crawl_website(
            &config(3, 2),
            fetcher,
            SitemapWriter::new(BrokenSink),
            cancel.clone(),
        )
        .await;

        assert!(matches!(result, Err(SitemapError::Sink(_))));
        assert!(cancel.is_cancelled());
    }
}
