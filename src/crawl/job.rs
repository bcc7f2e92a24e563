// src/crawl/job.rs
// =============================================================================
// The units of work passed between the dispatcher and the worker pool.
//
// - Job:     one URL to fetch at a given crawl depth
// - Outcome: what happened when a worker executed that job
//
// Every job executed by a worker produces exactly one outcome.
// =============================================================================

use std::fmt;
use std::time::Duration;

use crate::error::FetchError;
use crate::fetch::PageFetcher;
use crate::sitemap::PageRecord;

/// Identifier handed out by the dispatcher, unique within one crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub url: String,
    /// Breadth-first distance from the seed (seed = 1)
    pub depth: u32,
}

impl Job {
    pub fn new(id: JobId, url: impl Into<String>, depth: u32) -> Self {
        Self {
            id,
            url: url.into(),
            depth,
        }
    }

    // Fetches the page and stamps it with this job's depth
    //
    // The fetch is bounded by `timeout`; running out of time is reported
    // like any other fetch failure.
    pub async fn execute(
        &self,
        fetcher: &dyn PageFetcher,
        timeout: Duration,
    ) -> Result<PageRecord, FetchError> {
        let page = tokio::time::timeout(timeout, fetcher.fetch(&self.url))
            .await
            .map_err(|_| FetchError::Timeout)??;

        Ok(PageRecord::from_fetched(page, self.depth))
    }
}

/// The result of executing one job
#[derive(Debug)]
pub struct Outcome {
    pub job: Job,
    pub result: Result<PageRecord, FetchError>,
}

impl Outcome {
    pub fn job_id(&self) -> JobId {
        self.job.id
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}
