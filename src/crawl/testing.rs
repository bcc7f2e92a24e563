// src/crawl/testing.rs
// =============================================================================
// A scripted PageFetcher for the pool and dispatcher tests.
//
// Each URL is told up front how to behave:
// - page:     answers with a fixed list of links
// - failing:  can't be reached (a transport error)
// - off_host: redirects away from the crawl host
// - hanging:  never answers, until the crawl is cancelled
//
// Unknown URLs fail too. Every call is recorded so tests can check which
// pages were fetched, and how often.
// =============================================================================

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::fetch::{FetchedPage, PageFetcher};

#[derive(Default)]
pub struct ScriptedFetcher {
    pages: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    off_host: HashSet<String>,
    cancel_after: Option<(usize, CancellationToken)>,
    hung: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// `url` answers with these links
    pub fn page(mut self, url: &str, links: &[&str]) -> Self {
        self.pages
            .insert(url.to_string(), links.iter().map(|l| l.to_string()).collect());
        self
    }

    /// `url` can't be reached
    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// `url` redirects to another host
    pub fn off_host(mut self, url: &str) -> Self {
        self.off_host.insert(url.to_string());
        self
    }

    /// `url` never answers
    pub fn hanging(mut self, url: &str) -> Self {
        self.hanging.insert(url.to_string());
        self
    }

    /// Fires `token` once `count` hanging fetches are in flight
    pub fn cancel_after_hung(mut self, count: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((count, token));
        self
    }

    /// Every URL fetched so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        if self.hanging.contains(url) {
            let hung = self.hung.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((count, token)) = &self.cancel_after {
                if hung == *count {
                    token.cancel();
                }
            }
            std::future::pending::<()>().await;
        }

        if self.failing.contains(url) {
            return Err(FetchError::Connect("connection refused".to_string()));
        }

        if self.off_host.contains(url) {
            return Err(FetchError::HostMismatch {
                requested: Some("example.com".to_string()),
                actual: Some("elsewhere.org".to_string()),
            });
        }

        match self.pages.get(url) {
            Some(links) => Ok(FetchedPage {
                location: url.to_string(),
                last_modified: None,
                change_frequency: None,
                links: links.clone(),
            }),
            None => Err(FetchError::Transport(format!("no scripted page for {}", url))),
        }
    }
}
