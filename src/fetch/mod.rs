// src/fetch/mod.rs
// =============================================================================
// This module fetches pages over HTTP and turns them into FetchedPage values.
//
// Key functionality:
// - PageFetcher: the trait the worker pool calls, one page per call
// - HttpFetcher: the reqwest-backed implementation used by the binary
// - Rejects pages that end up on a different host (off-site redirects)
// - Reads the Last-Modified header when the server sends one
//
// Rust concepts:
// - Traits + async_trait: so workers can hold an Arc<dyn PageFetcher>
// - Send + Sync: every worker task calls the same fetcher concurrently
// =============================================================================

mod links;

pub use links::extract_links;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, LAST_MODIFIED, LOCATION};
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::FetchError;
use crate::sitemap::ChangeFrequency;

const MAX_REDIRECTS: usize = 10;

/// A fetched and parsed page, before the crawl assigns it a depth
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub location: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub change_frequency: Option<ChangeFrequency>,
    /// Same-host links, already resolved and filtered
    pub links: Vec<String>,
}

/// Fetches one page
///
/// Implementations are shared by all workers, so they must be safe to call
/// from many tasks at once.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Fetches pages with one shared reqwest client
pub struct HttpFetcher {
    client: Client,
    seed: Url,
}

impl HttpFetcher {
    // Creates an HTTP client with reasonable settings
    // We'll reuse this client for all requests (connection pooling)
    pub fn new(seed: Url, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(same_host_redirects())
            .user_agent(concat!("sitemap-crawler/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, seed })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let requested = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let response = self.client.get(requested.clone()).send().await?;

        // reqwest follows same-host redirects, so the final URL can differ
        // from the requested one; leaving the host means we left the site
        let final_url = response.url().clone();
        let status = response.status();
        let landed_on = if status.is_redirection() {
            redirect_target(response.headers(), &final_url).unwrap_or_else(|| final_url.clone())
        } else {
            final_url.clone()
        };

        if landed_on.host_str() != requested.host_str() {
            return Err(FetchError::HostMismatch {
                requested: requested.host_str().map(str::to_string),
                actual: landed_on.host_str().map(str::to_string),
            });
        }

        // The status code itself is not checked: an error page on this host
        // is still a page of the site and gets listed
        let last_modified = last_modified(response.headers())?;
        let html = response.text().await?;
        let links = extract_links(&html, &final_url, &self.seed);

        debug!(url, status = status.as_u16(), links = links.len(), "parsed page");

        Ok(FetchedPage {
            location: url.to_string(),
            last_modified,
            change_frequency: None,
            links,
        })
    }
}

// Redirect policy: follow redirects on the same host, stop before leaving it
//
// A stopped redirect comes back as the 3xx response itself, which fetch()
// turns into FetchError::HostMismatch without requesting the other site.
fn same_host_redirects() -> Policy {
    Policy::custom(|attempt| {
        let leaves_host = attempt
            .previous()
            .first()
            .is_some_and(|first| first.host_str() != attempt.url().host_str());

        if leaves_host {
            attempt.stop()
        } else if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else {
            attempt.follow()
        }
    })
}

// Where a 3xx response points to, resolved against the response URL
fn redirect_target(headers: &HeaderMap, from: &Url) -> Option<Url> {
    let location = headers.get(LOCATION)?.to_str().ok()?;
    from.join(location.trim()).ok()
}

// Reads the Last-Modified header (RFC 1123 dates, e.g.
// "Tue, 15 Nov 1994 08:12:31 GMT")
//
// A missing header is fine and gives None; a header that is present but
// can't be parsed is an error.
fn last_modified(headers: &HeaderMap) -> Result<Option<DateTime<Utc>>, FetchError> {
    let Some(value) = headers.get(LAST_MODIFIED) else {
        return Ok(None);
    };

    let value = String::from_utf8_lossy(value.as_bytes()).trim().to_string();
    if value.is_empty() {
        return Ok(None);
    }

    DateTime::parse_from_rfc2822(&value)
        .map(|date| Some(date.with_timezone(&Utc)))
        .map_err(|source| FetchError::InvalidLastModified { value, source })
}
