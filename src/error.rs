// src/error.rs
// =============================================================================
// Error types for every stage of the crawl.
//
// Each failure class has a different fate:
// - ConfigError:   bad command-line input, the crawl never starts (exit 2)
// - FetchError:    one page failed, it is skipped and the crawl goes on
// - SitemapError:  Encoding skips one page, Sink aborts the whole run (exit 1)
// - PoolError:     a job was submitted after the pool input was closed
//
// Rust concepts:
// - thiserror: derives std::error::Error and Display from attributes
// - #[from]: lets the ? operator convert one error type into another
// =============================================================================

use std::path::PathBuf;

use thiserror::Error;

/// Invalid crawl settings, reported before any request is made
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("the provided url is not valid: {0}")]
    InvalidUrl(String),

    #[error("the provided url has no scheme or host: {0}")]
    IncompleteUrl(String),

    #[error("output file must have the .xml extension, got {0}")]
    OutputExtension(PathBuf),

    #[error("number of parallel workers can't be smaller than 1, got {0}")]
    InvalidWorkers(usize),

    #[error("maximum depth can't be smaller than 1, got {0}")]
    InvalidMaxDepth(u32),

    #[error("request timeout must be at least one second")]
    InvalidTimeout,
}

/// Why a single page could not be turned into a sitemap entry
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request timed out")]
    Timeout,

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("could not resolve hostname")]
    Dns,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("page resolved to host {actual:?}, expected {requested:?}")]
    HostMismatch {
        requested: Option<String>,
        actual: Option<String>,
    },

    #[error("invalid Last-Modified header '{value}': {source}")]
    InvalidLastModified {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl From<reqwest::Error> for FetchError {
    // reqwest errors can happen for many reasons, we sort them into the
    // categories above so the log line says what went wrong
    fn from(error: reqwest::Error) -> Self {
        let message = error.to_string();

        if error.is_timeout() {
            FetchError::Timeout
        } else if error.is_redirect() {
            FetchError::TooManyRedirects
        } else if error.is_connect() {
            if message.to_lowercase().contains("dns") {
                FetchError::Dns
            } else {
                FetchError::Connect(message)
            }
        } else {
            FetchError::Transport(message)
        }
    }
}

/// Failures of the sitemap writer
#[derive(Debug, Error)]
pub enum SitemapError {
    /// The output file could not be created or written; fatal
    #[error("cannot write sitemap: {0}")]
    Sink(#[from] std::io::Error),

    /// One entry could not be serialized; that page is skipped
    #[error("cannot encode sitemap entry for {location}: {reason}")]
    Encoding { location: String, reason: String },
}

impl SitemapError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SitemapError::Sink(_))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("job input of the worker pool is closed")]
    InputClosed,
}
