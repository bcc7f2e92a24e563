// src/crawl/config.rs
// =============================================================================
// Validated crawl settings.
//
// The CLI (src/cli.rs) parses flags with clap and hands them over as a
// CrawlConfig. The validation helpers here are shared: clap calls them while
// parsing, and CrawlConfig::validate() re-checks a config built in code.
// =============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_OUTPUT_FILE: &str = "./temp.xml";
pub const DEFAULT_WORKERS: usize = 3;
pub const DEFAULT_MAX_DEPTH: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

// Job and outcome queues hold this many entries per worker
const QUEUE_SLOTS_PER_WORKER: usize = 10;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Where the crawl starts; its host bounds the crawl
    pub seed: Url,
    pub output_file: PathBuf,
    /// Number of concurrent fetch workers
    pub workers: usize,
    /// Deepest level to crawl; the seed is depth 1
    pub max_depth: u32,
    pub verbose: bool,
    pub request_timeout: Duration,
}

impl CrawlConfig {
    /// A config with the default settings for the given seed
    pub fn new(seed: Url) -> Self {
        Self {
            seed,
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            workers: DEFAULT_WORKERS,
            max_depth: DEFAULT_MAX_DEPTH,
            verbose: true,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_seed(self.seed.as_str())?;
        validate_output_file(&self.output_file)?;

        if self.workers < 1 {
            return Err(ConfigError::InvalidWorkers(self.workers));
        }
        if self.max_depth < 1 {
            return Err(ConfigError::InvalidMaxDepth(self.max_depth));
        }
        if self.request_timeout < Duration::from_secs(1) {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }

    /// Capacity of the job queue and of the outcome queue
    pub fn queue_capacity(&self) -> usize {
        self.workers.max(1) * QUEUE_SLOTS_PER_WORKER
    }
}

/// Parses the seed: it must be absolute, with a scheme and a host
pub fn validate_seed(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|_| ConfigError::InvalidUrl(raw.to_string()))?;

    if url.scheme().is_empty() || url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::IncompleteUrl(raw.to_string()));
    }

    Ok(url)
}

/// The sitemap path must end in `.xml`
pub fn validate_output_file(path: &Path) -> Result<(), ConfigError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("xml") => Ok(()),
        _ => Err(ConfigError::OutputExtension(path.to_path_buf())),
    }
}
