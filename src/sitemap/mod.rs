// src/sitemap/mod.rs
// =============================================================================
// The sitemap data model.
//
// A PageRecord is what the crawler knows about one fetched page: where it
// lives, when it last changed, how deep in the crawl it was found and which
// same-host pages it links to. The writer submodule turns records into XML.
//
// Rust concepts:
// - Option<T>: optional sitemap fields (lastmod, changefreq)
// - Manual trait impls: Display and Serialize for ChangeFrequency
// =============================================================================

mod writer;

pub use writer::SitemapWriter;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::fetch::FetchedPage;

/// Lowest priority handed out; depths past the table clamp to it
pub const MIN_PRIORITY: f64 = 0.1;

/// Expected update cadence of a page, as listed in <changefreq>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFrequency::Always => "Always",
            ChangeFrequency::Hourly => "Hourly",
            ChangeFrequency::Daily => "Daily",
            ChangeFrequency::Weekly => "Weekly",
            ChangeFrequency::Monthly => "Monthly",
            ChangeFrequency::Yearly => "Yearly",
            ChangeFrequency::Never => "Never",
        }
    }
}

impl fmt::Display for ChangeFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Serialized as element text: <changefreq>Daily</changefreq>
impl Serialize for ChangeFrequency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One crawled page, ready to become a sitemap entry
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    /// The URL that was requested for this page
    pub location: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub change_frequency: Option<ChangeFrequency>,
    /// Derived from depth, see priority_for_depth()
    pub priority: f64,
    /// Breadth-first distance from the seed (seed = 1)
    pub depth: u32,
    /// Absolute same-host links found on the page, in document order
    pub links: Vec<String>,
}

impl PageRecord {
    /// Builds the record for a page fetched at the given crawl depth
    pub fn from_fetched(page: FetchedPage, depth: u32) -> Self {
        Self {
            location: page.location,
            last_modified: page.last_modified,
            change_frequency: page.change_frequency,
            priority: priority_for_depth(depth),
            depth,
            links: page.links,
        }
    }
}

// Maps a crawl depth to a sitemap priority
//
// depth 1 -> 1.0, depth 2 -> 0.9, ... depth 9 -> 0.2
// Anything deeper clamps to MIN_PRIORITY (0.1).
//
// The value is computed in tenths and divided once, so every result is the
// exact f64 of its decimal literal (0.9, 0.8, ...).
pub fn priority_for_depth(depth: u32) -> f64 {
    let tenths = 11u32.saturating_sub(depth.max(1)).max(1);
    (f64::from(tenths) / 10.0).max(MIN_PRIORITY)
}
