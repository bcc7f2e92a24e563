// src/sitemap/writer.rs
// =============================================================================
// Streams page records into a sitemap XML document.
//
// Records arrive in the order fetches complete, so the writer never buffers
// the whole document: the root element is opened on first use, each record
// becomes one <url> entry right away, and finish() closes the root.
//
// Output:
//   <?xml version="1.0" encoding="UTF-8"?>
//   <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//     <url><loc>https://example.com/</loc><priority>1.0</priority></url>
//   </urlset>
//
// Rust concepts:
// - Generics: SitemapWriter<W: Write> works with files and in-memory buffers
// - Consuming methods: finish(self) can only be called once
// =============================================================================

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::SecondsFormat;
use serde::Serialize;

use super::{ChangeFrequency, PageRecord};
use crate::error::SitemapError;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const URLSET_OPEN: &str = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#;
const URLSET_CLOSE: &str = "</urlset>";

// The shape of one <url> element
// Fields set to None are left out of the document entirely
#[derive(Serialize)]
struct UrlEntry<'a> {
    loc: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    lastmod: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    changefreq: Option<ChangeFrequency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<String>,
}

impl<'a> UrlEntry<'a> {
    fn from_record(record: &'a PageRecord) -> Self {
        Self {
            loc: &record.location,
            lastmod: record
                .last_modified
                .map(|date| date.to_rfc3339_opts(SecondsFormat::Secs, true)),
            changefreq: record.change_frequency,
            priority: Some(format!("{:.1}", record.priority)),
        }
    }
}

/// Incremental sitemap document writer
pub struct SitemapWriter<W: Write> {
    out: W,
    root_open: bool,
    entries: usize,
}

impl SitemapWriter<BufWriter<File>> {
    /// Creates (or truncates) the sitemap file at `path`
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SitemapError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> SitemapWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            root_open: false,
            entries: 0,
        }
    }

    /// Number of <url> entries written so far
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Appends one page to the document
    ///
    /// Encoding failures only skip this page (`SitemapError::Encoding`);
    /// I/O failures are reported as `SitemapError::Sink`.
    pub fn write_page(&mut self, record: &PageRecord) -> Result<(), SitemapError> {
        let entry = UrlEntry::from_record(record);
        let xml = quick_xml::se::to_string_with_root("url", &entry).map_err(|e| {
            SitemapError::Encoding {
                location: record.location.clone(),
                reason: e.to_string(),
            }
        })?;

        self.open_root()?;
        writeln!(self.out, "  {}", xml)?;
        self.entries += 1;
        Ok(())
    }

    /// Closes the root element, flushes, and hands back the underlying writer
    ///
    /// An empty crawl still produces a complete document with an empty root.
    pub fn finish(mut self) -> Result<W, SitemapError> {
        self.open_root()?;
        writeln!(self.out, "{}", URLSET_CLOSE)?;
        self.out.flush()?;
        Ok(self.out)
    }

    fn open_root(&mut self) -> Result<(), SitemapError> {
        if !self.root_open {
            writeln!(self.out, "{}", XML_DECLARATION)?;
            writeln!(self.out, "{}", URLSET_OPEN)?;
            self.root_open = true;
        }
        Ok(())
    }
}
