// src/fetch/links.rs
// =============================================================================
// This module extracts crawlable links from HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
//
// We use the `url` crate to:
// - Resolve relative links against the page (or its <base href>)
// - Compare hosts and strip fragments
//
// A link survives only if it is an http(s) page on the same host, is not
// the crawl seed, and does not point at a known non-page file type.
// =============================================================================

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

// URI schemes that never lead to a crawlable page
pub const NON_NAVIGABLE_SCHEMES: &[&str] = &[
    "mailto:",
    "javascript:",
    "tel:",
    "whatsapp:",
    "callto:",
    "wtai:",
    "sms:",
    "market:",
    "geopoint:",
    "ymsgr:",
    "msnim:",
    "gtalk:",
    "skype:",
];

// Path suffixes of files that are not web pages
pub const SKIPPED_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".tiff", ".pdf", ".txt", ".gif", ".psd", ".ai", ".dwg", ".bmp",
    ".zip", ".tar", ".gzip", ".gz", ".svg", ".avi", ".mov", ".json", ".xml", ".mp3", ".mp4",
    ".wav", ".mid", ".ogg", ".acc", ".ac3", ".ogm", ".cda", ".mpeg", ".swf", ".acg", ".bat",
    ".ttf", ".msi", ".lnk", ".dll", ".db", ".exe", ".doc", ".docx", ".xls", ".xlsx", ".ppt",
    ".pptx",
];

// Extracts the links worth crawling from an HTML page
//
// Parameters:
//   html: the page body
//   page_url: the URL the page was served from (for relative links)
//   seed: the URL the crawl started from; links back to it are dropped
//
// Returns: absolute, fragment-free URLs on page_url's host, in document
// order, each at most once
pub fn extract_links(html: &str, page_url: &Url, seed: &Url) -> Vec<String> {
    let document = Html::parse_document(html);

    // Both selectors are constants and known to be valid
    let anchors = Selector::parse("a[href]").expect("valid anchor selector");
    let base_selector = Selector::parse("base[href]").expect("valid base selector");

    // <base href> changes what relative links are resolved against
    let base = document
        .select(&base_selector)
        .next()
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone());

    let host = page_url.host_str();
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&anchors) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Some(link) = resolve_link(&base, href) else {
            continue;
        };

        if !is_page_link(&link, host, seed) {
            continue;
        }

        let link = link.to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    links
}

// Cleans up a raw href and resolves it to an absolute URL
//
// Returns None for empty links, fragment-only links, non-navigable
// schemes and anything the url crate can't parse.
fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = sanitize_href(href)?;

    let mut url = base.join(href).ok()?;
    url.set_fragment(None);

    // Only web pages can end up in a sitemap
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    Some(url)
}

// Trims whitespace, drops the fragment and rejects non-navigable schemes
//
// Examples:
//   "  /docs#intro " -> Some("/docs")
//   "#top"           -> None
//   "mailto:a@b.c"   -> None
pub fn sanitize_href(href: &str) -> Option<&str> {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();

    if NON_NAVIGABLE_SCHEMES
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let without_fragment = href.split('#').next().unwrap_or_default().trim();
    if without_fragment.is_empty() {
        return None;
    }

    Some(without_fragment)
}

fn is_page_link(url: &Url, host: Option<&str>, seed: &Url) -> bool {
    url.host_str() == host && url != seed && has_page_extension(url)
}

// Checks the path (not the query string) against SKIPPED_EXTENSIONS
fn has_page_extension(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    let path = path.trim_end_matches('/');

    !SKIPPED_EXTENSIONS
        .iter()
        .any(|extension| path.ends_with(extension))
}
