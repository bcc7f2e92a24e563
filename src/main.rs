// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (stderr, warnings only in verbose mode)
// 3. Open the sitemap file
// 4. Crawl the site, stopping early on Ctrl-C
// 5. Exit with proper code (0 = success, 1 = runtime error, 2 = bad arguments)
//
// Rust concepts used:
// - async/await: Because we need to make many network requests concurrently
// - Result<T, E>: For error handling (T = success type, E = error type)
// - Arc: the page fetcher is shared by every worker task
// =============================================================================

// Module declarations - tells Rust about our other source files
mod cli; // src/cli.rs - command-line parsing
mod crawl; // src/crawl/ - worker pool, dispatcher, crawl state
mod error; // src/error.rs - error types
mod fetch; // src/fetch/ - HTTP fetching and link extraction
mod progress; // src/progress.rs - verbose progress line
mod sitemap; // src/sitemap/ - sitemap entries and the XML writer

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use crawl::CrawlConfig;
use fetch::HttpFetcher;
use sitemap::SitemapWriter;

// The #[tokio::main] attribute transforms our async main into a real main function
// It creates a tokio runtime and runs our async code inside it
#[tokio::main]
async fn main() {
    // Invalid arguments: clap prints the message (or --help) and we exit
    // with clap's code, 2 for errors and 0 for help/version
    let cli = match Cli::try_parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(e.exit_code());
        }
    };

    let config = CrawlConfig::from(cli);
    init_logging(config.verbose);

    let exit_code = match run(config).await {
        Ok(()) => 0,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Runtime error: {:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

// This is the main application logic
// Returns:
//   Ok(()) = sitemap written (possibly partial, after Ctrl-C)
//   Err = the sitemap could not be written
async fn run(config: CrawlConfig) -> Result<()> {
    config.validate().context("invalid crawl settings")?;

    let sitemap = SitemapWriter::create(&config.output_file).with_context(|| {
        format!(
            "could not create sitemap file {}",
            config.output_file.display()
        )
    })?;

    let fetcher = HttpFetcher::new(config.seed.clone(), config.request_timeout)
        .context("could not build the HTTP client")?;

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    let (summary, _file) = crawl::crawl_website(&config, Arc::new(fetcher), sitemap, cancel)
        .await
        .with_context(|| format!("could not write {}", config.output_file.display()))?;

    if summary.cancelled {
        warn!(
            pages = summary.pages_written,
            "crawl interrupted, sitemap contains the pages fetched so far"
        );
    }
    info!(
        found = summary.urls_found,
        written = summary.pages_written,
        failed = summary.pages_failed,
        skipped = summary.pages_skipped,
        elapsed = ?summary.elapsed,
        output = %config.output_file.display(),
        "sitemap written"
    );

    Ok(())
}

// Verbose mode shows warnings (failed pages, interruptions); otherwise only
// errors are printed. Logs go to stderr so they never mix with other output.
fn init_logging(verbose: bool) {
    let level = if verbose { "warn" } else { "error" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// First Ctrl-C: stop the crawl and keep what was fetched
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!();
            warn!("interrupted, finishing the sitemap");
            cancel.cancel();
        }
    });
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why is the sitemap file opened before crawling?
//    - If the path can't be written we want to fail right away,
//      not after crawling the whole site
//
// 2. What does CancellationToken do?
//    - It's a shared "stop" flag that tasks can await
//    - Every worker and the dispatcher hold a clone of the same token
//    - cancel() wakes all of them up at once
//
// 3. Why std::process::exit() at the end?
//    - main() can't return an arbitrary exit code directly
//    - exit() lets us report 0, 1 or 2 to the shell (or CI pipeline)
// -----------------------------------------------------------------------------
