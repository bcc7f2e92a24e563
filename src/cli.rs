// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
//   sitemap-crawler --url https://example.com --output-file sitemap.xml \
//                   --parallel 5 --max-depth 4 --verbose=false
//
// Every flag is validated while parsing, so a Cli value that exists is
// always a valid crawl config. Invalid input makes clap print an error and
// the program exit with code 2.
//
// The older single-dash spelling (-url, -max-depth, ...) is still accepted:
// normalize_flags() rewrites it to the double-dash form before clap sees it.
//
// Rust concepts:
// - Derive macros: clap generates the parser from the struct
// - Value parsers: plain functions that turn a &str into a typed value
// - From trait: converting the parsed Cli into a CrawlConfig
// =============================================================================

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use url::Url;

use crate::crawl::{
    validate_output_file, validate_seed, CrawlConfig, DEFAULT_MAX_DEPTH, DEFAULT_OUTPUT_FILE,
    DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS,
};
use crate::error::ConfigError;

// Long flags that may also be written with a single dash
const LONG_FLAGS: &[&str] = &[
    "url",
    "output-file",
    "parallel",
    "max-depth",
    "verbose",
    "timeout",
    "help",
    "version",
];

#[derive(Parser, Debug)]
#[command(
    name = "sitemap-crawler",
    version,
    about = "Crawls a website breadth-first and writes its pages into a sitemap",
    long_about = "sitemap-crawler starts at one URL, follows the links it finds on the same host \
                  up to a maximum depth, and writes every page it reached into a sitemap XML file."
)]
pub struct Cli {
    /// URL to start crawling from (e.g. https://example.com)
    #[arg(long, value_parser = parse_seed)]
    pub url: Url,

    /// Where to write the sitemap; must end in .xml
    #[arg(long, default_value = DEFAULT_OUTPUT_FILE, value_parser = parse_output_file)]
    pub output_file: PathBuf,

    /// Number of pages fetched at the same time
    #[arg(
        long,
        default_value_t = DEFAULT_WORKERS as u32,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub parallel: u32,

    /// Deepest level to crawl; the start page is depth 1
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_DEPTH,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_depth: u32,

    /// Print progress and page errors to stderr (--verbose=false to silence)
    #[arg(
        long,
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub verbose: bool,

    /// Seconds to wait for a single page before giving up on it
    #[arg(
        long,
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,
}

impl Cli {
    /// Parses `args` (program name first), accepting single-dash long flags
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_flags(args))
    }
}

impl From<Cli> for CrawlConfig {
    fn from(cli: Cli) -> Self {
        let mut config = CrawlConfig::new(cli.url);
        config.output_file = cli.output_file;
        config.workers = cli.parallel as usize;
        config.max_depth = cli.max_depth;
        config.verbose = cli.verbose;
        config.request_timeout = Duration::from_secs(cli.timeout);
        config
    }
}

fn parse_seed(raw: &str) -> Result<Url, ConfigError> {
    validate_seed(raw)
}

fn parse_output_file(raw: &str) -> Result<PathBuf, ConfigError> {
    let path = PathBuf::from(raw);
    validate_output_file(&path)?;
    Ok(path)
}

// Rewrites "-url" / "-url=x" to "--url" / "--url=x" for the known long flags
//
// The program name (first argument) and anything else are left untouched.
fn normalize_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .enumerate()
        .map(|(index, arg)| if index == 0 { arg } else { normalize_flag(arg) })
        .collect()
}

fn normalize_flag(arg: OsString) -> OsString {
    let Some(text) = arg.to_str() else {
        return arg;
    };
    let Some(rest) = text.strip_prefix('-') else {
        return arg;
    };
    if rest.starts_with('-') {
        return arg;
    }

    let name = rest.split('=').next().unwrap_or(rest);
    if LONG_FLAGS.contains(&name) {
        OsString::from(format!("-{}", text))
    } else {
        arg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        let mut full = vec!["sitemap-crawler"];
        full.extend_from_slice(args);
        Cli::try_parse_args(full)
    }

    #[test]
    fn test_valid_arguments() {
        let cli = parse(&[
            "--url",
            "http://example.com",
            "--output-file",
            "example.xml",
            "--parallel",
            "3",
            "--max-depth",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.url.as_str(), "http://example.com/");
        assert_eq!(cli.output_file, PathBuf::from("example.xml"));
        assert_eq!(cli.parallel, 3);
        assert_eq!(cli.max_depth, 3);
        assert!(cli.verbose);
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["--url", "https://example.com"]).unwrap();
        let config = CrawlConfig::from(cli);

        assert_eq!(config.output_file, PathBuf::from("./temp.xml"));
        assert_eq!(config.workers, 3);
        assert_eq!(config.max_depth, 3);
        assert!(config.verbose);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_arguments_exit_with_usage_error() {
        let cases: &[&[&str]] = &[
            // no scheme
            &["--url", "example.com"],
            &["--url", "http://example.com", "--output-file", "example.pdf"],
            &["--url", "http://example.com", "--parallel", "0"],
            &["--url", "http://example.com", "--max-depth", "0"],
            &["--url", "http://example.com", "--timeout", "0"],
            &["--url", "http://example.com", "--parallel", "many"],
            // --url is required
            &["--max-depth", "2"],
        ];

        for args in cases {
            let err = parse(args).unwrap_err();
            assert_eq!(err.exit_code(), 2, "args: {:?}", args);
        }
    }

    #[test]
    fn test_single_dash_flags() {
        let cli = parse(&[
            "-url",
            "http://example.com",
            "-output-file",
            "example.xml",
            "-parallel",
            "5",
            "-max-depth=2",
            "-verbose=false",
        ])
        .unwrap();

        assert_eq!(cli.parallel, 5);
        assert_eq!(cli.max_depth, 2);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_verbose_flag_forms() {
        let bare = parse(&["--url", "http://example.com", "--verbose"]).unwrap();
        assert!(bare.verbose);

        let off = parse(&["--url", "http://example.com", "--verbose=false"]).unwrap();
        assert!(!off.verbose);
    }

    #[test]
    fn test_help_is_not_an_error_exit() {
        let err = parse(&["-help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        assert_eq!(err.exit_code(), 0);
    }

    #[test]
    fn test_normalize_leaves_values_alone() {
        let args = normalize_flags(["prog", "-url", "-x", "--parallel", "-verbose"]);
        let expected: Vec<OsString> = ["prog", "--url", "-x", "--parallel", "--verbose"]
            .into_iter()
            .map(OsString::from)
            .collect();
        assert_eq!(args, expected);
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why validate in value parsers?
//    - clap reports the problem with the flag name and the usage line
//    - The rest of the program never sees an invalid value
//
// 2. What is OsString?
//    - Command-line arguments aren't guaranteed to be valid UTF-8
//    - OsString holds them as the OS gave them; to_str() returns None
//      when they aren't UTF-8, and we leave those arguments untouched
//
// 3. Why `impl From<Cli> for CrawlConfig`?
//    - It keeps the crawl code independent of clap
//    - Tests can build a CrawlConfig directly without parsing flags
// -----------------------------------------------------------------------------
