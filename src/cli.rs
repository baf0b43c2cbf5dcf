//! Command-line interface definitions for dupehash.
//!
//! # Example
//!
//! ```bash
//! # Hash every visible file under ~/Downloads using all CPUs
//! dupehash ~/Downloads
//!
//! # Eight workers, JSON report
//! dupehash -j 8 --output json ~/Downloads
//!
//! # Debug logging
//! dupehash -vv ~/Downloads
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Concurrent SHA-1 duplicate file scanner.
///
/// Hashes every visible regular file under PATH, prints one
/// `<sha1>\t<path>` line per file sorted by digest, and summarizes how many
/// files duplicate an earlier one.
#[derive(Debug, Parser)]
#[command(name = "dupehash")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to scan
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Number of hashing workers (default: logical CPU count)
    #[arg(short, long, value_name = "N", value_parser = parse_jobs)]
    pub jobs: Option<usize>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Read buffer size per worker (e.g. 64KiB, 1MiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size, default_value = "64KiB")]
    pub buffer_size: usize,

    /// Increase verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress lines and all diagnostics except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print errors as a JSON object on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tab-separated lines on stdout, summary on stderr
    Text,
    /// One JSON document on stdout
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a worker count. Zero is rejected.
fn parse_jobs(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(0) => Err("worker count must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("invalid worker count '{}': {}", s, e)),
    }
}

/// Parse a buffer size with an optional binary suffix.
///
/// Accepts B, KiB/K, MiB/M (case-insensitive). Plain numbers are bytes.
///
/// # Examples
///
/// ```
/// use dupehash::cli::parse_size;
///
/// assert_eq!(parse_size("4096").unwrap(), 4096);
/// assert_eq!(parse_size("64KiB").unwrap(), 65536);
/// assert_eq!(parse_size("1m").unwrap(), 1024 * 1024);
/// assert!(parse_size("0").is_err());
/// ```
pub fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);

    let value: usize = number
        .parse()
        .map_err(|_| format!("invalid size '{}'", s))?;
    let multiplier: usize = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kib" => 1024,
        "m" | "mib" => 1024 * 1024,
        other => return Err(format!("unknown size suffix '{}'", other)),
    };

    match value.checked_mul(multiplier) {
        Some(0) => Err("size must be at least 1 byte".to_string()),
        Some(bytes) => Ok(bytes),
        None => Err(format!("size '{}' is too large", s)),
    }
}
