//! dupehash - concurrent duplicate file scanner
//!
//! Walks a directory tree, hashes every visible regular file with SHA-1 on a
//! pool of worker threads, and reports files sorted by digest so duplicates
//! sit next to each other.
//!
//! # Modules
//!
//! - [`scanner`]: directory walking, SHA-1 hashing, the [`scanner::FileRecord`]
//! - [`pipeline`]: walker thread, worker pool, aggregator and the
//!   [`pipeline::DuplicateScanner`] that wires them together
//! - [`report`]: ordered result set and duplicate accounting
//! - [`progress`]: report sinks (text, JSON, in-memory)
//! - [`cli`], [`logging`], [`signal`], [`error`]: binary plumbing

pub mod cli;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod signal;

use anyhow::Context;

use cli::{Cli, OutputFormat};
use error::ExitCode;
use pipeline::{DuplicateScanner, ScanConfig};
use progress::{ConsoleSink, JsonSink, ReportSink};

/// Run the scanner for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error if the signal handler cannot be installed or the scan
/// or report fails. A Ctrl+C surfaces as
/// [`PipelineError::Interrupted`](pipeline::PipelineError::Interrupted).
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let handler = signal::install_handler()?;

    let mut config = ScanConfig::default()
        .with_buffer_size(cli.buffer_size)
        .with_shutdown_flag(handler.get_flag());
    if let Some(jobs) = cli.jobs {
        config = config.with_workers(jobs);
    }
    log::debug!("Scan configuration: {:?}", config);

    let sink: Box<dyn ReportSink> = match cli.output {
        OutputFormat::Text => Box::new(ConsoleSink::stdio(cli.quiet)),
        OutputFormat::Json => Box::new(JsonSink::stdio(cli.quiet)),
    };

    let summary = DuplicateScanner::new(config)
        .run(&cli.path, sink.as_ref())
        .with_context(|| format!("Failed to scan {}", cli.path.display()))?;

    log::info!(
        "{} files, {} duplicates ({} bytes)",
        summary.files,
        summary.duplicates,
        summary.duplicate_bytes
    );
    Ok(ExitCode::Success)
}
