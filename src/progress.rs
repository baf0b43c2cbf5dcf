//! Report sinks: where the pipeline writes progress and results.
//!
//! The aggregator and reporter never print directly. They emit structured
//! events into a [`ReportSink`], so the output format can be swapped or
//! captured in tests without touching process-wide streams.
//!
//! Implementations:
//! - [`ConsoleSink`]: the line-oriented text format (stdout for file lines,
//!   stderr for progress and summary), with an indicatif spinner when
//!   stderr is a terminal
//! - [`JsonSink`]: one JSON document on stdout, written with the summary
//! - [`MemorySink`]: records events in memory
//! - `()`: discards everything

use std::io::{self, IsTerminal, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::pipeline::Throughput;
use crate::report::{ReportLine, ReportSummary};
use crate::scanner::FileRecord;

/// Receiver of pipeline events.
///
/// Implement this trait to receive progress updates and report output.
/// Events from the aggregator arrive while hashing is still running;
/// report lines and the summary arrive after aggregation completes.
///
/// Progress is best effort. A failure to emit a report line or the summary
/// is returned to the reporter and ends the run.
pub trait ReportSink: Send + Sync {
    /// Called for every successfully hashed record the aggregator accepts.
    fn on_record(&self, _record: &FileRecord) {}

    /// Called once per progress tick.
    fn on_throughput(&self, sample: &Throughput);

    /// Called for each file in report order.
    ///
    /// # Errors
    ///
    /// Returns the I/O or encoding failure that kept the line from the output.
    fn on_line(&self, line: &ReportLine) -> io::Result<()>;

    /// Called once after the last line.
    ///
    /// # Errors
    ///
    /// Returns the I/O or encoding failure that kept the summary from the output.
    fn on_summary(&self, summary: &ReportSummary) -> io::Result<()>;
}

impl ReportSink for () {
    fn on_throughput(&self, _sample: &Throughput) {}

    fn on_line(&self, _line: &ReportLine) -> io::Result<()> {
        Ok(())
    }

    fn on_summary(&self, _summary: &ReportSummary) -> io::Result<()> {
        Ok(())
    }
}

/// Encode a file line: `<hex digest>\t<relative path>\n`.
///
/// The path is written as its raw OS bytes, so names that are not valid
/// UTF-8 stay distinct and usable.
#[must_use]
pub fn encode_line(line: &ReportLine) -> Vec<u8> {
    let path = line.path.as_os_str().as_encoded_bytes();
    let mut bytes = Vec::with_capacity(42 + path.len());
    bytes.extend_from_slice(line.digest_hex().as_bytes());
    bytes.push(b'\t');
    bytes.extend_from_slice(path);
    bytes.push(b'\n');
    bytes
}

/// Format a progress line.
#[must_use]
pub fn format_throughput(sample: &Throughput) -> String {
    format!(
        "MB/s: {:.2}\tfiles: {}\tMB/s (total): {:.2}",
        sample.mbps, sample.files, sample.average_mbps
    )
}

/// Format the three summary lines.
#[must_use]
pub fn format_summary(summary: &ReportSummary) -> [String; 3] {
    [
        format!("Duplicates   : {}", summary.duplicates),
        format!("Duplicate MB : {}", summary.duplicate_mb()),
        format!("Total MB     : {}", summary.total_mb()),
    ]
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

type Output = Mutex<Box<dyn Write + Send>>;

fn write_line(out: &Output, text: &str) -> io::Result<()> {
    writeln!(lock(out), "{}", text)
}

fn write_progress(out: &Output, text: &str) {
    if let Err(e) = write_line(out, text) {
        log::warn!("Failed to write progress: {}", e);
    }
}

/// Text output sink.
pub struct ConsoleSink {
    out: Output,
    err: Output,
    spinner: Option<ProgressBar>,
    quiet: bool,
}

impl ConsoleSink {
    /// Sink writing to the process stdout and stderr.
    ///
    /// When `quiet` is true, progress lines are suppressed; file lines and
    /// the summary are still written.
    #[must_use]
    pub fn stdio(quiet: bool) -> Self {
        let spinner = (!quiet && io::stderr().is_terminal()).then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
            );
            pb.set_message("Hashing");
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        Self {
            out: Mutex::new(Box::new(io::BufWriter::new(io::stdout()))),
            err: Mutex::new(Box::new(io::stderr())),
            spinner,
            quiet,
        }
    }

    /// Sink writing to arbitrary writers, without a spinner.
    #[must_use]
    pub fn with_writers(out: Box<dyn Write + Send>, err: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            err: Mutex::new(err),
            spinner: None,
            quiet: false,
        }
    }
}

impl ReportSink for ConsoleSink {
    fn on_record(&self, _record: &FileRecord) {
        if let Some(ref pb) = self.spinner {
            pb.inc(1);
        }
    }

    fn on_throughput(&self, sample: &Throughput) {
        if self.quiet {
            return;
        }
        let text = format_throughput(sample);
        match self.spinner {
            Some(ref pb) => pb.println(text),
            None => write_progress(&self.err, &text),
        }
    }

    fn on_line(&self, line: &ReportLine) -> io::Result<()> {
        if let Some(pb) = self.spinner.as_ref().filter(|pb| !pb.is_finished()) {
            pb.finish_and_clear();
        }
        lock(&self.out).write_all(&encode_line(line))
    }

    fn on_summary(&self, summary: &ReportSummary) -> io::Result<()> {
        if let Some(ref pb) = self.spinner {
            pb.finish_and_clear();
        }
        lock(&self.out).flush()?;
        for text in format_summary(summary) {
            write_line(&self.err, &text)?;
        }
        Ok(())
    }
}

impl Drop for ConsoleSink {
    fn drop(&mut self) {
        if let Some(ref pb) = self.spinner {
            pb.finish_and_clear();
        }
    }
}

#[derive(Serialize)]
struct JsonSummary {
    files: usize,
    duplicates: usize,
    duplicate_bytes: u64,
    total_bytes: u64,
    duplicate_mb: f64,
    total_mb: f64,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    files: &'a [ReportLine],
    summary: JsonSummary,
}

/// JSON output sink.
///
/// Buffers report lines and writes a single document when the summary
/// arrives. Progress lines still go to stderr unless quiet.
pub struct JsonSink {
    out: Output,
    err: Output,
    lines: Mutex<Vec<ReportLine>>,
    quiet: bool,
}

impl JsonSink {
    /// Sink writing the document to stdout and progress to stderr.
    #[must_use]
    pub fn stdio(quiet: bool) -> Self {
        Self::with_writers(Box::new(io::stdout()), Box::new(io::stderr()), quiet)
    }

    /// Sink writing to arbitrary writers.
    #[must_use]
    pub fn with_writers(out: Box<dyn Write + Send>, err: Box<dyn Write + Send>, quiet: bool) -> Self {
        Self {
            out: Mutex::new(out),
            err: Mutex::new(err),
            lines: Mutex::new(Vec::new()),
            quiet,
        }
    }
}

impl ReportSink for JsonSink {
    fn on_throughput(&self, sample: &Throughput) {
        if !self.quiet {
            write_progress(&self.err, &format_throughput(sample));
        }
    }

    fn on_line(&self, line: &ReportLine) -> io::Result<()> {
        lock(&self.lines).push(line.clone());
        Ok(())
    }

    /// Serializes the whole document before writing, so a path that JSON
    /// cannot carry (not valid UTF-8) fails the report without partial output.
    fn on_summary(&self, summary: &ReportSummary) -> io::Result<()> {
        let lines = std::mem::take(&mut *lock(&self.lines));
        let report = JsonReport {
            files: &lines,
            summary: JsonSummary {
                files: summary.files,
                duplicates: summary.duplicates,
                duplicate_bytes: summary.duplicate_bytes,
                total_bytes: summary.total_bytes,
                duplicate_mb: summary.duplicate_mb(),
                total_mb: summary.total_mb(),
            },
        };
        let json = serde_json::to_string_pretty(&report)?;
        write_line(&self.out, &json)?;
        lock(&self.out).flush()
    }
}

/// A recorded sink event.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// A hashed record was accepted (path only)
    Record(std::path::PathBuf),
    /// A progress tick
    Throughput(Throughput),
    /// A report line
    Line(ReportLine),
    /// The final summary
    Summary(ReportSummary),
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SinkEvent>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<SinkEvent> {
        lock(&self.events).clone()
    }

    /// The report lines received so far.
    #[must_use]
    pub fn lines(&self) -> Vec<ReportLine> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Line(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    /// The progress samples received so far.
    #[must_use]
    pub fn throughput(&self) -> Vec<Throughput> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Throughput(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    /// The summary, if one was received.
    #[must_use]
    pub fn summary(&self) -> Option<ReportSummary> {
        lock(&self.events).iter().rev().find_map(|e| match e {
            SinkEvent::Summary(s) => Some(*s),
            _ => None,
        })
    }
}

impl ReportSink for MemorySink {
    fn on_record(&self, record: &FileRecord) {
        lock(&self.events).push(SinkEvent::Record(record.path.clone()));
    }

    fn on_throughput(&self, sample: &Throughput) {
        lock(&self.events).push(SinkEvent::Throughput(*sample));
    }

    fn on_line(&self, line: &ReportLine) -> io::Result<()> {
        lock(&self.events).push(SinkEvent::Line(line.clone()));
        Ok(())
    }

    fn on_summary(&self, summary: &ReportSummary) -> io::Result<()> {
        lock(&self.events).push(SinkEvent::Summary(*summary));
        Ok(())
    }
}
