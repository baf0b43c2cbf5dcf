//! Result stream consumer.
//!
//! The [`Aggregator`] drains the result stream on the caller's thread. It
//! tracks throughput in one-second windows, stops at the first failed
//! record, and buffers every accepted record for the final ordered report.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use super::PipelineError;
use crate::progress::ReportSink;
use crate::report::{bytes_to_mb, OrderedResultSet};
use crate::scanner::FileRecord;

/// Default progress interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// How often the consume loop wakes to check for shutdown.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// One progress observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    /// MB/s over the last window
    pub mbps: f64,
    /// Records received in the last window
    pub files: usize,
    /// Incremental mean of `mbps` over all ticks so far
    pub average_mbps: f64,
}

/// Consumes [`FileRecord`]s, emits progress, buffers results.
pub struct Aggregator<'a> {
    sink: &'a dyn ReportSink,
    tick_interval: Duration,
    window_start: Instant,
    window_bytes: u64,
    window_files: usize,
    ticks: u32,
    average_mbps: f64,
    records: Vec<FileRecord>,
}

impl<'a> Aggregator<'a> {
    /// Create an aggregator whose first window starts now.
    #[must_use]
    pub fn new(sink: &'a dyn ReportSink, tick_interval: Duration) -> Self {
        Self::starting_at(sink, tick_interval, Instant::now())
    }

    /// Create an aggregator whose first window starts at `start`.
    #[must_use]
    pub fn starting_at(sink: &'a dyn ReportSink, tick_interval: Duration, start: Instant) -> Self {
        Self {
            sink,
            tick_interval,
            window_start: start,
            window_bytes: 0,
            window_files: 0,
            ticks: 0,
            average_mbps: 0.0,
            records: Vec::new(),
        }
    }

    /// Account for one record observed at `now`.
    ///
    /// # Errors
    ///
    /// Returns the record's failure if it carries one. The failed record is
    /// not buffered and the caller must stop consuming.
    pub fn observe(&mut self, mut record: FileRecord, now: Instant) -> Result<(), PipelineError> {
        self.window_bytes += record.size;
        self.window_files += 1;

        if let Some(error) = record.error.take() {
            log::debug!("Aggregator: aborting on {}", error);
            return Err(error.into());
        }

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed > self.tick_interval {
            self.tick(elapsed);
            self.window_start = now;
        }

        self.sink.on_record(&record);
        self.records.push(record);
        Ok(())
    }

    fn tick(&mut self, elapsed: Duration) {
        self.ticks += 1;
        let mbps = bytes_to_mb(self.window_bytes) / elapsed.as_secs_f64();
        self.average_mbps += (mbps - self.average_mbps) / f64::from(self.ticks);

        self.sink.on_throughput(&Throughput {
            mbps,
            files: self.window_files,
            average_mbps: self.average_mbps,
        });

        self.window_bytes = 0;
        self.window_files = 0;
    }

    /// Drain `results` until every sender is gone.
    ///
    /// When `shutdown` is given, it is polled while waiting; a set flag ends
    /// consumption with [`PipelineError::Interrupted`].
    ///
    /// # Errors
    ///
    /// Returns the first failure carried by a record, or `Interrupted`.
    pub fn consume(
        &mut self,
        results: &Receiver<FileRecord>,
        shutdown: Option<&AtomicBool>,
    ) -> Result<(), PipelineError> {
        let interrupted = || shutdown.is_some_and(|f| f.load(Ordering::SeqCst));

        loop {
            if interrupted() {
                log::info!("Aggregator: shutdown requested");
                return Err(PipelineError::Interrupted);
            }
            match results.recv_timeout(SHUTDOWN_POLL) {
                Ok(record) => self.observe(record, Instant::now())?,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    log::debug!(
                        "Aggregator: result stream closed after {} records",
                        self.records.len()
                    );
                    return Ok(());
                }
            }
        }
    }

    /// Number of progress ticks emitted so far.
    #[must_use]
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Running average throughput in MB/s.
    #[must_use]
    pub fn average_mbps(&self) -> f64 {
        self.average_mbps
    }

    /// Number of buffered records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record has been buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sort the buffered records for reporting.
    #[must_use]
    pub fn finish(self) -> OrderedResultSet {
        OrderedResultSet::new(self.records)
    }
}
