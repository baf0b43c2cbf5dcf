//! Concurrent scan pipeline.
//!
//! # Overview
//!
//! A scan runs three stages connected by two unbounded channels:
//!
//! 1. **Walker** (`walker` thread): depth-first traversal, one job per
//!    regular file on the job stream
//! 2. **Worker pool** (see [`pool`]): N hashing workers, one
//!    [`FileRecord`] per job on the result stream
//! 3. **Aggregator** (see [`aggregator`]): runs on the calling thread,
//!    reports throughput and buffers records
//!
//! The walker reports a traversal failure by sending a sentinel record on
//! the result stream before closing the job stream. The result stream
//! closes once the walker and every worker have released it.
//!
//! On the first failure the scanner sets its cancellation token, drops the
//! result receiver and joins both threads before returning.
//!
//! # Example
//!
//! ```no_run
//! use dupehash::pipeline::{DuplicateScanner, ScanConfig};
//! use std::path::Path;
//!
//! let scanner = DuplicateScanner::new(ScanConfig::default().with_workers(4));
//! let summary = scanner.run(Path::new("."), &()).unwrap();
//! println!("{} duplicates", summary.duplicates);
//! ```

pub mod aggregator;
pub mod pool;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;

pub use aggregator::{Aggregator, Throughput, DEFAULT_TICK_INTERVAL};
pub use pool::WorkerPool;

use crate::progress::ReportSink;
use crate::report::{OrderedResultSet, ReportError, ReportSummary, Reporter};
use crate::scanner::hasher::DEFAULT_BUFFER_SIZE;
use crate::scanner::{
    FileDigester, FileRecord, HashError, Hasher, RecordError, WalkError, Walker,
};

/// Errors that end a scan.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Directory traversal failed.
    #[error(transparent)]
    Traversal(#[from] WalkError),

    /// A file could not be read.
    #[error(transparent)]
    Read(#[from] HashError),

    /// The report could not be produced.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// The scan was interrupted by the user.
    #[error("Scan interrupted by user")]
    Interrupted,

    /// A pipeline thread could not be started.
    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        /// Thread name
        name: &'static str,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The hashing thread pool could not be built.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A pipeline thread panicked.
    #[error("The {0} thread panicked")]
    Panicked(&'static str),
}

impl From<RecordError> for PipelineError {
    fn from(error: RecordError) -> Self {
        match error {
            RecordError::Traversal(e) => Self::Traversal(e),
            RecordError::Read(HashError::Interrupted(_)) => Self::Interrupted,
            RecordError::Read(e) => Self::Read(e),
        }
    }
}

/// Scan configuration.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Number of hashing workers. Defaults to the logical CPU count.
    pub workers: usize,
    /// Interval between progress lines.
    pub tick_interval: Duration,
    /// Read buffer size per worker.
    pub buffer_size: usize,
    /// Optional external shutdown flag (Ctrl+C).
    pub shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            buffer_size: DEFAULT_BUFFER_SIZE,
            shutdown_flag: None,
        }
    }
}

impl ScanConfig {
    /// Set the number of hashing workers (at least one).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the progress interval.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the read buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Runs the walk → hash → aggregate pipeline over one root.
#[derive(Debug, Clone)]
pub struct DuplicateScanner {
    config: ScanConfig,
    digester: Option<Arc<dyn FileDigester>>,
}

impl Default for DuplicateScanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

impl DuplicateScanner {
    /// Create a scanner with the given configuration.
    #[must_use]
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            digester: None,
        }
    }

    /// Hash with `digester` instead of the built-in SHA-1 [`Hasher`].
    ///
    /// The scan's cancellation still stops workers between files, but does
    /// not interrupt a custom digester mid-file. `buffer_size` is ignored.
    #[must_use]
    pub fn with_digester(mut self, digester: Arc<dyn FileDigester>) -> Self {
        self.digester = Some(digester);
        self
    }

    /// The scanner configuration.
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Hash every visible regular file under `root`.
    ///
    /// Progress is emitted to `sink` while hashing runs. The returned set is
    /// sorted by `(digest, path)`.
    ///
    /// # Errors
    ///
    /// Returns the first traversal or read failure, [`PipelineError::Interrupted`]
    /// when the shutdown flag is set, or a thread setup failure.
    pub fn scan(
        &self,
        root: &Path,
        sink: &dyn ReportSink,
    ) -> Result<OrderedResultSet, PipelineError> {
        let cancel = Arc::new(AtomicBool::new(false));
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<PathBuf>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<FileRecord>();

        let digester: Arc<dyn FileDigester> = match self.digester {
            Some(ref digester) => Arc::clone(digester),
            None => Arc::new(
                Hasher::new()
                    .with_buffer_size(self.config.buffer_size)
                    .with_shutdown_flag(Arc::clone(&cancel)),
            ),
        };
        let pool = WorkerPool::new(self.config.workers, digester)
            .with_shutdown_flag(Arc::clone(&cancel))
            .spawn(job_rx, result_tx.clone())?;

        let walker = Walker::new(root).with_shutdown_flag(Arc::clone(&cancel));
        let walker = match thread::Builder::new()
            .name("walker".to_string())
            .spawn(move || produce_jobs(&walker, &job_tx, &result_tx))
        {
            Ok(handle) => handle,
            Err(source) => {
                // The closure never ran, so job_tx is already gone and the pool winds down
                cancel.store(true, Ordering::SeqCst);
                drop(result_rx);
                join(pool, "hash-pool")?;
                return Err(PipelineError::Spawn {
                    name: "walker",
                    source,
                });
            }
        };

        log::info!(
            "Scanning {} with {} workers",
            root.display(),
            self.config.workers
        );

        let mut aggregator = Aggregator::new(sink, self.config.tick_interval);
        let outcome = aggregator.consume(&result_rx, self.config.shutdown_flag.as_deref());

        if outcome.is_err() {
            cancel.store(true, Ordering::SeqCst);
        }
        drop(result_rx);

        let walker_joined = join(walker, "walker");
        let pool_joined = join(pool, "hash-pool");

        outcome?;
        walker_joined?;
        pool_joined?;

        if self.config.is_shutdown_requested() {
            return Err(PipelineError::Interrupted);
        }

        log::info!("Hashed {} files", aggregator.len());
        Ok(aggregator.finish())
    }

    /// Scan `root` and write the report to `sink`.
    ///
    /// # Errors
    ///
    /// Returns any error from [`scan`](Self::scan) or from reporting.
    pub fn run(&self, root: &Path, sink: &dyn ReportSink) -> Result<ReportSummary, PipelineError> {
        let set = self.scan(root, sink)?;
        Ok(Reporter::new(root).report(&set, sink)?)
    }
}

/// Walker thread body: submit jobs, then close the job stream.
///
/// A traversal failure is forwarded as a sentinel record on the result
/// stream before the job stream closes.
fn produce_jobs(walker: &Walker, jobs: &Sender<PathBuf>, results: &Sender<FileRecord>) {
    if let Err(e) = walker.submit(jobs) {
        log::debug!("Walker: traversal failed: {}", e);
        // The aggregator may already be gone
        let _ = results.send(FileRecord::sentinel(e));
    }
}

fn join(handle: JoinHandle<()>, name: &'static str) -> Result<(), PipelineError> {
    handle.join().map_err(|_| {
        log::error!("The {} thread panicked", name);
        PipelineError::Panicked(name)
    })
}
