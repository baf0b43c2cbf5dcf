//! Fixed-size hashing worker pool.
//!
//! Workers share one job receiver and one result sender. A rayon
//! [`ThreadPool::scope`](rayon::ThreadPool::scope) hosts the receive loops;
//! the scope returning means every worker has exited, and only then is the
//! pool's result sender dropped. The result stream therefore closes exactly
//! once, after the last record has been sent.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use super::PipelineError;
use crate::scanner::{FileDigester, FileRecord};

/// Pool of hashing workers.
#[derive(Debug)]
pub struct WorkerPool {
    workers: usize,
    digester: Arc<dyn FileDigester>,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl WorkerPool {
    /// Create a pool with `workers` workers (at least one).
    #[must_use]
    pub fn new(workers: usize, digester: Arc<dyn FileDigester>) -> Self {
        Self {
            workers: workers.max(1),
            digester,
            shutdown_flag: None,
        }
    }

    /// Set the flag that makes workers stop taking jobs.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Number of workers.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Start the workers on a supervising `hash-pool` thread.
    ///
    /// The returned handle finishes after all workers have exited and the
    /// result stream has been released by the pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread pool or the supervising thread cannot
    /// be created.
    pub fn spawn(
        self,
        jobs: Receiver<PathBuf>,
        results: Sender<FileRecord>,
    ) -> Result<JoinHandle<()>, PipelineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("hash-worker-{}", i))
            .build()?;

        thread::Builder::new()
            .name("hash-pool".to_string())
            .spawn(move || {
                let shutdown = self.shutdown_flag.as_deref();
                pool.scope(|scope| {
                    for id in 0..self.workers {
                        let jobs = jobs.clone();
                        let results = results.clone();
                        let digester = self.digester.as_ref();
                        scope.spawn(move |_| worker_loop(id, &jobs, &results, digester, shutdown));
                    }
                });
                drop(results);
                log::debug!(
                    "Worker pool: all {} workers finished, result stream released",
                    self.workers
                );
            })
            .map_err(|source| PipelineError::Spawn {
                name: "hash-pool",
                source,
            })
    }
}

/// Receive paths until the job stream is closed and drained.
fn worker_loop(
    id: usize,
    jobs: &Receiver<PathBuf>,
    results: &Sender<FileRecord>,
    digester: &dyn FileDigester,
    shutdown: Option<&AtomicBool>,
) {
    let mut processed = 0usize;
    for path in jobs.iter() {
        if shutdown.is_some_and(|f| f.load(Ordering::SeqCst)) {
            log::debug!("Worker {}: shutdown requested", id);
            break;
        }

        let record = match digester.digest_file(&path) {
            Ok(digest) => FileRecord::hashed(path, digest.digest, digest.size),
            Err(e) => {
                log::debug!("Worker {}: {}", id, e);
                FileRecord::failed(path, e)
            }
        };

        if results.send(record).is_err() {
            log::debug!("Worker {}: result stream closed", id);
            break;
        }
        processed += 1;
    }
    log::trace!("Worker {} exiting after {} files", id, processed);
}
