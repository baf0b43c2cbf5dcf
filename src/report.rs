//! Ordered reporting of scan results.
//!
//! # Overview
//!
//! Results arrive from the hashing workers in no particular order. The
//! [`OrderedResultSet`] restores determinism by sorting on
//! `(digest, path)`, which places every run of equal digests next to each
//! other. The [`Reporter`] then walks the set once, emitting one
//! [`ReportLine`] per file and counting every record after the first of a
//! run as a duplicate.
//!
//! # Example
//!
//! ```
//! use dupehash::report::{OrderedResultSet, Reporter};
//! use dupehash::scanner::{digest_bytes, FileRecord};
//! use std::path::{Path, PathBuf};
//!
//! let hello = digest_bytes(b"hello");
//! let set = OrderedResultSet::new(vec![
//!     FileRecord::hashed(PathBuf::from("/root/b.txt"), hello, 5),
//!     FileRecord::hashed(PathBuf::from("/root/a.txt"), hello, 5),
//! ]);
//!
//! let summary = Reporter::new(Path::new("/root")).report(&set, &()).unwrap();
//! assert_eq!(summary.duplicates, 1);
//! assert_eq!(summary.duplicate_bytes, 5);
//! ```

use std::cmp::Ordering;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::progress::ReportSink;
use crate::scanner::{digest_to_hex, Digest, FileRecord};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Convert a byte count to megabytes (bytes / 1024 / 1024).
#[must_use]
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Errors that can occur while reporting.
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    /// A result path is not located under the scan root.
    #[error("Cannot make {path} relative to {root}")]
    NotUnderRoot {
        /// Offending record path
        path: PathBuf,
        /// The scan root
        root: PathBuf,
    },

    /// A report line or the summary could not be written.
    #[error("Failed to write report: {0}")]
    Output(#[from] io::Error),
}

/// Compare two records by digest, then by raw path bytes.
///
/// Records without a digest sort first.
fn compare_records(a: &FileRecord, b: &FileRecord) -> Ordering {
    a.digest
        .cmp(&b.digest)
        .then_with(|| a.path.as_os_str().cmp(b.path.as_os_str()))
}

/// Scan results sorted by `(digest, path)`.
#[derive(Debug, Default)]
pub struct OrderedResultSet {
    records: Vec<FileRecord>,
}

impl OrderedResultSet {
    /// Sort `records` into a result set.
    #[must_use]
    pub fn new(mut records: Vec<FileRecord>) -> Self {
        records.sort_unstable_by(compare_records);
        Self { records }
    }

    /// The records in report order.
    #[must_use]
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Take ownership of the sorted records.
    #[must_use]
    pub fn into_inner(self) -> Vec<FileRecord> {
        self.records
    }
}

/// One reported file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    /// Content digest
    #[serde(serialize_with = "serialize_digest")]
    pub digest: Digest,
    /// Path relative to the scan root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Whether an earlier line had the same digest
    pub duplicate: bool,
}

impl ReportLine {
    /// Digest as 40 hex characters.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        digest_to_hex(&self.digest)
    }
}

fn serialize_digest<S: serde::Serializer>(digest: &Digest, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&digest_to_hex(digest))
}

/// Aggregate duplication statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    /// Number of reported files
    pub files: usize,
    /// Files whose digest equals the previous file's digest
    pub duplicates: usize,
    /// Total size of the duplicate files
    pub duplicate_bytes: u64,
    /// Total size of all reported files
    pub total_bytes: u64,
}

impl ReportSummary {
    /// Duplicate size in megabytes.
    #[must_use]
    pub fn duplicate_mb(&self) -> f64 {
        bytes_to_mb(self.duplicate_bytes)
    }

    /// Total size in megabytes.
    #[must_use]
    pub fn total_mb(&self) -> f64 {
        bytes_to_mb(self.total_bytes)
    }
}

/// Emits the per-file report and summary for a scan root.
#[derive(Debug, Clone)]
pub struct Reporter {
    root: PathBuf,
}

impl Reporter {
    /// Create a reporter that prints paths relative to `root`.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Walk the ordered set once, emitting lines and the summary to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::NotUnderRoot`] at the first record whose path
    /// is outside the root, or [`ReportError::Output`] when the sink fails to
    /// emit a line or the summary. Lines already emitted are not retracted.
    pub fn report(
        &self,
        set: &OrderedResultSet,
        sink: &dyn ReportSink,
    ) -> Result<ReportSummary, ReportError> {
        let mut summary = ReportSummary::default();
        let mut previous: Option<Digest> = None;

        for record in set.records() {
            let relative = record
                .path
                .strip_prefix(&self.root)
                .map_err(|_| ReportError::NotUnderRoot {
                    path: record.path.clone(),
                    root: self.root.clone(),
                })?;

            let duplicate = record.digest.is_some() && record.digest == previous;
            if !duplicate {
                previous = record.digest;
            }

            summary.files += 1;
            summary.total_bytes += record.size;
            if duplicate {
                summary.duplicates += 1;
                summary.duplicate_bytes += record.size;
            }

            sink.on_line(&ReportLine {
                digest: record.digest.unwrap_or_default(),
                path: relative.to_path_buf(),
                size: record.size,
                duplicate,
            })?;
        }

        log::debug!(
            "Report: {} files, {} duplicates, {} duplicate bytes",
            summary.files,
            summary.duplicates,
            summary.duplicate_bytes
        );
        sink.on_summary(&summary)?;
        Ok(summary)
    }
}
