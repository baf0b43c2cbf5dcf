//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Depth-first directory walking using walkdir
//! - Content hashing with SHA-1
//! - The [`FileRecord`] that flows through the scan pipeline
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and job submission
//! - [`hasher`]: SHA-1 file hashing (streaming)
//!
//! # Example
//!
//! ```no_run
//! use dupehash::scanner::{Hasher, Walker};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let walker = Walker::new(Path::new("."));
//! for entry in walker.walk() {
//!     let path = entry.expect("traversal failed");
//!     let digest = hasher.digest_file(&path).expect("read failed");
//!     println!("{}: {} bytes", path.display(), digest.size);
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::path::PathBuf;

// Re-export main types
pub use hasher::{
    digest_bytes, digest_to_hex, hex_to_digest, Digest, FileDigest, FileDigester, Hasher,
};
pub use walker::{is_hidden_name, Walker};

/// One unit of work and result in the scan pipeline.
///
/// Records are created by a hashing worker, or by the job producer as a
/// sentinel (empty path) carrying a traversal error. They are read-only
/// once created.
#[derive(Debug)]
pub struct FileRecord {
    /// Path of the file, joined onto the scan root. Empty for a sentinel.
    pub path: PathBuf,
    /// SHA-1 digest of the content, `None` when the file was not read.
    pub digest: Option<Digest>,
    /// Bytes read from the file, 0 when unread due to error.
    pub size: u64,
    /// Failure cause. A record carrying an error is terminal for the scan.
    pub error: Option<RecordError>,
}

impl FileRecord {
    /// Create a record for a successfully hashed file.
    #[must_use]
    pub fn hashed(path: PathBuf, digest: Digest, size: u64) -> Self {
        Self {
            path,
            digest: Some(digest),
            size,
            error: None,
        }
    }

    /// Create a record for a file that could not be hashed.
    #[must_use]
    pub fn failed(path: PathBuf, error: HashError) -> Self {
        Self {
            path,
            digest: None,
            size: 0,
            error: Some(RecordError::Read(error)),
        }
    }

    /// Create the sentinel record the job producer sends when traversal fails.
    #[must_use]
    pub fn sentinel(error: WalkError) -> Self {
        Self {
            path: PathBuf::new(),
            digest: None,
            size: 0,
            error: Some(RecordError::Traversal(error)),
        }
    }

    /// Whether this record carries a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Errors that can occur while traversing the directory tree.
#[derive(thiserror::Error, Debug)]
pub enum WalkError {
    /// Permission was denied when opening or listing a directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The scan root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Any other I/O error while listing a directory.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Hashing was abandoned because shutdown was requested.
    #[error("Hashing interrupted: {0}")]
    Interrupted(PathBuf),
}

impl HashError {
    /// Classify an I/O error raised while opening or reading `path`.
    pub(crate) fn from_io(path: &std::path::Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// The failure a [`FileRecord`] can carry.
#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    /// Directory traversal failed.
    #[error(transparent)]
    Traversal(#[from] WalkError),

    /// A file could not be read.
    #[error(transparent)]
    Read(#[from] HashError),
}
