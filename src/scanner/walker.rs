//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a directory
//! tree and feeding every regular file into the scan pipeline's job stream.
//!
//! # Traversal policy
//!
//! - Hidden entries below the root (see [`is_hidden_name`]) are pruned with
//!   their subtree
//! - Regular files are yielded in directory-listing order, not sorted
//! - Directories are descended depth-first
//! - Symlinks, devices, sockets and FIFOs are skipped; links are never followed
//! - The first directory that cannot be opened or listed ends the walk
//!
//! # Example
//!
//! ```no_run
//! use dupehash::scanner::Walker;
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"));
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(path) => println!("{}", path.display()),
//!         Err(e) => {
//!             eprintln!("Traversal failed: {}", e);
//!             break;
//!         }
//!     }
//! }
//! ```

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use walkdir::WalkDir;

use super::WalkError;

/// Whether a base name marks a hidden entry.
///
/// A name is hidden when it starts with `.`, is longer than one character,
/// and is not `..`. The current-directory name `.` is not hidden.
#[must_use]
pub fn is_hidden_name(name: &OsStr) -> bool {
    let bytes = name.as_encoded_bytes();
    bytes.len() > 1 && bytes[0] == b'.' && bytes != b".."
}

/// Depth-first directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given root directory.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops before the next entry.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Root directory of this walker.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Check that the root exists and is a directory.
    fn validate_root(&self) -> Result<(), WalkError> {
        match std::fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(WalkError::NotADirectory(self.root.clone())),
            Err(e) => Err(self.io_error(self.root.clone(), e)),
        }
    }

    /// Walk the directory tree, yielding paths of regular files.
    ///
    /// An `Err` item means traversal failed; callers are expected to stop
    /// at the first one.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf, WalkError>> + '_ {
        let invalid = self.validate_root().err();
        let entries = invalid.is_none().then(|| {
            WalkDir::new(&self.root)
                .follow_links(false)
                .into_iter()
                .filter_entry(|entry| {
                    // The root is scanned even when its own name is hidden
                    let hidden = entry.depth() > 0 && is_hidden_name(entry.file_name());
                    if hidden {
                        log::trace!("Skipping hidden entry: {}", entry.path().display());
                    }
                    !hidden
                })
        });

        invalid.map(Err).into_iter().chain(
            entries
                .into_iter()
                .flatten()
                .take_while(move |_| {
                    let stop = self.is_shutdown_requested();
                    if stop {
                        log::debug!("Walker: Shutdown requested, stopping iteration");
                    }
                    !stop
                })
                .filter_map(move |entry| match entry {
                    Ok(entry) => {
                        let file_type = entry.file_type();
                        if file_type.is_file() {
                            Some(Ok(entry.into_path()))
                        } else {
                            if !file_type.is_dir() {
                                log::trace!("Skipping non-regular entry: {}", entry.path().display());
                            }
                            None
                        }
                    }
                    Err(e) => Some(Err(self.walkdir_error(e))),
                }),
        )
    }

    /// Feed every discovered file into the job stream.
    ///
    /// Stops early, without error, when no job receiver is left.
    ///
    /// # Errors
    ///
    /// Returns the first traversal error. Jobs already sent stay queued.
    pub fn submit(&self, jobs: &Sender<PathBuf>) -> Result<usize, WalkError> {
        let mut submitted = 0;
        for entry in self.walk() {
            let path = entry?;
            if jobs.send(path).is_err() {
                log::debug!("Walker: job stream closed after {} jobs", submitted);
                break;
            }
            submitted += 1;
        }
        log::debug!("Walker: submitted {} jobs from {}", submitted, self.root.display());
        Ok(submitted)
    }

    /// Classify an I/O error for `path`.
    fn io_error(&self, path: PathBuf, error: io::Error) -> WalkError {
        match error.kind() {
            io::ErrorKind::PermissionDenied => WalkError::PermissionDenied(path),
            io::ErrorKind::NotFound => WalkError::NotFound(path),
            _ => WalkError::Io {
                path,
                source: error,
            },
        }
    }

    /// Convert a walkdir error, keeping the underlying I/O error when present.
    fn walkdir_error(&self, error: walkdir::Error) -> WalkError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        log::debug!("Walker error for {}: {}", path.display(), error);
        let message = error.to_string();
        match error.into_io_error() {
            Some(source) => self.io_error(path, source),
            None => WalkError::Io {
                path,
                source: io::Error::other(message),
            },
        }
    }
}
