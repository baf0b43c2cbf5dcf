//! SHA-1 file hasher with streaming support.
//!
//! # Overview
//!
//! This module provides the [`Hasher`] struct for computing SHA-1 digests
//! of file contents. Files are streamed through a fixed-size buffer, so
//! memory use does not grow with file size.
//!
//! # Example
//!
//! ```no_run
//! use dupehash::scanner::{digest_to_hex, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let result = hasher.digest_file(Path::new("Cargo.toml")).unwrap();
//! println!("{} ({} bytes)", digest_to_hex(&result.digest), result.size);
//! ```

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sha1::{Digest as _, Sha1};

use super::HashError;

/// A SHA-1 digest.
pub type Digest = [u8; 20];

/// Default read buffer size for streaming (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Digest and byte count of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDigest {
    /// SHA-1 of the full content
    pub digest: Digest,
    /// Number of bytes read
    pub size: u64,
}

/// Streaming SHA-1 file hasher.
///
/// Stateless apart from its configuration; one instance is shared by all
/// workers behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            shutdown_flag: None,
        }
    }

    /// Set the read buffer size (minimum 1 byte).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Set the shutdown flag, checked between buffer reads.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Configured read buffer size.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Compute the SHA-1 digest of a file's full content.
    ///
    /// The file is opened read-only and closed before returning, on every
    /// path. No partial digest is ever returned.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened, a read fails
    /// mid-stream, or shutdown is requested while reading.
    pub fn digest_file(&self, path: &Path) -> Result<FileDigest, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut state = Sha1::new();
        let mut buffer = vec![0u8; self.buffer_size];
        let mut size = 0u64;

        loop {
            if self.is_shutdown_requested() {
                return Err(HashError::Interrupted(path.to_path_buf()));
            }
            let n = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            state.update(&buffer[..n]);
            size += n as u64;
        }

        log::trace!("Hashed {} ({} bytes)", path.display(), size);
        let mut digest = [0u8; 20];
        digest.copy_from_slice(&state.finalize());
        Ok(FileDigest { digest, size })
    }
}

/// Something that turns a file path into its content digest.
///
/// [`Hasher`] is the implementation used by the scan pipeline; the worker
/// pool only depends on this trait.
pub trait FileDigester: Send + Sync + std::fmt::Debug {
    /// Digest the full content of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be read.
    fn digest_file(&self, path: &Path) -> Result<FileDigest, HashError>;
}

impl FileDigester for Hasher {
    fn digest_file(&self, path: &Path) -> Result<FileDigest, HashError> {
        Hasher::digest_file(self, path)
    }
}

/// SHA-1 of an in-memory byte slice.
#[must_use]
pub fn digest_bytes(data: &[u8]) -> Digest {
    let mut digest = [0u8; 20];
    digest.copy_from_slice(&Sha1::digest(data));
    digest
}

/// Format a digest as 40 lowercase hex characters.
#[must_use]
pub fn digest_to_hex(digest: &Digest) -> String {
    hex::encode(digest)
}

/// Parse 40 hex characters back into a digest.
///
/// Returns `None` on wrong length or non-hex input.
#[must_use]
pub fn hex_to_digest(text: &str) -> Option<Digest> {
    let mut digest = [0u8; 20];
    hex::decode_to_slice(text, &mut digest).ok()?;
    Some(digest)
}
