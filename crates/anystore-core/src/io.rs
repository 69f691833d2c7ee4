//! Chunked data transfer.
//!
//! Every backend moves bytes between caller streams and its medium through
//! [`copy_exact`] or [`copy_to_end`], so progress callbacks, deadlines and
//! short-source detection behave identically everywhere.

use std::io::{self, Read, Write};
use std::time::Instant;

use tracing::trace;

use crate::error::{Result, StorageError};
use crate::pairs::{IoCallback, OperationOptions};

/// Default chunk size for copies (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Settings of one transfer.
#[derive(Clone, Default)]
pub struct CopyOptions {
    /// Bytes per chunk. Zero means [`DEFAULT_CHUNK_SIZE`].
    pub chunk_size: usize,
    /// Called after every chunk with that chunk's length.
    pub callback: Option<IoCallback>,
    /// Fail with `Timeout` once this instant has passed.
    pub deadline: Option<Instant>,
}

impl std::fmt::Debug for CopyOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyOptions")
            .field("chunk_size", &self.chunk_size)
            .field("callback", &self.callback.is_some())
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl CopyOptions {
    /// Take the callback and deadline from parsed operation options.
    #[must_use]
    pub fn from_options(opts: &OperationOptions, chunk_size: usize) -> Self {
        Self {
            chunk_size,
            callback: opts.io_callback.clone(),
            deadline: opts.deadline,
        }
    }

    fn chunk(&self) -> usize {
        if self.chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            self.chunk_size
        }
    }

    fn check_deadline(&self, transferred: u64) -> Result<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(StorageError::Timeout { transferred })
            }
            _ => Ok(()),
        }
    }
}

/// Copy exactly `size` bytes from `source` to `sink`.
///
/// A source that ends early fails with `InvalidArgument`.
pub fn copy_exact(
    source: &mut dyn Read,
    sink: &mut dyn Write,
    size: u64,
    opts: &CopyOptions,
) -> Result<u64> {
    let copied = copy_inner(source, sink, Some(size), opts)?;
    if copied < size {
        return Err(StorageError::invalid_argument(format!(
            "source ended after {copied} of {size} bytes"
        )));
    }
    Ok(copied)
}

/// Copy everything `source` yields into `sink`.
pub fn copy_to_end(source: &mut dyn Read, sink: &mut dyn Write, opts: &CopyOptions) -> Result<u64> {
    copy_inner(source, sink, None, opts)
}

/// Discard the first `n` bytes of `source`.
pub fn skip(source: &mut dyn Read, n: u64) -> Result<()> {
    if n == 0 {
        return Ok(());
    }
    let skipped = io::copy(&mut Read::take(&mut *source, n), &mut io::sink())?;
    if skipped < n {
        return Err(StorageError::invalid_argument(format!(
            "source ended after {skipped} of {n} bytes to skip"
        )));
    }
    Ok(())
}

fn copy_inner(
    source: &mut dyn Read,
    sink: &mut dyn Write,
    limit: Option<u64>,
    opts: &CopyOptions,
) -> Result<u64> {
    let mut buf = vec![0u8; opts.chunk()];
    let mut copied: u64 = 0;
    opts.check_deadline(copied)?;

    loop {
        let want = match limit {
            Some(limit) if copied >= limit => break,
            Some(limit) => usize::try_from(limit - copied).map_or(buf.len(), |r| r.min(buf.len())),
            None => buf.len(),
        };
        let n = match source.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        sink.write_all(&buf[..n])?;
        copied += n as u64;
        trace!(chunk = n, copied, "copied chunk");
        if let Some(callback) = &opts.callback {
            callback(n);
        }
        opts.check_deadline(copied)?;
    }

    sink.flush()?;
    Ok(copied)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
