//! Payload storage for the memory backend.
//!
//! Payloads below a configurable threshold are kept in memory as [`Bytes`].
//! Larger payloads are spilled to temporary files on disk.
//!
//! [`BlobStore`] holds two maps, both [`DashMap`]s: whole objects keyed by
//! absolute path, and multipart parts keyed by `(upload_id, index)`. It
//! knows nothing about object metadata; the backend keeps that in its key
//! index.
//!
//! # Spillover to Disk
//!
//! When a payload exceeds the threshold its bytes are written to a file
//! created with [`tempfile`]. The file is removed when the entry leaves the
//! map (via the [`Drop`] implementation on [`StoredData`]).
//!
//! # Appends
//!
//! Appended payloads grow in place: an in-memory payload becomes a growable
//! buffer on its first append and spills once it crosses the threshold, and
//! a spilled payload is extended by appending to its file. The running MD5
//! of each appended object is kept so an append only hashes the new bytes.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use anystore_core::checksums::{self, EtagHasher};
use anystore_core::error::{Result, StorageError};
use anystore_core::object::Part;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::{debug, trace, warn};

/// Key of a stored part: `(upload_id, index)`.
type PartKey = (String, u32);

// ---------------------------------------------------------------------------
// WriteResult
// ---------------------------------------------------------------------------

/// Outcome of storing a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    /// Quoted ETag of the stored payload.
    pub etag: String,
    /// Size in bytes.
    pub size: u64,
}

// ---------------------------------------------------------------------------
// StoredData
// ---------------------------------------------------------------------------

/// A stored payload, in memory or spilled to a temp file.
enum StoredData {
    InMemory { data: Bytes },
    Growing { data: Vec<u8> },
    OnDisk { path: PathBuf, size: u64 },
}

impl std::fmt::Debug for StoredData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InMemory { data } => f
                .debug_struct("InMemory")
                .field("size", &data.len())
                .finish(),
            Self::Growing { data } => f
                .debug_struct("Growing")
                .field("size", &data.len())
                .finish(),
            Self::OnDisk { path, size } => f
                .debug_struct("OnDisk")
                .field("path", path)
                .field("size", size)
                .finish(),
        }
    }
}

impl Drop for StoredData {
    fn drop(&mut self) {
        if let Self::OnDisk { path, .. } = self {
            if let Err(e) = std::fs::remove_file(path.as_path()) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "failed to remove temp file");
                }
            } else {
                trace!(path = %path.display(), "removed temp file");
            }
        }
    }
}

impl StoredData {
    fn len(&self) -> u64 {
        match self {
            Self::InMemory { data } => data.len() as u64,
            Self::Growing { data } => data.len() as u64,
            Self::OnDisk { size, .. } => *size,
        }
    }

    fn read_all(&self) -> Result<Bytes> {
        self.read_range(0, self.len())
    }

    /// Read `len` bytes starting at `offset`. The range must lie within the
    /// payload.
    fn read_range(&self, offset: u64, len: u64) -> Result<Bytes> {
        match self {
            Self::InMemory { data } => {
                let start = to_usize(offset)?;
                let end = to_usize(offset + len)?;
                Ok(data.slice(start..end))
            }
            Self::Growing { data } => {
                let start = to_usize(offset)?;
                let end = to_usize(offset + len)?;
                Ok(Bytes::copy_from_slice(&data[start..end]))
            }
            Self::OnDisk { path, .. } => {
                let mut file = File::open(path).map_err(|e| {
                    StorageError::Internal(anyhow::anyhow!(
                        "failed to open temp file {}: {e}",
                        path.display()
                    ))
                })?;
                file.seek(SeekFrom::Start(offset))?;
                let mut buf = vec![0u8; to_usize(len)?];
                file.read_exact(&mut buf).map_err(|e| {
                    StorageError::Internal(anyhow::anyhow!(
                        "failed to read temp file {}: {e}",
                        path.display()
                    ))
                })?;
                Ok(Bytes::from(buf))
            }
        }
    }

    /// Append `tail`, spilling to disk once the payload outgrows
    /// `max_memory_size`. On failure the payload is left as it was.
    fn extend(&mut self, tail: &[u8], max_memory_size: usize) -> Result<()> {
        let in_memory = !matches!(self, Self::OnDisk { .. });
        if in_memory && self.len() + tail.len() as u64 > max_memory_size as u64 {
            let mut grown = self.read_all()?.to_vec();
            grown.extend_from_slice(tail);
            *self = spill_to_disk(&grown)?;
            return Ok(());
        }

        match self {
            Self::InMemory { data } => {
                let mut grown = Vec::with_capacity(data.len() + tail.len());
                grown.extend_from_slice(data);
                grown.extend_from_slice(tail);
                *self = Self::Growing { data: grown };
            }
            Self::Growing { data } => data.extend_from_slice(tail),
            Self::OnDisk { path, size } => {
                let mut file = OpenOptions::new().append(true).open(&*path).map_err(|e| {
                    StorageError::Internal(anyhow::anyhow!(
                        "failed to open temp file {}: {e}",
                        path.display()
                    ))
                })?;
                if let Err(e) = file.write_all(tail) {
                    if let Err(rollback) = file.set_len(*size) {
                        warn!(path = %path.display(), error = %rollback, "failed to truncate temp file");
                    }
                    return Err(StorageError::Internal(anyhow::anyhow!(
                        "failed to append to temp file {}: {e}",
                        path.display()
                    )));
                }
                *size += tail.len() as u64;
            }
        }
        Ok(())
    }
}

fn to_usize(n: u64) -> Result<usize> {
    usize::try_from(n)
        .map_err(|_| StorageError::invalid_argument(format!("{n} bytes do not fit in memory")))
}

// ---------------------------------------------------------------------------
// BlobStore
// ---------------------------------------------------------------------------

/// Payload store with automatic spillover to temp files.
pub struct BlobStore {
    objects: DashMap<String, StoredData>,
    parts: DashMap<PartKey, StoredData>,
    append_digests: DashMap<String, EtagHasher>,
    max_memory_size: usize,
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore")
            .field("objects_count", &self.objects.len())
            .field("parts_count", &self.parts.len())
            .field("max_memory_size", &self.max_memory_size)
            .finish()
    }
}

impl BlobStore {
    /// Create a store that spills payloads above `max_memory_size` bytes.
    #[must_use]
    pub fn new(max_memory_size: usize) -> Self {
        debug!(max_memory_size, "creating BlobStore");
        Self {
            objects: DashMap::new(),
            parts: DashMap::new(),
            append_digests: DashMap::new(),
            max_memory_size,
        }
    }

    /// Store (or replace) the payload of `key`.
    pub fn put(&self, key: &str, data: Bytes) -> Result<WriteResult> {
        let etag = checksums::compute_etag(&data);
        let size = data.len() as u64;
        let stored = self.store_data(data)?;
        trace!(key, size, "stored object data");
        self.objects.insert(key.to_owned(), stored);
        self.append_digests.remove(key);
        Ok(WriteResult { etag, size })
    }

    /// Read `len` bytes of `key` starting at `offset`.
    pub fn read_range(&self, key: &str, offset: u64, len: u64) -> Result<Bytes> {
        let entry = self
            .objects
            .get(key)
            .ok_or_else(|| StorageError::not_found(key))?;
        let total = entry.value().len();
        if offset.checked_add(len).is_none_or(|end| end > total) {
            return Err(StorageError::invalid_argument(format!(
                "range {offset}+{len} outside {total} bytes of {key}"
            )));
        }
        entry.value().read_range(offset, len)
    }

    /// Append `data` to the payload of `key`, which must exist.
    ///
    /// Only the appended bytes are copied and hashed.
    pub fn append(&self, key: &str, data: &[u8]) -> Result<WriteResult> {
        let mut entry = self
            .objects
            .get_mut(key)
            .ok_or_else(|| StorageError::not_found(key))?;
        let mut digest = match self.append_digests.remove(key) {
            Some((_, digest)) => digest,
            None => {
                let mut digest = EtagHasher::new();
                digest.update(&entry.value().read_all()?);
                digest
            }
        };
        entry.value_mut().extend(data, self.max_memory_size)?;
        digest.update(data);

        let etag = digest.clone().finish();
        let size = entry.value().len();
        self.append_digests.insert(key.to_owned(), digest);
        trace!(key, appended = data.len(), size, "appended object data");
        Ok(WriteResult { etag, size })
    }

    /// Remove the payload of `key`. No-op when absent.
    pub fn remove(&self, key: &str) {
        self.append_digests.remove(key);
        if self.objects.remove(key).is_some() {
            trace!(key, "deleted object data");
        }
    }

    /// Store (or replace) part `index` of `upload_id`.
    pub fn write_part(&self, upload_id: &str, index: u32, data: Bytes) -> Result<WriteResult> {
        let etag = checksums::compute_etag(&data);
        let size = data.len() as u64;
        let stored = self.store_data(data)?;
        trace!(upload_id, index, size, "stored part data");
        self.parts.insert((upload_id.to_owned(), index), stored);
        Ok(WriteResult { etag, size })
    }

    /// Remove a single part. No-op when absent.
    pub fn remove_part(&self, upload_id: &str, index: u32) {
        self.parts.remove(&(upload_id.to_owned(), index));
    }

    /// Concatenate `parts` of `upload_id`, in the given order, into `key`.
    ///
    /// Every stored part must still carry the ETag listed for it; a part
    /// rewritten since the list was validated is `InvalidState` and nothing
    /// is stored. The result carries the composite multipart ETag. Parts are
    /// left in place; call [`BlobStore::remove_parts`] once the upload is
    /// retired.
    pub fn assemble(&self, upload_id: &str, key: &str, parts: &[Part]) -> Result<WriteResult> {
        let mut combined = Vec::new();
        let mut part_etags = Vec::with_capacity(parts.len());

        for part in parts {
            let index = part.index;
            let entry = self
                .parts
                .get(&(upload_id.to_owned(), index))
                .ok_or_else(|| {
                    StorageError::invalid_argument(format!(
                        "part {index} of upload {upload_id} has no data"
                    ))
                })?;
            let data = entry.value().read_all()?;
            let md5 = checksums::compute_md5(&data);
            if md5 != part.etag.trim_matches('"') {
                return Err(StorageError::invalid_state(format!(
                    "part {index} of upload {upload_id} changed while completing"
                )));
            }
            part_etags.push(md5);
            combined.extend_from_slice(&data);
        }

        let etag = checksums::compute_multipart_etag(&part_etags);
        let size = combined.len() as u64;
        let stored = self.store_data(Bytes::from(combined))?;
        self.objects.insert(key.to_owned(), stored);
        self.append_digests.remove(key);

        debug!(upload_id, key, size, parts = parts.len(), "assembled multipart object");
        Ok(WriteResult { etag, size })
    }

    /// Delete every part of `upload_id`. Returns how many were removed.
    pub fn remove_parts(&self, upload_id: &str) -> usize {
        let before = self.parts.len();
        self.parts.retain(|key, _| {
            let matches = key.0 == upload_id;
            if matches {
                trace!(upload_id, index = key.1, "removing part data");
            }
            !matches
        });
        before - self.parts.len()
    }

    /// Number of stored parts.
    #[must_use]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn store_data(&self, data: Bytes) -> Result<StoredData> {
        if data.len() > self.max_memory_size {
            spill_to_disk(&data)
        } else {
            Ok(StoredData::InMemory { data })
        }
    }
}

fn spill_to_disk(data: &[u8]) -> Result<StoredData> {
    let size = data.len() as u64;

    // Keep the file after the handle drops; StoredData::drop removes it.
    let temp = tempfile::NamedTempFile::new().map_err(|e| {
        StorageError::Internal(anyhow::anyhow!("failed to create temp file: {e}"))
    })?;
    let path = temp.path().to_path_buf();
    temp.persist(&path).map_err(|e| {
        StorageError::Internal(anyhow::anyhow!(
            "failed to persist temp file {}: {e}",
            path.display()
        ))
    })?;

    std::fs::write(&path, data).map_err(|e| {
        StorageError::Internal(anyhow::anyhow!(
            "failed to write temp file {}: {e}",
            path.display()
        ))
    })?;

    trace!(path = %path.display(), size, "spilled data to disk");
    Ok(StoredData::OnDisk { path, size })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
