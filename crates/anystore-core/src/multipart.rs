//! Multipart upload state machine.
//!
//! [`MultipartTracker`] owns the bookkeeping side of segmented uploads for a
//! backend: which ids are live, which parts each upload holds, and which ids
//! have been retired. Part payloads stay with the backend; the tracker only
//! records their index, size and ETag.
//!
//! ```text
//!   create ──> Active ──record_part*──> Active ──complete──> Completed
//!                 │
//!                 └──────────────cancel──────────────> Cancelled
//! ```
//!
//! Retired ids are kept as tombstones so later use reports `InvalidState`
//! instead of `NotFound`.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::object::{Object, ObjectMode, Part};
use crate::utils::generate_multipart_id;

/// Default inclusive range of part indices.
pub const DEFAULT_PART_INDEX_RANGE: RangeInclusive<u32> = 0..=9999;

/// An in-progress multipart upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipartUpload {
    /// Upload identifier.
    pub id: String,
    /// Path the completed object will be stored at.
    pub path: String,
    /// When the upload was created.
    pub initiated: DateTime<Utc>,
    /// Content type for the completed object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Backend metadata captured at creation, applied on completion.
    pub metadata: BTreeMap<String, String>,
    /// Parts uploaded so far, keyed by index.
    pub parts: BTreeMap<u32, UploadPart>,
}

impl MultipartUpload {
    /// Create a new upload record.
    #[must_use]
    pub fn new(id: String, path: String) -> Self {
        Self {
            id,
            path,
            initiated: Utc::now(),
            content_type: None,
            metadata: BTreeMap::new(),
            parts: BTreeMap::new(),
        }
    }

    /// Insert or replace a part, returning the replaced one.
    pub fn put_part(&mut self, part: UploadPart) -> Option<UploadPart> {
        self.parts.insert(part.index, part)
    }

    /// Get a part by index.
    #[must_use]
    pub fn get_part(&self, index: u32) -> Option<&UploadPart> {
        self.parts.get(&index)
    }

    /// Number of parts uploaded so far.
    #[must_use]
    pub fn parts_count(&self) -> usize {
        self.parts.len()
    }

    /// Sum of all uploaded part sizes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.parts.values().map(|p| p.size).sum()
    }

    /// Parts in increasing index order.
    #[must_use]
    pub fn sorted_parts(&self) -> Vec<Part> {
        self.parts.values().map(UploadPart::to_part).collect()
    }

    /// Handle for this upload, as returned by `create_multipart` and part
    /// listings.
    #[must_use]
    pub fn to_object(&self) -> Object {
        let mut object = Object::new(self.path.clone(), ObjectMode::PART);
        object.multipart_id = Some(self.id.clone());
        object.content_type.clone_from(&self.content_type);
        object.last_modified = Some(self.initiated);
        object.metadata.clone_from(&self.metadata);
        object
    }
}

/// Bookkeeping for one uploaded part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPart {
    /// Zero-based index.
    pub index: u32,
    /// Entity tag (quoted hex MD5).
    pub etag: String,
    /// Size in bytes.
    pub size: u64,
    /// When the part was uploaded.
    pub last_modified: DateTime<Utc>,
}

impl UploadPart {
    /// Public view of this part.
    #[must_use]
    pub fn to_part(&self) -> Part {
        Part {
            index: self.index,
            size: self.size,
            etag: self.etag.clone(),
            last_modified: self.last_modified,
        }
    }
}

#[derive(Debug)]
enum UploadState {
    Active(MultipartUpload),
    Completed,
    Cancelled,
}

impl UploadState {
    fn retired(&self) -> Option<&'static str> {
        match self {
            Self::Active(_) => None,
            Self::Completed => Some("completed"),
            Self::Cancelled => Some("cancelled"),
        }
    }
}

/// Tracks every multipart upload of one backend instance.
#[derive(Debug)]
pub struct MultipartTracker {
    index_range: RangeInclusive<u32>,
    uploads: DashMap<String, UploadState>,
}

impl Default for MultipartTracker {
    fn default() -> Self {
        Self::new(DEFAULT_PART_INDEX_RANGE)
    }
}

impl MultipartTracker {
    /// Create a tracker accepting part indices in `index_range`.
    #[must_use]
    pub fn new(index_range: RangeInclusive<u32>) -> Self {
        Self {
            index_range,
            uploads: DashMap::new(),
        }
    }

    /// Inclusive range of valid part indices.
    #[must_use]
    pub fn index_range(&self) -> &RangeInclusive<u32> {
        &self.index_range
    }

    /// Allocate a new upload for `path`.
    pub fn create(
        &self,
        path: &str,
        content_type: Option<String>,
        metadata: BTreeMap<String, String>,
    ) -> MultipartUpload {
        let mut upload = MultipartUpload::new(generate_multipart_id(), path.to_owned());
        upload.content_type = content_type;
        upload.metadata = metadata;
        self.uploads
            .insert(upload.id.clone(), UploadState::Active(upload.clone()));
        debug!(path, multipart_id = %upload.id, "created multipart upload");
        upload
    }

    /// Fail with `InvalidArgument` if `index` is outside the accepted range.
    pub fn check_index(&self, index: u32) -> Result<()> {
        if self.index_range.contains(&index) {
            Ok(())
        } else {
            Err(StorageError::invalid_argument(format!(
                "part index {index} outside {}..={}",
                self.index_range.start(),
                self.index_range.end()
            )))
        }
    }

    /// Run `f` against the live upload `id`, which must belong to `path`.
    fn with_active<T>(
        &self,
        id: &str,
        path: &str,
        f: impl FnOnce(&mut UploadState) -> Result<T>,
    ) -> Result<T> {
        let mut entry = self
            .uploads
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(format!("multipart upload {id}")))?;
        if let Some(how) = entry.retired() {
            return Err(StorageError::invalid_state(format!(
                "multipart upload {id} was already {how}"
            )));
        }
        if let UploadState::Active(upload) = &*entry {
            if upload.path != path {
                return Err(StorageError::invalid_argument(format!(
                    "multipart upload {id} belongs to {}, not {path}",
                    upload.path
                )));
            }
        }
        f(&mut *entry)
    }

    /// Snapshot of the live upload `id`.
    pub fn get(&self, id: &str, path: &str) -> Result<MultipartUpload> {
        self.with_active(id, path, |state| match state {
            UploadState::Active(upload) => Ok(upload.clone()),
            _ => Err(StorageError::invalid_state("upload retired")),
        })
    }

    /// Record an uploaded part, replacing any earlier part with that index.
    pub fn record_part(&self, id: &str, path: &str, part: UploadPart) -> Result<Option<UploadPart>> {
        self.check_index(part.index)?;
        self.with_active(id, path, |state| match state {
            UploadState::Active(upload) => Ok(upload.put_part(part)),
            _ => Err(StorageError::invalid_state("upload retired")),
        })
    }

    /// Parts of the live upload `id`, in increasing index order.
    pub fn parts(&self, id: &str, path: &str) -> Result<Vec<Part>> {
        self.with_active(id, path, |state| match state {
            UploadState::Active(upload) => Ok(upload.sorted_parts()),
            _ => Err(StorageError::invalid_state("upload retired")),
        })
    }

    /// Validate `parts` against the recorded ones, run `assemble`, and retire
    /// the id.
    ///
    /// The list must be non-empty, strictly increasing by index, and every
    /// entry must match a recorded part's ETag and size. `assemble` runs while
    /// the upload is locked; if it fails the upload stays live.
    pub fn complete<F>(&self, id: &str, path: &str, parts: &[Part], assemble: F) -> Result<MultipartUpload>
    where
        F: FnOnce(&MultipartUpload, &[Part]) -> Result<()>,
    {
        self.with_active(id, path, |state| {
            let UploadState::Active(upload) = &*state else {
                return Err(StorageError::invalid_state("upload retired"));
            };
            validate_parts(upload, parts)?;
            assemble(upload, parts)?;
            let UploadState::Active(upload) = std::mem::replace(state, UploadState::Completed) else {
                return Err(StorageError::invalid_state("upload retired"));
            };
            debug!(path, multipart_id = %id, parts = parts.len(), "completed multipart upload");
            Ok(upload)
        })
    }

    /// Retire the live upload `id`, returning it so its parts can be freed.
    pub fn cancel(&self, id: &str, path: &str) -> Result<MultipartUpload> {
        self.with_active(id, path, |state| {
            let UploadState::Active(upload) = std::mem::replace(state, UploadState::Cancelled) else {
                return Err(StorageError::invalid_state("upload retired"));
            };
            debug!(path, multipart_id = %id, parts = upload.parts_count(), "cancelled multipart upload");
            Ok(upload)
        })
    }

    /// Live uploads whose path starts with `prefix`, ordered by path then
    /// creation time.
    #[must_use]
    pub fn list_active(&self, prefix: &str) -> Vec<MultipartUpload> {
        let mut uploads: Vec<MultipartUpload> = self
            .uploads
            .iter()
            .filter_map(|entry| match entry.value() {
                UploadState::Active(upload) if upload.path.starts_with(prefix) => {
                    Some(upload.clone())
                }
                _ => None,
            })
            .collect();
        uploads.sort_by(|a, b| a.path.cmp(&b.path).then(a.initiated.cmp(&b.initiated)));
        uploads
    }
}

fn validate_parts(upload: &MultipartUpload, parts: &[Part]) -> Result<()> {
    if parts.is_empty() {
        return Err(StorageError::invalid_argument(
            "complete_multipart requires at least one part",
        ));
    }
    for pair in parts.windows(2) {
        if pair[1].index <= pair[0].index {
            return Err(StorageError::invalid_argument(format!(
                "parts must be in strictly increasing index order, got {} after {}",
                pair[1].index, pair[0].index
            )));
        }
    }
    for part in parts {
        match upload.get_part(part.index) {
            Some(recorded) if recorded.etag == part.etag && recorded.size == part.size => {}
            Some(_) => {
                return Err(StorageError::invalid_argument(format!(
                    "part {} does not match the uploaded part",
                    part.index
                )));
            }
            None => {
                return Err(StorageError::invalid_argument(format!(
                    "part {} was never uploaded",
                    part.index
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn part(index: u32, size: u64) -> UploadPart {
        UploadPart {
            index,
            etag: format!("\"etag-{index}-{size}\""),
            size,
            last_modified: Utc::now(),
        }
    }

    fn tracker_with_upload(path: &str) -> (MultipartTracker, String) {
        let tracker = MultipartTracker::default();
        let upload = tracker.create(path, None, BTreeMap::new());
        (tracker, upload.id)
    }

    #[test]
    fn test_should_create_upload_bound_to_path() {
        let (tracker, id) = tracker_with_upload("big.bin");
        let upload = tracker
            .get(&id, "big.bin")
            .expect("get");
        assert_eq!(upload.path, "big.bin");
        assert_eq!(upload.parts_count(), 0);
        assert_eq!(upload.total_size(), 0);

        let object = upload.to_object();
        assert!(object.mode.is_part());
        assert_eq!(object.multipart_id.as_deref(), Some(id.as_str()));
    }

    #[test]
    fn test_should_replace_existing_part() {
        let (tracker, id) = tracker_with_upload("a");
        let replaced = tracker
            .record_part(&id, "a", part(0, 100))
            .expect("record");
        assert!(replaced.is_none());
        let replaced = tracker
            .record_part(&id, "a", part(0, 200))
            .expect("record");
        assert_eq!(replaced.map(|p| p.size), Some(100));

        let parts = tracker.parts(&id, "a").expect("parts");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].size, 200);
    }

    #[test]
    fn test_should_reject_index_outside_range() {
        let tracker = MultipartTracker::new(0..=3);
        let upload = tracker.create("a", None, BTreeMap::new());
        let err = tracker
            .record_part(&upload.id, "a", part(4, 1))
            .expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(tracker.check_index(3).is_ok());
    }

    #[test]
    fn test_should_list_parts_in_increasing_order() {
        let (tracker, id) = tracker_with_upload("a");
        for index in [5, 1, 3] {
            tracker
                .record_part(&id, "a", part(index, 10))
                .expect("record");
        }
        let indices: Vec<u32> = tracker
            .parts(&id, "a")
            .expect("parts")
            .iter()
            .map(|p| p.index)
            .collect();
        assert_eq!(indices, vec![1, 3, 5]);
    }

    #[test]
    fn test_should_complete_and_retire_upload() {
        let (tracker, id) = tracker_with_upload("a");
        let p0 = part(0, 3);
        let p1 = part(1, 4);
        tracker.record_part(&id, "a", p0.clone()).ok();
        tracker.record_part(&id, "a", p1.clone()).ok();

        let mut assembled = 0;
        let upload = tracker
            .complete(&id, "a", &[p0.to_part(), p1.to_part()], |upload, parts| {
                assembled = parts.len();
                assert_eq!(upload.total_size(), 7);
                Ok(())
            })
            .expect("complete");
        assert_eq!(assembled, 2);
        assert_eq!(upload.total_size(), 7);

        let err = tracker.parts(&id, "a").expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        let err = tracker
            .record_part(&id, "a", part(2, 1))
            .expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(tracker.list_active("").is_empty());
    }

    #[test]
    fn test_should_reject_unordered_or_mismatched_parts() {
        let (tracker, id) = tracker_with_upload("a");
        let p0 = part(0, 3);
        let p1 = part(1, 4);
        tracker.record_part(&id, "a", p0.clone()).ok();
        tracker.record_part(&id, "a", p1.clone()).ok();

        let noop = |_: &MultipartUpload, _: &[Part]| -> Result<()> { Ok(()) };
        let err = tracker
            .complete(&id, "a", &[p1.to_part(), p0.to_part()], noop)
            .expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let mut forged = p0.to_part();
        forged.etag = "\"forged\"".to_owned();
        let err = tracker
            .complete(&id, "a", &[forged], noop)
            .expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = tracker
            .complete(&id, "a", &[], noop)
            .expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        assert!(tracker.get(&id, "a").is_ok());
    }

    #[test]
    fn test_should_keep_upload_live_when_assembly_fails() {
        let (tracker, id) = tracker_with_upload("a");
        let p0 = part(0, 1);
        tracker.record_part(&id, "a", p0.clone()).ok();
        let err = tracker
            .complete(&id, "a", &[p0.to_part()], |_, _| {
                Err(StorageError::invalid_state("disk full"))
            })
            .expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(tracker.get(&id, "a").is_ok());
    }

    #[test]
    fn test_should_cancel_upload_without_parts() {
        let (tracker, id) = tracker_with_upload("a");
        let upload = tracker.cancel(&id, "a").expect("cancel");
        assert_eq!(upload.parts_count(), 0);

        let err = tracker.cancel(&id, "a").expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_should_distinguish_unknown_and_foreign_ids() {
        let (tracker, id) = tracker_with_upload("a");
        let err = tracker.get("nope", "a").expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = tracker.get(&id, "b").expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_should_list_active_uploads_by_prefix() {
        let tracker = MultipartTracker::default();
        tracker.create("logs/b", None, BTreeMap::new());
        tracker.create("logs/a", None, BTreeMap::new());
        let other = tracker.create("data/c", None, BTreeMap::new());
        tracker.cancel(&other.id, "data/c").ok();
        let extra = tracker.create("logs/z", None, BTreeMap::new());
        tracker.cancel(&extra.id, "logs/z").ok();

        let paths: Vec<String> = tracker.list_active("logs/").into_iter().map(|u| u.path).collect();
        assert_eq!(paths, vec!["logs/a".to_owned(), "logs/b".to_owned()]);
        assert!(tracker.list_active("data/").is_empty());
    }
}
