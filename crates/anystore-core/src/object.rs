//! Object, part and backend metadata types.
//!
//! An [`Object`] is the handle every storage call returns: a path plus
//! whatever metadata the backend knows about it. The abstraction only ever
//! mutates it to record the next append offset.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};

// ---------------------------------------------------------------------------
// Object mode
// ---------------------------------------------------------------------------

/// Bit flags describing what an object can be used for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectMode(u8);

impl ObjectMode {
    /// Readable regular object.
    pub const READ: Self = Self(1);
    /// Directory or common prefix.
    pub const DIR: Self = Self(1 << 1);
    /// Appendable object.
    pub const APPEND: Self = Self(1 << 2);
    /// In-progress multipart upload.
    pub const PART: Self = Self(1 << 3);

    /// Whether every flag in `other` is set.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    /// Whether the object is a regular readable object.
    #[must_use]
    pub fn is_read(self) -> bool {
        self.contains(Self::READ)
    }

    /// Whether the object is a directory.
    #[must_use]
    pub fn is_dir(self) -> bool {
        self.contains(Self::DIR)
    }

    /// Whether the object accepts appends.
    #[must_use]
    pub fn is_append(self) -> bool {
        self.contains(Self::APPEND)
    }

    /// Whether the object is an in-progress multipart upload.
    #[must_use]
    pub fn is_part(self) -> bool {
        self.contains(Self::PART)
    }
}

impl BitOr for ObjectMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ObjectMode {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ObjectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (Self::READ, "read"),
            (Self::DIR, "dir"),
            (Self::APPEND, "append"),
            (Self::PART, "part"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect();
        f.write_str(&names.join("|"))
    }
}

// ---------------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------------

/// Handle to an addressable storage entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    /// Path relative to the backend's work directory.
    pub path: String,
    /// What the object can be used for.
    pub mode: ObjectMode,
    /// Size in bytes, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    /// Content type recorded at write time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Entity tag (quoted hex MD5 or composite multipart tag).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Last modification time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    /// Multipart upload this handle is bound to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multipart_id: Option<String>,
    /// Offset the next append starts at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append_offset: Option<u64>,
    /// Backend-specific metadata, e.g. recorded encryption settings.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Object {
    /// Create a bare handle for `path`.
    #[must_use]
    pub fn new(path: impl Into<String>, mode: ObjectMode) -> Self {
        Self {
            path: path.into(),
            mode,
            ..Self::default()
        }
    }

    /// Multipart id, or `InvalidArgument` if this handle is not bound to one.
    pub fn must_get_multipart_id(&self) -> Result<&str> {
        self.multipart_id.as_deref().ok_or_else(|| {
            StorageError::invalid_argument(format!(
                "object {} has no multipart id",
                self.path
            ))
        })
    }

    /// Append offset, or `InvalidState` if this handle is not appendable.
    pub fn must_get_append_offset(&self) -> Result<u64> {
        if !self.mode.is_append() {
            return Err(StorageError::invalid_state(format!(
                "object {} is not appendable",
                self.path
            )));
        }
        Ok(self.append_offset.unwrap_or(0))
    }

    /// Size in bytes, zero when unknown.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.content_length.unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Part
// ---------------------------------------------------------------------------

/// One segment of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Zero-based index.
    pub index: u32,
    /// Size in bytes.
    pub size: u64,
    /// Entity tag assigned by the backend.
    pub etag: String,
    /// When the part was written.
    pub last_modified: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Backend metadata
// ---------------------------------------------------------------------------

/// Static description of a backend instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageMeta {
    /// Backend type, equal to the scheme it is registered under.
    pub backend: String,
    /// Bucket or container name, empty when the backend has none.
    pub name: String,
    /// Work directory all relative paths resolve against.
    pub work_dir: String,
    /// Location or region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Whether the backend implements `Appender`.
    pub appender: bool,
    /// Whether the backend implements `Multiparter`.
    pub multiparter: bool,
    /// Whether the backend implements `HttpSigner`.
    pub http_signer: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_should_combine_mode_flags() {
        let mut mode = ObjectMode::READ;
        mode |= ObjectMode::APPEND;
        assert!(mode.is_read());
        assert!(mode.is_append());
        assert!(!mode.is_dir());
        assert_eq!(mode.to_string(), "read|append");
        assert!(!ObjectMode::default().contains(ObjectMode::default()));
    }

    #[test]
    fn test_should_require_multipart_id() {
        let mut obj = Object::new("a.bin", ObjectMode::PART);
        let err = obj
            .must_get_multipart_id()
            .expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        obj.multipart_id = Some("m-1".to_owned());
        assert_eq!(obj.must_get_multipart_id().ok(), Some("m-1"));
    }

    #[test]
    fn test_should_refuse_append_offset_on_regular_object() {
        let obj = Object::new("a.log", ObjectMode::READ);
        let err = obj
            .must_get_append_offset()
            .expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let obj = Object::new("a.log", ObjectMode::READ | ObjectMode::APPEND);
        assert_eq!(obj.must_get_append_offset().ok(), Some(0));
    }

    #[test]
    fn test_should_serialize_object_to_camel_case_json() {
        let mut obj = Object::new("k", ObjectMode::READ);
        obj.content_length = Some(3);
        let json = serde_json::to_string(&obj).expect("serialize");
        assert!(json.contains("contentLength"));
        assert!(!json.contains("multipartId"));
    }
}
