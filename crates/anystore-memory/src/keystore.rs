//! Object metadata index.
//!
//! [`KeyStore`] maps absolute paths to [`ObjectRecord`]s in a `BTreeMap`, so
//! keys are always sorted and listings can resume from the last key they
//! returned. Payload bytes live in [`BlobStore`](crate::storage::BlobStore).

use std::collections::BTreeMap;
use std::ops::Bound;

use anystore_core::object::{Object, ObjectMode};
use anystore_core::utils::relative_path;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Metadata of one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Size in bytes.
    pub size: u64,
    /// Quoted ETag.
    pub etag: Option<String>,
    /// Content type recorded at write time.
    pub content_type: Option<String>,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Created by `create_append`.
    pub appendable: bool,
    /// Virtual directory marker.
    pub dir: bool,
    /// Extension metadata (recorded encryption settings).
    pub metadata: BTreeMap<String, String>,
}

impl ObjectRecord {
    /// Record for a freshly written regular object.
    #[must_use]
    pub fn new(size: u64, etag: String) -> Self {
        Self {
            size,
            etag: Some(etag),
            content_type: None,
            last_modified: Utc::now(),
            appendable: false,
            dir: false,
            metadata: BTreeMap::new(),
        }
    }

    /// Handle for this record, reported under a path relative to `work_dir`.
    #[must_use]
    pub fn to_object(&self, work_dir: &str, key: &str) -> Object {
        let mode = if self.dir {
            ObjectMode::DIR
        } else if self.appendable {
            ObjectMode::READ | ObjectMode::APPEND
        } else {
            ObjectMode::READ
        };
        let mut object = Object::new(relative_path(work_dir, key), mode);
        object.content_length = Some(self.size);
        object.etag.clone_from(&self.etag);
        object.content_type.clone_from(&self.content_type);
        object.last_modified = Some(self.last_modified);
        object.metadata.clone_from(&self.metadata);
        if self.appendable {
            object.append_offset = Some(self.size);
        }
        object
    }
}

/// One listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEntry {
    /// A stored object.
    Object {
        /// Absolute key.
        key: String,
        /// Its metadata.
        record: ObjectRecord,
    },
    /// A common prefix ending in `/`, produced by delimited listings.
    CommonPrefix(String),
}

impl ListEntry {
    /// Key or prefix this entry sorts by.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Object { key, .. } => key,
            Self::CommonPrefix(prefix) => prefix,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone)]
pub struct ListPage {
    /// Entries in ascending key order.
    pub entries: Vec<ListEntry>,
    /// Marker to resume from, `None` when the listing is complete.
    pub next_marker: Option<String>,
}

/// Sorted map of absolute key to object metadata.
#[derive(Debug, Default)]
pub struct KeyStore {
    objects: BTreeMap<String, ObjectRecord>,
}

impl KeyStore {
    /// Insert or replace a record.
    pub fn put(&mut self, key: &str, record: ObjectRecord) {
        debug!(key, size = record.size, "storing object record");
        self.objects.insert(key.to_owned(), record);
    }

    /// Get the record for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ObjectRecord> {
        self.objects.get(key)
    }

    /// Mutable access to the record for a key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut ObjectRecord> {
        self.objects.get_mut(key)
    }

    /// Remove a record. Returns the removed record if any.
    pub fn delete(&mut self, key: &str) -> Option<ObjectRecord> {
        self.objects.remove(key)
    }

    /// Number of stored records.
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }

    /// List keys starting with `prefix` that sort after `marker`.
    ///
    /// With `delimited`, keys containing a `/` after the prefix collapse into
    /// one [`ListEntry::CommonPrefix`] each, emitted in key order alongside
    /// objects. A marker that is a common prefix skips that whole subtree.
    #[must_use]
    pub fn list_page(
        &self,
        prefix: &str,
        delimited: bool,
        marker: Option<&str>,
        max_keys: usize,
    ) -> ListPage {
        let start = marker.map_or(Bound::Included(prefix), Bound::Excluded);
        let skip_subtree = marker.filter(|m| delimited && m.ends_with('/'));

        let mut entries: Vec<ListEntry> = Vec::new();
        let mut truncated = false;

        for (key, record) in self.objects.range::<str, _>((start, Bound::Unbounded)) {
            if !key.starts_with(prefix) {
                break;
            }
            if skip_subtree.is_some_and(|m| key.starts_with(m)) {
                continue;
            }
            // The directory's own marker is not one of its children.
            if delimited && key.len() == prefix.len() {
                continue;
            }

            let entry = if delimited {
                match key[prefix.len()..].find('/') {
                    Some(pos) => {
                        let common = &key[..prefix.len() + pos + 1];
                        if entries.last().is_some_and(|e| e.key() == common) {
                            continue;
                        }
                        ListEntry::CommonPrefix(common.to_owned())
                    }
                    None => ListEntry::Object {
                        key: key.clone(),
                        record: record.clone(),
                    },
                }
            } else {
                ListEntry::Object {
                    key: key.clone(),
                    record: record.clone(),
                }
            };

            if entries.len() >= max_keys {
                truncated = true;
                break;
            }
            entries.push(entry);
        }

        let next_marker = if truncated {
            entries.last().map(|e| e.key().to_owned())
        } else {
            None
        };
        ListPage {
            entries,
            next_marker,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
