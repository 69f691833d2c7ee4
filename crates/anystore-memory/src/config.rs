//! Memory backend configuration.
//!
//! Provides [`MemoryConfig`], the tunables of a [`MemoryStorager`]
//! (size limits, paging, spillover threshold). Values come from
//! environment variables via [`MemoryConfig::from_env`]; construction pairs
//! (work dir, name, location, credential, endpoint) are layered on top by
//! the backend.
//!
//! [`MemoryStorager`]: crate::MemoryStorager

use std::str::FromStr;

use anystore_core::io::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

const GIB: u64 = 1024 * 1024 * 1024;

/// Memory backend configuration.
///
/// # Examples
///
/// ```
/// use anystore_memory::config::MemoryConfig;
///
/// let config = MemoryConfig::builder().list_page_size(2).build();
/// assert_eq!(config.list_page_size, 2);
/// assert_eq!(config.part_index_max, 9999);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct MemoryConfig {
    /// Largest object a single `write` may store.
    #[builder(default = 5 * GIB)]
    pub max_object_size: u64,

    /// Length at which an appendable object is sealed.
    #[builder(default = 5 * GIB)]
    pub max_append_size: u64,

    /// Largest single multipart part.
    #[builder(default = 5 * GIB)]
    pub max_part_size: u64,

    /// Smallest accepted part index.
    #[builder(default = 0)]
    pub part_index_min: u32,

    /// Largest accepted part index.
    #[builder(default = 9999)]
    pub part_index_max: u32,

    /// Entries fetched per listing page.
    #[builder(default = 1000)]
    pub list_page_size: usize,

    /// Payloads larger than this many bytes are spilled to temp files.
    #[builder(default = 524_288)]
    pub max_memory_object_size: usize,

    /// Chunk size of data copies.
    #[builder(default = DEFAULT_CHUNK_SIZE)]
    pub io_chunk_size: usize,

    /// Host presigned requests are addressed to when no endpoint is set.
    #[builder(default = String::from("memory.localhost"))]
    pub signing_host: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_object_size: 5 * GIB,
            max_append_size: 5 * GIB,
            max_part_size: 5 * GIB,
            part_index_min: 0,
            part_index_max: 9999,
            list_page_size: 1000,
            max_memory_object_size: 524_288,
            io_chunk_size: DEFAULT_CHUNK_SIZE,
            signing_host: String::from("memory.localhost"),
        }
    }
}

impl MemoryConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults;
    /// unparsable numbers are ignored):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `ANYSTORE_MEMORY_MAX_OBJECT_SIZE` | `5368709120` |
    /// | `ANYSTORE_MEMORY_MAX_APPEND_SIZE` | `5368709120` |
    /// | `ANYSTORE_MEMORY_MAX_PART_SIZE` | `5368709120` |
    /// | `ANYSTORE_MEMORY_PART_INDEX_MIN` | `0` |
    /// | `ANYSTORE_MEMORY_PART_INDEX_MAX` | `9999` |
    /// | `ANYSTORE_MEMORY_LIST_PAGE_SIZE` | `1000` |
    /// | `ANYSTORE_MEMORY_MAX_MEMORY_OBJECT_SIZE` | `524288` |
    /// | `ANYSTORE_MEMORY_IO_CHUNK_SIZE` | `65536` |
    /// | `ANYSTORE_MEMORY_SIGNING_HOST` | `memory.localhost` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        set_parsed(&mut config.max_object_size, "ANYSTORE_MEMORY_MAX_OBJECT_SIZE");
        set_parsed(&mut config.max_append_size, "ANYSTORE_MEMORY_MAX_APPEND_SIZE");
        set_parsed(&mut config.max_part_size, "ANYSTORE_MEMORY_MAX_PART_SIZE");
        set_parsed(&mut config.part_index_min, "ANYSTORE_MEMORY_PART_INDEX_MIN");
        set_parsed(&mut config.part_index_max, "ANYSTORE_MEMORY_PART_INDEX_MAX");
        set_parsed(&mut config.list_page_size, "ANYSTORE_MEMORY_LIST_PAGE_SIZE");
        set_parsed(
            &mut config.max_memory_object_size,
            "ANYSTORE_MEMORY_MAX_MEMORY_OBJECT_SIZE",
        );
        set_parsed(&mut config.io_chunk_size, "ANYSTORE_MEMORY_IO_CHUNK_SIZE");
        if let Ok(v) = std::env::var("ANYSTORE_MEMORY_SIGNING_HOST") {
            config.signing_host = v;
        }

        config
    }
}

fn set_parsed<T: FromStr>(field: &mut T, var: &str) {
    if let Ok(v) = std::env::var(var) {
        if let Ok(n) = v.parse::<T>() {
            *field = n;
        }
    }
}
