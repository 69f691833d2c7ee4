//! Filesystem backend configuration.

use std::str::FromStr;

use anystore_core::io::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Filesystem backend configuration.
///
/// # Examples
///
/// ```
/// use anystore_fs::FsConfig;
///
/// let config = FsConfig::builder().sync_on_write(true).build();
/// assert!(config.sync_on_write);
/// assert_eq!(config.list_page_size, 1000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct FsConfig {
    /// Length at which an appended file is sealed.
    #[builder(default = 5 * 1024 * 1024 * 1024)]
    pub max_append_size: u64,

    /// Entries stat'ed per listing page.
    #[builder(default = 1000)]
    pub list_page_size: usize,

    /// Chunk size of data copies.
    #[builder(default = DEFAULT_CHUNK_SIZE)]
    pub io_chunk_size: usize,

    /// Flush file data to disk before a write or append returns.
    #[builder(default = false)]
    pub sync_on_write: bool,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            max_append_size: 5 * 1024 * 1024 * 1024,
            list_page_size: 1000,
            io_chunk_size: DEFAULT_CHUNK_SIZE,
            sync_on_write: false,
        }
    }
}

impl FsConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `ANYSTORE_FS_MAX_APPEND_SIZE` | `5368709120` |
    /// | `ANYSTORE_FS_LIST_PAGE_SIZE` | `1000` |
    /// | `ANYSTORE_FS_IO_CHUNK_SIZE` | `65536` |
    /// | `ANYSTORE_FS_SYNC_ON_WRITE` | `false` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        set_parsed(&mut config.max_append_size, "ANYSTORE_FS_MAX_APPEND_SIZE");
        set_parsed(&mut config.list_page_size, "ANYSTORE_FS_LIST_PAGE_SIZE");
        set_parsed(&mut config.io_chunk_size, "ANYSTORE_FS_IO_CHUNK_SIZE");
        if let Ok(v) = std::env::var("ANYSTORE_FS_SYNC_ON_WRITE") {
            config.sync_on_write = parse_bool(&v);
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

/// `1`, `true` and `yes` (any case) are true; everything else is false.
fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}
