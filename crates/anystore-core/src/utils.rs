//! Shared utilities for backends.
//!
//! Provides identifier generation and the path rules every backend applies:
//! validation, resolution against a work directory, and the reverse mapping
//! used when reporting paths back to callers.

use uuid::Uuid;

use crate::error::{Result, StorageError};

/// Maximum length of a path in bytes.
pub const MAX_PATH_BYTES: usize = 1024;

/// Generate a unique multipart upload id (UUID v4 without dashes).
///
/// # Examples
///
/// ```
/// use anystore_core::utils::generate_multipart_id;
///
/// let id = generate_multipart_id();
/// assert_eq!(id.len(), 32);
/// assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
#[must_use]
pub fn generate_multipart_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Validate an object path.
///
/// Rules:
/// - 1 to 1024 bytes
/// - no NUL bytes
/// - no `..` segments
pub fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(StorageError::invalid_argument("path must not be empty"));
    }
    validate_prefix(path)
}

/// Validate a listing prefix. Same rules as [`validate_path`] but may be empty.
pub fn validate_prefix(path: &str) -> Result<()> {
    if path.len() > MAX_PATH_BYTES {
        return Err(StorageError::invalid_argument(format!(
            "path exceeds {MAX_PATH_BYTES} bytes"
        )));
    }
    if path.contains('\0') {
        return Err(StorageError::invalid_argument("path contains a NUL byte"));
    }
    if path.split('/').any(|segment| segment == "..") {
        return Err(StorageError::invalid_argument(format!(
            "path {path} escapes its work directory"
        )));
    }
    Ok(())
}

/// Normalize a work directory to an absolute path ending in `/`.
///
/// # Examples
///
/// ```
/// use anystore_core::utils::normalize_work_dir;
///
/// assert_eq!(normalize_work_dir(""), "/");
/// assert_eq!(normalize_work_dir("data"), "/data/");
/// assert_eq!(normalize_work_dir("/data/"), "/data/");
/// ```
#[must_use]
pub fn normalize_work_dir(work_dir: &str) -> String {
    let trimmed = work_dir.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else {
        format!("/{trimmed}/")
    }
}

/// Resolve `path` against `work_dir`.
///
/// Absolute paths are taken as-is; relative paths are joined onto the work
/// directory. `work_dir` must already be normalized.
///
/// # Examples
///
/// ```
/// use anystore_core::utils::resolve_path;
///
/// assert_eq!(resolve_path("/data/", "a/b.txt"), "/data/a/b.txt");
/// assert_eq!(resolve_path("/data/", "/etc/x"), "/etc/x");
/// ```
#[must_use]
pub fn resolve_path(work_dir: &str, path: &str) -> String {
    if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("{work_dir}{path}")
    }
}

/// Map an absolute path back to one relative to `work_dir`.
///
/// Paths outside the work directory are returned unchanged.
#[must_use]
pub fn relative_path(work_dir: &str, absolute: &str) -> String {
    absolute
        .strip_prefix(work_dir)
        .unwrap_or(absolute)
        .to_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
