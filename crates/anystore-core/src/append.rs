//! Append state machine.
//!
//! An appendable object moves through `Created -> Appending* -> Sealed`.
//! Each write starts at the offset recorded on the caller's [`Object`] and
//! returns the next one; [`AppendPolicy::check`] refuses writes whose
//! recorded offset disagrees with the backend's actual length, writes that
//! would cross the size limit, and writes to a sealed object.

use crate::error::{Result, StorageError};
use crate::object::{Object, ObjectMode};

/// Size limit of appendable objects for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendPolicy {
    /// Maximum length an appendable object may reach.
    pub max_size: u64,
}

impl AppendPolicy {
    /// Policy with the given limit.
    #[must_use]
    pub fn new(max_size: u64) -> Self {
        Self { max_size }
    }

    /// Whether an object of `len` bytes accepts no further appends.
    #[must_use]
    pub fn is_sealed(&self, len: u64) -> bool {
        len >= self.max_size
    }

    /// Validate an append of `size` bytes to `object`, whose backend length
    /// is `current_len`. Returns the offset the write starts at.
    pub fn check(&self, object: &Object, current_len: u64, size: u64) -> Result<u64> {
        let offset = object.must_get_append_offset()?;
        if offset != current_len {
            return Err(StorageError::invalid_state(format!(
                "append offset {offset} of {} does not match object length {current_len}",
                object.path
            )));
        }
        if self.is_sealed(current_len) {
            return Err(StorageError::invalid_state(format!(
                "appendable object {} is sealed at {current_len} bytes",
                object.path
            )));
        }
        let end = offset.saturating_add(size);
        if end > self.max_size {
            return Err(StorageError::CapacityExceeded {
                requested: end,
                limit: self.max_size,
            });
        }
        Ok(offset)
    }
}

/// Handle for an appendable object currently `len` bytes long.
#[must_use]
pub fn appendable_object(path: impl Into<String>, len: u64) -> Object {
    let mut object = Object::new(path, ObjectMode::READ | ObjectMode::APPEND);
    object.content_length = Some(len);
    object.append_offset = Some(len);
    object
}

/// Record a successful append on the caller's handle.
pub fn advance(object: &mut Object, next_offset: u64) {
    object.append_offset = Some(next_offset);
    object.content_length = Some(next_offset);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_should_accept_append_at_current_length() {
        let policy = AppendPolicy::new(10);
        let mut object = appendable_object("log", 0);
        assert_eq!(policy.check(&object, 0, 4).ok(), Some(0));
        advance(&mut object, 4);
        assert_eq!(policy.check(&object, 4, 6).ok(), Some(4));
        assert_eq!(object.size(), 4);
    }

    #[test]
    fn test_should_detect_position_drift() {
        let policy = AppendPolicy::new(10);
        let object = appendable_object("log", 2);
        let err = policy
            .check(&object, 5, 1)
            .expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_should_refuse_append_past_limit() {
        let policy = AppendPolicy::new(10);
        let object = appendable_object("log", 8);
        let err = policy
            .check(&object, 8, 3)
            .expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
    }

    #[test]
    fn test_should_seal_object_at_limit() {
        let policy = AppendPolicy::new(10);
        let object = appendable_object("log", 10);
        assert!(policy.is_sealed(10));
        let err = policy
            .check(&object, 10, 0)
            .expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_should_refuse_non_appendable_object() {
        let policy = AppendPolicy::new(10);
        let object = Object::new("plain", ObjectMode::READ);
        let err = policy
            .check(&object, 0, 1)
            .expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }
}
