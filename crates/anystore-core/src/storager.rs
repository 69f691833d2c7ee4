//! Capability traits.
//!
//! [`Storager`] is the contract every backend implements. Optional features
//! live in separate traits ([`Appender`], [`Multiparter`], [`HttpSigner`]);
//! a backend opts in by implementing the trait and returning `Some(self)`
//! from the matching accessor on `Storager`. Callers holding a
//! `dyn Storager` check support with those accessors, which never perform
//! I/O and always give the same answer for the same instance.
//!
//! ```text
//! Storager ──as_appender()────> Option<&dyn Appender>
//!          ──as_multiparter()──> Option<&dyn Multiparter>
//!          ──as_http_signer()──> Option<&dyn HttpSigner>
//! ```

use std::fmt::Debug;
use std::io::{Read, Write};
use std::time::Duration;

use crate::error::{Result, StorageError};
use crate::iterator::{ObjectIterator, PartIterator};
use crate::object::{Object, Part, StorageMeta};
use crate::pairs::Pair;

/// Mandatory storage contract.
pub trait Storager: Send + Sync + Debug {
    /// Static description of this backend instance.
    fn metadata(&self) -> StorageMeta;

    /// Build a handle for `path` without touching the backend.
    ///
    /// A `multipart_id` pair binds the handle to an in-progress upload so it
    /// can be resumed.
    fn create(&self, path: &str, pairs: &[Pair]) -> Object;

    /// Copy the object (or the `offset`/`size` window of it) into `sink`.
    fn read(&self, path: &str, sink: &mut dyn Write, pairs: &[Pair]) -> Result<u64>;

    /// Store `size` bytes from `source` at `path`.
    fn write(&self, path: &str, source: &mut dyn Read, size: u64, pairs: &[Pair]) -> Result<u64>;

    /// Fetch metadata for `path`.
    fn stat(&self, path: &str, pairs: &[Pair]) -> Result<Object>;

    /// Delete `path`, or cancel an upload when a `multipart_id` pair is given.
    ///
    /// Deleting a missing object succeeds.
    fn delete(&self, path: &str, pairs: &[Pair]) -> Result<()>;

    /// List entries under `path` according to the `list_mode` pair.
    fn list(&self, path: &str, pairs: &[Pair]) -> Result<ObjectIterator>;

    /// `Some` when the backend supports appendable objects.
    fn as_appender(&self) -> Option<&dyn Appender> {
        None
    }

    /// `Some` when the backend supports multipart uploads.
    fn as_multiparter(&self) -> Option<&dyn Multiparter> {
        None
    }

    /// `Some` when the backend can presign HTTP requests.
    fn as_http_signer(&self) -> Option<&dyn HttpSigner> {
        None
    }
}

/// Appendable objects.
pub trait Appender: Send + Sync {
    /// Create (or truncate) an appendable object at `path`.
    fn create_append(&self, path: &str, pairs: &[Pair]) -> Result<Object>;

    /// Append `size` bytes at the object's recorded offset.
    ///
    /// Returns the next offset and records it on `object`.
    fn write_append(
        &self,
        object: &mut Object,
        source: &mut dyn Read,
        size: u64,
        pairs: &[Pair],
    ) -> Result<u64>;
}

/// Segmented uploads.
pub trait Multiparter: Send + Sync {
    /// Start an upload for `path`.
    fn create_multipart(&self, path: &str, pairs: &[Pair]) -> Result<Object>;

    /// Upload part `index`. Distinct indices may be written concurrently.
    fn write_multipart(
        &self,
        object: &Object,
        source: &mut dyn Read,
        size: u64,
        index: u32,
        pairs: &[Pair],
    ) -> Result<(u64, Part)>;

    /// Assemble the listed parts, in index order, into the final object.
    fn complete_multipart(&self, object: &Object, parts: &[Part], pairs: &[Pair]) -> Result<()>;

    /// Enumerate uploaded parts in increasing index order.
    fn list_multipart(&self, object: &Object, pairs: &[Pair]) -> Result<PartIterator>;
}

/// Presigned HTTP requests.
pub trait HttpSigner: Send + Sync {
    /// Presign a download of `path` valid for `expire`.
    fn query_sign_http_read(
        &self,
        path: &str,
        expire: Duration,
        pairs: &[Pair],
    ) -> Result<http::Request<()>>;

    /// Presign an upload of `size` bytes to `path` valid for `expire`.
    fn query_sign_http_write(
        &self,
        path: &str,
        size: u64,
        expire: Duration,
        pairs: &[Pair],
    ) -> Result<http::Request<()>>;
}

/// Appender capability, or `UnsupportedOperation`.
pub fn require_appender(store: &dyn Storager) -> Result<&dyn Appender> {
    store
        .as_appender()
        .ok_or_else(|| StorageError::unsupported_operation(store.metadata().backend, "appender"))
}

/// Multiparter capability, or `UnsupportedOperation`.
pub fn require_multiparter(store: &dyn Storager) -> Result<&dyn Multiparter> {
    store
        .as_multiparter()
        .ok_or_else(|| StorageError::unsupported_operation(store.metadata().backend, "multiparter"))
}

/// HTTP signer capability, or `UnsupportedOperation`.
pub fn require_http_signer(store: &dyn Storager) -> Result<&dyn HttpSigner> {
    store
        .as_http_signer()
        .ok_or_else(|| StorageError::unsupported_operation(store.metadata().backend, "http_signer"))
}
