//! Core contracts for anystore.
//!
//! This crate defines everything a storage backend and its callers share,
//! without implementing any backend itself.
//!
//! # Architecture
//!
//! ```text
//!          caller
//!            |
//!            v
//!   Storager (+ Appender / Multiparter / HttpSigner)
//!            |             |                |
//!            v             v                v
//!     OperationOptions  StorageIterator  MultipartTracker / AppendPolicy
//!       (pairs.rs)      (iterator.rs)    (multipart.rs / append.rs)
//! ```
//!
//! Backends parse the pairs of every call with
//! [`pairs::OperationOptions::parse`], move bytes with [`io::copy_exact`],
//! report listings as [`iterator::ObjectIterator`] and keep segmented and
//! appendable uploads consistent through [`multipart::MultipartTracker`] and
//! [`append::AppendPolicy`].

pub mod append;
pub mod checksums;
pub mod credential;
pub mod error;
pub mod fswrap;
pub mod io;
pub mod iterator;
pub mod multipart;
pub mod object;
pub mod pairs;
pub mod storager;
pub mod utils;

pub use error::{ErrorKind, Result, StorageError};
pub use iterator::{ObjectIterator, PartIterator, StorageIterator};
pub use object::{Object, ObjectMode, Part, StorageMeta};
pub use pairs::{ListMode, Operation, OperationOptions, Pair};
pub use storager::{Appender, HttpSigner, Multiparter, Storager};
