//! Service factory for anystore.
//!
//! Turns a scheme plus pairs, or a single connection string, into a
//! `Box<dyn Storager>`.
//!
//! ```text
//! "memory://bucket/data?enable_virtual_dir"
//!        |
//!        v
//! parse_connection_string ──> ("memory", [name, work_dir, enable_virtual_dir])
//!        |
//!        v
//! ServiceRegistry::new_storager ──> constructor("memory") ──> Box<dyn Storager>
//! ```
//!
//! # Usage
//!
//! ```
//! use anystore_core::Storager;
//!
//! let store = anystore_services::new_storager_from_string("memory:///tmp").unwrap();
//! store.write("a.txt", &mut &b"abc"[..], 3, &[]).unwrap();
//! assert_eq!(store.stat("a.txt", &[]).unwrap().content_length, Some(3));
//!
//! let err = anystore_services::new_storager_from_string("bogus://x").unwrap_err();
//! assert_eq!(err.kind(), anystore_core::ErrorKind::UnsupportedBackend);
//! ```

pub mod connection;
pub mod registry;

use anystore_core::{Pair, Result, Storager};

pub use connection::{ConnectionString, parse_connection_string};
pub use registry::{Constructor, ServiceRegistry};

/// Construct a default backend by scheme.
pub fn new_storager(scheme: &str, pairs: &[Pair]) -> Result<Box<dyn Storager>> {
    ServiceRegistry::with_defaults().new_storager(scheme, pairs)
}

/// Construct a default backend from a connection string.
pub fn new_storager_from_string(conn: &str) -> Result<Box<dyn Storager>> {
    ServiceRegistry::with_defaults().new_storager_from_string(conn)
}
