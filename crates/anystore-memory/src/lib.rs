//! In-process anystore backend.
//!
//! [`MemoryStorager`] implements [`Storager`] together with every optional
//! capability: appendable objects, multipart uploads and presigned HTTP
//! requests (which it can also serve back through
//! [`MemoryStorager::serve_presigned`]). Large payloads spill to temporary
//! files so tests and tools can push realistic sizes through it.
//!
//! # Usage
//!
//! ```
//! use anystore_core::Storager;
//! use anystore_core::storager::require_multiparter;
//!
//! let store = anystore_memory::new_storager(&[]).unwrap();
//! let uploads = require_multiparter(store.as_ref()).unwrap();
//!
//! let object = uploads.create_multipart("big.bin", &[]).unwrap();
//! let (_, part) = uploads
//!     .write_multipart(&object, &mut &b"abc"[..], 3, 0, &[])
//!     .unwrap();
//! uploads.complete_multipart(&object, &[part], &[]).unwrap();
//!
//! assert_eq!(store.stat("big.bin", &[]).unwrap().content_length, Some(3));
//! ```

pub mod backend;
pub mod config;
pub mod keystore;
pub mod sse;
pub mod storage;

use anystore_core::{Pair, Result, Storager};

pub use backend::{BACKEND, MemoryStorager};
pub use config::MemoryConfig;

/// Construct a memory backend as a trait object.
pub fn new_storager(pairs: &[Pair]) -> Result<Box<dyn Storager>> {
    Ok(Box::new(MemoryStorager::new(pairs)?))
}
