//! Local filesystem anystore backend.
//!
//! [`FsStorager`] maps object paths onto files below its work directory.
//! It implements [`Storager`] and [`Appender`](anystore_core::Appender);
//! multipart uploads and presigned requests are not available, and the
//! capability accessors say so.
//!
//! # Usage
//!
//! ```
//! use anystore_core::Storager;
//! use anystore_core::pairs::with_work_dir;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = anystore_fs::new_storager(&[with_work_dir(dir.path().to_string_lossy())]).unwrap();
//!
//! store.write("notes/today.txt", &mut &b"hi"[..], 2, &[]).unwrap();
//! assert_eq!(store.stat("notes/today.txt", &[]).unwrap().content_length, Some(2));
//! assert!(store.as_multiparter().is_none());
//! ```

pub mod backend;
pub mod config;

use anystore_core::{Pair, Result, Storager};

pub use backend::{BACKEND, FsStorager};
pub use config::FsConfig;

/// Construct a filesystem backend as a trait object.
pub fn new_storager(pairs: &[Pair]) -> Result<Box<dyn Storager>> {
    Ok(Box::new(FsStorager::new(pairs)?))
}
