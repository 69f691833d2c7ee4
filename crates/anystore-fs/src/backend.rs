//! The filesystem backend.
//!
//! Paths resolve against the work directory; absolute paths are used as-is.
//! Writes stage into a temporary file next to the target and rename it into
//! place, so a short source or a missed deadline never leaves a partial
//! file behind. Every regular file is appendable.

use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anystore_core::append::{self, AppendPolicy};
use anystore_core::error::{Result, StorageError};
use anystore_core::io::{CopyOptions, copy_exact, skip};
use anystore_core::iterator::{ObjectIterator, Page};
use anystore_core::object::{Object, ObjectMode, StorageMeta};
use anystore_core::pairs::{ListMode, Operation, OperationOptions, Pair};
use anystore_core::storager::{Appender, Storager};
use anystore_core::utils::{normalize_work_dir, resolve_path, validate_path, validate_prefix};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::FsConfig;

/// Scheme the filesystem backend is registered under.
pub const BACKEND: &str = "fs";

/// Storage backed by a local directory tree.
#[derive(Debug)]
pub struct FsStorager {
    config: FsConfig,
    name: String,
    work_dir: String,
    loose: bool,
    append_policy: AppendPolicy,
    append_lock: Mutex<()>,
}

impl FsStorager {
    /// Create a backend configured from the environment and `pairs`.
    pub fn new(pairs: &[Pair]) -> Result<Self> {
        Self::with_config(FsConfig::from_env(), pairs)
    }

    /// Create a backend from an explicit configuration and `pairs`.
    ///
    /// The work directory is created when missing.
    pub fn with_config(config: FsConfig, pairs: &[Pair]) -> Result<Self> {
        let opts = OperationOptions::parse(Operation::New, pairs, &[], false)?;
        if opts.credential.is_some() || opts.endpoint.is_some() || opts.location.is_some() {
            debug!("fs backend ignores credential, endpoint and location");
        }

        let work_dir = normalize_work_dir(opts.work_dir.as_deref().unwrap_or("/"));
        fs::create_dir_all(&work_dir).map_err(|e| StorageError::from_io(e, &work_dir))?;
        info!(work_dir = %work_dir, loose = opts.enable_loose_pair, "created fs storager");

        Ok(Self {
            append_policy: AppendPolicy::new(config.max_append_size),
            append_lock: Mutex::new(()),
            config,
            name: opts.name.unwrap_or_default(),
            work_dir,
            loose: opts.enable_loose_pair,
        })
    }

    /// Configuration this backend runs with.
    #[must_use]
    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    fn parse(&self, op: Operation, pairs: &[Pair]) -> Result<OperationOptions> {
        OperationOptions::parse(op, pairs, &[], self.loose)
    }

    fn local_path(&self, path: &str) -> PathBuf {
        PathBuf::from(resolve_path(&self.work_dir, path))
    }

    fn copy_options(&self, opts: &OperationOptions) -> CopyOptions {
        CopyOptions::from_options(opts, self.config.io_chunk_size)
    }

    fn read_file(&self, path: &str, sink: &mut dyn Write, pairs: &[Pair]) -> Result<u64> {
        let opts = self.parse(Operation::Read, pairs)?;
        validate_path(path)?;
        let local = self.local_path(path);

        let mut file = File::open(&local).map_err(|e| StorageError::from_io(e, path))?;
        let meta = file.metadata().map_err(|e| StorageError::from_io(e, path))?;
        if meta.is_dir() {
            return Err(StorageError::invalid_argument(format!("{path} is a directory")));
        }

        let len = meta.len();
        let offset = opts.offset.unwrap_or(0);
        if offset > len {
            return Err(StorageError::invalid_argument(format!(
                "offset {offset} beyond object length {len}"
            )));
        }
        let window = opts.size.map_or(len - offset, |size| size.min(len - offset));
        if offset > 0 {
            file.seek(SeekFrom::Start(offset))
                .map_err(|e| StorageError::from_io(e, path))?;
        }

        let n = copy_exact(&mut file, sink, window, &self.copy_options(&opts))?;
        debug!(path, offset, size = n, "read file");
        Ok(n)
    }

    fn write_file(&self, path: &str, source: &mut dyn Read, size: u64, pairs: &[Pair]) -> Result<u64> {
        let opts = self.parse(Operation::Write, pairs)?;
        validate_path(path)?;
        if let Some(declared) = opts.size {
            if declared != size {
                return Err(StorageError::invalid_argument(format!(
                    "size pair {declared} disagrees with write size {size}"
                )));
            }
        }
        let local = self.local_path(path);

        if path.ends_with('/') {
            if size != 0 {
                return Err(StorageError::invalid_argument(format!(
                    "directory {path} cannot carry {size} bytes"
                )));
            }
            fs::create_dir_all(&local).map_err(|e| StorageError::from_io(e, path))?;
            debug!(path, "created directory");
            return Ok(0);
        }

        let parent = local.parent().ok_or_else(|| {
            StorageError::invalid_argument(format!("{path} has no parent directory"))
        })?;
        fs::create_dir_all(parent).map_err(|e| StorageError::from_io(e, path))?;

        if let Some(offset) = opts.offset {
            skip(source, offset)?;
        }
        let mut staged = NamedTempFile::new_in(parent).map_err(|e| StorageError::from_io(e, path))?;
        copy_exact(source, staged.as_file_mut(), size, &self.copy_options(&opts))?;
        if self.config.sync_on_write {
            staged
                .as_file()
                .sync_all()
                .map_err(|e| StorageError::from_io(e, path))?;
        }
        staged
            .persist(&local)
            .map_err(|e| StorageError::from_io(e.error, path))?;

        debug!(path, size, "wrote file");
        Ok(size)
    }

    fn stat_file(&self, path: &str, pairs: &[Pair]) -> Result<Object> {
        self.parse(Operation::Stat, pairs)?;
        validate_path(path)?;
        let meta = fs::metadata(self.local_path(path)).map_err(|e| StorageError::from_io(e, path))?;
        Ok(object_from_metadata(path.to_owned(), &meta))
    }

    fn delete_file(&self, path: &str, pairs: &[Pair]) -> Result<()> {
        let opts = self.parse(Operation::Delete, pairs)?;
        validate_path(path)?;
        if opts.multipart_id.is_some() {
            return Err(StorageError::unsupported_operation(BACKEND, "multipart upload"));
        }
        let local = self.local_path(path);

        let removed = match fs::symlink_metadata(&local) {
            Ok(meta) if meta.is_dir() => fs::remove_dir(&local),
            Ok(_) => fs::remove_file(&local),
            Err(e) => Err(e),
        };
        match removed {
            Ok(()) => debug!(path, "deleted"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::from_io(e, path)),
        }
        Ok(())
    }

    fn list_files(&self, path: &str, pairs: &[Pair]) -> Result<ObjectIterator> {
        let opts = self.parse(Operation::List, pairs)?;
        validate_prefix(path)?;
        debug!(path, mode = %opts.list_mode, "listing");

        let mut entries = match opts.list_mode {
            ListMode::Dir => {
                let dir = if path.is_empty() || path.ends_with('/') {
                    path.to_owned()
                } else {
                    format!("{path}/")
                };
                read_entries(&self.local_path(&dir), &dir)?
                    .into_iter()
                    .map(|(child, is_dir)| if is_dir { format!("{child}/") } else { child })
                    .collect()
            }
            ListMode::Prefix => {
                let base = path.rfind('/').map_or("", |pos| &path[..=pos]);
                let mut files = Vec::new();
                walk(&self.local_path(base), base, path, &mut files)?;
                files
            }
            ListMode::Part => {
                return Err(StorageError::unsupported_operation(
                    BACKEND,
                    "list in part mode",
                ));
            }
        };
        entries.sort();

        let work_dir = self.work_dir.clone();
        let page_size = self.config.list_page_size.max(1);
        let mut rest = entries.into_iter();
        Ok(ObjectIterator::new(move || {
            let mut page = Vec::with_capacity(page_size);
            for entry in rest.by_ref().take(page_size) {
                match fs::metadata(resolve_path(&work_dir, &entry)) {
                    Ok(meta) => page.push(object_from_metadata(entry, &meta)),
                    // Removed since the directory was read.
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(StorageError::from_io(e, &entry)),
                }
            }
            Ok(if rest.as_slice().is_empty() {
                Page::last(page)
            } else {
                Page::more(page)
            })
        }))
    }
}

/// Directory entries of `dir` as `(rel + name, is_dir)`; a missing
/// directory has none.
fn read_entries(dir: &Path, rel: &str) -> Result<Vec<(String, bool)>> {
    let reader = match fs::read_dir(dir) {
        Ok(reader) => reader,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::from_io(e, rel)),
    };

    let mut entries = Vec::new();
    for entry in reader {
        let entry = entry.map_err(|e| StorageError::from_io(e, rel))?;
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            warn!(dir = %dir.display(), "skipping entry with a non UTF-8 name");
            continue;
        };
        let is_dir = entry
            .file_type()
            .map_err(|e| StorageError::from_io(e, rel))?
            .is_dir();
        entries.push((format!("{rel}{name}"), is_dir));
    }
    Ok(entries)
}

/// Collect files below `dir` whose path starts with `prefix`, skipping
/// subtrees that cannot match.
fn walk(dir: &Path, rel: &str, prefix: &str, out: &mut Vec<String>) -> Result<()> {
    for (child, is_dir) in read_entries(dir, rel)? {
        if is_dir {
            let child_dir = format!("{child}/");
            if child_dir.starts_with(prefix) || prefix.starts_with(&child_dir) {
                walk(&dir.join(&child[rel.len()..]), &child_dir, prefix, out)?;
            }
        } else if child.starts_with(prefix) {
            out.push(child);
        }
    }
    Ok(())
}

fn object_from_metadata(path: String, meta: &Metadata) -> Object {
    let mut object = if meta.is_dir() {
        Object::new(path, ObjectMode::DIR)
    } else {
        append::appendable_object(path, meta.len())
    };
    object.last_modified = meta.modified().ok().map(DateTime::<Utc>::from);
    object
}

// ---------------------------------------------------------------------------
// Storager
// ---------------------------------------------------------------------------

impl Storager for FsStorager {
    fn metadata(&self) -> StorageMeta {
        StorageMeta {
            backend: BACKEND.to_owned(),
            name: self.name.clone(),
            work_dir: self.work_dir.clone(),
            location: None,
            appender: true,
            multiparter: false,
            http_signer: false,
        }
    }

    fn create(&self, path: &str, pairs: &[Pair]) -> Object {
        if let Err(e) = self.parse(Operation::Create, pairs) {
            warn!(path, error = %e, "ignoring pairs of create");
        }
        if path.ends_with('/') {
            Object::new(path, ObjectMode::DIR)
        } else {
            Object::new(path, ObjectMode::READ)
        }
    }

    fn read(&self, path: &str, sink: &mut dyn Write, pairs: &[Pair]) -> Result<u64> {
        self.read_file(path, sink, pairs)
            .map_err(|e| e.with_context("read", path))
    }

    fn write(&self, path: &str, source: &mut dyn Read, size: u64, pairs: &[Pair]) -> Result<u64> {
        self.write_file(path, source, size, pairs)
            .map_err(|e| e.with_context("write", path))
    }

    fn stat(&self, path: &str, pairs: &[Pair]) -> Result<Object> {
        self.stat_file(path, pairs)
            .map_err(|e| e.with_context("stat", path))
    }

    fn delete(&self, path: &str, pairs: &[Pair]) -> Result<()> {
        self.delete_file(path, pairs)
            .map_err(|e| e.with_context("delete", path))
    }

    fn list(&self, path: &str, pairs: &[Pair]) -> Result<ObjectIterator> {
        self.list_files(path, pairs)
            .map_err(|e| e.with_context("list", path))
    }

    fn as_appender(&self) -> Option<&dyn Appender> {
        Some(self)
    }
}

// ---------------------------------------------------------------------------
// Appender
// ---------------------------------------------------------------------------

impl Appender for FsStorager {
    fn create_append(&self, path: &str, pairs: &[Pair]) -> Result<Object> {
        let run = || -> Result<Object> {
            self.parse(Operation::CreateAppend, pairs)?;
            validate_path(path)?;
            if path.ends_with('/') {
                return Err(StorageError::invalid_argument(format!(
                    "{path} names a directory"
                )));
            }
            let local = self.local_path(path);
            if let Some(parent) = local.parent() {
                fs::create_dir_all(parent).map_err(|e| StorageError::from_io(e, path))?;
            }

            let _guard = self.append_lock.lock();
            File::create(&local).map_err(|e| StorageError::from_io(e, path))?;
            debug!(path, "created appendable file");
            Ok(append::appendable_object(path, 0))
        };
        run().map_err(|e| e.with_context("create_append", path))
    }

    fn write_append(
        &self,
        object: &mut Object,
        source: &mut dyn Read,
        size: u64,
        pairs: &[Pair],
    ) -> Result<u64> {
        let path = object.path.clone();
        let mut run = |object: &mut Object| -> Result<u64> {
            let opts = self.parse(Operation::WriteAppend, pairs)?;
            validate_path(&path)?;
            let local = self.local_path(&path);

            // Fail before draining the source when the handle is already stale.
            let current = fs::metadata(&local)
                .map_err(|e| StorageError::from_io(e, &path))?
                .len();
            self.append_policy.check(object, current, size)?;

            let parent = local.parent().ok_or_else(|| {
                StorageError::invalid_argument(format!("{path} has no parent directory"))
            })?;
            let mut staged =
                NamedTempFile::new_in(parent).map_err(|e| StorageError::from_io(e, &path))?;
            copy_exact(source, staged.as_file_mut(), size, &self.copy_options(&opts))?;
            staged
                .as_file_mut()
                .seek(SeekFrom::Start(0))
                .map_err(|e| StorageError::from_io(e, &path))?;

            let _guard = self.append_lock.lock();
            let mut file = OpenOptions::new()
                .append(true)
                .open(&local)
                .map_err(|e| StorageError::from_io(e, &path))?;
            let current = file
                .metadata()
                .map_err(|e| StorageError::from_io(e, &path))?
                .len();
            self.append_policy.check(object, current, size)?;

            if let Err(e) = append_staged(staged.as_file_mut(), &mut file, size) {
                if let Err(rollback) = file.set_len(current) {
                    warn!(path = %path, error = %rollback, "failed to roll back partial append");
                }
                return Err(StorageError::from_io(e, &path));
            }
            if self.config.sync_on_write {
                file.sync_data().map_err(|e| StorageError::from_io(e, &path))?;
            }

            let next = current + size;
            append::advance(object, next);
            debug!(path = %path, offset = next, "appended to file");
            Ok(next)
        };
        run(object).map_err(|e| e.with_context("write_append", path.clone()))
    }
}

/// Copy a fully staged append onto the end of `file`.
fn append_staged(staged: &mut File, file: &mut File, size: u64) -> std::io::Result<()> {
    let copied = std::io::copy(staged, file)?;
    if copied == size {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("staged {copied} of {size} bytes"),
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::thread;
    use std::time::{Duration, Instant};

    use anystore_core::ErrorKind;
    use anystore_core::pairs::{
        with_deadline, with_list_mode, with_multipart_id, with_offset, with_size, with_work_dir,
    };
    use tempfile::TempDir;

    use super::*;

    fn store() -> (TempDir, FsStorager) {
        let dir = TempDir::new().expect("tempdir");
        let store = FsStorager::with_config(
            FsConfig::builder().list_page_size(2).build(),
            &[with_work_dir(dir.path().to_string_lossy())],
        )
        .expect("new");
        (dir, store)
    }

    fn put(store: &FsStorager, path: &str, data: &[u8]) {
        store
            .write(path, &mut &data[..], data.len() as u64, &[])
            .unwrap_or_else(|e| panic!("write {path} failed: {e}"));
    }

    fn get(store: &FsStorager, path: &str, pairs: &[Pair]) -> Vec<u8> {
        let mut out = Vec::new();
        store
            .read(path, &mut out, pairs)
            .unwrap_or_else(|e| panic!("read {path} failed: {e}"));
        out
    }

    fn paths(it: ObjectIterator) -> Vec<String> {
        it.collect_all()
            .expect("list")
            .into_iter()
            .map(|o| o.path)
            .collect()
    }

    /// Source that announces its first read, then waits for a release.
    struct GatedReader {
        started: Option<Sender<()>>,
        release: Receiver<()>,
        data: &'static [u8],
    }

    impl Read for GatedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if let Some(started) = self.started.take() {
                started.send(()).ok();
                self.release.recv_timeout(Duration::from_secs(5)).ok();
            }
            self.data.read(buf)
        }
    }

    fn expect_kind<T: std::fmt::Debug>(result: Result<T>, kind: ErrorKind) {
        let err = result.err().unwrap_or_else(|| panic!("expected {kind}"));
        assert_eq!(err.kind(), kind, "unexpected error: {err}");
    }

    #[test]
    fn test_should_write_nested_file_and_read_window() {
        let (dir, store) = store();
        put(&store, "a/b/c.txt", b"0123456789");
        assert!(dir.path().join("a/b/c.txt").is_file());
        assert_eq!(get(&store, "a/b/c.txt", &[]), b"0123456789");
        assert_eq!(get(&store, "a/b/c.txt", &[with_offset(7), with_size(10)]), b"789");
        expect_kind(
            store.read("a/b/c.txt", &mut Vec::new(), &[with_offset(11)]),
            ErrorKind::InvalidArgument,
        );
        expect_kind(store.read("missing", &mut Vec::new(), &[]), ErrorKind::NotFound);
    }

    #[test]
    fn test_should_leave_no_file_after_failed_write() {
        let (dir, store) = store();
        expect_kind(
            store.write("short", &mut &b"abc"[..], 5, &[]),
            ErrorKind::InvalidArgument,
        );
        expect_kind(
            store.write("late", &mut &b"abc"[..], 3, &[with_deadline(Instant::now())]),
            ErrorKind::Timeout,
        );
        let leftovers = fs::read_dir(dir.path())
            .expect("read_dir")
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_should_replace_existing_file() {
        let (_dir, store) = store();
        put(&store, "f", b"first");
        put(&store, "f", b"2nd");
        assert_eq!(get(&store, "f", &[]), b"2nd");
    }

    #[test]
    fn test_should_list_dir_with_subdirectories() {
        let (_dir, store) = store();
        for path in ["d/b", "d/a.txt", "d/a/x", "d/z", "top"] {
            put(&store, path, b"1");
        }
        let it = store
            .list("d", &[])
            .expect("list");
        let objects = it
            .collect_all()
            .expect("collect");
        let listed: Vec<&str> = objects.iter().map(|o| o.path.as_str()).collect();
        assert_eq!(listed, vec!["d/a.txt", "d/a/", "d/b", "d/z"]);
        assert!(objects[1].mode.is_dir());
        assert_eq!(objects[0].content_length, Some(1));

        let it = store
            .list("", &[])
            .expect("list");
        assert_eq!(paths(it), vec!["d/", "top"]);

        let it = store
            .list("nowhere/", &[])
            .expect("list");
        assert!(paths(it).is_empty());
    }

    #[test]
    fn test_should_list_prefix_recursively() {
        let (_dir, store) = store();
        for path in ["logs/2024/a", "logs/2024/b", "logs/2025/c", "logs-old", "other/x"] {
            put(&store, path, b"1");
        }
        let it = store
            .list("logs/", &[with_list_mode(ListMode::Prefix)])
            .expect("list");
        assert_eq!(paths(it), vec!["logs/2024/a", "logs/2024/b", "logs/2025/c"]);

        let it = store
            .list("logs", &[with_list_mode(ListMode::Prefix)])
            .expect("list");
        assert_eq!(paths(it).len(), 4);

        let it = store
            .list("logs/2024/", &[with_list_mode(ListMode::Prefix)])
            .expect("list");
        assert_eq!(paths(it), vec!["logs/2024/a", "logs/2024/b"]);
    }

    #[test]
    fn test_should_refuse_multipart_pairs_and_modes() {
        let (_dir, store) = store();
        expect_kind(
            store.list("", &[with_list_mode(ListMode::Part)]),
            ErrorKind::UnsupportedOperation,
        );
        expect_kind(
            store.delete("x", &[with_multipart_id("id")]),
            ErrorKind::UnsupportedOperation,
        );
        for _ in 0..3 {
            assert!(store.as_multiparter().is_none());
            assert!(store.as_http_signer().is_none());
            assert!(store.as_appender().is_some());
        }
        let meta = store.metadata();
        assert!(meta.appender && !meta.multiparter && !meta.http_signer);
    }

    #[test]
    fn test_should_delete_files_and_empty_dirs_idempotently() {
        let (dir, store) = store();
        put(&store, "d/f", b"1");
        store
            .delete("d/f", &[])
            .expect("delete");
        store
            .delete("d/f", &[])
            .expect("second delete");
        store
            .delete("d", &[])
            .expect("rmdir");
        assert!(!dir.path().join("d").exists());
    }

    #[test]
    fn test_should_append_and_resume_through_stat() {
        let (_dir, store) = store();
        let mut object = store
            .create_append("log/app.log", &[])
            .expect("create_append");
        let first = store
            .write_append(&mut object, &mut &b"ab"[..], 2, &[])
            .expect("append");
        let second = store
            .write_append(&mut object, &mut &b"cde"[..], 3, &[])
            .expect("append");
        assert_eq!((first, second), (2, 5));

        let mut resumed = store
            .stat("log/app.log", &[])
            .expect("stat");
        assert_eq!(resumed.append_offset, Some(5));
        store
            .write_append(&mut resumed, &mut &b"f"[..], 1, &[])
            .expect("append");
        assert_eq!(get(&store, "log/app.log", &[]), b"abcdef");

        expect_kind(
            store.write_append(&mut object, &mut &b"g"[..], 1, &[]),
            ErrorKind::InvalidState,
        );
    }

    #[test]
    fn test_should_roll_back_short_append() {
        let (_dir, store) = store();
        let mut object = store
            .create_append("log", &[])
            .expect("create_append");
        store
            .write_append(&mut object, &mut &b"ok"[..], 2, &[])
            .expect("append");
        expect_kind(
            store.write_append(&mut object, &mut &b"xy"[..], 5, &[]),
            ErrorKind::InvalidArgument,
        );
        assert_eq!(get(&store, "log", &[]), b"ok");
        store
            .write_append(&mut object, &mut &b"!"[..], 1, &[])
            .expect("append after rollback");
    }

    #[test]
    fn test_should_enforce_append_limit() {
        let dir = TempDir::new().expect("tempdir");
        let store = FsStorager::with_config(
            FsConfig::builder().max_append_size(3).build(),
            &[with_work_dir(dir.path().to_string_lossy())],
        )
        .expect("new");
        let mut object = store
            .create_append("log", &[])
            .expect("create_append");
        expect_kind(
            store.write_append(&mut object, &mut &b"abcd"[..], 4, &[]),
            ErrorKind::CapacityExceeded,
        );
        store
            .write_append(&mut object, &mut &b"abc"[..], 3, &[])
            .expect("append");
        expect_kind(
            store.write_append(&mut object, &mut &b"d"[..], 1, &[]),
            ErrorKind::InvalidState,
        );
    }

    #[test]
    fn test_should_append_elsewhere_while_a_source_stalls() {
        let (_dir, store) = store();
        let mut slow = store.create_append("slow.log", &[]).expect("create_append");
        let mut fast = store.create_append("fast.log", &[]).expect("create_append");
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();

        let store = &store;
        let slow = &mut slow;
        thread::scope(|s| {
            let stalled = s.spawn(move || {
                let mut source = GatedReader {
                    started: Some(started_tx),
                    release: release_rx,
                    data: b"slow",
                };
                store.write_append(slow, &mut source, 4, &[])
            });
            started_rx.recv().expect("slow append started");

            let begun = Instant::now();
            store
                .write_append(&mut fast, &mut &b"f"[..], 1, &[])
                .expect("fast append");
            let waited = begun.elapsed();
            release_tx.send(()).ok();

            assert!(waited < Duration::from_secs(2), "fast append waited {waited:?}");
            let appended = stalled.join().expect("join").expect("slow append");
            assert_eq!(appended, 4);
        });
        assert_eq!(get(store, "fast.log", &[]), b"f");
        assert_eq!(get(store, "slow.log", &[]), b"slow");
    }

    #[test]
    fn test_should_reject_append_handle_escaping_work_dir() {
        let (dir, store) = store();
        let mut forged = append::appendable_object("../outside.log", 0);
        expect_kind(
            store.write_append(&mut forged, &mut &b"x"[..], 1, &[]),
            ErrorKind::InvalidArgument,
        );
        let outside = dir.path().parent().map(|p| p.join("outside.log"));
        assert!(outside.is_none_or(|p| !p.exists()));
    }
}
