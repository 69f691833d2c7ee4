//! Filesystem-style view over any [`Storager`].
//!
//! [`StorageFs`] lets code written against files and directories use a
//! storage backend: [`StorageFs::open`] returns a [`StorageFile`] that
//! implements [`std::io::Read`] and [`std::io::Seek`] through ranged reads,
//! and [`StorageFs::read_dir`] / [`StorageFs::glob`] are built on `list`.

use std::io::{self, Cursor, Read, Seek, SeekFrom};

use regex::Regex;

use crate::error::{Result, StorageError};
use crate::object::Object;
use crate::pairs::{self, ListMode};
use crate::storager::Storager;

/// Filesystem-style adapter over a backend.
#[derive(Debug, Clone, Copy)]
pub struct StorageFs<'a> {
    store: &'a dyn Storager,
}

/// One entry returned by [`StorageFs::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Final path component, without a trailing `/`.
    pub name: String,
    /// Path relative to the backend's work directory.
    pub path: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Size in bytes, zero for directories.
    pub size: u64,
}

impl<'a> StorageFs<'a> {
    /// Wrap `store`.
    #[must_use]
    pub fn new(store: &'a dyn Storager) -> Self {
        Self { store }
    }

    /// Open `path` for reading.
    pub fn open(&self, path: &str) -> Result<StorageFile<'a>> {
        let object = self.store.stat(path, &[])?;
        if object.mode.is_dir() {
            return Err(StorageError::invalid_argument(format!(
                "{path} is a directory"
            )));
        }
        Ok(StorageFile {
            store: self.store,
            size: object.size(),
            object,
            pos: 0,
        })
    }

    /// Metadata of `path`.
    pub fn stat(&self, path: &str) -> Result<Object> {
        self.store.stat(path, &[])
    }

    /// Whole content of `path`.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.store.read(path, &mut buf, &[])?;
        Ok(buf)
    }

    /// Entries directly under `dir`, sorted by name.
    pub fn read_dir(&self, dir: &str) -> Result<Vec<DirEntry>> {
        let prefix = dir_prefix(dir);
        let objects = self
            .store
            .list(&prefix, &[pairs::with_list_mode(ListMode::Dir)])?
            .collect_all()?;
        let mut entries: Vec<DirEntry> = objects
            .into_iter()
            .map(|o| {
                let trimmed = o.path.trim_end_matches('/');
                let name = trimmed.rsplit('/').next().unwrap_or(trimmed).to_owned();
                DirEntry {
                    name,
                    is_dir: o.mode.is_dir(),
                    size: o.size(),
                    path: o.path,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Paths of regular objects matching a shell `pattern`.
    ///
    /// `*` and `?` never match `/`; `[...]` and `[!...]` are character
    /// classes. Results are sorted.
    pub fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = compile_glob(pattern)?;
        let literal_end = pattern.find(['*', '?', '[']).unwrap_or(pattern.len());
        let prefix = &pattern[..literal_end];

        let mut matches = Vec::new();
        let mut it = self
            .store
            .list(prefix, &[pairs::with_list_mode(ListMode::Prefix)])?;
        loop {
            match it.next() {
                Ok(o) if !o.mode.is_dir() && matcher.is_match(&o.path) => matches.push(o.path),
                Ok(_) => {}
                Err(e) if e.is_iterate_done() => break,
                Err(e) => return Err(e),
            }
        }
        matches.sort();
        Ok(matches)
    }
}

fn dir_prefix(dir: &str) -> String {
    let trimmed = dir.trim_matches('/');
    if trimmed.is_empty() || trimmed == "." {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

fn compile_glob(pattern: &str) -> Result<Regex> {
    let mut re = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            '[' => {
                re.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    re.push('^');
                }
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    if c == '\\' || c == '[' || c == '^' {
                        re.push('\\');
                    }
                    re.push(c);
                }
                if !closed {
                    return Err(StorageError::invalid_argument(format!(
                        "unterminated character class in {pattern}"
                    )));
                }
                re.push(']');
            }
            other => re.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| StorageError::invalid_argument(format!("bad pattern {pattern}: {e}")))
}

/// Read-only file handle returned by [`StorageFs::open`].
#[derive(Debug)]
pub struct StorageFile<'a> {
    store: &'a dyn Storager,
    object: Object,
    size: u64,
    pos: u64,
}

impl StorageFile<'_> {
    /// Metadata captured when the file was opened.
    #[must_use]
    pub fn metadata(&self) -> &Object {
        &self.object
    }
}

impl Read for StorageFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.size || buf.is_empty() {
            return Ok(0);
        }
        let remaining = self.size - self.pos;
        let want = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let mut sink = Cursor::new(&mut buf[..want]);
        let n = self
            .store
            .read(
                &self.object.path,
                &mut sink,
                &[pairs::with_offset(self.pos), pairs::with_size(want as u64)],
            )
            .map_err(io::Error::other)?;
        self.pos += n;
        usize::try_from(n).map_err(io::Error::other)
    }
}

impl Seek for StorageFile<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(delta) => self.size.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek to a negative position")
        })?;
        self.pos = target;
        Ok(target)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
