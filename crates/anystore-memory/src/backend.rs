//! The memory backend.
//!
//! [`MemoryStorager`] keeps object metadata in a sorted [`KeyStore`] behind a
//! `parking_lot::RwLock` and payloads in a [`BlobStore`]. Every mutation of
//! an object takes the key store's write lock for the duration of the
//! metadata and payload update, so readers never observe a record whose
//! payload is missing. Caller streams are always drained before a lock is
//! taken.
//!
//! ```text
//! write ─┐                      ┌─> KeyStore  (path -> ObjectRecord, sorted)
//! append ├─ stage source ─ lock ┤
//! part  ─┘                      └─> BlobStore (path -> bytes, (id, index) -> bytes)
//! ```

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;

use anystore_auth::canonical::url_decode;
use anystore_auth::presign::{PresignParams, presign, verify_presigned};
use anystore_auth::{AuthError, StaticCredentialProvider};
use anystore_core::append::{self, AppendPolicy};
use anystore_core::checksums::compute_etag;
use anystore_core::credential::{Credential, Endpoint};
use anystore_core::error::{Result, StorageError};
use anystore_core::io::{CopyOptions, copy_exact, skip};
use anystore_core::iterator::{ObjectIterator, Page, PartIterator};
use anystore_core::multipart::{MultipartTracker, UploadPart};
use anystore_core::object::{Object, ObjectMode, Part, StorageMeta};
use anystore_core::pairs::{self, ListMode, Operation, OperationOptions, Pair};
use anystore_core::storager::{Appender, HttpSigner, Multiparter, Storager};
use anystore_core::utils::{
    normalize_work_dir, relative_path, resolve_path, validate_path, validate_prefix,
};
use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::MemoryConfig;
use crate::keystore::{KeyStore, ListEntry, ObjectRecord};
use crate::sse::{self, READ_EXTENSIONS, SseSettings, WRITE_EXTENSIONS};
use crate::storage::BlobStore;

/// Scheme the memory backend is registered under.
pub const BACKEND: &str = "memory";

/// Service name in the credential scope of presigned requests.
const SIGNING_SERVICE: &str = "memory";

/// Region used for signing when no location is configured.
const DEFAULT_LOCATION: &str = "local";

/// In-process object store implementing every capability.
///
/// # Examples
///
/// ```
/// use anystore_core::Storager;
/// use anystore_core::pairs::with_work_dir;
/// use anystore_memory::MemoryStorager;
///
/// let store = MemoryStorager::new(&[with_work_dir("/data")]).unwrap();
/// store.write("hello.txt", &mut &b"hello"[..], 5, &[]).unwrap();
///
/// let mut out = Vec::new();
/// store.read("hello.txt", &mut out, &[]).unwrap();
/// assert_eq!(out, b"hello");
/// ```
pub struct MemoryStorager {
    config: MemoryConfig,
    name: String,
    work_dir: String,
    location: Option<String>,
    endpoint: Option<Endpoint>,
    access_key: String,
    secret_key: String,
    loose: bool,
    virtual_dir: bool,
    keys: Arc<RwLock<KeyStore>>,
    blobs: BlobStore,
    uploads: MultipartTracker,
    append_policy: AppendPolicy,
}

impl std::fmt::Debug for MemoryStorager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorager")
            .field("name", &self.name)
            .field("work_dir", &self.work_dir)
            .field("location", &self.location)
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("loose", &self.loose)
            .field("virtual_dir", &self.virtual_dir)
            .field("objects", &self.keys.read().len())
            .field("blobs", &self.blobs)
            .finish_non_exhaustive()
    }
}

impl MemoryStorager {
    /// Create a backend configured from the environment and `pairs`.
    pub fn new(pairs: &[Pair]) -> Result<Self> {
        Self::with_config(MemoryConfig::from_env(), pairs)
    }

    /// Create a backend from an explicit configuration and `pairs`.
    ///
    /// Only `hmac` credentials are accepted; without one, a random signing
    /// secret is generated for this instance.
    pub fn with_config(config: MemoryConfig, pairs: &[Pair]) -> Result<Self> {
        let opts = OperationOptions::parse(Operation::New, pairs, &[], false)?;

        let (access_key, secret_key) = match opts.credential.as_deref() {
            Some(raw) => {
                let credential: Credential = raw.parse()?;
                let Some((access_key, secret_key)) = credential.hmac() else {
                    return Err(StorageError::invalid_argument(format!(
                        "memory backend needs an hmac credential, got {}",
                        credential.protocol()
                    )));
                };
                (access_key.to_owned(), secret_key.to_owned())
            }
            None => (BACKEND.to_owned(), Uuid::new_v4().simple().to_string()),
        };
        let endpoint = opts
            .endpoint
            .as_deref()
            .map(str::parse::<Endpoint>)
            .transpose()?;

        if config.part_index_min > config.part_index_max {
            return Err(StorageError::invalid_argument(format!(
                "part index range {}..={} is empty",
                config.part_index_min, config.part_index_max
            )));
        }

        let name = opts.name.unwrap_or_default();
        let work_dir = normalize_work_dir(opts.work_dir.as_deref().unwrap_or("/"));
        info!(
            name = %name,
            work_dir = %work_dir,
            loose = opts.enable_loose_pair,
            virtual_dir = opts.enable_virtual_dir,
            "created memory storager"
        );

        Ok(Self {
            blobs: BlobStore::new(config.max_memory_object_size),
            uploads: MultipartTracker::new(config.part_index_min..=config.part_index_max),
            append_policy: AppendPolicy::new(config.max_append_size),
            keys: Arc::new(RwLock::new(KeyStore::default())),
            config,
            name,
            work_dir,
            location: opts.location,
            endpoint,
            access_key,
            secret_key,
            loose: opts.enable_loose_pair,
            virtual_dir: opts.enable_virtual_dir,
        })
    }

    /// Configuration this backend runs with.
    #[must_use]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Verify a request produced by this backend's [`HttpSigner`] and
    /// execute it.
    ///
    /// `GET` requests copy the object into `sink`; `PUT` requests store
    /// `content-length` bytes from `body`. Returns the bytes transferred.
    pub fn serve_presigned(
        &self,
        request: http::Request<()>,
        body: &mut dyn Read,
        sink: &mut dyn Write,
    ) -> Result<u64> {
        let (parts, ()) = request.into_parts();
        let provider =
            StaticCredentialProvider::new([(self.access_key.clone(), self.secret_key.clone())]);
        verify_presigned(&parts, &provider).map_err(auth_error)?;

        let decoded = url_decode(parts.uri.path());
        let key = if self.name.is_empty() {
            decoded.as_str()
        } else {
            decoded
                .strip_prefix(&format!("/{}", self.name))
                .ok_or_else(|| {
                    StorageError::invalid_argument(format!(
                        "presigned path {decoded} is outside {}",
                        self.name
                    ))
                })?
        };
        debug!(method = %parts.method, key, "serving presigned request");

        if parts.method == http::Method::GET {
            self.read(key, sink, &[])
        } else if parts.method == http::Method::PUT {
            let size = parts
                .headers
                .get(http::header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .ok_or_else(|| {
                    StorageError::invalid_argument("presigned upload without content-length")
                })?;
            let mut write_pairs = Vec::new();
            if let Some(content_type) = parts
                .headers
                .get(http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
            {
                write_pairs.push(pairs::with_content_type(content_type));
            }
            self.write(key, body, size, &write_pairs)
        } else {
            Err(StorageError::unsupported_operation(
                BACKEND,
                format!("presigned {}", parts.method),
            ))
        }
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn parse(&self, op: Operation, pairs: &[Pair], extensions: &[&str]) -> Result<OperationOptions> {
        OperationOptions::parse(op, pairs, extensions, self.loose)
    }

    fn key(&self, path: &str) -> String {
        resolve_path(&self.work_dir, path)
    }

    fn copy_options(&self, opts: &OperationOptions) -> CopyOptions {
        CopyOptions::from_options(opts, self.config.io_chunk_size)
    }

    /// Drain exactly `size` bytes of `source` into memory.
    fn stage(&self, source: &mut dyn Read, size: u64, opts: &OperationOptions) -> Result<Bytes> {
        let capacity = usize::try_from(size).map_or(0, |s| s.min(self.config.io_chunk_size));
        let mut buf = Vec::with_capacity(capacity);
        copy_exact(source, &mut buf, size, &self.copy_options(opts))?;
        Ok(Bytes::from(buf))
    }

    fn page_size(&self) -> usize {
        self.config.list_page_size.max(1)
    }

    fn region(&self) -> &str {
        self.location.as_deref().unwrap_or(DEFAULT_LOCATION)
    }

    fn read_object(&self, path: &str, sink: &mut dyn Write, pairs: &[Pair]) -> Result<u64> {
        let opts = self.parse(Operation::Read, pairs, READ_EXTENSIONS)?;
        validate_path(path)?;
        let key = self.key(path);

        let keys = self.keys.read();
        let record = keys.get(&key).ok_or_else(|| StorageError::not_found(path))?;
        if record.dir {
            return Err(StorageError::invalid_argument(format!("{path} is a directory")));
        }
        sse::check_customer_key(&record.metadata, &opts, path)?;

        let offset = opts.offset.unwrap_or(0);
        if offset > record.size {
            return Err(StorageError::invalid_argument(format!(
                "offset {offset} beyond object length {}",
                record.size
            )));
        }
        let available = record.size - offset;
        let len = opts.size.map_or(available, |size| size.min(available));
        let data = self.blobs.read_range(&key, offset, len)?;
        drop(keys);

        let n = copy_exact(&mut data.as_ref(), sink, len, &self.copy_options(&opts))?;
        debug!(path, offset, size = n, "read object");
        Ok(n)
    }

    fn write_object(
        &self,
        path: &str,
        source: &mut dyn Read,
        size: u64,
        pairs: &[Pair],
    ) -> Result<u64> {
        let opts = self.parse(Operation::Write, pairs, WRITE_EXTENSIONS)?;
        validate_path(path)?;
        if let Some(declared) = opts.size {
            if declared != size {
                return Err(StorageError::invalid_argument(format!(
                    "size pair {declared} disagrees with write size {size}"
                )));
            }
        }
        let key = self.key(path);

        if path.ends_with('/') {
            return self.write_dir_marker(path, &key, size);
        }
        if size > self.config.max_object_size {
            return Err(StorageError::CapacityExceeded {
                requested: size,
                limit: self.config.max_object_size,
            });
        }
        let encryption = SseSettings::from_options(&opts)?;

        if let Some(offset) = opts.offset {
            skip(source, offset)?;
        }
        let data = self.stage(source, size, &opts)?;

        let mut keys = self.keys.write();
        let result = self.blobs.put(&key, data)?;
        let mut record = ObjectRecord::new(result.size, result.etag);
        record.content_type = opts.content_type;
        if let Some(encryption) = encryption {
            record.metadata = encryption.to_metadata();
        }
        keys.put(&key, record);
        drop(keys);

        debug!(path, size, "wrote object");
        Ok(size)
    }

    fn write_dir_marker(&self, path: &str, key: &str, size: u64) -> Result<u64> {
        if !self.virtual_dir {
            return Err(StorageError::invalid_argument(format!(
                "{path} ends with '/'; directories need enable_virtual_dir"
            )));
        }
        if size != 0 {
            return Err(StorageError::invalid_argument(format!(
                "directory marker {path} cannot carry {size} bytes"
            )));
        }
        let mut record = ObjectRecord::new(0, compute_etag(b""));
        record.dir = true;
        self.keys.write().put(key, record);
        debug!(path, "created directory marker");
        Ok(0)
    }

    fn stat_object(&self, path: &str, pairs: &[Pair]) -> Result<Object> {
        let opts = self.parse(Operation::Stat, pairs, READ_EXTENSIONS)?;
        validate_path(path)?;
        let key = self.key(path);

        let keys = self.keys.read();
        let record = keys.get(&key).ok_or_else(|| StorageError::not_found(path))?;
        sse::check_customer_key(&record.metadata, &opts, path)?;
        let mut object = record.to_object(&self.work_dir, &key);
        object.path = path.to_owned();
        Ok(object)
    }

    fn delete_object(&self, path: &str, pairs: &[Pair]) -> Result<()> {
        let opts = self.parse(Operation::Delete, pairs, &[])?;
        validate_path(path)?;
        let key = self.key(path);

        if let Some(id) = opts.multipart_id {
            self.uploads.cancel(&id, &key)?;
            let removed = self.blobs.remove_parts(&id);
            debug!(path, multipart_id = %id, parts = removed, "freed cancelled upload");
            return Ok(());
        }

        let mut keys = self.keys.write();
        if keys.delete(&key).is_some() {
            self.blobs.remove(&key);
            debug!(path, "deleted object");
        }
        Ok(())
    }

    fn list_objects(&self, path: &str, pairs: &[Pair]) -> Result<ObjectIterator> {
        let opts = self.parse(Operation::List, pairs, &[])?;
        validate_prefix(path)?;
        let mut prefix = self.key(path);
        let page_size = self.page_size();
        debug!(path, mode = %opts.list_mode, "listing");

        match opts.list_mode {
            ListMode::Dir | ListMode::Prefix => {
                let delimited = opts.list_mode == ListMode::Dir;
                if delimited && !prefix.ends_with('/') {
                    prefix.push('/');
                }
                let keys = Arc::clone(&self.keys);
                let work_dir = self.work_dir.clone();
                let mut marker: Option<String> = None;
                Ok(ObjectIterator::new(move || {
                    let page = keys
                        .read()
                        .list_page(&prefix, delimited, marker.as_deref(), page_size);
                    let items = page
                        .entries
                        .into_iter()
                        .map(|entry| match entry {
                            ListEntry::Object { key, record } => record.to_object(&work_dir, &key),
                            ListEntry::CommonPrefix(common) => {
                                Object::new(relative_path(&work_dir, &common), ObjectMode::DIR)
                            }
                        })
                        .collect();
                    marker = page.next_marker;
                    Ok(if marker.is_some() {
                        Page::more(items)
                    } else {
                        Page::last(items)
                    })
                }))
            }
            ListMode::Part => {
                let objects: Vec<Object> = self
                    .uploads
                    .list_active(&prefix)
                    .iter()
                    .map(|upload| {
                        let mut object = upload.to_object();
                        object.path = relative_path(&self.work_dir, &upload.path);
                        object
                    })
                    .collect();
                Ok(ObjectIterator::paged(objects, page_size))
            }
        }
    }
}

fn auth_error(err: AuthError) -> StorageError {
    StorageError::invalid_argument(format!("presigned request rejected: {err}"))
}

// ---------------------------------------------------------------------------
// Storager
// ---------------------------------------------------------------------------

impl Storager for MemoryStorager {
    fn metadata(&self) -> StorageMeta {
        StorageMeta {
            backend: BACKEND.to_owned(),
            name: self.name.clone(),
            work_dir: self.work_dir.clone(),
            location: self.location.clone(),
            appender: true,
            multiparter: true,
            http_signer: true,
        }
    }

    fn create(&self, path: &str, pairs: &[Pair]) -> Object {
        let opts = self
            .parse(Operation::Create, pairs, &[])
            .unwrap_or_else(|e| {
                warn!(path, error = %e, "ignoring pairs of create");
                OperationOptions::default()
            });
        let mut object = if let Some(id) = opts.multipart_id {
            let mut object = Object::new(path, ObjectMode::PART);
            object.multipart_id = Some(id);
            object
        } else if self.virtual_dir && path.ends_with('/') {
            Object::new(path, ObjectMode::DIR)
        } else {
            Object::new(path, ObjectMode::READ)
        };
        object.content_type = opts.content_type;
        object
    }

    fn read(&self, path: &str, sink: &mut dyn Write, pairs: &[Pair]) -> Result<u64> {
        self.read_object(path, sink, pairs)
            .map_err(|e| e.with_context("read", path))
    }

    fn write(&self, path: &str, source: &mut dyn Read, size: u64, pairs: &[Pair]) -> Result<u64> {
        self.write_object(path, source, size, pairs)
            .map_err(|e| e.with_context("write", path))
    }

    fn stat(&self, path: &str, pairs: &[Pair]) -> Result<Object> {
        self.stat_object(path, pairs)
            .map_err(|e| e.with_context("stat", path))
    }

    fn delete(&self, path: &str, pairs: &[Pair]) -> Result<()> {
        self.delete_object(path, pairs)
            .map_err(|e| e.with_context("delete", path))
    }

    fn list(&self, path: &str, pairs: &[Pair]) -> Result<ObjectIterator> {
        self.list_objects(path, pairs)
            .map_err(|e| e.with_context("list", path))
    }

    fn as_appender(&self) -> Option<&dyn Appender> {
        Some(self)
    }

    fn as_multiparter(&self) -> Option<&dyn Multiparter> {
        Some(self)
    }

    fn as_http_signer(&self) -> Option<&dyn HttpSigner> {
        Some(self)
    }
}

// ---------------------------------------------------------------------------
// Appender
// ---------------------------------------------------------------------------

impl Appender for MemoryStorager {
    fn create_append(&self, path: &str, pairs: &[Pair]) -> Result<Object> {
        let opts = self
            .parse(Operation::CreateAppend, pairs, &[])
            .map_err(|e| e.with_context("create_append", path))?;
        validate_path(path).map_err(|e| e.with_context("create_append", path))?;
        let key = self.key(path);

        let mut keys = self.keys.write();
        let result = self.blobs.put(&key, Bytes::new())?;
        let mut record = ObjectRecord::new(0, result.etag);
        record.appendable = true;
        record.content_type.clone_from(&opts.content_type);
        keys.put(&key, record);
        drop(keys);

        debug!(path, "created appendable object");
        let mut object = append::appendable_object(path, 0);
        object.content_type = opts.content_type;
        Ok(object)
    }

    fn write_append(
        &self,
        object: &mut Object,
        source: &mut dyn Read,
        size: u64,
        pairs: &[Pair],
    ) -> Result<u64> {
        let path = object.path.clone();
        let key = self.key(&path);
        let mut run = |object: &mut Object| -> Result<u64> {
            let opts = self.parse(Operation::WriteAppend, pairs, &[])?;
            validate_path(&path)?;

            // Fail before draining the source when the handle is already stale.
            let current = appendable_len(&self.keys.read(), &key, &path)?;
            self.append_policy.check(object, current, size)?;
            let data = self.stage(source, size, &opts)?;

            let mut keys = self.keys.write();
            let current = appendable_len(&keys, &key, &path)?;
            self.append_policy.check(object, current, size)?;
            let result = self.blobs.append(&key, &data)?;
            if let Some(record) = keys.get_mut(&key) {
                record.size = result.size;
                record.etag = Some(result.etag);
                record.last_modified = Utc::now();
            }
            drop(keys);

            append::advance(object, result.size);
            debug!(path = %path, offset = result.size, "appended to object");
            Ok(result.size)
        };
        run(object).map_err(|e| e.with_context("write_append", path.clone()))
    }
}

fn appendable_len(keys: &KeyStore, key: &str, path: &str) -> Result<u64> {
    let record = keys.get(key).ok_or_else(|| StorageError::not_found(path))?;
    if !record.appendable {
        return Err(StorageError::invalid_state(format!(
            "{path} was not created as an appendable object"
        )));
    }
    Ok(record.size)
}

// ---------------------------------------------------------------------------
// Multiparter
// ---------------------------------------------------------------------------

impl Multiparter for MemoryStorager {
    fn create_multipart(&self, path: &str, pairs: &[Pair]) -> Result<Object> {
        let run = || -> Result<Object> {
            let opts = self.parse(Operation::CreateMultipart, pairs, WRITE_EXTENSIONS)?;
            validate_path(path)?;
            let metadata = SseSettings::from_options(&opts)?
                .map(|encryption| encryption.to_metadata())
                .unwrap_or_default();
            let upload = self
                .uploads
                .create(&self.key(path), opts.content_type, metadata);
            let mut object = upload.to_object();
            object.path = path.to_owned();
            Ok(object)
        };
        run().map_err(|e| e.with_context("create_multipart", path))
    }

    fn write_multipart(
        &self,
        object: &Object,
        source: &mut dyn Read,
        size: u64,
        index: u32,
        pairs: &[Pair],
    ) -> Result<(u64, Part)> {
        let mut run = || -> Result<(u64, Part)> {
            let opts = self.parse(Operation::WriteMultipart, pairs, &[])?;
            let id = object.must_get_multipart_id()?;
            let key = self.key(&object.path);
            self.uploads.check_index(index)?;
            if size > self.config.max_part_size {
                return Err(StorageError::CapacityExceeded {
                    requested: size,
                    limit: self.config.max_part_size,
                });
            }
            // Fail before draining the source when the upload is not live.
            self.uploads.get(id, &key)?;

            let data = self.stage(source, size, &opts)?;
            let result = self.blobs.write_part(id, index, data)?;
            let part = UploadPart {
                index,
                etag: result.etag,
                size: result.size,
                last_modified: Utc::now(),
            };
            if let Err(e) = self.uploads.record_part(id, &key, part.clone()) {
                self.blobs.remove_part(id, index);
                return Err(e);
            }
            debug!(path = %object.path, multipart_id = %id, index, size, "wrote part");
            Ok((result.size, part.to_part()))
        };
        run().map_err(|e| e.with_context("write_multipart", object.path.clone()))
    }

    fn complete_multipart(&self, object: &Object, parts: &[Part], pairs: &[Pair]) -> Result<()> {
        let run = || -> Result<()> {
            self.parse(Operation::CompleteMultipart, pairs, &[])?;
            let id = object.must_get_multipart_id()?;
            let key = self.key(&object.path);

            self.uploads.complete(id, &key, parts, |upload, parts| {
                let mut keys = self.keys.write();
                let result = self.blobs.assemble(id, &key, parts)?;
                let mut record = ObjectRecord::new(result.size, result.etag);
                record.content_type.clone_from(&upload.content_type);
                record.metadata.clone_from(&upload.metadata);
                keys.put(&key, record);
                Ok(())
            })?;

            let removed = self.blobs.remove_parts(id);
            debug!(path = %object.path, multipart_id = %id, parts = removed, "completed upload");
            Ok(())
        };
        run().map_err(|e| e.with_context("complete_multipart", object.path.clone()))
    }

    fn list_multipart(&self, object: &Object, pairs: &[Pair]) -> Result<PartIterator> {
        let run = || -> Result<PartIterator> {
            self.parse(Operation::ListMultipart, pairs, &[])?;
            let id = object.must_get_multipart_id()?;
            let parts = self.uploads.parts(id, &self.key(&object.path))?;
            Ok(PartIterator::paged(parts, self.page_size()))
        };
        run().map_err(|e| e.with_context("list_multipart", object.path.clone()))
    }
}

// ---------------------------------------------------------------------------
// HttpSigner
// ---------------------------------------------------------------------------

impl MemoryStorager {
    fn presign_request(
        &self,
        method: http::Method,
        path: &str,
        content_length: Option<u64>,
        expire: Duration,
    ) -> Result<http::Request<()>> {
        validate_path(path)?;
        let key = self.key(path);
        let url_path = if self.name.is_empty() {
            key
        } else {
            format!("/{}{key}", self.name)
        };
        let (scheme, host) = match &self.endpoint {
            Some(endpoint) => (endpoint.protocol.as_str(), endpoint.authority()),
            None => ("http", self.config.signing_host.clone()),
        };

        let request = presign(&PresignParams {
            method,
            scheme,
            host: &host,
            path: &url_path,
            region: self.region(),
            service: SIGNING_SERVICE,
            access_key: &self.access_key,
            secret_key: &self.secret_key,
            expires: expire,
            content_length,
            timestamp: Utc::now(),
        })
        .map_err(auth_error)?;
        debug!(path, method = %request.method(), expires = expire.as_secs(), "presigned request");
        Ok(request)
    }
}

impl HttpSigner for MemoryStorager {
    fn query_sign_http_read(
        &self,
        path: &str,
        expire: Duration,
        pairs: &[Pair],
    ) -> Result<http::Request<()>> {
        self.parse(Operation::QuerySignHttpRead, pairs, &[])
            .and_then(|_| self.presign_request(http::Method::GET, path, None, expire))
            .map_err(|e| e.with_context("query_sign_http_read", path))
    }

    fn query_sign_http_write(
        &self,
        path: &str,
        size: u64,
        expire: Duration,
        pairs: &[Pair],
    ) -> Result<http::Request<()>> {
        let run = || -> Result<http::Request<()>> {
            let opts = self.parse(Operation::QuerySignHttpWrite, pairs, &[])?;
            if size > self.config.max_object_size {
                return Err(StorageError::CapacityExceeded {
                    requested: size,
                    limit: self.config.max_object_size,
                });
            }
            let mut request = self.presign_request(http::Method::PUT, path, Some(size), expire)?;
            if let Some(content_type) = opts.content_type {
                let value = http::HeaderValue::from_str(&content_type).map_err(|e| {
                    StorageError::invalid_argument(format!("invalid content type: {e}"))
                })?;
                request
                    .headers_mut()
                    .insert(http::header::CONTENT_TYPE, value);
            }
            Ok(request)
        };
        run().map_err(|e| e.with_context("query_sign_http_write", path))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
