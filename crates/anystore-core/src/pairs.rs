//! Pair registry.
//!
//! A [`Pair`] is a named, typed value passed to backend construction and to
//! every storage operation. Each [`Operation`] recognizes a documented subset
//! of pair names and declares a [`PairPolicy`] deciding what happens to the
//! rest. [`OperationOptions::parse`] folds a pair slice into named optional
//! fields, resolving duplicates last-wins, so backends never look pairs up by
//! string on their hot paths.
//!
//! # Usage
//!
//! ```
//! use anystore_core::pairs::{self, Operation, OperationOptions};
//!
//! let opts = OperationOptions::parse(
//!     Operation::Read,
//!     &[pairs::with_offset(4), pairs::with_size(8), pairs::with_offset(2)],
//!     &[],
//!     false,
//! )
//! .unwrap();
//! assert_eq!(opts.offset, Some(2));
//! assert_eq!(opts.size, Some(8));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StorageError};

/// Progress callback, invoked with the byte count of every I/O chunk.
pub type IoCallback = Arc<dyn Fn(usize) + Send + Sync>;

// ---------------------------------------------------------------------------
// Pair names
// ---------------------------------------------------------------------------

/// Work directory of a backend instance.
pub const WORK_DIR: &str = "work_dir";
/// Bucket or container name.
pub const NAME: &str = "name";
/// Credential string, e.g. `hmac:ak:sk`.
pub const CREDENTIAL: &str = "credential";
/// Endpoint string, e.g. `https:host:443`.
pub const ENDPOINT: &str = "endpoint";
/// Region or location.
pub const LOCATION: &str = "location";
/// Treat every unsupported optional pair as ignorable.
pub const ENABLE_LOOSE_PAIR: &str = "enable_loose_pair";
/// Simulate directories on a flat namespace.
pub const ENABLE_VIRTUAL_DIR: &str = "enable_virtual_dir";
/// Byte offset of a read or write window.
pub const OFFSET: &str = "offset";
/// Byte size of a read or write window.
pub const SIZE: &str = "size";
/// Per-chunk progress callback.
pub const IO_CALLBACK: &str = "io_callback";
/// Listing mode.
pub const LIST_MODE: &str = "list_mode";
/// Multipart upload identifier.
pub const MULTIPART_ID: &str = "multipart_id";
/// Content type recorded on written objects.
pub const CONTENT_TYPE: &str = "content_type";
/// Deadline bounding a blocking transfer.
pub const DEADLINE: &str = "deadline";

/// Server-side encryption algorithm (`AES256` or `aws:kms`).
pub const SERVER_SIDE_ENCRYPTION: &str = "server_side_encryption";
/// KMS key id used with `aws:kms`.
pub const SERVER_SIDE_ENCRYPTION_AWS_KMS_KEY_ID: &str = "server_side_encryption_aws_kms_key_id";
/// Base64 encoded JSON encryption context.
pub const SERVER_SIDE_ENCRYPTION_CONTEXT: &str = "server_side_encryption_context";
/// Whether a bucket key is used for KMS encryption.
pub const SERVER_SIDE_ENCRYPTION_BUCKET_KEY_ENABLED: &str =
    "server_side_encryption_bucket_key_enabled";
/// Customer-provided key algorithm (`AES256`).
pub const SERVER_SIDE_ENCRYPTION_CUSTOMER_ALGORITHM: &str =
    "server_side_encryption_customer_algorithm";
/// Customer-provided key, base64 encoded.
pub const SERVER_SIDE_ENCRYPTION_CUSTOMER_KEY: &str = "server_side_encryption_customer_key";

// ---------------------------------------------------------------------------
// List mode
// ---------------------------------------------------------------------------

/// Traversal mode of a `list` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListMode {
    /// Single level, `/` delimited.
    #[default]
    Dir,
    /// Every object whose path starts with the given prefix.
    Prefix,
    /// In-progress multipart uploads.
    Part,
}

impl ListMode {
    /// Wire name of the mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dir => "dir",
            Self::Prefix => "prefix",
            Self::Part => "part",
        }
    }
}

impl fmt::Display for ListMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListMode {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dir" => Ok(Self::Dir),
            "prefix" => Ok(Self::Prefix),
            "part" => Ok(Self::Part),
            other => Err(StorageError::invalid_argument(format!(
                "unknown list mode: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Pair
// ---------------------------------------------------------------------------

/// A named, typed configuration value.
#[derive(Clone)]
pub enum Pair {
    /// See [`WORK_DIR`].
    WorkDir(String),
    /// See [`NAME`].
    Name(String),
    /// See [`CREDENTIAL`].
    Credential(String),
    /// See [`ENDPOINT`].
    Endpoint(String),
    /// See [`LOCATION`].
    Location(String),
    /// See [`ENABLE_LOOSE_PAIR`].
    EnableLoosePair(bool),
    /// See [`ENABLE_VIRTUAL_DIR`].
    EnableVirtualDir(bool),
    /// See [`OFFSET`].
    Offset(u64),
    /// See [`SIZE`].
    Size(u64),
    /// See [`IO_CALLBACK`].
    IoCallback(IoCallback),
    /// See [`LIST_MODE`].
    ListMode(ListMode),
    /// See [`MULTIPART_ID`].
    MultipartId(String),
    /// See [`CONTENT_TYPE`].
    ContentType(String),
    /// See [`DEADLINE`].
    Deadline(Instant),
    /// Backend-specific pair.
    Extension {
        /// Pair name.
        key: String,
        /// Raw value.
        value: String,
    },
    /// A pair the operation must recognize, whatever its policy.
    Required(Box<Pair>),
}

impl Pair {
    /// Name of the pair.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::WorkDir(_) => WORK_DIR,
            Self::Name(_) => NAME,
            Self::Credential(_) => CREDENTIAL,
            Self::Endpoint(_) => ENDPOINT,
            Self::Location(_) => LOCATION,
            Self::EnableLoosePair(_) => ENABLE_LOOSE_PAIR,
            Self::EnableVirtualDir(_) => ENABLE_VIRTUAL_DIR,
            Self::Offset(_) => OFFSET,
            Self::Size(_) => SIZE,
            Self::IoCallback(_) => IO_CALLBACK,
            Self::ListMode(_) => LIST_MODE,
            Self::MultipartId(_) => MULTIPART_ID,
            Self::ContentType(_) => CONTENT_TYPE,
            Self::Deadline(_) => DEADLINE,
            Self::Extension { key, .. } => key,
            Self::Required(inner) => inner.name(),
        }
    }

    /// Mark this pair as required.
    #[must_use]
    pub fn required(self) -> Self {
        match self {
            Self::Required(_) => self,
            other => Self::Required(Box::new(other)),
        }
    }

    fn split_required(&self) -> (&Self, bool) {
        match self {
            Self::Required(inner) => (inner.split_required().0, true),
            other => (other, false),
        }
    }
}

impl fmt::Debug for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkDir(v)
            | Self::Name(v)
            | Self::Endpoint(v)
            | Self::Location(v)
            | Self::MultipartId(v)
            | Self::ContentType(v) => write!(f, "{}={v:?}", self.name()),
            Self::Credential(_) => write!(f, "{CREDENTIAL}=<redacted>"),
            Self::EnableLoosePair(v) | Self::EnableVirtualDir(v) => {
                write!(f, "{}={v}", self.name())
            }
            Self::Offset(v) | Self::Size(v) => write!(f, "{}={v}", self.name()),
            Self::IoCallback(_) => write!(f, "{IO_CALLBACK}=<fn>"),
            Self::ListMode(m) => write!(f, "{LIST_MODE}={m}"),
            Self::Deadline(d) => write!(f, "{DEADLINE}={d:?}"),
            Self::Extension { key, value } => write!(f, "{key}={value:?}"),
            Self::Required(inner) => write!(f, "required({inner:?})"),
        }
    }
}

/// Set the work directory.
#[must_use]
pub fn with_work_dir(v: impl Into<String>) -> Pair {
    Pair::WorkDir(v.into())
}

/// Set the bucket or container name.
#[must_use]
pub fn with_name(v: impl Into<String>) -> Pair {
    Pair::Name(v.into())
}

/// Set the credential string.
#[must_use]
pub fn with_credential(v: impl Into<String>) -> Pair {
    Pair::Credential(v.into())
}

/// Set the endpoint string.
#[must_use]
pub fn with_endpoint(v: impl Into<String>) -> Pair {
    Pair::Endpoint(v.into())
}

/// Set the location or region.
#[must_use]
pub fn with_location(v: impl Into<String>) -> Pair {
    Pair::Location(v.into())
}

/// Ignore unsupported optional pairs on every operation.
#[must_use]
pub fn with_enable_loose_pair() -> Pair {
    Pair::EnableLoosePair(true)
}

/// Simulate directories on a flat namespace.
#[must_use]
pub fn with_enable_virtual_dir() -> Pair {
    Pair::EnableVirtualDir(true)
}

/// Start of the transfer window.
#[must_use]
pub fn with_offset(v: u64) -> Pair {
    Pair::Offset(v)
}

/// Length of the transfer window.
#[must_use]
pub fn with_size(v: u64) -> Pair {
    Pair::Size(v)
}

/// Progress callback invoked after every I/O chunk.
#[must_use]
pub fn with_io_callback(f: impl Fn(usize) + Send + Sync + 'static) -> Pair {
    Pair::IoCallback(Arc::new(f))
}

/// Listing mode.
#[must_use]
pub fn with_list_mode(v: ListMode) -> Pair {
    Pair::ListMode(v)
}

/// Bind the call to an in-progress multipart upload.
#[must_use]
pub fn with_multipart_id(v: impl Into<String>) -> Pair {
    Pair::MultipartId(v.into())
}

/// Content type recorded on the written object.
#[must_use]
pub fn with_content_type(v: impl Into<String>) -> Pair {
    Pair::ContentType(v.into())
}

/// Absolute deadline for a blocking transfer.
#[must_use]
pub fn with_deadline(v: Instant) -> Pair {
    Pair::Deadline(v)
}

/// Deadline `timeout` from now.
#[must_use]
pub fn with_timeout(timeout: Duration) -> Pair {
    Pair::Deadline(Instant::now() + timeout)
}

/// Backend-specific pair.
#[must_use]
pub fn with_extension(key: impl Into<String>, value: impl Into<String>) -> Pair {
    Pair::Extension {
        key: key.into(),
        value: value.into(),
    }
}

/// Server-side encryption algorithm.
#[must_use]
pub fn with_server_side_encryption(v: impl Into<String>) -> Pair {
    with_extension(SERVER_SIDE_ENCRYPTION, v)
}

/// KMS key id for `aws:kms` encryption.
#[must_use]
pub fn with_server_side_encryption_aws_kms_key_id(v: impl Into<String>) -> Pair {
    with_extension(SERVER_SIDE_ENCRYPTION_AWS_KMS_KEY_ID, v)
}

/// Base64 encoded JSON encryption context.
#[must_use]
pub fn with_server_side_encryption_context(v: impl Into<String>) -> Pair {
    with_extension(SERVER_SIDE_ENCRYPTION_CONTEXT, v)
}

/// Enable a bucket key for KMS encryption.
#[must_use]
pub fn with_server_side_encryption_bucket_key_enabled(v: bool) -> Pair {
    with_extension(SERVER_SIDE_ENCRYPTION_BUCKET_KEY_ENABLED, v.to_string())
}

/// Customer-provided key algorithm.
#[must_use]
pub fn with_server_side_encryption_customer_algorithm(v: impl Into<String>) -> Pair {
    with_extension(SERVER_SIDE_ENCRYPTION_CUSTOMER_ALGORITHM, v)
}

/// Customer-provided key, already base64 encoded.
#[must_use]
pub fn with_server_side_encryption_customer_key(v: impl Into<String>) -> Pair {
    with_extension(SERVER_SIDE_ENCRYPTION_CUSTOMER_KEY, v)
}

// ---------------------------------------------------------------------------
// Operations and policies
// ---------------------------------------------------------------------------

/// What an operation does with a pair it does not recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairPolicy {
    /// Fail with `UnsupportedPair`.
    Strict,
    /// Ignore the pair.
    Permissive,
}

/// Every call that accepts pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Backend construction.
    New,
    /// `Storager::create`.
    Create,
    /// `Storager::read`.
    Read,
    /// `Storager::write`.
    Write,
    /// `Storager::stat`.
    Stat,
    /// `Storager::delete`.
    Delete,
    /// `Storager::list`.
    List,
    /// `Appender::create_append`.
    CreateAppend,
    /// `Appender::write_append`.
    WriteAppend,
    /// `Multiparter::create_multipart`.
    CreateMultipart,
    /// `Multiparter::write_multipart`.
    WriteMultipart,
    /// `Multiparter::complete_multipart`.
    CompleteMultipart,
    /// `Multiparter::list_multipart`.
    ListMultipart,
    /// `HttpSigner::query_sign_http_read`.
    QuerySignHttpRead,
    /// `HttpSigner::query_sign_http_write`.
    QuerySignHttpWrite,
}

impl Operation {
    /// Snake-case name of the operation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Create => "create",
            Self::Read => "read",
            Self::Write => "write",
            Self::Stat => "stat",
            Self::Delete => "delete",
            Self::List => "list",
            Self::CreateAppend => "create_append",
            Self::WriteAppend => "write_append",
            Self::CreateMultipart => "create_multipart",
            Self::WriteMultipart => "write_multipart",
            Self::CompleteMultipart => "complete_multipart",
            Self::ListMultipart => "list_multipart",
            Self::QuerySignHttpRead => "query_sign_http_read",
            Self::QuerySignHttpWrite => "query_sign_http_write",
        }
    }

    /// Policy for unrecognized pairs.
    ///
    /// Mutations refuse pairs they cannot honor; reads and metadata calls
    /// ignore them.
    #[must_use]
    pub fn policy(self) -> PairPolicy {
        match self {
            Self::New
            | Self::Write
            | Self::Delete
            | Self::CreateAppend
            | Self::WriteAppend
            | Self::CreateMultipart
            | Self::WriteMultipart
            | Self::CompleteMultipart => PairPolicy::Strict,
            Self::Create
            | Self::Read
            | Self::Stat
            | Self::List
            | Self::ListMultipart
            | Self::QuerySignHttpRead
            | Self::QuerySignHttpWrite => PairPolicy::Permissive,
        }
    }

    /// Core pair names this operation recognizes.
    #[must_use]
    pub fn core_pairs(self) -> &'static [&'static str] {
        match self {
            Self::New => &[
                WORK_DIR,
                NAME,
                CREDENTIAL,
                ENDPOINT,
                LOCATION,
                ENABLE_LOOSE_PAIR,
                ENABLE_VIRTUAL_DIR,
            ],
            Self::Create => &[MULTIPART_ID, CONTENT_TYPE],
            Self::Read => &[OFFSET, SIZE, IO_CALLBACK, DEADLINE],
            Self::Write => &[OFFSET, SIZE, IO_CALLBACK, CONTENT_TYPE, DEADLINE],
            Self::Delete => &[MULTIPART_ID],
            Self::List => &[LIST_MODE],
            Self::CreateAppend | Self::CreateMultipart | Self::QuerySignHttpWrite => {
                &[CONTENT_TYPE]
            }
            Self::WriteAppend | Self::WriteMultipart => &[IO_CALLBACK, DEADLINE],
            Self::Stat
            | Self::CompleteMultipart
            | Self::ListMultipart
            | Self::QuerySignHttpRead => &[],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Parsed options
// ---------------------------------------------------------------------------

/// Pairs of one call, resolved into named fields.
#[derive(Clone, Default)]
pub struct OperationOptions {
    /// Work directory.
    pub work_dir: Option<String>,
    /// Bucket or container name.
    pub name: Option<String>,
    /// Credential string.
    pub credential: Option<String>,
    /// Endpoint string.
    pub endpoint: Option<String>,
    /// Location or region.
    pub location: Option<String>,
    /// Loose pair handling requested.
    pub enable_loose_pair: bool,
    /// Virtual directories requested.
    pub enable_virtual_dir: bool,
    /// Window offset.
    pub offset: Option<u64>,
    /// Window size.
    pub size: Option<u64>,
    /// Progress callback.
    pub io_callback: Option<IoCallback>,
    /// Listing mode, `Dir` when absent.
    pub list_mode: ListMode,
    /// Multipart upload id.
    pub multipart_id: Option<String>,
    /// Content type.
    pub content_type: Option<String>,
    /// Transfer deadline.
    pub deadline: Option<Instant>,
    /// Recognized extension pairs.
    pub extensions: BTreeMap<String, String>,
}

impl fmt::Debug for OperationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationOptions")
            .field("work_dir", &self.work_dir)
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("location", &self.location)
            .field("offset", &self.offset)
            .field("size", &self.size)
            .field("io_callback", &self.io_callback.is_some())
            .field("list_mode", &self.list_mode)
            .field("multipart_id", &self.multipart_id)
            .field("content_type", &self.content_type)
            .field("deadline", &self.deadline)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl OperationOptions {
    /// Resolve `pairs` for `op`.
    ///
    /// `extensions` lists the backend-specific pair names the backend accepts
    /// for this operation. `loose` is the backend instance's loose-pair flag;
    /// for [`Operation::New`] it is also switched on by an
    /// `enable_loose_pair` pair in `pairs`.
    pub fn parse(op: Operation, pairs: &[Pair], extensions: &[&str], loose: bool) -> Result<Self> {
        let loose = loose
            || (op == Operation::New
                && pairs
                    .iter()
                    .any(|p| matches!(p.split_required().0, Pair::EnableLoosePair(true))));
        let strict = op.policy() == PairPolicy::Strict && !loose;
        let core = op.core_pairs();

        let mut opts = Self::default();
        for pair in pairs {
            let (pair, required) = pair.split_required();
            let name = pair.name();
            let recognized = match pair {
                Pair::Extension { .. } => extensions.contains(&name),
                _ => core.contains(&name),
            };
            if !recognized {
                if strict || required {
                    return Err(StorageError::UnsupportedPair {
                        operation: op.to_string(),
                        pair: name.to_owned(),
                    });
                }
                debug!(operation = %op, pair = name, "ignoring unsupported pair");
                continue;
            }
            opts.apply(pair);
        }
        Ok(opts)
    }

    fn apply(&mut self, pair: &Pair) {
        match pair {
            Pair::WorkDir(v) => self.work_dir = Some(v.clone()),
            Pair::Name(v) => self.name = Some(v.clone()),
            Pair::Credential(v) => self.credential = Some(v.clone()),
            Pair::Endpoint(v) => self.endpoint = Some(v.clone()),
            Pair::Location(v) => self.location = Some(v.clone()),
            Pair::EnableLoosePair(v) => self.enable_loose_pair = *v,
            Pair::EnableVirtualDir(v) => self.enable_virtual_dir = *v,
            Pair::Offset(v) => self.offset = Some(*v),
            Pair::Size(v) => self.size = Some(*v),
            Pair::IoCallback(f) => self.io_callback = Some(Arc::clone(f)),
            Pair::ListMode(m) => self.list_mode = *m,
            Pair::MultipartId(v) => self.multipart_id = Some(v.clone()),
            Pair::ContentType(v) => self.content_type = Some(v.clone()),
            Pair::Deadline(d) => self.deadline = Some(*d),
            Pair::Extension { key, value } => {
                self.extensions.insert(key.clone(), value.clone());
            }
            Pair::Required(inner) => self.apply(inner),
        }
    }

    /// Look up a recognized extension pair.
    #[must_use]
    pub fn extension(&self, key: &str) -> Option<&str> {
        self.extensions.get(key).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::ErrorKind;

    fn parse(op: Operation, pairs: &[Pair]) -> Result<OperationOptions> {
        OperationOptions::parse(op, pairs, &[SERVER_SIDE_ENCRYPTION], false)
    }

    #[test]
    fn test_should_resolve_duplicates_last_wins() {
        let opts = parse(
            Operation::Write,
            &[with_size(1), with_content_type("a"), with_size(3), with_content_type("b")],
        )
        .expect("parse");
        assert_eq!(opts.size, Some(3));
        assert_eq!(opts.content_type.as_deref(), Some("b"));
    }

    #[test]
    fn test_should_reject_unknown_pair_on_strict_operation() {
        let err = parse(Operation::Write, &[with_list_mode(ListMode::Prefix)])
            .expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::UnsupportedPair);
        assert!(err.to_string().contains("list_mode"));
    }

    #[test]
    fn test_should_ignore_unknown_pair_on_permissive_operation() {
        let opts = parse(Operation::Read, &[with_list_mode(ListMode::Prefix), with_offset(7)])
            .expect("parse");
        assert_eq!(opts.offset, Some(7));
        assert_eq!(opts.list_mode, ListMode::Dir);
    }

    #[test]
    fn test_should_fail_required_pair_even_when_permissive() {
        let err = parse(Operation::Stat, &[with_offset(1).required()])
            .expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::UnsupportedPair);
    }

    #[test]
    fn test_should_accept_required_pair_when_recognized() {
        let opts = parse(Operation::Delete, &[with_multipart_id("m1").required()])
            .expect("parse");
        assert_eq!(opts.multipart_id.as_deref(), Some("m1"));
    }

    #[test]
    fn test_should_relax_strict_operation_when_loose() {
        let opts = OperationOptions::parse(
            Operation::Write,
            &[with_list_mode(ListMode::Part), with_size(2)],
            &[],
            true,
        )
        .expect("parse");
        assert_eq!(opts.size, Some(2));
    }

    #[test]
    fn test_should_enable_loose_from_construction_pairs() {
        let opts = OperationOptions::parse(
            Operation::New,
            &[with_offset(1), with_enable_loose_pair(), with_work_dir("/tmp")],
            &[],
            false,
        )
        .expect("parse");
        assert!(opts.enable_loose_pair);
        assert_eq!(opts.work_dir.as_deref(), Some("/tmp"));
        assert_eq!(opts.offset, None);
    }

    #[test]
    fn test_should_only_accept_declared_extensions() {
        let opts = parse(Operation::Write, &[with_server_side_encryption("AES256")])
            .expect("parse");
        assert_eq!(opts.extension(SERVER_SIDE_ENCRYPTION), Some("AES256"));

        let err = parse(Operation::Write, &[with_extension("storage_class", "COLD")])
            .expect_err("expected error");
        assert_eq!(err.kind(), ErrorKind::UnsupportedPair);
    }

    #[test]
    fn test_should_keep_io_callback_callable() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let opts = parse(Operation::Read, &[with_io_callback(move |n| {
            c.fetch_add(n, Ordering::SeqCst);
        })])
        .expect("parse");
        let cb = opts.io_callback.expect("callback missing");
        cb(5);
        cb(6);
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_should_redact_credential_in_debug() {
        let rendered = format!("{:?}", with_credential("hmac:ak:sk"));
        assert!(!rendered.contains("sk"));
    }

    #[test]
    fn test_should_parse_list_mode() {
        assert_eq!("prefix".parse::<ListMode>().ok(), Some(ListMode::Prefix));
        assert!("tree".parse::<ListMode>().is_err());
    }
}
