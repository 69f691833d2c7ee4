//! Contract tests for anystore backends.
//!
//! Every scenario runs against each backend the default service registry
//! can build, so a backend only passes once it honors the shared contract.
//! Backends are constructed through connection strings, exactly as callers
//! would.
//!
//! ```text
//! cargo test -p anystore-integration
//! ```

use std::sync::Once;

use anystore_core::Storager;
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A backend under test with an isolated work directory.
#[derive(Debug)]
pub struct TestBackend {
    /// Scheme the backend was built from.
    pub scheme: &'static str,
    /// The backend itself.
    pub store: Box<dyn Storager>,
    _dir: Option<TempDir>,
}

/// Build every default backend with a fresh work directory.
#[must_use]
pub fn backends() -> Vec<TestBackend> {
    init_tracing();

    let memory = anystore_services::new_storager_from_string(&format!(
        "memory:///{}",
        unique_name("work")
    ))
    .expect("failed to build memory backend");

    let dir = TempDir::new().expect("failed to create tempdir");
    let fs = anystore_services::new_storager_from_string(&format!("fs://{}", dir.path().display()))
        .expect("failed to build fs backend");

    tracing::debug!(fs_dir = %dir.path().display(), "built test backends");
    vec![
        TestBackend {
            scheme: "memory",
            store: memory,
            _dir: None,
        },
        TestBackend {
            scheme: "fs",
            store: fs,
            _dir: Some(dir),
        },
    ]
}

/// Generate a unique name for a test object or directory.
#[must_use]
pub fn unique_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string()[..8].to_owned();
    format!("{prefix}-{id}")
}

/// Read a whole object, panicking on failure.
#[must_use]
pub fn read_all(store: &dyn Storager, path: &str) -> Vec<u8> {
    let mut out = Vec::new();
    store
        .read(path, &mut out, &[])
        .unwrap_or_else(|e| panic!("failed to read {path}: {e}"));
    out
}

/// Write `data` to `path`, panicking on failure.
pub fn write_all(store: &dyn Storager, path: &str, data: &[u8]) {
    store
        .write(path, &mut &data[..], data.len() as u64, &[])
        .unwrap_or_else(|e| panic!("failed to write {path}: {e}"));
}

mod test_append;
mod test_factory;
mod test_fswrap;
mod test_list;
mod test_multipart;
mod test_object;
mod test_signer;
