//! Backend registry.
//!
//! A [`ServiceRegistry`] is an owned table from scheme to constructor. There
//! is no process-wide registration step: callers build the table they need,
//! usually starting from [`ServiceRegistry::with_defaults`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anystore_core::error::{Result, StorageError};
use anystore_core::{Pair, Storager};
use tracing::{debug, info};

use crate::connection::parse_connection_string;

/// Builds a backend from its construction pairs.
pub type Constructor = Arc<dyn Fn(&[Pair]) -> Result<Box<dyn Storager>> + Send + Sync>;

/// Table of constructible backends, keyed by scheme.
///
/// # Examples
///
/// ```
/// use anystore_services::ServiceRegistry;
///
/// let registry = ServiceRegistry::with_defaults();
/// assert_eq!(registry.schemes(), vec!["fs", "memory"]);
///
/// let store = registry.new_storager_from_string("memory://bucket/data").unwrap();
/// assert_eq!(store.metadata().name, "bucket");
/// ```
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    constructors: HashMap<String, Constructor>,
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

impl ServiceRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the `memory` and `fs` backends.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(anystore_memory::BACKEND, anystore_memory::new_storager);
        registry.register(anystore_fs::BACKEND, anystore_fs::new_storager);
        registry
    }

    /// Register `constructor` under `scheme` (case-insensitive), replacing
    /// and returning any previous one.
    pub fn register<F>(&mut self, scheme: impl Into<String>, constructor: F) -> Option<Constructor>
    where
        F: Fn(&[Pair]) -> Result<Box<dyn Storager>> + Send + Sync + 'static,
    {
        let scheme = scheme.into().to_ascii_lowercase();
        debug!(scheme = %scheme, "registering backend");
        self.constructors.insert(scheme, Arc::new(constructor))
    }

    /// Whether a backend is registered under `scheme`.
    #[must_use]
    pub fn contains(&self, scheme: &str) -> bool {
        self.constructors.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Registered schemes in sorted order.
    #[must_use]
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Construct the backend registered under `scheme`.
    pub fn new_storager(&self, scheme: &str, pairs: &[Pair]) -> Result<Box<dyn Storager>> {
        let scheme = scheme.to_ascii_lowercase();
        let constructor = self
            .constructors
            .get(&scheme)
            .ok_or_else(|| StorageError::UnsupportedBackend {
                scheme: scheme.clone(),
            })?;
        let store = constructor(pairs)?;
        info!(scheme = %scheme, work_dir = %store.metadata().work_dir, "constructed storager");
        Ok(store)
    }

    /// Parse `conn` and construct the backend it names.
    ///
    /// Malformed strings and unknown schemes fail before any constructor
    /// runs.
    pub fn new_storager_from_string(&self, conn: &str) -> Result<Box<dyn Storager>> {
        let parsed = parse_connection_string(conn)?;
        self.new_storager(&parsed.scheme, &parsed.pairs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
