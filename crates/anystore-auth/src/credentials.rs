//! Credential lookup for request verification.
//!
//! [`CredentialProvider`] resolves secret access keys from access key IDs.
//! Backends that hold a single `hmac` credential use
//! [`StaticCredentialProvider`].

use std::collections::HashMap;

use crate::error::AuthError;

/// Trait for looking up secret access keys by access key ID.
pub trait CredentialProvider: Send + Sync {
    /// Retrieve the secret access key for the given access key ID.
    fn get_secret_key(&self, access_key_id: &str) -> Result<String, AuthError>;
}

/// An in-memory credential provider backed by a `HashMap`.
///
/// # Examples
///
/// ```
/// use anystore_auth::credentials::{CredentialProvider, StaticCredentialProvider};
///
/// let provider = StaticCredentialProvider::new(vec![("AKID".to_owned(), "secret".to_owned())]);
/// assert_eq!(provider.get_secret_key("AKID").unwrap(), "secret");
/// ```
#[derive(Clone)]
pub struct StaticCredentialProvider {
    credentials: HashMap<String, String>,
}

impl std::fmt::Debug for StaticCredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentialProvider")
            .field("access_keys", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StaticCredentialProvider {
    /// Create a provider from `(access_key_id, secret_key)` pairs.
    pub fn new(credentials: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            credentials: credentials.into_iter().collect(),
        }
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn get_secret_key(&self, access_key_id: &str) -> Result<String, AuthError> {
        self.credentials
            .get(access_key_id)
            .cloned()
            .ok_or_else(|| AuthError::AccessKeyNotFound(access_key_id.to_owned()))
    }
}
