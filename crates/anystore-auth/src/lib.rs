//! SigV4 query-string presigning for anystore backends.
//!
//! Backends that implement `HttpSigner` use this crate to turn a path and a
//! validity window into an `http::Request<()>` that any HTTP client can send
//! without further credentials. The same crate verifies such requests when a
//! backend executes them itself.
//!
//! # Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use anystore_auth::credentials::StaticCredentialProvider;
//! use anystore_auth::presign::{PresignParams, presign, verify_presigned};
//!
//! let req = presign(&PresignParams {
//!     method: http::Method::GET,
//!     scheme: "http",
//!     host: "memory.local",
//!     path: "/bucket/a.txt",
//!     region: "local",
//!     service: "memory",
//!     access_key: "AKID",
//!     secret_key: "secret",
//!     expires: Duration::from_secs(60),
//!     content_length: None,
//!     timestamp: chrono::Utc::now(),
//! })
//! .unwrap();
//!
//! let provider = StaticCredentialProvider::new(vec![("AKID".to_owned(), "secret".to_owned())]);
//! let (parts, ()) = req.into_parts();
//! assert!(verify_presigned(&parts, &provider).is_ok());
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical request construction
//! - [`credentials`] - Credential provider trait and in-memory implementation
//! - [`error`] - Authentication error types
//! - [`presign`] - Presigned request generation and verification
//! - [`sigv4`] - Signing key derivation and signature primitives

pub mod canonical;
pub mod credentials;
pub mod error;
pub mod presign;
pub mod sigv4;

pub use credentials::{CredentialProvider, StaticCredentialProvider};
pub use error::AuthError;
pub use presign::{MAX_PRESIGN_EXPIRY, PresignParams, presign, validate_expiry, verify_presigned};
