//! Error types for presigned request handling.
//!
//! All signing and verification failures are represented by [`AuthError`].

/// Errors that can occur while presigning or verifying a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The signing algorithm is not supported (only AWS4-HMAC-SHA256 is supported).
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The `X-Amz-Credential` value does not match `AKID/date/region/service/aws4_request`.
    #[error("Invalid credential format")]
    InvalidCredential,

    /// The access key ID was not found in the credential store.
    #[error("Access key not found: {0}")]
    AccessKeyNotFound(String),

    /// The computed signature does not match the provided signature.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,

    /// The presigned request has expired (current time exceeds `X-Amz-Date` + `X-Amz-Expires`).
    #[error("Request has expired")]
    RequestExpired,

    /// A required query parameter is missing or malformed.
    #[error("Missing required query parameter: {0}")]
    MissingQueryParam(String),

    /// A header listed in `X-Amz-SignedHeaders` is missing from the request.
    #[error("Missing required header: {0}")]
    MissingHeader(String),

    /// The requested validity is zero or longer than seven days.
    #[error("Invalid expiry: {0}")]
    InvalidExpiry(String),

    /// The request could not be assembled.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
