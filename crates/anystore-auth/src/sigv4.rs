//! AWS Signature Version 4 primitives.
//!
//! 1. Build the string to sign from the timestamp, credential scope and
//!    canonical request hash.
//! 2. Derive the signing key with HMAC-SHA256 from the secret key and scope.
//! 3. Sign the string and hex-encode the result.

use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// The only supported signing algorithm.
pub const SUPPORTED_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Timestamp layout of `X-Amz-Date`.
pub const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Date layout of the credential scope.
pub const SCOPE_DATE_FORMAT: &str = "%Y%m%d";

type HmacSha256 = Hmac<Sha256>;

/// Build the string to sign.
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{SUPPORTED_ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// `date/region/service/aws4_request`.
#[must_use]
pub fn credential_scope(date: &str, region: &str, service: &str) -> String {
    format!("{date}/{region}/{service}/aws4_request")
}

/// Hex SHA-256 of a canonical request.
#[must_use]
pub fn hash_canonical_request(canonical_request: &str) -> String {
    hex::encode(Sha256::digest(canonical_request.as_bytes()))
}

/// Derive the signing key for a credential scope.
pub fn derive_signing_key(
    secret_key: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, AuthError> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes())?;
    let date_region_key = hmac_sha256(&date_key, region.as_bytes())?;
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes())?;
    hmac_sha256(&date_region_service_key, b"aws4_request")
}

/// Sign `data` and hex-encode the signature.
pub fn compute_signature(signing_key: &[u8], data: &str) -> Result<String, AuthError> {
    let sig = hmac_sha256(signing_key, data.as_bytes())?;
    Ok(hex::encode(sig))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, AuthError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AuthError::InvalidRequest(format!("HMAC key rejected: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
