//! Presigned requests (SigV4 query-string authentication).
//!
//! Presigned requests carry their authentication in query parameters:
//!
//! - `X-Amz-Algorithm` - Must be `AWS4-HMAC-SHA256`
//! - `X-Amz-Credential` - `AKID/date/region/service/aws4_request`
//! - `X-Amz-Date` - ISO 8601 basic format timestamp (`YYYYMMDDTHHMMSSZ`)
//! - `X-Amz-Expires` - Validity duration in seconds
//! - `X-Amz-SignedHeaders` - Semicolon-separated signed header names
//! - `X-Amz-Signature` - The hex-encoded signature
//!
//! The payload hash is always `UNSIGNED-PAYLOAD`. [`presign`] produces an
//! `http::Request<()>` ready to be sent by any HTTP client, and
//! [`verify_presigned`] checks one on the receiving side.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::canonical::{
    build_canonical_headers, build_canonical_query_string, build_canonical_uri,
    build_signed_headers_string, encode_query_params, url_decode,
};
use crate::credentials::CredentialProvider;
use crate::error::AuthError;
use crate::sigv4::{
    AMZ_DATE_FORMAT, SCOPE_DATE_FORMAT, SUPPORTED_ALGORITHM, build_string_to_sign,
    compute_signature, credential_scope, derive_signing_key, hash_canonical_request,
};

const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Longest validity a presigned request may have.
pub const MAX_PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Reject a zero validity or one longer than [`MAX_PRESIGN_EXPIRY`].
pub fn validate_expiry(expires_in: Duration) -> Result<(), AuthError> {
    if expires_in > MAX_PRESIGN_EXPIRY {
        Err(AuthError::InvalidExpiry(format!(
            "expiry duration {expires_in:?} exceeds maximum allowed {MAX_PRESIGN_EXPIRY:?}"
        )))
    } else if expires_in.as_secs() == 0 {
        Err(AuthError::InvalidExpiry(
            "expiry duration must be at least one second".to_owned(),
        ))
    } else {
        Ok(())
    }
}

/// Everything needed to presign one request.
#[derive(Clone)]
pub struct PresignParams<'a> {
    /// HTTP method.
    pub method: http::Method,
    /// `http` or `https`.
    pub scheme: &'a str,
    /// Host, optionally with port.
    pub host: &'a str,
    /// Raw (unencoded) request path.
    pub path: &'a str,
    /// Region of the credential scope.
    pub region: &'a str,
    /// Service of the credential scope.
    pub service: &'a str,
    /// Access key id.
    pub access_key: &'a str,
    /// Secret access key.
    pub secret_key: &'a str,
    /// Validity.
    pub expires: Duration,
    /// Body size to bind into the signature, for uploads.
    pub content_length: Option<u64>,
    /// Signing time.
    pub timestamp: DateTime<Utc>,
}

impl std::fmt::Debug for PresignParams<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresignParams")
            .field("method", &self.method)
            .field("host", &self.host)
            .field("path", &self.path)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("expires", &self.expires)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Build a presigned request.
pub fn presign(params: &PresignParams<'_>) -> Result<http::Request<()>, AuthError> {
    validate_expiry(params.expires)?;

    let timestamp = params.timestamp.format(AMZ_DATE_FORMAT).to_string();
    let date = params.timestamp.format(SCOPE_DATE_FORMAT).to_string();
    let scope = credential_scope(&date, params.region, params.service);

    let mut headers: Vec<(&str, String)> = vec![("host", params.host.to_owned())];
    if let Some(len) = params.content_length {
        headers.push(("content-length", len.to_string()));
    }
    let signed: Vec<&str> = headers.iter().map(|(name, _)| *name).collect();
    let signed_headers_str = build_signed_headers_string(&signed);

    let mut query: BTreeMap<&str, String> = BTreeMap::new();
    query.insert("X-Amz-Algorithm", SUPPORTED_ALGORITHM.to_owned());
    query.insert("X-Amz-Credential", format!("{}/{scope}", params.access_key));
    query.insert("X-Amz-Date", timestamp.clone());
    query.insert("X-Amz-Expires", params.expires.as_secs().to_string());
    query.insert("X-Amz-SignedHeaders", signed_headers_str.clone());
    let canonical_query = encode_query_params(&query);

    let canonical_uri = build_canonical_uri(params.path);
    let header_refs: Vec<(&str, &str)> = headers.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let canonical_headers = build_canonical_headers(&header_refs, &signed);
    let method = params.method.as_str();
    let canonical_request = format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers_str}\n{UNSIGNED_PAYLOAD}"
    );

    let string_to_sign =
        build_string_to_sign(&timestamp, &scope, &hash_canonical_request(&canonical_request));
    let signing_key = derive_signing_key(params.secret_key, &date, params.region, params.service)?;
    let signature = compute_signature(&signing_key, &string_to_sign)?;

    let uri = format!(
        "{}://{}{canonical_uri}?{canonical_query}&X-Amz-Signature={signature}",
        params.scheme, params.host
    );
    debug!(method, uri = %uri, "presigned request");

    let mut builder = http::Request::builder().method(params.method.clone()).uri(uri);
    for (name, value) in &headers {
        builder = builder.header(*name, value.as_str());
    }
    builder
        .body(())
        .map_err(|e| AuthError::InvalidRequest(e.to_string()))
}

/// Parsed presigned query parameters.
#[derive(Debug, Clone)]
pub struct ParsedPresignedParams {
    /// Access key id.
    pub access_key_id: String,
    /// Scope date (`YYYYMMDD`).
    pub date: String,
    /// Scope region.
    pub region: String,
    /// Scope service.
    pub service: String,
    /// `X-Amz-Date`.
    pub timestamp: String,
    /// `X-Amz-Expires` in seconds.
    pub expires: u64,
    /// Signed header names.
    pub signed_headers: Vec<String>,
    /// Provided signature.
    pub signature: String,
}

/// Parse the SigV4 query parameters of a presigned request.
pub fn parse_presigned_params(query: &str) -> Result<ParsedPresignedParams, AuthError> {
    let params: HashMap<String, String> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            Some((key.to_owned(), url_decode(value)))
        })
        .collect();

    let algorithm = get_required_param(&params, "X-Amz-Algorithm")?;
    if algorithm != SUPPORTED_ALGORITHM {
        return Err(AuthError::UnsupportedAlgorithm(algorithm));
    }

    let credential = get_required_param(&params, "X-Amz-Credential")?;
    let timestamp = get_required_param(&params, "X-Amz-Date")?;
    let expires_str = get_required_param(&params, "X-Amz-Expires")?;
    let signed_headers_str = get_required_param(&params, "X-Amz-SignedHeaders")?;
    let signature = get_required_param(&params, "X-Amz-Signature")?;

    let cred_parts: Vec<&str> = credential.splitn(5, '/').collect();
    if cred_parts.len() != 5 || cred_parts[4] != "aws4_request" {
        return Err(AuthError::InvalidCredential);
    }

    let expires: u64 = expires_str
        .parse()
        .map_err(|_| AuthError::MissingQueryParam("X-Amz-Expires (invalid integer)".to_owned()))?;

    Ok(ParsedPresignedParams {
        access_key_id: cred_parts[0].to_owned(),
        date: cred_parts[1].to_owned(),
        region: cred_parts[2].to_owned(),
        service: cred_parts[3].to_owned(),
        timestamp,
        expires,
        signed_headers: signed_headers_str.split(';').map(ToOwned::to_owned).collect(),
        signature,
    })
}

/// Verify a presigned request against the current time.
pub fn verify_presigned(
    parts: &http::request::Parts,
    credential_provider: &dyn CredentialProvider,
) -> Result<ParsedPresignedParams, AuthError> {
    verify_presigned_at(parts, credential_provider, Utc::now())
}

/// Verify a presigned request as of `now`.
pub fn verify_presigned_at(
    parts: &http::request::Parts,
    credential_provider: &dyn CredentialProvider,
    now: DateTime<Utc>,
) -> Result<ParsedPresignedParams, AuthError> {
    let query = parts.uri.query().unwrap_or("");
    let parsed = parse_presigned_params(query)?;

    debug!(
        access_key_id = %parsed.access_key_id,
        region = %parsed.region,
        expires = parsed.expires,
        "verifying presigned request"
    );

    check_expiration(&parsed.timestamp, parsed.expires, now)?;

    let secret_key = credential_provider.get_secret_key(&parsed.access_key_id)?;

    let canonical_uri = build_canonical_uri(parts.uri.path());
    let canonical_query = build_canonical_query_string_without_signature(query);
    let signed_header_refs: Vec<&str> = parsed.signed_headers.iter().map(String::as_str).collect();
    let header_pairs = collect_signed_headers(parts, &signed_header_refs)?;
    let canonical_headers = build_canonical_headers(&header_pairs, &signed_header_refs);
    let signed_headers_str = build_signed_headers_string(&signed_header_refs);

    let method = parts.method.as_str();
    let canonical_request = format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers_str}\n{UNSIGNED_PAYLOAD}"
    );

    let scope = credential_scope(&parsed.date, &parsed.region, &parsed.service);
    let string_to_sign = build_string_to_sign(
        &parsed.timestamp,
        &scope,
        &hash_canonical_request(&canonical_request),
    );
    let signing_key =
        derive_signing_key(&secret_key, &parsed.date, &parsed.region, &parsed.service)?;
    let expected_signature = compute_signature(&signing_key, &string_to_sign)?;

    if parsed
        .signature
        .as_bytes()
        .ct_eq(expected_signature.as_bytes())
        .into()
    {
        debug!(access_key_id = %parsed.access_key_id, "presigned request verified");
        Ok(parsed)
    } else {
        debug!(provided = %parsed.signature, "presigned signature mismatch");
        Err(AuthError::SignatureDoesNotMatch)
    }
}

fn get_required_param(params: &HashMap<String, String>, name: &str) -> Result<String, AuthError> {
    params
        .get(name)
        .cloned()
        .ok_or_else(|| AuthError::MissingQueryParam(name.to_owned()))
}

fn build_canonical_query_string_without_signature(query: &str) -> String {
    let filtered: String = query
        .split('&')
        .filter(|param| !param.starts_with("X-Amz-Signature="))
        .collect::<Vec<_>>()
        .join("&");
    build_canonical_query_string(&filtered)
}

fn check_expiration(timestamp: &str, expires: u64, now: DateTime<Utc>) -> Result<(), AuthError> {
    let request_time = NaiveDateTime::parse_from_str(timestamp, AMZ_DATE_FORMAT)
        .map_err(|_| AuthError::MissingQueryParam("X-Amz-Date (invalid format)".to_owned()))?;

    let expiry_time = request_time
        + chrono::Duration::seconds(i64::try_from(expires).map_err(|_| AuthError::RequestExpired)?);

    if now.naive_utc() > expiry_time {
        return Err(AuthError::RequestExpired);
    }

    Ok(())
}

fn collect_signed_headers<'a>(
    parts: &'a http::request::Parts,
    signed_headers: &[&'a str],
) -> Result<Vec<(&'a str, &'a str)>, AuthError> {
    let mut result = Vec::with_capacity(signed_headers.len());

    for &name in signed_headers {
        let value = parts
            .headers
            .get(name)
            .ok_or_else(|| AuthError::MissingHeader(name.to_owned()))?
            .to_str()
            .map_err(|_| AuthError::MissingHeader(name.to_owned()))?;
        result.push((name, value));
    }

    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
