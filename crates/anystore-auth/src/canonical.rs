//! Canonical request construction for AWS Signature Version 4.
//!
//! This module implements the canonical request format:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! Each component is normalized so that the signer and the verifier derive
//! byte-identical input.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters that must be percent-encoded in URI components.
///
/// Everything except unreserved characters (`A-Z a-z 0-9 - _ . ~`).
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the full canonical request string.
#[must_use]
pub fn build_canonical_request(
    method: &str,
    uri: &str,
    query_string: &str,
    headers: &[(&str, &str)],
    signed_headers: &[&str],
    payload_hash: &str,
) -> String {
    let canonical_uri = build_canonical_uri(uri);
    let canonical_query = build_canonical_query_string(query_string);
    let canonical_headers = build_canonical_headers(headers, signed_headers);
    let signed_headers_str = build_signed_headers_string(signed_headers);

    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers_str}\n{payload_hash}"
    )
}

/// Build the canonical URI from a path.
///
/// Each segment is decoded and re-encoded, so already-encoded and raw paths
/// produce the same result. An empty path becomes `/`.
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    let encoded_segments: Vec<String> = path
        .split('/')
        .map(|segment| {
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            uri_encode(&decoded)
        })
        .collect();

    let joined = encoded_segments.join("/");
    if joined.starts_with('/') {
        joined
    } else {
        format!("/{joined}")
    }
}

/// Sort the `key=value` parameters of an already-encoded query string.
#[must_use]
pub fn build_canonical_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut params: Vec<(&str, &str)> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|param| param.split_once('=').unwrap_or((param, "")))
        .collect();

    params.sort_unstable();

    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Encode raw query parameters into a canonical (sorted, encoded) query string.
#[must_use]
pub fn encode_query_params(params: &BTreeMap<&str, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers block from the signed subset of `headers`.
#[must_use]
pub fn build_canonical_headers(headers: &[(&str, &str)], signed_headers: &[&str]) -> String {
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let lower_name = name.to_lowercase();
        let trimmed_value = collapse_whitespace(value.trim());
        header_map
            .entry(lower_name)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&trimmed_value);
            })
            .or_insert(trimmed_value);
    }

    let mut sorted_signed: Vec<&str> = signed_headers.to_vec();
    sorted_signed.sort_unstable();

    sorted_signed
        .iter()
        .filter_map(|name| header_map.get(*name).map(|value| format!("{name}:{value}")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Sorted, `;`-joined list of signed header names.
#[must_use]
pub fn build_signed_headers_string(signed_headers: &[&str]) -> String {
    let mut sorted: Vec<&str> = signed_headers.to_vec();
    sorted.sort_unstable();
    sorted.join(";")
}

/// Percent-encode a single URI component.
#[must_use]
pub fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

/// Decode a percent-encoded query value.
#[must_use]
pub fn url_decode(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}

fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
