//! Connection-string parsing.
//!
//! A connection string names a backend and its construction pairs in one
//! line:
//!
//! ```text
//! scheme://[name][/work_dir][?key=value&flag...]
//! ```
//!
//! Parsing is pure; nothing is constructed and no I/O happens.

use anystore_core::error::{Result, StorageError};
use anystore_core::pairs::{
    self, CREDENTIAL, ENABLE_LOOSE_PAIR, ENABLE_VIRTUAL_DIR, ENDPOINT, LOCATION, NAME, Pair,
    WORK_DIR,
};
use percent_encoding::percent_decode_str;

/// A parsed connection string.
#[derive(Debug, Clone)]
pub struct ConnectionString {
    /// Backend scheme, lower-cased.
    pub scheme: String,
    /// Construction pairs in the order they appeared.
    pub pairs: Vec<Pair>,
}

/// Split a connection string into its scheme and construction pairs.
///
/// The segment before the first `/` becomes the `name` pair and the rest of
/// the path the `work_dir` pair. Query keys `credential`, `endpoint`,
/// `location`, `name` and `work_dir` map onto their core pairs, flags such
/// as `enable_virtual_dir` may omit the value, and any other key becomes an
/// extension pair. Every name and value is percent-decoded.
///
/// # Examples
///
/// ```
/// use anystore_services::parse_connection_string;
///
/// let conn = parse_connection_string(
///     "memory://bucket/data?credential=hmac:ak:sk&enable_virtual_dir",
/// )
/// .unwrap();
/// assert_eq!(conn.scheme, "memory");
/// assert_eq!(conn.pairs.len(), 4);
/// ```
pub fn parse_connection_string(conn: &str) -> Result<ConnectionString> {
    let (scheme, rest) = conn.split_once("://").ok_or_else(|| {
        StorageError::invalid_argument(format!("connection string {conn:?} lacks \"://\""))
    })?;
    validate_scheme(scheme)?;

    let (location, query) = rest.split_once('?').unwrap_or((rest, ""));
    let (name, work_dir) = match location.find('/') {
        Some(pos) => (&location[..pos], &location[pos..]),
        None => (location, ""),
    };

    let mut pairs = Vec::new();
    if !name.is_empty() {
        pairs.push(pairs::with_name(decode(name)?));
    }
    if !work_dir.is_empty() {
        pairs.push(pairs::with_work_dir(decode(work_dir)?));
    }
    for item in query.split('&').filter(|item| !item.is_empty()) {
        pairs.push(parse_query_item(item)?);
    }

    Ok(ConnectionString {
        scheme: scheme.to_ascii_lowercase(),
        pairs,
    })
}

fn validate_scheme(scheme: &str) -> Result<()> {
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.' | '_'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::invalid_argument(format!(
            "invalid scheme {scheme:?} in connection string"
        )))
    }
}

fn parse_query_item(item: &str) -> Result<Pair> {
    let (raw_key, raw_value) = match item.split_once('=') {
        Some((key, value)) => (key, Some(value)),
        None => (item, None),
    };
    let key = decode(raw_key)?;
    if key.is_empty() {
        return Err(StorageError::invalid_argument(format!(
            "empty key in connection string query item {item:?}"
        )));
    }
    let value = raw_value.map(decode).transpose()?;

    let pair = match key.as_str() {
        ENABLE_LOOSE_PAIR => Pair::EnableLoosePair(parse_flag(&key, value.as_deref())?),
        ENABLE_VIRTUAL_DIR => Pair::EnableVirtualDir(parse_flag(&key, value.as_deref())?),
        CREDENTIAL | ENDPOINT | LOCATION | NAME | WORK_DIR => {
            let value = value.ok_or_else(|| {
                StorageError::invalid_argument(format!(
                    "connection string key {key} needs a value"
                ))
            })?;
            match key.as_str() {
                CREDENTIAL => pairs::with_credential(value),
                ENDPOINT => pairs::with_endpoint(value),
                LOCATION => pairs::with_location(value),
                NAME => pairs::with_name(value),
                _ => pairs::with_work_dir(value),
            }
        }
        _ => pairs::with_extension(key.as_str(), value.unwrap_or_else(|| "true".to_owned())),
    };
    Ok(pair)
}

fn parse_flag(key: &str, value: Option<&str>) -> Result<bool> {
    match value {
        None | Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(StorageError::invalid_argument(format!(
            "flag {key} takes true or false, got {other:?}"
        ))),
    }
}

/// Percent-decode one component, refusing malformed escapes and non UTF-8
/// results.
fn decode(raw: &str) -> Result<String> {
    let bytes = raw.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                return Err(StorageError::invalid_argument(format!(
                    "invalid percent-encoding in {raw:?}"
                )));
            }
        }
    }
    percent_decode_str(raw)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| StorageError::invalid_argument(format!("{raw:?} is not UTF-8: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
