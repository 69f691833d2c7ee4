//! Server-side encryption settings.
//!
//! The memory backend does not encrypt anything. It validates the SSE
//! extension pairs the way an S3-compatible service would, records them in
//! the object's metadata map, and demands the same customer key back before
//! it reveals an SSE-C object.
//!
//! | Pair | Accepted values |
//! |------|-----------------|
//! | `server_side_encryption` | `AES256`, `aws:kms` |
//! | `server_side_encryption_aws_kms_key_id` | any, requires `aws:kms` |
//! | `server_side_encryption_context` | base64 JSON object, requires `aws:kms` |
//! | `server_side_encryption_bucket_key_enabled` | `true`, `false`, requires `aws:kms` |
//! | `server_side_encryption_customer_algorithm` | `AES256` |
//! | `server_side_encryption_customer_key` | base64 of 32 bytes |

use std::collections::BTreeMap;

use anystore_core::checksums::compute_md5;
use anystore_core::error::{Result, StorageError};
use anystore_core::pairs::{
    OperationOptions, SERVER_SIDE_ENCRYPTION, SERVER_SIDE_ENCRYPTION_AWS_KMS_KEY_ID,
    SERVER_SIDE_ENCRYPTION_BUCKET_KEY_ENABLED, SERVER_SIDE_ENCRYPTION_CONTEXT,
    SERVER_SIDE_ENCRYPTION_CUSTOMER_ALGORITHM, SERVER_SIDE_ENCRYPTION_CUSTOMER_KEY,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Metadata key holding the MD5 of the customer key.
pub const CUSTOMER_KEY_MD5: &str = "server_side_encryption_customer_key_md5";

/// Every SSE pair, accepted by calls that store data.
pub const WRITE_EXTENSIONS: &[&str] = &[
    SERVER_SIDE_ENCRYPTION,
    SERVER_SIDE_ENCRYPTION_AWS_KMS_KEY_ID,
    SERVER_SIDE_ENCRYPTION_CONTEXT,
    SERVER_SIDE_ENCRYPTION_BUCKET_KEY_ENABLED,
    SERVER_SIDE_ENCRYPTION_CUSTOMER_ALGORITHM,
    SERVER_SIDE_ENCRYPTION_CUSTOMER_KEY,
];

/// SSE-C pairs, accepted by calls that reveal data.
pub const READ_EXTENSIONS: &[&str] = &[
    SERVER_SIDE_ENCRYPTION_CUSTOMER_ALGORITHM,
    SERVER_SIDE_ENCRYPTION_CUSTOMER_KEY,
];

const AES256: &str = "AES256";
const AWS_KMS: &str = "aws:kms";
const CUSTOMER_KEY_LEN: usize = 32;

/// Managed-key encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedKey {
    /// `AES256` or `aws:kms`.
    pub algorithm: String,
    /// KMS key id.
    pub kms_key_id: Option<String>,
    /// Encryption context, still base64 encoded.
    pub context: Option<String>,
    /// Bucket key flag.
    pub bucket_key_enabled: Option<bool>,
}

/// Validated encryption settings of one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseSettings {
    /// Keys managed by the service.
    Managed(ManagedKey),
    /// Customer-provided key, identified by its MD5.
    Customer {
        /// Hex MD5 of the raw key.
        key_md5: String,
    },
}

impl SseSettings {
    /// Validate the SSE pairs of a write. `None` when none were given.
    pub fn from_options(opts: &OperationOptions) -> Result<Option<Self>> {
        let algorithm = opts.extension(SERVER_SIDE_ENCRYPTION);
        let kms_key_id = opts.extension(SERVER_SIDE_ENCRYPTION_AWS_KMS_KEY_ID);
        let context = opts.extension(SERVER_SIDE_ENCRYPTION_CONTEXT);
        let bucket_key = opts.extension(SERVER_SIDE_ENCRYPTION_BUCKET_KEY_ENABLED);
        let customer = customer_key_md5(opts)?;

        let Some(algorithm) = algorithm else {
            if kms_key_id.is_some() || context.is_some() || bucket_key.is_some() {
                return Err(StorageError::invalid_argument(format!(
                    "KMS settings require {SERVER_SIDE_ENCRYPTION}={AWS_KMS}"
                )));
            }
            return Ok(customer.map(|key_md5| Self::Customer { key_md5 }));
        };

        if customer.is_some() {
            return Err(StorageError::invalid_argument(
                "server-side encryption and customer-provided keys are mutually exclusive",
            ));
        }

        match algorithm {
            AES256 => {
                if kms_key_id.is_some() || context.is_some() || bucket_key.is_some() {
                    return Err(StorageError::invalid_argument(format!(
                        "KMS settings require {SERVER_SIDE_ENCRYPTION}={AWS_KMS}"
                    )));
                }
            }
            AWS_KMS => {}
            other => {
                return Err(StorageError::invalid_argument(format!(
                    "unsupported server-side encryption algorithm: {other}"
                )));
            }
        }

        if let Some(context) = context {
            validate_context(context)?;
        }
        let bucket_key_enabled = bucket_key
            .map(|v| {
                v.parse::<bool>().map_err(|_| {
                    StorageError::invalid_argument(format!(
                        "{SERVER_SIDE_ENCRYPTION_BUCKET_KEY_ENABLED} must be true or false, got {v}"
                    ))
                })
            })
            .transpose()?;

        Ok(Some(Self::Managed(ManagedKey {
            algorithm: algorithm.to_owned(),
            kms_key_id: kms_key_id.map(ToOwned::to_owned),
            context: context.map(ToOwned::to_owned),
            bucket_key_enabled,
        })))
    }

    /// Metadata entries recorded on the stored object.
    #[must_use]
    pub fn to_metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        match self {
            Self::Managed(key) => {
                metadata.insert(SERVER_SIDE_ENCRYPTION.to_owned(), key.algorithm.clone());
                if let Some(id) = &key.kms_key_id {
                    metadata.insert(SERVER_SIDE_ENCRYPTION_AWS_KMS_KEY_ID.to_owned(), id.clone());
                }
                if let Some(context) = &key.context {
                    metadata.insert(SERVER_SIDE_ENCRYPTION_CONTEXT.to_owned(), context.clone());
                }
                if let Some(enabled) = key.bucket_key_enabled {
                    metadata.insert(
                        SERVER_SIDE_ENCRYPTION_BUCKET_KEY_ENABLED.to_owned(),
                        enabled.to_string(),
                    );
                }
            }
            Self::Customer { key_md5 } => {
                metadata.insert(
                    SERVER_SIDE_ENCRYPTION_CUSTOMER_ALGORITHM.to_owned(),
                    AES256.to_owned(),
                );
                metadata.insert(CUSTOMER_KEY_MD5.to_owned(), key_md5.clone());
            }
        }
        metadata
    }
}

/// Fail unless `opts` carries the customer key an SSE-C object was stored with.
pub fn check_customer_key(
    metadata: &BTreeMap<String, String>,
    opts: &OperationOptions,
    path: &str,
) -> Result<()> {
    let Some(expected) = metadata.get(CUSTOMER_KEY_MD5) else {
        return Ok(());
    };
    match customer_key_md5(opts)? {
        Some(actual) if &actual == expected => Ok(()),
        Some(_) => Err(StorageError::invalid_argument(format!(
            "customer key does not match the key {path} was stored with"
        ))),
        None => Err(StorageError::invalid_argument(format!(
            "{path} is encrypted with a customer key; supply {SERVER_SIDE_ENCRYPTION_CUSTOMER_KEY}"
        ))),
    }
}

fn customer_key_md5(opts: &OperationOptions) -> Result<Option<String>> {
    let algorithm = opts.extension(SERVER_SIDE_ENCRYPTION_CUSTOMER_ALGORITHM);
    let key = opts.extension(SERVER_SIDE_ENCRYPTION_CUSTOMER_KEY);
    match (algorithm, key) {
        (None, None) => Ok(None),
        (Some(AES256), Some(key)) => {
            let raw = STANDARD.decode(key).map_err(|e| {
                StorageError::invalid_argument(format!("customer key is not valid base64: {e}"))
            })?;
            if raw.len() != CUSTOMER_KEY_LEN {
                return Err(StorageError::invalid_argument(format!(
                    "customer key must be {CUSTOMER_KEY_LEN} bytes, got {}",
                    raw.len()
                )));
            }
            Ok(Some(compute_md5(&raw)))
        }
        (Some(AES256), None) | (None, Some(_)) => Err(StorageError::invalid_argument(format!(
            "{SERVER_SIDE_ENCRYPTION_CUSTOMER_ALGORITHM} and {SERVER_SIDE_ENCRYPTION_CUSTOMER_KEY} must be given together"
        ))),
        (Some(other), _) => Err(StorageError::invalid_argument(format!(
            "unsupported customer key algorithm: {other}"
        ))),
    }
}

fn validate_context(context: &str) -> Result<()> {
    let raw = STANDARD.decode(context).map_err(|e| {
        StorageError::invalid_argument(format!("encryption context is not valid base64: {e}"))
    })?;
    let value: serde_json::Value = serde_json::from_slice(&raw).map_err(|e| {
        StorageError::invalid_argument(format!("encryption context is not JSON: {e}"))
    })?;
    if !value.is_object() {
        return Err(StorageError::invalid_argument(
            "encryption context must be a JSON object",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use anystore_core::pairs::{
        Pair, with_server_side_encryption, with_server_side_encryption_aws_kms_key_id,
        with_server_side_encryption_bucket_key_enabled, with_server_side_encryption_context,
        with_server_side_encryption_customer_algorithm, with_server_side_encryption_customer_key,
    };
    use anystore_core::{ErrorKind, Operation};

    use super::*;

    fn opts(pairs: &[Pair]) -> OperationOptions {
        OperationOptions::parse(Operation::Write, pairs, WRITE_EXTENSIONS, false)
            .expect("parse")
    }

    fn customer_key(byte: u8) -> String {
        STANDARD.encode([byte; CUSTOMER_KEY_LEN])
    }

    #[test]
    fn test_should_accept_kms_settings() {
        let context = STANDARD.encode(br#"{"team":"storage"}"#);
        let settings = SseSettings::from_options(&opts(&[
            with_server_side_encryption("aws:kms"),
            with_server_side_encryption_aws_kms_key_id("key-1"),
            with_server_side_encryption_context(context.clone()),
            with_server_side_encryption_bucket_key_enabled(true),
        ]))
        .expect("validate")
        .expect("expected settings");

        let metadata = settings.to_metadata();
        assert_eq!(metadata.get(SERVER_SIDE_ENCRYPTION).map(String::as_str), Some("aws:kms"));
        assert_eq!(metadata.get(SERVER_SIDE_ENCRYPTION_CONTEXT), Some(&context));
        assert_eq!(
            metadata.get(SERVER_SIDE_ENCRYPTION_BUCKET_KEY_ENABLED).map(String::as_str),
            Some("true")
        );
    }

    #[test]
    fn test_should_return_none_without_pairs() {
        let settings = SseSettings::from_options(&opts(&[]))
            .expect("validate");
        assert!(settings.is_none());
    }

    #[test]
    fn test_should_reject_invalid_settings() {
        let cases = vec![
            vec![with_server_side_encryption("rot13")],
            vec![
                with_server_side_encryption("AES256"),
                with_server_side_encryption_aws_kms_key_id("key-1"),
            ],
            vec![with_server_side_encryption_aws_kms_key_id("key-1")],
            vec![
                with_server_side_encryption("aws:kms"),
                with_server_side_encryption_context(STANDARD.encode(b"[1,2]")),
            ],
            vec![
                with_server_side_encryption("aws:kms"),
                with_server_side_encryption_context("%%%"),
            ],
            vec![with_server_side_encryption_customer_key(customer_key(1))],
            vec![
                with_server_side_encryption_customer_algorithm("AES256"),
                with_server_side_encryption_customer_key(STANDARD.encode([1u8; 16])),
            ],
            vec![
                with_server_side_encryption("AES256"),
                with_server_side_encryption_customer_algorithm("AES256"),
                with_server_side_encryption_customer_key(customer_key(1)),
            ],
        ];
        for pairs in cases {
            let err = SseSettings::from_options(&opts(&pairs))
                .err()
                .unwrap_or_else(|| panic!("expected error for {pairs:?}"));
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn test_should_require_matching_customer_key() {
        let settings = SseSettings::from_options(&opts(&[
            with_server_side_encryption_customer_algorithm("AES256"),
            with_server_side_encryption_customer_key(customer_key(7)),
        ]))
        .expect("validate")
        .expect("expected settings");
        let metadata = settings.to_metadata();
        assert!(!metadata.values().any(|v| v == &customer_key(7)));

        let read = |pairs: &[Pair]| {
            OperationOptions::parse(Operation::Stat, pairs, READ_EXTENSIONS, false)
                .expect("parse")
        };
        let same = read(&[
            with_server_side_encryption_customer_algorithm("AES256"),
            with_server_side_encryption_customer_key(customer_key(7)),
        ]);
        assert!(check_customer_key(&metadata, &same, "a").is_ok());

        let other = read(&[
            with_server_side_encryption_customer_algorithm("AES256"),
            with_server_side_encryption_customer_key(customer_key(8)),
        ]);
        assert!(check_customer_key(&metadata, &other, "a").is_err());
        assert!(check_customer_key(&metadata, &read(&[]), "a").is_err());
        assert!(check_customer_key(&BTreeMap::new(), &read(&[]), "a").is_ok());
    }
}
