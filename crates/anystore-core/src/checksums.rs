//! ETag computation.
//!
//! Whole objects and parts carry a quoted hex MD5 ETag. Objects assembled
//! from a multipart upload carry the MD5 of the concatenated binary part
//! digests followed by `-<part count>`. Large payloads are hashed
//! incrementally with [`EtagHasher`] while they stream through a copy.

use digest::Digest;

/// Compute the hex-encoded MD5 digest of `data`.
///
/// # Examples
///
/// ```
/// use anystore_core::checksums::compute_md5;
///
/// assert_eq!(compute_md5(b"hello"), "5d41402abc4b2a76b9719d911017c592");
/// ```
#[must_use]
pub fn compute_md5(data: &[u8]) -> String {
    let hash = md5::Md5::digest(data);
    hex::encode(hash)
}

/// Compute the quoted MD5 ETag of `data`.
///
/// # Examples
///
/// ```
/// use anystore_core::checksums::compute_etag;
///
/// assert_eq!(compute_etag(b""), "\"d41d8cd98f00b204e9800998ecf8427e\"");
/// ```
#[must_use]
pub fn compute_etag(data: &[u8]) -> String {
    let md5_hex = compute_md5(data);
    format!("\"{md5_hex}\"")
}

/// Compute the composite ETag of an object assembled from parts.
///
/// `part_etags` are the (optionally quoted) hex MD5 ETags of the parts in
/// assembly order. Entries that are not valid hex are skipped.
#[must_use]
pub fn compute_multipart_etag(part_etags: &[impl AsRef<str>]) -> String {
    let mut combined = Vec::with_capacity(part_etags.len() * 16);
    for etag in part_etags {
        let hex_str = etag.as_ref().trim_matches('"');
        if let Ok(bytes) = hex::decode(hex_str) {
            combined.extend_from_slice(&bytes);
        }
    }
    let final_md5 = hex::encode(md5::Md5::digest(&combined));
    format!("\"{final_md5}-{}\"", part_etags.len())
}

/// Incremental ETag computation.
#[derive(Default, Clone)]
pub struct EtagHasher {
    md5: md5::Md5,
}

impl std::fmt::Debug for EtagHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtagHasher").finish_non_exhaustive()
    }
}

impl EtagHasher {
    /// Create an empty hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of data.
    pub fn update(&mut self, data: &[u8]) {
        self.md5.update(data);
    }

    /// Quoted hex MD5 ETag of everything fed so far.
    #[must_use]
    pub fn finish(self) -> String {
        format!("\"{}\"", hex::encode(self.md5.finalize()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_match_streaming_and_one_shot_etag() {
        let mut hasher = EtagHasher::new();
        hasher.update(b"hel");
        hasher.update(b"lo");
        assert_eq!(hasher.finish(), compute_etag(b"hello"));
    }

    #[test]
    fn test_should_compute_multipart_etag_with_part_count() {
        let etags = [compute_etag(b"part one"), compute_etag(b"part two")];
        let etag = compute_multipart_etag(&etags);
        assert!(etag.starts_with('"'));
        assert!(etag.ends_with("-2\""));

        let mut combined = Vec::new();
        combined.extend(hex::decode(compute_md5(b"part one")).unwrap_or_default());
        combined.extend(hex::decode(compute_md5(b"part two")).unwrap_or_default());
        assert_eq!(etag, format!("\"{}-2\"", compute_md5(&combined)));
    }
}
