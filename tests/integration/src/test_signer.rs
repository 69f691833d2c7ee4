//! Presigned request tests against the memory backend.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anystore_core::pairs::{with_credential, with_name, with_work_dir};
    use anystore_core::storager::require_http_signer;
    use anystore_core::{ErrorKind, HttpSigner};
    use anystore_memory::MemoryStorager;

    use crate::{read_all, unique_name, write_all};

    fn signing_store() -> MemoryStorager {
        MemoryStorager::new(&[
            with_name("presigned"),
            with_work_dir(format!("/{}", unique_name("signer"))),
            with_credential("hmac:AKIDEXAMPLE:wJalrXUtnFEMI/K7MDENG"),
        ])
        .expect("construct")
    }

    #[test]
    fn test_should_upload_and_download_through_presigned_requests() {
        let store = signing_store();
        let signer =
            require_http_signer(&store).expect("no http signer");
        let body = b"uploaded without credentials";

        let upload = signer
            .query_sign_http_write("shared/report.txt", body.len() as u64, Duration::from_secs(300), &[])
            .expect("presign write");
        assert_eq!(upload.method(), http::Method::PUT);
        assert!(upload.uri().path().starts_with("/presigned/"));
        let written = store
            .serve_presigned(upload, &mut &body[..], &mut std::io::sink())
            .expect("serve upload");
        assert_eq!(written, body.len() as u64);
        assert_eq!(read_all(&store, "shared/report.txt"), body);

        let download = signer
            .query_sign_http_read("shared/report.txt", Duration::from_secs(300), &[])
            .expect("presign read");
        let mut out = Vec::new();
        store
            .serve_presigned(download, &mut std::io::empty(), &mut out)
            .expect("serve download");
        assert_eq!(out, body);
    }

    #[test]
    fn test_should_reject_request_signed_by_another_store() {
        let signer_store = signing_store();
        let other = MemoryStorager::new(&[
            with_name("presigned"),
            with_credential("hmac:AKIDOTHER:another-secret"),
        ])
        .expect("construct");
        write_all(&signer_store, "a.txt", b"abc");

        let request = signer_store
            .query_sign_http_read("a.txt", Duration::from_secs(60), &[])
            .expect("presign");
        let err = other
            .serve_presigned(request, &mut std::io::empty(), &mut Vec::new())
            .expect_err("expected foreign request to fail");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_should_reject_expiry_beyond_limit() {
        let store = signing_store();
        let err = store
            .query_sign_http_read("a.txt", Duration::from_secs(8 * 24 * 3600), &[])
            .expect_err("expected expiry error");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_should_not_offer_signer_on_fs() {
        for backend in crate::backends() {
            let has_signer = backend.store.as_http_signer().is_some();
            assert_eq!(has_signer, backend.scheme == "memory", "{}", backend.scheme);
        }
    }
}
