//! Read, write, stat and delete contract tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    use anystore_core::ErrorKind;
    use anystore_core::pairs::{with_io_callback, with_offset, with_size};

    use crate::{backends, read_all, unique_name, write_all};

    #[test]
    fn test_should_round_trip_object() {
        for backend in backends() {
            let store = backend.store.as_ref();
            let path = format!("{}/data.bin", unique_name("obj"));
            let data: Vec<u8> = (0..=255u8).cycle().take(200_000).collect();

            write_all(store, &path, &data);
            assert_eq!(read_all(store, &path), data, "{}", backend.scheme);

            let object = store
                .stat(&path, &[])
                .expect("stat");
            assert_eq!(object.content_length, Some(200_000), "{}", backend.scheme);
            assert!(object.mode.is_read(), "{}", backend.scheme);
        }
    }

    #[test]
    fn test_should_read_window_and_report_progress() {
        for backend in backends() {
            let store = backend.store.as_ref();
            let path = unique_name("window");
            write_all(store, &path, b"hello, world");

            let seen = Arc::new(AtomicU64::new(0));
            let counter = Arc::clone(&seen);
            let mut out = Vec::new();
            let n = store
                .read(
                    &path,
                    &mut out,
                    &[
                        with_offset(7),
                        with_size(100),
                        with_io_callback(move |chunk| {
                            counter.fetch_add(chunk as u64, Ordering::SeqCst);
                        }),
                    ],
                )
                .expect("read");
            assert_eq!(n, 5, "{}", backend.scheme);
            assert_eq!(out, b"world", "{}", backend.scheme);
            assert_eq!(seen.load(Ordering::SeqCst), 5, "{}", backend.scheme);

            let err = store
                .read(&path, &mut Vec::new(), &[with_offset(13)])
                .expect_err("expected error");
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{}", backend.scheme);
        }
    }

    #[test]
    fn test_should_store_nothing_from_short_source() {
        for backend in backends() {
            let store = backend.store.as_ref();
            let path = unique_name("short");
            let err = store
                .write(&path, &mut &b"abc"[..], 10, &[])
                .expect_err("expected error");
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{}", backend.scheme);

            let err = store
                .stat(&path, &[])
                .expect_err("expected error");
            assert_eq!(err.kind(), ErrorKind::NotFound, "{}", backend.scheme);
        }
    }

    #[test]
    fn test_should_delete_idempotently() {
        for backend in backends() {
            let store = backend.store.as_ref();
            let path = unique_name("gone");
            write_all(store, &path, b"x");
            for _ in 0..2 {
                store
                    .delete(&path, &[])
                    .expect("delete");
            }
            let err = store
                .read(&path, &mut Vec::new(), &[])
                .expect_err("expected error");
            assert_eq!(err.kind(), ErrorKind::NotFound, "{}", backend.scheme);
        }
    }

    #[test]
    fn test_should_share_backend_across_threads() {
        for backend in backends() {
            let store: Arc<dyn anystore_core::Storager> = Arc::from(backend.store);
            let prefix = unique_name("threads");
            std::thread::scope(|scope| {
                for i in 0..8 {
                    let store = Arc::clone(&store);
                    let prefix = prefix.clone();
                    scope.spawn(move || {
                        let path = format!("{prefix}/{i}");
                        write_all(store.as_ref(), &path, path.as_bytes());
                        assert_eq!(read_all(store.as_ref(), &path), path.as_bytes());
                    });
                }
            });
        }
    }
}
