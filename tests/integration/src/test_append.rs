//! Append state machine contract tests.

#[cfg(test)]
mod tests {
    use anystore_core::ErrorKind;
    use anystore_core::storager::require_appender;

    use crate::{backends, read_all, unique_name};

    #[test]
    fn test_should_return_strictly_increasing_offsets() {
        for backend in backends() {
            let store = backend.store.as_ref();
            let appender = require_appender(store)
                .expect("no appender");
            let path = unique_name("append");

            let mut object = appender
                .create_append(&path, &[])
                .expect("create_append");
            assert_eq!(object.append_offset, Some(0), "{}", backend.scheme);

            let chunks: [&[u8]; 4] = [b"a", b"bb", b"ccc", b"dddd"];
            let mut last = 0;
            for chunk in chunks {
                let next = appender
                    .write_append(&mut object, &mut &chunk[..], chunk.len() as u64, &[])
                    .expect("append");
                assert!(next > last, "{}", backend.scheme);
                assert_eq!(object.append_offset, Some(next), "{}", backend.scheme);
                last = next;
            }
            assert_eq!(last, 10, "{}", backend.scheme);
            assert_eq!(read_all(store, &path), b"abbcccdddd", "{}", backend.scheme);
        }
    }

    #[test]
    fn test_should_resume_append_from_stat() {
        for backend in backends() {
            let store = backend.store.as_ref();
            let appender = require_appender(store)
                .expect("no appender");
            let path = unique_name("resume");

            let mut first = appender
                .create_append(&path, &[])
                .expect("create_append");
            appender
                .write_append(&mut first, &mut &b"123"[..], 3, &[])
                .expect("append");

            let mut resumed = store
                .stat(&path, &[])
                .expect("stat");
            assert!(resumed.mode.is_append(), "{}", backend.scheme);
            assert_eq!(resumed.append_offset, Some(3), "{}", backend.scheme);
            appender
                .write_append(&mut resumed, &mut &b"45"[..], 2, &[])
                .expect("append");

            let err = appender
                .write_append(&mut first, &mut &b"6"[..], 1, &[])
                .expect_err("expected drift error");
            assert_eq!(err.kind(), ErrorKind::InvalidState, "{}", backend.scheme);
            assert_eq!(read_all(store, &path), b"12345", "{}", backend.scheme);
        }
    }
}
