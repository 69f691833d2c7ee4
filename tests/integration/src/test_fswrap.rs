//! Filesystem adapter tests.

#[cfg(test)]
mod tests {
    use std::io::{Read, Seek, SeekFrom};

    use anystore_core::ErrorKind;
    use anystore_core::fswrap::StorageFs;

    use crate::{backends, unique_name, write_all};

    #[test]
    fn test_should_read_and_seek_through_file_handle() {
        for backend in backends() {
            let store = backend.store.as_ref();
            let path = format!("{}/data.bin", unique_name("seek"));
            let data: Vec<u8> = (0..=255u8).collect();
            write_all(store, &path, &data);

            let fs = StorageFs::new(store);
            let mut file = fs
                .open(&path)
                .expect("open");
            assert_eq!(file.metadata().size(), 256);

            let mut head = [0u8; 4];
            file.read_exact(&mut head)
                .expect("read");
            assert_eq!(head, [0, 1, 2, 3]);

            file.seek(SeekFrom::End(-2))
                .expect("seek");
            let mut tail = Vec::new();
            file.read_to_end(&mut tail)
                .expect("read");
            assert_eq!(tail, vec![254, 255]);
        }
    }

    #[test]
    fn test_should_read_dir_and_glob() {
        for backend in backends() {
            let store = backend.store.as_ref();
            let root = unique_name("tree");
            write_all(store, &format!("{root}/a.txt"), b"aa");
            write_all(store, &format!("{root}/b.log"), b"b");
            write_all(store, &format!("{root}/nested/c.txt"), b"c");

            let fs = StorageFs::new(store);
            let entries = fs
                .read_dir(&root)
                .expect("read_dir");
            let names: Vec<(&str, bool)> = entries
                .iter()
                .map(|e| (e.name.as_str(), e.is_dir))
                .collect();
            assert_eq!(
                names,
                vec![("a.txt", false), ("b.log", false), ("nested", true)],
                "{}",
                backend.scheme
            );

            let matched = fs
                .glob(&format!("{root}/*.txt"))
                .expect("glob");
            assert_eq!(matched, vec![format!("{root}/a.txt")], "{}", backend.scheme);

            assert_eq!(fs.read_file(&format!("{root}/nested/c.txt")).ok(), Some(b"c".to_vec()));
        }
    }

    #[test]
    fn test_should_refuse_to_open_missing_file() {
        for backend in backends() {
            let fs = StorageFs::new(backend.store.as_ref());
            let err = fs
                .open(&unique_name("missing"))
                .expect_err("expected error");
            assert_eq!(err.kind(), ErrorKind::NotFound, "{}", backend.scheme);
        }
    }
}
