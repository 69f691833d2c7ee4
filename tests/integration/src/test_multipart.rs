//! Multipart state machine contract tests.
//!
//! Backends without a `Multiparter` are skipped.

#[cfg(test)]
mod tests {
    use anystore_core::pairs::with_multipart_id;
    use anystore_core::{ErrorKind, Part};

    use crate::{backends, read_all, unique_name};

    const PERMUTATIONS: [[u32; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    fn part_data(index: u32) -> Vec<u8> {
        let fill = b'a' + u8::try_from(index).unwrap_or(0);
        vec![fill; 100 + index as usize * 10]
    }

    #[test]
    fn test_should_assemble_parts_written_in_any_order() {
        for backend in backends() {
            let Some(uploads) = backend.store.as_multiparter() else {
                continue;
            };
            for order in PERMUTATIONS {
                let path = unique_name("permuted");
                let object = uploads
                    .create_multipart(&path, &[])
                    .expect("create");

                let mut parts: Vec<Part> = Vec::new();
                for index in order {
                    let data = part_data(index);
                    let (_, part) = uploads
                        .write_multipart(&object, &mut data.as_slice(), data.len() as u64, index, &[])
                        .expect("write part");
                    parts.push(part);
                }
                parts.sort_by_key(|p| p.index);
                uploads
                    .complete_multipart(&object, &parts, &[])
                    .expect("complete");

                let expected: Vec<u8> = (0..3).flat_map(part_data).collect();
                let stat = backend
                    .store
                    .stat(&path, &[])
                    .expect("stat");
                assert_eq!(
                    stat.content_length,
                    Some(parts.iter().map(|p| p.size).sum::<u64>())
                );
                assert_eq!(read_all(backend.store.as_ref(), &path), expected);
            }
        }
    }

    #[test]
    fn test_should_resume_after_two_parts() {
        for backend in backends() {
            let Some(uploads) = backend.store.as_multiparter() else {
                continue;
            };
            let path = unique_name("resume");
            let object = uploads
                .create_multipart(&path, &[])
                .expect("create");
            let id = object.multipart_id.clone().unwrap_or_default();
            for index in [0u32, 1] {
                let data = part_data(index);
                uploads
                    .write_multipart(&object, &mut data.as_slice(), data.len() as u64, index, &[])
                    .expect("write part");
            }

            // A fresh handle built only from the path and the id.
            let resumed = backend.store.create(&path, &[with_multipart_id(id)]);
            let parts = uploads
                .list_multipart(&resumed, &[])
                .and_then(|it| it.collect_all())
                .expect("list parts");
            let indices: Vec<u32> = parts.iter().map(|p| p.index).collect();
            assert_eq!(indices, vec![0, 1]);
            let next = parts.last().map_or(0, |p| p.index + 1);
            assert_eq!(next, 2);

            let data = part_data(next);
            let (_, last) = uploads
                .write_multipart(&resumed, &mut data.as_slice(), data.len() as u64, next, &[])
                .expect("write part");
            let mut all = parts;
            all.push(last);
            uploads
                .complete_multipart(&resumed, &all, &[])
                .expect("complete");
            assert_eq!(
                backend.store.stat(&path, &[]).map(|o| o.content_length).ok(),
                Some(Some(330))
            );
        }
    }

    #[test]
    fn test_should_retire_cancelled_upload() {
        for backend in backends() {
            let Some(uploads) = backend.store.as_multiparter() else {
                continue;
            };
            let path = unique_name("cancel");
            let object = uploads
                .create_multipart(&path, &[])
                .expect("create");
            let id = object.multipart_id.clone().unwrap_or_default();

            backend
                .store
                .delete(&path, &[with_multipart_id(id)])
                .expect("cancel");
            let err = uploads
                .write_multipart(&object, &mut &b"x"[..], 1, 0, &[])
                .expect_err("expected error");
            assert_eq!(err.kind(), ErrorKind::InvalidState);

            let unknown = backend.store.create(&path, &[with_multipart_id("never-issued")]);
            let err = uploads
                .list_multipart(&unknown, &[])
                .expect_err("expected error");
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }
}
