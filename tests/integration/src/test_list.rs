//! Listing and iterator contract tests.

#[cfg(test)]
mod tests {
    use anystore_core::iterator::Step;
    use anystore_core::pairs::with_list_mode;
    use anystore_core::{ErrorKind, ListMode};

    use crate::{backends, unique_name, write_all};

    #[test]
    fn test_should_yield_n_items_then_sentinel() {
        for backend in backends() {
            let store = backend.store.as_ref();
            let dir = unique_name("iter");
            for i in 0..5 {
                write_all(store, &format!("{dir}/item-{i}"), b"x");
            }

            let mut it = store
                .list(&format!("{dir}/"), &[])
                .expect("list");
            let mut paths = Vec::new();
            loop {
                match it.next() {
                    Ok(object) => paths.push(object.path),
                    Err(e) if e.is_iterate_done() => break,
                    Err(e) => panic!("{}: next failed: {e}", backend.scheme),
                }
            }
            let expected: Vec<String> = (0..5).map(|i| format!("{dir}/item-{i}")).collect();
            assert_eq!(paths, expected, "{}", backend.scheme);

            for _ in 0..3 {
                let err = it
                    .next()
                    .expect_err("expected sentinel");
                assert_eq!(err.kind(), ErrorKind::IterateDone, "{}", backend.scheme);
            }
            assert!(it.step().is_exhausted(), "{}", backend.scheme);
        }
    }

    #[test]
    fn test_should_separate_dir_and_prefix_modes() {
        for backend in backends() {
            let store = backend.store.as_ref();
            let dir = unique_name("modes");
            for path in ["a", "sub/b", "sub/deep/c"] {
                write_all(store, &format!("{dir}/{path}"), b"1");
            }

            let objects = store
                .list(&format!("{dir}/"), &[with_list_mode(ListMode::Dir)])
                .and_then(|it| it.collect_all())
                .expect("dir list");
            let listed: Vec<(String, bool)> = objects
                .into_iter()
                .map(|o| (o.path, o.mode.is_dir()))
                .collect();
            assert_eq!(
                listed,
                vec![(format!("{dir}/a"), false), (format!("{dir}/sub/"), true)],
                "{}",
                backend.scheme
            );

            let objects = store
                .list(&format!("{dir}/"), &[with_list_mode(ListMode::Prefix)])
                .and_then(|it| it.collect_all())
                .expect("prefix list");
            assert_eq!(objects.len(), 3, "{}", backend.scheme);
            assert!(objects.iter().all(|o| !o.mode.is_dir()), "{}", backend.scheme);
        }
    }

    #[test]
    fn test_should_expose_tagged_steps() {
        for backend in backends() {
            let store = backend.store.as_ref();
            let dir = unique_name("steps");
            write_all(store, &format!("{dir}/only"), b"1");

            let mut it = store
                .list(&format!("{dir}/"), &[])
                .expect("list");
            assert!(matches!(it.step(), Step::Item(_)), "{}", backend.scheme);
            assert!(it.step().is_exhausted(), "{}", backend.scheme);
            assert_eq!(it.yielded(), 1, "{}", backend.scheme);
        }
    }
}
