//! Service factory tests.

#[cfg(test)]
mod tests {
    use anystore_core::ErrorKind;
    use anystore_core::pairs::with_work_dir;
    use anystore_services::{ServiceRegistry, new_storager, new_storager_from_string};

    use crate::write_all;

    #[test]
    fn test_should_reject_unknown_scheme() {
        let err = new_storager_from_string("bogus://x")
            .expect_err("expected unknown scheme to fail");
        assert_eq!(err.kind(), ErrorKind::UnsupportedBackend);

        let err = new_storager("s3", &[])
            .expect_err("expected unknown scheme to fail");
        assert_eq!(err.kind(), ErrorKind::UnsupportedBackend);
    }

    #[test]
    fn test_should_reject_malformed_connection_strings() {
        for conn in ["memory", "memory://b%zz", "memory://?name"] {
            let err = new_storager_from_string(conn)
                .err()
                .unwrap_or_else(|| panic!("expected {conn:?} to fail"));
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{conn}");
        }
    }

    #[test]
    fn test_should_apply_name_and_work_dir_from_string() {
        let store = new_storager_from_string("memory://bucket/data/set")
            .expect("construct");
        let meta = store.metadata();
        assert_eq!(meta.backend, "memory");
        assert_eq!(meta.name, "bucket");
        assert_eq!(meta.work_dir, "/data/set/");
    }

    #[test]
    fn test_should_report_capabilities_consistently() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = new_storager("fs", &[with_work_dir(dir.path().display().to_string())])
            .expect("construct");
        for _ in 0..3 {
            assert!(store.as_multiparter().is_none());
            assert!(store.as_appender().is_some());
        }
        let meta = store.metadata();
        assert!(!meta.multiparter);
        assert!(meta.appender);

        write_all(store.as_ref(), "probe", b"x");
        assert!(dir.path().join("probe").is_file());
    }

    #[test]
    fn test_should_build_from_custom_registry() {
        let mut registry = ServiceRegistry::new();
        registry.register("scratch", anystore_memory::new_storager);
        let store = registry
            .new_storager_from_string("scratch:///tmp")
            .expect("construct");
        assert_eq!(store.metadata().backend, "memory");
        assert!(registry.new_storager_from_string("fs:///tmp").is_err());
    }
}
