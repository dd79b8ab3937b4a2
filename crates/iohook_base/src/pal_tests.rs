/* 📖 # Why run one suite against every file backend?

Facades fall through to whichever backend the host installed, so the stdio
backend and the in-memory backend have to agree on the observable contract:
element counts, positions after seeks, sentinels for bad handles. Each check
below is written once against `&dyn FileBackend` and run against both.
*/

#[cfg(test)]
mod backend_conformance_tests {
    use crate::pal::{FileBackend, FileHandle, MemoryBackend, StdioBackend, Whence};
    use tempfile::TempDir;

    /// A backend plus a way to build paths it can create files under.
    struct Fixture {
        backend: Box<dyn FileBackend>,
        root: Option<TempDir>,
    }

    impl Fixture {
        fn path(&self, name: &str) -> String {
            match &self.root {
                Some(dir) => dir.path().join(name).to_string_lossy().into_owned(),
                None => name.to_string(),
            }
        }
    }

    fn fixtures() -> Vec<Fixture> {
        vec![
            Fixture {
                backend: Box::new(MemoryBackend::new()),
                root: None,
            },
            Fixture {
                backend: Box::new(StdioBackend::new()),
                root: Some(TempDir::new().unwrap()),
            },
        ]
    }

    fn create_with(fixture: &Fixture, name: &str, content: &[u8]) -> String {
        let path = fixture.path(name);
        let backend = &fixture.backend;
        let handle = backend.open(&path, "wb").unwrap();
        assert_eq!(backend.write(handle, content, 1, content.len()), content.len());
        assert_eq!(backend.close(handle), 0);
        path
    }

    #[test]
    fn test_read_back_what_was_written() {
        for fixture in fixtures() {
            let path = create_with(&fixture, "voice.bin", b"flite");
            let backend = &fixture.backend;

            let handle = backend.open(&path, "rb").unwrap();
            let mut buf = [0u8; 5];
            assert_eq!(backend.read(handle, &mut buf, 1, 5), 5, "{:?}", backend);
            assert_eq!(&buf, b"flite");
            assert_eq!(backend.read_byte(handle), None);
            assert_eq!(backend.close(handle), 0);
        }
    }

    #[test]
    fn test_seek_end_tell_reports_length() {
        for fixture in fixtures() {
            let path = create_with(&fixture, "len.bin", &[7u8; 42]);
            let backend = &fixture.backend;

            let handle = backend.open(&path, "rb").unwrap();
            assert_eq!(backend.seek(handle, 0, Whence::End), 0);
            assert_eq!(backend.tell(handle), 42, "{:?}", backend);
            assert_eq!(backend.seek(handle, -2, Whence::Current), 0);
            assert_eq!(backend.tell(handle), 40);
            backend.close(handle);
        }
    }

    #[test]
    fn test_partial_element_reads_advance_position() {
        for fixture in fixtures() {
            let path = create_with(&fixture, "odd.bin", &[1, 2, 3, 4, 5]);
            let backend = &fixture.backend;

            let handle = backend.open(&path, "rb").unwrap();
            let mut buf = [0u8; 8];
            assert_eq!(backend.read(handle, &mut buf, 2, 4), 2, "{:?}", backend);
            assert_eq!(backend.tell(handle), 5);
            backend.close(handle);
        }
    }

    #[test]
    fn test_update_mode_reads_and_writes() {
        for fixture in fixtures() {
            let path = fixture.path("update.bin");
            let backend = &fixture.backend;

            let handle = backend.open(&path, "w+b").unwrap();
            assert_eq!(backend.write(handle, b"abc", 1, 3), 3);
            assert_eq!(backend.seek(handle, 1, Whence::Start), 0);
            assert_eq!(backend.read_byte(handle), Some(b'b'), "{:?}", backend);
            backend.close(handle);
        }
    }

    #[test]
    fn test_append_mode_keeps_existing_content() {
        for fixture in fixtures() {
            let path = create_with(&fixture, "log.txt", b"one ");
            let backend = &fixture.backend;

            let handle = backend.open(&path, "ab").unwrap();
            assert_eq!(backend.write(handle, b"two", 1, 3), 3);
            backend.close(handle);

            let handle = backend.open(&path, "rb").unwrap();
            let mut buf = [0u8; 16];
            let read = backend.read(handle, &mut buf, 1, 16);
            assert_eq!(&buf[..read], b"one two", "{:?}", backend);
            backend.close(handle);
        }
    }

    #[test]
    fn test_read_past_end_returns_nothing() {
        for fixture in fixtures() {
            let path = fixture.path("short.bin");
            let backend = &fixture.backend;

            let handle = backend.open(&path, "w+b").unwrap();
            assert_eq!(backend.write(handle, b"abc", 1, 3), 3);
            assert_eq!(backend.seek(handle, 10, Whence::Start), 0);
            let mut buf = [0u8; 4];
            assert_eq!(backend.read(handle, &mut buf, 1, 4), 0, "{:?}", backend);
            assert_eq!(backend.read_byte(handle), None);
            assert_eq!(backend.tell(handle), 10);
            assert_eq!(buf, [0u8; 4]);
            backend.close(handle);
        }
    }

    #[test]
    fn test_missing_file_and_unknown_handle() {
        for fixture in fixtures() {
            let backend = &fixture.backend;
            assert!(backend.open(&fixture.path("missing.bin"), "rb").is_none());

            let stranger = FileHandle::from_raw(0xdead).unwrap();
            let mut buf = [0u8; 4];
            assert_eq!(backend.read(stranger, &mut buf, 1, 4), 0);
            assert_eq!(backend.write(stranger, b"x", 1, 1), 0);
            assert_eq!(backend.read_byte(stranger), None);
            assert_eq!(backend.tell(stranger), -1);
            assert_eq!(backend.seek(stranger, 0, Whence::Start), -1);
            assert_eq!(backend.close(stranger), -1, "{:?}", backend);
        }
    }
}
