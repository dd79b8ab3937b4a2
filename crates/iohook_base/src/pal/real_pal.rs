use std::collections::HashSet;
use std::ffi::{CString, c_void};

use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

use super::traits::{FileBackend, FileHandle, HeapBackend, Whence};

/* 📖 # Why C stdio instead of std::fs::File?

The library's contract is C stdio: mode strings such as `"a+b"`, element
counts for read/write, `fgetc` end-of-stream, `ftell`/`fseek` with `SEEK_*`
origins. Calling libc directly keeps those semantics exact (append-mode
writes always land at the end, `w+` truncates, reads after writes need a
seek) instead of re-deriving them on top of std::fs.

The backend records every `FILE*` it opened. Handles are opaque tokens that
may come from an override or a virtual path resolver, so a handle that is not
in the set is answered with the stdio failure sentinel and never dereferenced.
*/

const EOF: i32 = -1;

/// Default file backend: C stdio through `libc`.
#[derive(Debug, Default)]
pub struct StdioBackend {
    streams: Mutex<HashSet<usize>>,
}

impl StdioBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of streams opened by this backend and not yet closed.
    pub fn open_stream_count(&self) -> usize {
        self.streams.lock().len()
    }

    /// Runs `f` with the `FILE*` behind `handle` while holding the stream set
    /// lock, or returns `fallback` if this backend did not open `handle`.
    fn with_stream<T>(
        &self,
        handle: FileHandle,
        fallback: T,
        f: impl FnOnce(*mut libc::FILE) -> T,
    ) -> T {
        let streams = self.streams.lock();
        if !streams.contains(&handle.as_raw()) {
            debug!(?handle, "handle was not opened by the stdio backend");
            return fallback;
        }
        f(handle.as_raw() as *mut libc::FILE)
    }
}

/// Clamps an element count to what fits in a buffer of `len` bytes.
fn clamp_count(len: usize, size: usize, count: usize) -> usize {
    if size == 0 {
        return 0;
    }
    count.min(len / size)
}

impl FileBackend for StdioBackend {
    #[instrument(skip(self), level = "debug")]
    fn open(&self, path: &str, mode: &str) -> Option<FileHandle> {
        let (Ok(c_path), Ok(c_mode)) = (CString::new(path), CString::new(mode)) else {
            debug!("path or mode contains an interior NUL byte");
            return None;
        };
        let file = unsafe { libc::fopen(c_path.as_ptr(), c_mode.as_ptr()) };
        let Some(handle) = FileHandle::from_raw(file as usize) else {
            debug!(error = %std::io::Error::last_os_error(), "fopen failed");
            return None;
        };
        self.streams.lock().insert(handle.as_raw());
        debug!(?handle, "stream opened");
        Some(handle)
    }

    fn write(&self, handle: FileHandle, buf: &[u8], size: usize, count: usize) -> usize {
        let count = clamp_count(buf.len(), size, count);
        if count == 0 {
            return 0;
        }
        self.with_stream(handle, 0, |file| unsafe {
            libc::fwrite(buf.as_ptr().cast::<c_void>(), size, count, file)
        })
    }

    fn read(&self, handle: FileHandle, buf: &mut [u8], size: usize, count: usize) -> usize {
        let count = clamp_count(buf.len(), size, count);
        if count == 0 {
            return 0;
        }
        self.with_stream(handle, 0, |file| unsafe {
            libc::fread(buf.as_mut_ptr().cast::<c_void>(), size, count, file)
        })
    }

    fn read_byte(&self, handle: FileHandle) -> Option<u8> {
        let value = self.with_stream(handle, EOF, |file| unsafe { libc::fgetc(file) });
        u8::try_from(value).ok()
    }

    fn tell(&self, handle: FileHandle) -> i64 {
        self.with_stream(handle, -1, |file| unsafe { libc::ftell(file) as i64 })
    }

    fn seek(&self, handle: FileHandle, offset: i64, whence: Whence) -> i32 {
        let Ok(offset) = libc::c_long::try_from(offset) else {
            debug!(offset, "seek offset does not fit in a C long");
            return -1;
        };
        self.with_stream(handle, -1, |file| unsafe {
            libc::fseek(file, offset, whence.as_raw())
        })
    }

    #[instrument(skip(self), level = "debug")]
    fn close(&self, handle: FileHandle) -> i32 {
        let mut streams = self.streams.lock();
        if !streams.remove(&handle.as_raw()) {
            debug!("handle was not opened by the stdio backend");
            return EOF;
        }
        let status = unsafe { libc::fclose(handle.as_raw() as *mut libc::FILE) };
        debug!(status, "stream closed");
        status
    }
}

/// The library's internal allocator: C heap through `libc`.
///
/// Policy: negative sizes yield null, zero-byte requests are served as one
/// byte, all fresh memory is zeroed, and exhaustion aborts through
/// [`std::alloc::handle_alloc_error`] instead of returning null.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHeap;

impl SystemHeap {
    pub fn new() -> Self {
        Self
    }

    fn effective_size(symbol: &'static str, size: i32) -> Option<usize> {
        match usize::try_from(size) {
            Ok(0) => Some(1),
            Ok(size) => Some(size),
            Err(_) => {
                warn!(symbol, size, "refusing negative allocation size");
                None
            }
        }
    }

    fn out_of_memory(size: usize) -> ! {
        let layout = std::alloc::Layout::from_size_align(size, 1)
            .unwrap_or_else(|_| std::alloc::Layout::new::<u8>());
        std::alloc::handle_alloc_error(layout)
    }
}

impl HeapBackend for SystemHeap {
    fn alloc(&self, size: i32) -> *mut c_void {
        self.zero_alloc(size)
    }

    fn zero_alloc(&self, size: i32) -> *mut c_void {
        let Some(size) = Self::effective_size("zero_alloc", size) else {
            return std::ptr::null_mut();
        };
        let ptr = unsafe { libc::calloc(size, 1) };
        if ptr.is_null() {
            Self::out_of_memory(size);
        }
        ptr
    }

    fn realloc(&self, ptr: *mut c_void, size: i32) -> *mut c_void {
        if ptr.is_null() {
            return self.alloc(size);
        }
        let Some(size) = Self::effective_size("realloc", size) else {
            return std::ptr::null_mut();
        };
        let moved = unsafe { libc::realloc(ptr, size) };
        if moved.is_null() {
            Self::out_of_memory(size);
        }
        moved
    }

    fn free(&self, ptr: *mut c_void) {
        if !ptr.is_null() {
            unsafe { libc::free(ptr) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup_test_dir() -> (TempDir, StdioBackend) {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        (temp_dir, StdioBackend::new())
    }

    fn path_in(dir: &TempDir, name: &str) -> String {
        dir.path().join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn test_open_missing_file_for_reading() {
        let (temp_dir, backend) = setup_test_dir();
        assert!(backend.open(&path_in(&temp_dir, "missing.bin"), "rb").is_none());
        assert_eq!(backend.open_stream_count(), 0);
    }

    #[test]
    fn test_write_then_read_back() {
        let (temp_dir, backend) = setup_test_dir();
        let path = path_in(&temp_dir, "data.bin");

        let handle = backend.open(&path, "w+b").unwrap();
        assert_eq!(backend.write(handle, b"hello world", 1, 11), 11);
        assert_eq!(backend.tell(handle), 11);
        assert_eq!(backend.seek(handle, 6, Whence::Start), 0);

        let mut buf = [0u8; 5];
        assert_eq!(backend.read(handle, &mut buf, 1, 5), 5);
        assert_eq!(&buf, b"world");
        assert_eq!(backend.read_byte(handle), None);
        assert_eq!(backend.close(handle), 0);

        assert_eq!(fs::read(&path).unwrap(), b"hello world");
    }

    #[test]
    fn test_read_counts_whole_elements() {
        let (temp_dir, backend) = setup_test_dir();
        let path = path_in(&temp_dir, "elements.bin");
        fs::write(&path, [1u8, 2, 3, 4, 5, 6, 7]).unwrap();

        let handle = backend.open(&path, "rb").unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(backend.read(handle, &mut buf, 2, 4), 3);
        assert_eq!(&buf[..6], &[1, 2, 3, 4, 5, 6]);
        backend.close(handle);
    }

    #[test]
    fn test_count_is_clamped_to_buffer() {
        let (temp_dir, backend) = setup_test_dir();
        let path = path_in(&temp_dir, "clamp.bin");

        let handle = backend.open(&path, "wb").unwrap();
        assert_eq!(backend.write(handle, b"abc", 1, 100), 3);
        assert_eq!(backend.write(handle, b"abc", 0, 3), 0);
        backend.close(handle);

        assert_eq!(fs::read(&path).unwrap(), b"abc");
    }

    #[test]
    fn test_append_mode_writes_at_end() {
        let (temp_dir, backend) = setup_test_dir();
        let path = path_in(&temp_dir, "log.txt");
        fs::write(&path, "first\n").unwrap();

        let handle = backend.open(&path, "ab").unwrap();
        assert_eq!(backend.write(handle, b"second\n", 1, 7), 7);
        backend.close(handle);

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_seek_end_and_tell() {
        let (temp_dir, backend) = setup_test_dir();
        let path = path_in(&temp_dir, "sized.bin");
        fs::write(&path, vec![0u8; 42]).unwrap();

        let handle = backend.open(&path, "rb").unwrap();
        assert_eq!(backend.seek(handle, 0, Whence::End), 0);
        assert_eq!(backend.tell(handle), 42);
        assert_eq!(backend.seek(handle, -2, Whence::Current), 0);
        assert_eq!(backend.tell(handle), 40);
        backend.close(handle);
    }

    #[test]
    fn test_foreign_handle_gets_sentinels() {
        let backend = StdioBackend::new();
        let foreign = FileHandle::from_raw(0xdead_0000).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(backend.write(foreign, b"data", 1, 4), 0);
        assert_eq!(backend.read(foreign, &mut buf, 1, 4), 0);
        assert_eq!(backend.read_byte(foreign), None);
        assert_eq!(backend.tell(foreign), -1);
        assert_eq!(backend.seek(foreign, 0, Whence::Start), -1);
        assert_eq!(backend.close(foreign), -1);
    }

    #[test]
    fn test_close_twice_is_rejected() {
        let (temp_dir, backend) = setup_test_dir();
        let handle = backend.open(&path_in(&temp_dir, "once.bin"), "wb").unwrap();
        assert_eq!(backend.open_stream_count(), 1);
        assert_eq!(backend.close(handle), 0);
        assert_eq!(backend.close(handle), -1);
        assert_eq!(backend.open_stream_count(), 0);
    }

    #[test]
    fn test_system_heap_zeroes_and_resizes() {
        let heap = SystemHeap::new();
        let ptr = heap.alloc(16);
        assert!(!ptr.is_null());
        let bytes = unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), 16) };
        assert!(bytes.iter().all(|b| *b == 0));

        unsafe { ptr.cast::<u8>().write(0x5a) };
        let grown = heap.realloc(ptr, 4096);
        assert!(!grown.is_null());
        assert_eq!(unsafe { grown.cast::<u8>().read() }, 0x5a);
        heap.free(grown);
    }

    #[test]
    fn test_system_heap_size_policy() {
        let heap = SystemHeap::new();
        assert!(heap.alloc(-1).is_null());
        assert!(heap.zero_alloc(-5).is_null());

        let zero = heap.alloc(0);
        assert!(!zero.is_null());
        heap.free(zero);

        let from_null = heap.realloc(std::ptr::null_mut(), 8);
        assert!(!from_null.is_null());
        heap.free(from_null);
        heap.free(std::ptr::null_mut());
    }
}
