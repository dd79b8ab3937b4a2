use std::ffi::c_void;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

/* 📖 # What is the Platform Abstraction Layer here?

The PAL is the set of default backends the facades fall through to when no
override is bound: a file backend with C stdio semantics and a heap backend
with the library's allocator semantics. Both are traits so the default can be
the real platform (`StdioBackend`, `SystemHeap`) or an in-memory stand-in
(`MemoryBackend`, `MockHeap`). The same traits double as the capability
interface a host can install wholesale as its override.
*/

/// Opaque handle to an open file.
///
/// Whoever created the handle (platform default, override or virtual path
/// resolver) owns what it refers to. A null handle is expressed as `None`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(NonZeroUsize);

impl FileHandle {
    /// Wraps a raw token, returning `None` for zero.
    pub fn from_raw(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    /// The raw token this handle wraps.
    pub fn as_raw(self) -> usize {
        self.0.get()
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileHandle({:#x})", self.0.get())
    }
}

/// Platform seek origin. Discriminants are the platform's `SEEK_*` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Whence {
    Start = libc::SEEK_SET,
    Current = libc::SEEK_CUR,
    End = libc::SEEK_END,
}

impl Whence {
    /// The platform constant passed to `fseek`.
    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

/// File primitives with C stdio semantics.
///
/// Failures are reported the way stdio reports them: `None` for a failed
/// open or end of stream, short element counts, `-1` from `tell`, `seek` and
/// `close`. Implementations must tolerate handles they did not create by
/// returning those sentinels.
pub trait FileBackend: fmt::Debug + Send + Sync + 'static {
    /// Open `path` with a stdio mode string such as `"rb"` or `"w+b"`.
    fn open(&self, path: &str, mode: &str) -> Option<FileHandle>;

    /// Write up to `count` elements of `size` bytes from `buf`; returns elements written.
    fn write(&self, handle: FileHandle, buf: &[u8], size: usize, count: usize) -> usize;

    /// Read up to `count` elements of `size` bytes into `buf`; returns elements read.
    fn read(&self, handle: FileHandle, buf: &mut [u8], size: usize, count: usize) -> usize;

    /// Read a single byte, `None` at end of stream or on error.
    fn read_byte(&self, handle: FileHandle) -> Option<u8>;

    /// Current absolute position, `-1` on error.
    fn tell(&self, handle: FileHandle) -> i64;

    /// Move the position; `0` on success, `-1` on error.
    fn seek(&self, handle: FileHandle, offset: i64, whence: Whence) -> i32;

    /// Close the handle; `0` on success, `-1` on error.
    fn close(&self, handle: FileHandle) -> i32;
}

/// Heap primitives with the library's allocator conventions.
///
/// Sizes are signed to match the library's call sites. Pointers returned by
/// `alloc`, `zero_alloc` and `realloc` must only be passed back to the same
/// backend's `realloc` and `free`.
pub trait HeapBackend: fmt::Debug + Send + Sync + 'static {
    fn alloc(&self, size: i32) -> *mut c_void;

    /// Allocate `size` zeroed bytes.
    fn zero_alloc(&self, size: i32) -> *mut c_void;

    /// Resize `ptr` to `size` bytes; may move the allocation.
    fn realloc(&self, ptr: *mut c_void, size: i32) -> *mut c_void;

    fn free(&self, ptr: *mut c_void);
}

/// Shared handle to a [`FileBackend`].
///
/// Internally wraps `Arc<dyn FileBackend>` for cheap cloning, following the
/// same pattern as [`HeapHandle`].
///
/// # Examples
///
/// ```
/// use iohook_base::pal::{FileBackendHandle, MemoryBackend};
///
/// let files = FileBackendHandle::new(MemoryBackend::new());
/// let shared = files.clone(); // same backend, same files
/// ```
#[derive(Debug, Clone)]
pub struct FileBackendHandle(Arc<dyn FileBackend>);

impl FileBackendHandle {
    pub fn new(backend: impl FileBackend + 'static) -> Self {
        Self(Arc::new(backend))
    }
}

impl std::ops::Deref for FileBackendHandle {
    type Target = dyn FileBackend;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

/// Shared handle to a [`HeapBackend`].
#[derive(Debug, Clone)]
pub struct HeapHandle(Arc<dyn HeapBackend>);

impl HeapHandle {
    pub fn new(heap: impl HeapBackend + 'static) -> Self {
        Self(Arc::new(heap))
    }
}

impl std::ops::Deref for HeapHandle {
    type Target = dyn HeapBackend;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
