use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::Arc;

use parking_lot::Mutex;

use super::traits::{FileBackend, FileHandle, HeapBackend, Whence};

/* 📖 # Why in-memory backends next to the real ones?

Routing tests need to see exactly which backend served a call and with which
arguments. `MemoryBackend` keeps files in a HashMap, honors the stdio mode
string it is opened with and records every mode string, so tests can assert
on the translated mode without touching the disk. `MockHeap` serves blocks
from owned buffers and records every call.

Hosts can also install `MemoryBackend` as the default file backend to give
the library a sandboxed file system.
*/

const FIRST_STREAM_ID: usize = 0x1000;

/// In-memory file backend with stdio mode semantics.
///
/// # Examples
///
/// ```
/// use iohook_base::pal::{FileBackend, MemoryBackend};
///
/// let files = MemoryBackend::new();
/// files.add_file("voice.bin", b"abc".to_vec());
/// let handle = files.open("voice.bin", "rb").unwrap();
/// assert_eq!(files.read_byte(handle), Some(b'a'));
/// assert_eq!(files.opened_modes(), vec!["rb".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<String, Vec<u8>>,
    streams: HashMap<usize, MemoryStream>,
    next_id: usize,
    opened_modes: Vec<String>,
}

#[derive(Debug)]
struct MemoryStream {
    path: String,
    position: usize,
    readable: bool,
    writable: bool,
    append: bool,
}

/// Access rights and placement parsed from a stdio mode string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ParsedMode {
    readable: bool,
    writable: bool,
    append: bool,
    truncate: bool,
    create: bool,
}

fn parse_mode(mode: &str) -> Option<ParsedMode> {
    let mut chars = mode.chars();
    let primary = chars.next()?;
    let mut update = false;
    for modifier in chars {
        match modifier {
            '+' => update = true,
            'b' => {}
            _ => return None,
        }
    }
    let parsed = match primary {
        'r' => ParsedMode {
            readable: true,
            writable: update,
            append: false,
            truncate: false,
            create: false,
        },
        'w' => ParsedMode {
            readable: update,
            writable: true,
            append: false,
            truncate: true,
            create: true,
        },
        'a' => ParsedMode {
            readable: update,
            writable: true,
            append: true,
            truncate: false,
            create: true,
        },
        _ => return None,
    };
    Some(parsed)
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn add_file(&self, path: impl Into<String>, content: Vec<u8>) {
        self.state.lock().files.insert(path.into(), content);
    }

    /// Current contents of a file, if it exists.
    pub fn file_contents(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(path).cloned()
    }

    /// Every mode string passed to `open`, in call order, including failed opens.
    pub fn opened_modes(&self) -> Vec<String> {
        self.state.lock().opened_modes.clone()
    }

    /// Number of handles opened and not yet closed.
    pub fn open_stream_count(&self) -> usize {
        self.state.lock().streams.len()
    }
}

impl MemoryState {
    /// Splits borrows so a stream and its file can be used together.
    fn stream_and_file(&mut self, handle: FileHandle) -> Option<(&mut MemoryStream, &mut Vec<u8>)> {
        let stream = self.streams.get_mut(&handle.as_raw())?;
        let file = self.files.entry(stream.path.clone()).or_default();
        Some((stream, file))
    }
}

impl FileBackend for MemoryBackend {
    fn open(&self, path: &str, mode: &str) -> Option<FileHandle> {
        let mut state = self.state.lock();
        state.opened_modes.push(mode.to_string());
        let parsed = parse_mode(mode)?;

        match state.files.get_mut(path) {
            Some(content) if parsed.truncate => content.clear(),
            Some(_) => {}
            None if parsed.create => {
                state.files.insert(path.to_string(), Vec::new());
            }
            None => return None,
        }

        let id = FIRST_STREAM_ID + state.next_id;
        state.next_id += 1;
        state.streams.insert(
            id,
            MemoryStream {
                path: path.to_string(),
                position: 0,
                readable: parsed.readable,
                writable: parsed.writable,
                append: parsed.append,
            },
        );
        FileHandle::from_raw(id)
    }

    fn write(&self, handle: FileHandle, buf: &[u8], size: usize, count: usize) -> usize {
        if size == 0 {
            return 0;
        }
        let mut state = self.state.lock();
        let Some((stream, file)) = state.stream_and_file(handle) else {
            return 0;
        };
        if !stream.writable {
            return 0;
        }
        let count = count.min(buf.len() / size);
        let bytes = &buf[..count * size];
        if stream.append {
            stream.position = file.len();
        }
        let Some(end) = stream.position.checked_add(bytes.len()) else {
            return 0;
        };
        if file.len() < end {
            if file.try_reserve(end - file.len()).is_err() {
                return 0;
            }
            file.resize(end, 0);
        }
        file[stream.position..end].copy_from_slice(bytes);
        stream.position = end;
        count
    }

    fn read(&self, handle: FileHandle, buf: &mut [u8], size: usize, count: usize) -> usize {
        if size == 0 {
            return 0;
        }
        let mut state = self.state.lock();
        let Some((stream, file)) = state.stream_and_file(handle) else {
            return 0;
        };
        if !stream.readable {
            return 0;
        }
        let wanted = count.min(buf.len() / size) * size;
        let Some(available) = file.get(stream.position..) else {
            return 0;
        };
        let copied = wanted.min(available.len());
        buf[..copied].copy_from_slice(&available[..copied]);
        stream.position += copied;
        copied / size
    }

    fn read_byte(&self, handle: FileHandle) -> Option<u8> {
        let mut state = self.state.lock();
        let (stream, file) = state.stream_and_file(handle)?;
        if !stream.readable {
            return None;
        }
        let byte = file.get(stream.position).copied()?;
        stream.position += 1;
        Some(byte)
    }

    fn tell(&self, handle: FileHandle) -> i64 {
        let state = self.state.lock();
        state
            .streams
            .get(&handle.as_raw())
            .and_then(|stream| i64::try_from(stream.position).ok())
            .unwrap_or(-1)
    }

    fn seek(&self, handle: FileHandle, offset: i64, whence: Whence) -> i32 {
        let mut state = self.state.lock();
        let Some((stream, file)) = state.stream_and_file(handle) else {
            return -1;
        };
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => stream.position,
            Whence::End => file.len(),
        };
        let target = i64::try_from(base)
            .ok()
            .and_then(|base| base.checked_add(offset))
            .and_then(|target| usize::try_from(target).ok());
        match target {
            Some(target) => {
                stream.position = target;
                0
            }
            None => -1,
        }
    }

    fn close(&self, handle: FileHandle) -> i32 {
        match self.state.lock().streams.remove(&handle.as_raw()) {
            Some(_) => 0,
            None => -1,
        }
    }
}

/// A call observed by [`MockHeap`]. Pointers are recorded as addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapCall {
    Alloc(i32),
    ZeroAlloc(i32),
    Realloc { ptr: usize, size: i32 },
    Free(usize),
}

/// Heap backend serving zeroed blocks from owned buffers and recording
/// every call.
#[derive(Debug, Clone, Default)]
pub struct MockHeap {
    state: Arc<Mutex<HeapState>>,
}

#[derive(Debug, Default)]
struct HeapState {
    blocks: HashMap<usize, Vec<u8>>,
    calls: Vec<HeapCall>,
    foreign_frees: usize,
}

impl HeapState {
    fn allocate(&mut self, size: i32) -> *mut c_void {
        let Ok(size) = usize::try_from(size) else {
            return std::ptr::null_mut();
        };
        let mut block = vec![0u8; size.max(1)];
        let ptr = block.as_mut_ptr();
        self.blocks.insert(ptr as usize, block);
        ptr.cast()
    }
}

impl MockHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls observed so far, in order.
    pub fn calls(&self) -> Vec<HeapCall> {
        self.state.lock().calls.clone()
    }

    /// Number of blocks currently allocated.
    pub fn live_blocks(&self) -> usize {
        self.state.lock().blocks.len()
    }

    /// Whether `ptr` is a live block of this heap.
    pub fn owns(&self, ptr: *const c_void) -> bool {
        self.state.lock().blocks.contains_key(&(ptr as usize))
    }

    /// Frees of pointers this heap never handed out.
    pub fn foreign_frees(&self) -> usize {
        self.state.lock().foreign_frees
    }
}

impl HeapBackend for MockHeap {
    fn alloc(&self, size: i32) -> *mut c_void {
        let mut state = self.state.lock();
        state.calls.push(HeapCall::Alloc(size));
        state.allocate(size)
    }

    fn zero_alloc(&self, size: i32) -> *mut c_void {
        let mut state = self.state.lock();
        state.calls.push(HeapCall::ZeroAlloc(size));
        state.allocate(size)
    }

    fn realloc(&self, ptr: *mut c_void, size: i32) -> *mut c_void {
        let mut state = self.state.lock();
        state.calls.push(HeapCall::Realloc {
            ptr: ptr as usize,
            size,
        });
        if ptr.is_null() {
            return state.allocate(size);
        }
        let Some(old) = state.blocks.remove(&(ptr as usize)) else {
            return std::ptr::null_mut();
        };
        let moved = state.allocate(size);
        if let Some(block) = state.blocks.get_mut(&(moved as usize)) {
            let keep = old.len().min(block.len());
            block[..keep].copy_from_slice(&old[..keep]);
        }
        moved
    }

    fn free(&self, ptr: *mut c_void) {
        let mut state = self.state.lock();
        state.calls.push(HeapCall::Free(ptr as usize));
        if ptr.is_null() {
            return;
        }
        if state.blocks.remove(&(ptr as usize)).is_none() {
            state.foreign_frees += 1;
        }
    }
}
