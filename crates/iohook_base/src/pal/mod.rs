/* 📖 # What is the Platform Abstraction Layer here?

Every facade falls through to a platform backend when no override is bound.
The backends are traits so that default can be the real platform or an
in-memory stand-in:

- `StdioBackend` and `SystemHeap` wrap the C library's stdio and the system allocator
- `MemoryBackend` and `MockHeap` keep everything in memory and record calls for tests
*/

pub mod mock;
pub mod real_pal;
mod traits;

pub use mock::{HeapCall, MemoryBackend, MockHeap};
pub use real_pal::{StdioBackend, SystemHeap};
pub use traits::{FileBackend, FileBackendHandle, FileHandle, HeapBackend, HeapHandle, Whence};
