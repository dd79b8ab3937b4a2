/* 📖 # Why have iohook_base as a core library?
iohook_base holds what every layer of the seam shares: the error type, the
tracing setup, the opaque file handle and the default backends the facades fall
through to. The engine crate builds registry and facades on top of it.
*/

pub mod error;
mod error_tests;
pub mod pal;
mod pal_tests;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, HookError, HookResult, ResultExt};
pub use pal::{FileBackend, FileBackendHandle, FileHandle, HeapBackend, HeapHandle, Whence};
