/* 📖 # Why an explicit context instead of process globals?

The library was written against one global table of function pointers. Here a
`HookContext` owns the two slot sets together with the defaults they fall
through to, and every facade it builds shares those slot sets through `Arc`.
Two contexts never see each other's overrides, which keeps tests isolated
and lets a host run two differently hooked instances side by side. A host
that wants one process-wide table keeps a single context in a static.
*/

use std::sync::Arc;

use iohook_base::pal::{MemoryBackend, StdioBackend, SystemHeap};
use iohook_base::{FileBackendHandle, HeapHandle};
use tracing::debug;

use crate::alloc::{AllocFacade, AllocHooks};
use crate::config::{DefaultIo, HookConfig};
use crate::io::{IoFacade, IoHooks};
use crate::resolver::{NoVirtualPaths, PrefixResolver, VirtualOpener, VirtualResolver};

/// Slot sets plus the defaults and resolver their facades use.
#[derive(Debug, Clone)]
pub struct HookContext {
    io_hooks: Arc<IoHooks>,
    alloc_hooks: Arc<AllocHooks>,
    files: FileBackendHandle,
    heap: HeapHandle,
    resolver: Arc<dyn VirtualResolver>,
}

impl Default for HookContext {
    fn default() -> Self {
        Self::new()
    }
}

impl HookContext {
    /// Every slot unbound, C stdio and the system heap as defaults, no
    /// virtual paths.
    pub fn new() -> Self {
        Self::with_defaults(
            FileBackendHandle::new(StdioBackend::new()),
            HeapHandle::new(SystemHeap::new()),
            Arc::new(NoVirtualPaths),
        )
    }

    pub fn with_defaults(
        files: FileBackendHandle,
        heap: HeapHandle,
        resolver: Arc<dyn VirtualResolver>,
    ) -> Self {
        Self {
            io_hooks: Arc::new(IoHooks::new()),
            alloc_hooks: Arc::new(AllocHooks::new()),
            files,
            heap,
            resolver,
        }
    }

    /// Builds a context from configuration.
    ///
    /// `opener` opens virtual paths; without one no path is virtual and the
    /// configured prefixes are ignored.
    pub fn from_config(config: &HookConfig, opener: Option<Arc<VirtualOpener>>) -> Self {
        let files = match config.default_io {
            DefaultIo::Stdio => FileBackendHandle::new(StdioBackend::new()),
            DefaultIo::Memory => FileBackendHandle::new(MemoryBackend::new()),
        };
        let resolver: Arc<dyn VirtualResolver> = match opener {
            Some(opener) => Arc::new(PrefixResolver::from_arc(
                config.virtual_prefixes.clone(),
                opener,
            )),
            None => Arc::new(NoVirtualPaths),
        };
        debug!(default_io = ?config.default_io, ?resolver, "hook context created");
        Self::with_defaults(files, HeapHandle::new(SystemHeap::new()), resolver)
    }

    pub fn io_hooks(&self) -> &IoHooks {
        &self.io_hooks
    }

    pub fn alloc_hooks(&self) -> &AllocHooks {
        &self.alloc_hooks
    }

    /// I/O facade sharing this context's slots.
    pub fn io(&self) -> IoFacade {
        IoFacade::new(self.io_hooks.clone(), self.files.clone(), self.resolver.clone())
    }

    /// Allocation facade sharing this context's slots.
    pub fn alloc(&self) -> AllocFacade {
        AllocFacade::new(self.alloc_hooks.clone(), self.heap.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpenFlags;
    use iohook_base::FileHandle;

    #[test]
    fn test_facades_share_slots() {
        let context = HookContext::new();
        let first = context.io();
        let second = context.io();

        context.io_hooks().set_tell(|_| 42);
        let handle = FileHandle::from_raw(1).unwrap();
        assert_eq!(first.tell(handle), 42);
        assert_eq!(second.tell(handle), 42);
    }

    #[test]
    fn test_contexts_are_isolated() {
        let hooked = HookContext::new();
        let plain = HookContext::new();
        hooked.alloc_hooks().set_alloc(|_| std::ptr::null_mut());

        assert!(hooked.alloc().allocate(8).is_null());
        let ptr = plain.alloc().allocate(8);
        assert!(!ptr.is_null());
        plain.alloc().release(ptr);
    }

    #[test]
    fn test_memory_default_from_config() {
        let config = HookConfig::from_toml_str(r#"default_io = "memory""#).unwrap();
        let context = HookContext::from_config(&config, None);
        let io = context.io();

        let handle = io.open("scratch.bin", OpenFlags::WRITE | OpenFlags::READ).unwrap().unwrap();
        assert_eq!(io.write(handle, b"abc", 1, 3), 3);
        assert_eq!(io.file_size(handle), 3);
        assert_eq!(io.close(handle), 0);
    }

    #[test]
    fn test_config_prefixes_reach_resolver() {
        let config = HookConfig::from_toml_str(r#"virtual_prefixes = ["pak:"]"#).unwrap();
        let opener: Arc<VirtualOpener> = Arc::new(|_: &str| FileHandle::from_raw(0x55));
        let context = HookContext::from_config(&config, Some(opener));

        let handle = context.io().open("pak:voices/kal", OpenFlags::READ).unwrap();
        assert_eq!(handle, FileHandle::from_raw(0x55));
    }
}
