/* 📖 # How does allocation dispatch?

The library allocates through four primitives. Each consults its own slot:
an override receives the exact arguments, otherwise the context's default
heap (`SystemHeap` unless configured otherwise) serves the call. Slots are
independent, so a host overriding `alloc` but not `free` owns the mismatch;
`install_heap` binds all four to one backend to avoid it.

Sizes stay `i32` because that is what the library passes.
*/

use std::ffi::c_void;
use std::sync::Arc;

use iohook_base::HeapHandle;

use crate::registry::override_slots;

override_slots! {
    /// Override slots for the allocation primitives.
    pub struct AllocHooks {
        alloc, set_alloc, clear_alloc: AllocHook = fn(i32) -> *mut c_void;
        zero_alloc, set_zero_alloc, clear_zero_alloc: ZeroAllocHook = fn(i32) -> *mut c_void;
        realloc, set_realloc, clear_realloc: ReallocHook = fn(*mut c_void, i32) -> *mut c_void;
        free, set_free, clear_free: FreeHook = fn(*mut c_void);
    }
}

impl AllocHooks {
    /// Routes every allocation primitive to `heap`.
    pub fn install_heap(&self, heap: HeapHandle) {
        let alloc = heap.clone();
        self.set_alloc(move |size| alloc.alloc(size));
        let zero_alloc = heap.clone();
        self.set_zero_alloc(move |size| zero_alloc.zero_alloc(size));
        let realloc = heap.clone();
        self.set_realloc(move |ptr, size| realloc.realloc(ptr, size));
        self.set_free(move |ptr| heap.free(ptr));
    }
}

/// Allocation entry points used by the library.
#[derive(Debug, Clone)]
pub struct AllocFacade {
    hooks: Arc<AllocHooks>,
    heap: HeapHandle,
}

impl AllocFacade {
    pub fn new(hooks: Arc<AllocHooks>, heap: HeapHandle) -> Self {
        Self { hooks, heap }
    }

    pub fn hooks(&self) -> &AllocHooks {
        &self.hooks
    }

    pub fn allocate(&self, size: i32) -> *mut c_void {
        match self.hooks.alloc().route() {
            Some(hook) => hook(size),
            None => self.heap.alloc(size),
        }
    }

    /// Allocates `size` zeroed bytes.
    pub fn zero_allocate(&self, size: i32) -> *mut c_void {
        match self.hooks.zero_alloc().route() {
            Some(hook) => hook(size),
            None => self.heap.zero_alloc(size),
        }
    }

    /// Resizes a block; ownership of `ptr` passes to whichever allocator
    /// serves the call.
    pub fn reallocate(&self, ptr: *mut c_void, size: i32) -> *mut c_void {
        match self.hooks.realloc().route() {
            Some(hook) => hook(ptr, size),
            None => self.heap.realloc(ptr, size),
        }
    }

    pub fn release(&self, ptr: *mut c_void) {
        match self.hooks.free().route() {
            Some(hook) => hook(ptr),
            None => self.heap.free(ptr),
        }
    }
}
