/* 📖 # What is iohook_engine?

The dispatch seam between the embedded library and its host. The library
calls a facade (`IoFacade`, `AllocFacade`) for every file and heap primitive;
the facade checks the primitive's slot and either forwards to the host's
override or falls through to the platform default from iohook_base.

Modules, bottom up:

- `registry`: slots, bindings and the macro generating closed slot sets
- `mode`, `origin`: open intent and seek origin translation
- `format`: the printf engine behind formatted writes
- `resolver`: paths that bypass the seam entirely
- `io`, `alloc`: the facades
- `config`, `context`: wiring it all up for a host
*/

pub mod alloc;
pub mod config;
pub mod context;
pub mod format;
pub mod io;
pub mod mode;
pub mod origin;
pub mod registry;
pub mod resolver;


pub use alloc::{AllocFacade, AllocHooks};
pub use config::{DefaultIo, HookConfig, load_config};
pub use context::HookContext;
pub use format::{FormatArg, format_to_buffer, format_to_vec};
pub use io::{IoFacade, IoHooks};
pub use mode::{OpenFlags, OpenMode};
pub use origin::SeekOrigin;
pub use registry::{Binding, Slot};
pub use resolver::{NoVirtualPaths, PrefixResolver, VirtualOpener, VirtualResolver};
