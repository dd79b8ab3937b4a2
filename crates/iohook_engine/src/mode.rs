use bitflags::bitflags;

use iohook_base::{ErrorKind, HookResult};

bitflags! {
    /// Abstract open intent passed by the library.
    ///
    /// The bit values are the library's own constants. `BINARY` is accepted
    /// for compatibility; every translated mode is binary anyway.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const WRITE = 1;
        const READ = 2;
        const APPEND = 4;
        const BINARY = 8;
    }
}

/// Concrete stdio mode an [`OpenFlags`] bitset translates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenMode {
    /// Read and write, truncating.
    UpdateTruncate,
    /// Read anywhere, writes go to the end.
    UpdateAppend,
    Write,
    Append,
    Read,
}

impl OpenMode {
    /// Translates intent flags by priority: read+write, read+append, write,
    /// append, read. The first matching combination wins, so extra bits such
    /// as `WRITE | APPEND` resolve to the higher-priority mode.
    pub fn from_flags(flags: OpenFlags) -> HookResult<Self> {
        let has = |wanted: OpenFlags| flags.contains(wanted);
        let mode = if has(OpenFlags::WRITE | OpenFlags::READ) {
            OpenMode::UpdateTruncate
        } else if has(OpenFlags::APPEND | OpenFlags::READ) {
            OpenMode::UpdateAppend
        } else if has(OpenFlags::WRITE) {
            OpenMode::Write
        } else if has(OpenFlags::APPEND) {
            OpenMode::Append
        } else if has(OpenFlags::READ) {
            OpenMode::Read
        } else {
            return Err(ErrorKind::InvalidOpenMode { bits: flags.bits() }.into());
        };
        Ok(mode)
    }

    /// The stdio mode string, always with the binary suffix.
    pub fn as_str(self) -> &'static str {
        match self {
            OpenMode::UpdateTruncate => "w+b",
            OpenMode::UpdateAppend => "a+b",
            OpenMode::Write => "wb",
            OpenMode::Append => "ab",
            OpenMode::Read => "rb",
        }
    }
}
