/* 📖 # What does the I/O facade translate?

Most file primitives forward their arguments verbatim to the override or to
the default backend. Three of them do more:

- `open` turns the library's `OpenFlags` into a binary stdio mode string, or
  hands virtual paths to the resolver without touching the seam at all
- `seek` turns a `SeekOrigin` into the platform `Whence` and reports the
  resulting absolute position through `tell`
- `file_size` probes with tell/seek-to-end/tell and restores the position

`file_size` reads the tell and seek bindings once. It uses the override pair
only when both are bound, because mixing a host seek with a platform tell on
the same handle would measure two different files. No other call may use the
same handle while `file_size` runs.

`formatted_write` without an override renders the text itself and writes it
through the default backend. `format_to_buffer` never consults the registry.
*/

use std::sync::Arc;

use iohook_base::{FileBackendHandle, FileHandle, HookResult, ResultExt, Whence};
use tracing::{debug, instrument, trace};

use crate::format::{self, FormatArg};
use crate::mode::{OpenFlags, OpenMode};
use crate::origin::SeekOrigin;
use crate::registry::{Binding, override_slots};
use crate::resolver::VirtualResolver;

override_slots! {
    /// Override slots for the file primitives.
    pub struct IoHooks {
        /// Receives the path and the translated mode string.
        open, set_open, clear_open: OpenHook = fn(&str, &str) -> Option<FileHandle>;
        write, set_write, clear_write: WriteHook = fn(FileHandle, &[u8], usize, usize) -> usize;
        read, set_read, clear_read: ReadHook = fn(FileHandle, &mut [u8], usize, usize) -> usize;
        read_byte, set_read_byte, clear_read_byte: ReadByteHook = fn(FileHandle) -> Option<u8>;
        tell, set_tell, clear_tell: TellHook = fn(FileHandle) -> i64;
        /// Receives the translated platform origin; returns 0 on success.
        seek, set_seek, clear_seek: SeekHook = fn(FileHandle, i64, Whence) -> i32;
        /// Receives the format string and its arguments unrendered.
        formatted_write, set_formatted_write, clear_formatted_write:
            FormattedWriteHook = fn(FileHandle, &str, &[FormatArg<'_>]) -> i32;
        close, set_close, clear_close: CloseHook = fn(FileHandle) -> i32;
    }
}

impl IoHooks {
    /// Routes every primitive to `backend`. Formatted output is rendered
    /// here and written through `backend`.
    pub fn install_backend(&self, backend: FileBackendHandle) {
        let open = backend.clone();
        self.set_open(move |path, mode| open.open(path, mode));
        let write = backend.clone();
        self.set_write(move |handle, buf, size, count| write.write(handle, buf, size, count));
        let read = backend.clone();
        self.set_read(move |handle, buf, size, count| read.read(handle, buf, size, count));
        let read_byte = backend.clone();
        self.set_read_byte(move |handle| read_byte.read_byte(handle));
        let tell = backend.clone();
        self.set_tell(move |handle| tell.tell(handle));
        let seek = backend.clone();
        self.set_seek(move |handle, offset, whence| seek.seek(handle, offset, whence));
        let formatted_write = backend.clone();
        self.set_formatted_write(move |handle, format, args: &[FormatArg<'_>]| {
            write_rendered(&formatted_write, handle, format, args)
        });
        self.set_close(move |handle| backend.close(handle));
    }
}

/// File entry points used by the library.
#[derive(Debug, Clone)]
pub struct IoFacade {
    hooks: Arc<IoHooks>,
    files: FileBackendHandle,
    resolver: Arc<dyn VirtualResolver>,
}

impl IoFacade {
    pub fn new(
        hooks: Arc<IoHooks>,
        files: FileBackendHandle,
        resolver: Arc<dyn VirtualResolver>,
    ) -> Self {
        Self {
            hooks,
            files,
            resolver,
        }
    }

    pub fn hooks(&self) -> &IoHooks {
        &self.hooks
    }

    /// Opens `path` with the intent in `flags`.
    ///
    /// `Ok(None)` means the backend could not open the file. Flags that
    /// name no read, write or append intent are rejected.
    #[instrument(skip(self), level = "debug")]
    pub fn open(&self, path: &str, flags: OpenFlags) -> HookResult<Option<FileHandle>> {
        if self.resolver.is_virtual(path) {
            debug!("delegating to virtual path resolver");
            return Ok(self.resolver.open_virtual(path));
        }
        let mode = OpenMode::from_flags(flags)
            .with_context(|| format!("Failed to open '{}'", path))?
            .as_str();
        let handle = match self.hooks.open().route() {
            Some(hook) => hook(path, mode),
            None => self.files.open(path, mode),
        };
        if handle.is_none() {
            debug!(mode, "open failed");
        }
        Ok(handle)
    }

    /// Writes up to `count` elements of `size` bytes; returns elements written.
    pub fn write(&self, handle: FileHandle, buf: &[u8], size: usize, count: usize) -> usize {
        match self.hooks.write().route() {
            Some(hook) => hook(handle, buf, size, count),
            None => self.files.write(handle, buf, size, count),
        }
    }

    /// Reads up to `count` elements of `size` bytes; returns elements read.
    pub fn read(&self, handle: FileHandle, buf: &mut [u8], size: usize, count: usize) -> usize {
        match self.hooks.read().route() {
            Some(hook) => hook(handle, buf, size, count),
            None => self.files.read(handle, buf, size, count),
        }
    }

    /// Next byte, or `None` at end of stream.
    pub fn read_byte(&self, handle: FileHandle) -> Option<u8> {
        match self.hooks.read_byte().route() {
            Some(hook) => hook(handle),
            None => self.files.read_byte(handle),
        }
    }

    pub fn tell(&self, handle: FileHandle) -> i64 {
        match self.hooks.tell().route() {
            Some(hook) => hook(handle),
            None => self.files.tell(handle),
        }
    }

    /// Moves the position and returns the new absolute position.
    ///
    /// A failed seek leaves the position unchanged, so the returned value is
    /// then the old position.
    pub fn seek(&self, handle: FileHandle, offset: i64, origin: SeekOrigin) -> i64 {
        let whence = origin.to_whence();
        let status = match self.hooks.seek().route() {
            Some(hook) => hook(handle, offset, whence),
            None => self.files.seek(handle, offset, whence),
        };
        if status != 0 {
            debug!(?handle, offset, ?whence, status, "seek failed");
        }
        self.tell(handle)
    }

    /// Renders `format` with `args` and writes it to `handle`.
    ///
    /// Returns the number of bytes written, or `-1` if the default backend
    /// wrote fewer bytes than were rendered or the count does not fit `i32`.
    pub fn formatted_write(
        &self,
        handle: FileHandle,
        format: &str,
        args: &[FormatArg<'_>],
    ) -> i32 {
        match self.hooks.formatted_write().route() {
            Some(hook) => hook(handle, format, args),
            None => write_rendered(&self.files, handle, format, args),
        }
    }

    /// Closes `handle`; `0` on success.
    pub fn close(&self, handle: FileHandle) -> i32 {
        match self.hooks.close().route() {
            Some(hook) => hook(handle),
            None => self.files.close(handle),
        }
    }

    /// Total length of the file behind `handle`, leaving its position as
    /// it was.
    ///
    /// The caller must not use `handle` from another thread meanwhile.
    pub fn file_size(&self, handle: FileHandle) -> i64 {
        match (self.hooks.tell().current(), self.hooks.seek().current()) {
            (Binding::Overridden(tell), Binding::Overridden(seek)) => {
                trace!(slot = "file_size", route = "override", "dispatch");
                probe_size(|| tell(handle), |offset, whence| seek(handle, offset, whence))
            }
            _ => {
                trace!(slot = "file_size", route = "default", "dispatch");
                probe_size(
                    || self.files.tell(handle),
                    |offset, whence| self.files.seek(handle, offset, whence),
                )
            }
        }
    }

    /// Renders into `buffer` with `snprintf` semantics, see
    /// [`format::format_to_buffer`].
    pub fn format_to_buffer(
        &self,
        buffer: &mut [u8],
        format: &str,
        args: &[FormatArg<'_>],
    ) -> usize {
        format::format_to_buffer(buffer, format, args)
    }
}

fn write_rendered(
    files: &FileBackendHandle,
    handle: FileHandle,
    format: &str,
    args: &[FormatArg<'_>],
) -> i32 {
    let rendered = format::format_to_vec(format, args);
    let written = files.write(handle, &rendered, 1, rendered.len());
    let status = formatted_status(rendered.len(), written);
    if status < 0 {
        debug!(?handle, written, expected = rendered.len(), "formatted write failed");
    }
    status
}

/// `fprintf` result for `rendered` bytes of which `written` reached the
/// file: the count, or `-1` when short or not representable.
fn formatted_status(rendered: usize, written: usize) -> i32 {
    if written != rendered {
        return -1;
    }
    i32::try_from(written).unwrap_or(-1)
}

fn probe_size(tell: impl Fn() -> i64, seek: impl Fn(i64, Whence) -> i32) -> i64 {
    let original = tell();
    seek(0, Whence::End);
    let size = tell();
    seek(original, Whence::Start);
    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{NoVirtualPaths, PrefixResolver};
    use iohook_base::ErrorKind;
    use iohook_base::pal::MemoryBackend;

    fn facade_over(default: MemoryBackend) -> IoFacade {
        IoFacade::new(
            Arc::new(IoHooks::new()),
            FileBackendHandle::new(default),
            Arc::new(NoVirtualPaths),
        )
    }

    #[test]
    fn test_open_rejects_flags_without_intent() {
        let facade = facade_over(MemoryBackend::new());
        let error = facade.open("voice.bin", OpenFlags::BINARY).unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::InvalidOpenMode { bits: 8 }));
        assert_eq!(
            error.to_string(),
            "Failed to open 'voice.bin': Invalid open mode 0x8: expected a combination of read, write and append"
        );
    }

    #[test]
    fn test_open_missing_file_is_none() {
        let facade = facade_over(MemoryBackend::new());
        assert_eq!(facade.open("missing.bin", OpenFlags::READ).unwrap(), None);
    }

    #[test]
    fn test_virtual_paths_bypass_translation_and_overrides() {
        let files = MemoryBackend::new();
        let facade = IoFacade::new(
            Arc::new(IoHooks::new()),
            FileBackendHandle::new(files.clone()),
            Arc::new(PrefixResolver::with_default_prefixes(|_| FileHandle::from_raw(0x99))),
        );
        facade.hooks().set_open(|_, _| None);

        let handle = facade.open("http://voices/kal", OpenFlags::empty()).unwrap();
        assert_eq!(handle, FileHandle::from_raw(0x99));
        assert!(files.opened_modes().is_empty());
    }

    #[test]
    fn test_seek_reports_position() {
        let files = MemoryBackend::new();
        files.add_file("data.bin", vec![0; 10]);
        let facade = facade_over(files);
        let handle = facade.open("data.bin", OpenFlags::READ).unwrap().unwrap();

        assert_eq!(facade.seek(handle, 4, SeekOrigin::Absolute), 4);
        assert_eq!(facade.seek(handle, 2, SeekOrigin::Relative), 6);
        assert_eq!(facade.seek(handle, -1, SeekOrigin::EndRelative), 9);
        assert_eq!(facade.seek(handle, -20, SeekOrigin::Relative), 9);
    }

    #[test]
    fn test_formatted_write_default_renders_and_writes() {
        let files = MemoryBackend::new();
        let facade = facade_over(files.clone());
        let handle = facade.open("log.txt", OpenFlags::WRITE).unwrap().unwrap();

        let written = facade.formatted_write(handle, "%s: %d\n", crate::fmt_args!["frames", 12]);
        assert_eq!(written, 11);
        assert_eq!(files.file_contents("log.txt").unwrap(), b"frames: 12\n");
    }

    #[test]
    fn test_formatted_write_short_write_is_error() {
        let files = MemoryBackend::new();
        files.add_file("readonly.txt", vec![]);
        let facade = facade_over(files);
        let handle = facade.open("readonly.txt", OpenFlags::READ).unwrap().unwrap();

        assert_eq!(facade.formatted_write(handle, "x", &[]), -1);
    }

    #[test]
    fn test_empty_formatted_write_succeeds() {
        let files = MemoryBackend::new();
        let facade = facade_over(files);
        let handle = facade.open("empty.txt", OpenFlags::WRITE).unwrap().unwrap();
        assert_eq!(facade.formatted_write(handle, "", &[]), 0);
    }

    #[test]
    fn test_formatted_status_follows_fprintf() {
        assert_eq!(formatted_status(11, 11), 11);
        assert_eq!(formatted_status(0, 0), 0);
        assert_eq!(formatted_status(5, 2), -1);
        let huge = i32::MAX as usize + 1;
        assert_eq!(formatted_status(huge, huge), -1);
        assert_eq!(formatted_status(i32::MAX as usize, i32::MAX as usize), i32::MAX);
    }

    #[test]
    fn test_installed_backend_serves_formatted_write() {
        let default = MemoryBackend::new();
        let host = MemoryBackend::new();
        let facade = facade_over(default.clone());
        facade.hooks().install_backend(FileBackendHandle::new(host.clone()));
        assert_eq!(facade.hooks().overridden_slots().len(), 8);

        let handle = facade.open("log.txt", OpenFlags::WRITE).unwrap().unwrap();
        assert_eq!(facade.formatted_write(handle, "%d\n", crate::fmt_args![42]), 3);
        assert_eq!(host.file_contents("log.txt").unwrap(), b"42\n");
        assert_eq!(default.file_contents("log.txt"), None);
    }

    #[test]
    fn test_file_size_with_only_tell_overridden_uses_default_pair() {
        let files = MemoryBackend::new();
        files.add_file("data.bin", vec![1; 12]);
        let facade = facade_over(files);
        let handle = facade.open("data.bin", OpenFlags::READ).unwrap().unwrap();
        facade.hooks().set_tell(|_| 1000);

        assert_eq!(facade.file_size(handle), 12);
    }
}
