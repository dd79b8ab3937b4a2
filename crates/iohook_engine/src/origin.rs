use iohook_base::{ErrorKind, HookResult, Whence};

/// Platform-independent seek reference used by the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeekOrigin {
    /// From the start of the file.
    Absolute,
    /// From the current position.
    Relative,
    /// From the end of the file.
    EndRelative,
}

impl SeekOrigin {
    /// Decodes the library's raw origin value (0, 1, 2).
    pub fn from_raw(raw: i32) -> HookResult<Self> {
        match raw {
            0 => Ok(SeekOrigin::Absolute),
            1 => Ok(SeekOrigin::Relative),
            2 => Ok(SeekOrigin::EndRelative),
            _ => Err(ErrorKind::InvalidSeekOrigin { raw }.into()),
        }
    }

    pub fn to_whence(self) -> Whence {
        match self {
            SeekOrigin::Absolute => Whence::Start,
            SeekOrigin::Relative => Whence::Current,
            SeekOrigin::EndRelative => Whence::End,
        }
    }
}

impl From<SeekOrigin> for Whence {
    fn from(origin: SeekOrigin) -> Self {
        origin.to_whence()
    }
}
