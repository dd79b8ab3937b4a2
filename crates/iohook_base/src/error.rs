use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use tracing_error::{SpanTrace, SpanTraceStatus};

/* 📖 # Where do errors come from in a dispatch seam?

The facades pass backend failures through untouched: a null handle, a short
count or a `-1` from tell/close is the backend's own answer. `HookError` only
covers what the seam itself decides: rejecting an open-intent bitset that
maps to no mode string, rejecting an unknown raw seek origin, and ambient
concerns such as loading configuration or installing the tracing subscriber.
*/

/// Error variants that can occur in iohook operations.
/// Each variant represents a specific error category with its associated context.
#[derive(Debug)]
pub enum ErrorKind {
    /// File system operation failed
    FileError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Open-intent bitset matched none of the recognized read/write/append combinations
    InvalidOpenMode { bits: u32 },

    /// Raw seek origin value outside absolute/relative/end-relative
    InvalidSeekOrigin { raw: i32 },

    /// Catch-all for other errors with a message
    Message { message: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::InvalidOpenMode { bits } => {
                write!(
                    f,
                    "Invalid open mode {:#x}: expected a combination of read, write and append",
                    bits
                )
            }
            ErrorKind::InvalidSeekOrigin { raw } => {
                write!(f, "Invalid seek origin {}", raw)
            }
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }
}

/// Error wrapping an [`ErrorKind`] with a context chain, an optional cause
/// and the span trace active when it was created.
pub struct HookError {
    kind: ErrorKind,
    context: Vec<String>,
    cause: Option<Box<HookError>>,
    span_trace: SpanTrace,
}

impl HookError {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            cause: None,
            span_trace: SpanTrace::capture(),
        }
    }

    /// Shorthand for an [`ErrorKind::Message`] error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Attaches context to an error.
    /// Context is displayed before the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Records the error that led to this one.
    pub fn caused_by(mut self, cause: impl Into<Box<HookError>>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Context strings in the order they were attached.
    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    /// The error this one was caused by, if any.
    pub fn cause(&self) -> Option<&HookError> {
        self.cause.as_deref()
    }

    /// Span trace captured when the error was created.
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// Returns the innermost error in the chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        let item_count = self.context.len() + usize::from(self.cause.is_some());
        for (index, ctx) in self.context.iter().enumerate() {
            let branch = if index + 1 == item_count { "└─" } else { "├─" };
            writeln!(f, "{}{} {}", indent, branch, ctx)?;
        }
        if let Some(cause) = &self.cause {
            writeln!(f, "{}└─ cause: {}", indent, cause.kind)?;
            cause.fmt_tree(f, &format!("{}   ", indent))?;
        }
        Ok(())
    }
}

impl From<ErrorKind> for HookError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<ErrorKind> for Box<HookError> {
    fn from(kind: ErrorKind) -> Self {
        Box::new(HookError::new(kind))
    }
}

impl StdError for HookError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source),
            _ => self.cause.as_deref().map(|cause| cause as &(dyn StdError + 'static)),
        }
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ctx in &self.context {
            write!(f, "{}: ", ctx)?;
        }
        write!(f, "{}", self.kind)
    }
}

/* 📖 # What does the Debug output look like?

Debug renders the error as a tree: the message, then each context line, then
the cause chain indented below it, and finally the span trace when one was
captured:

```text
open failed
├─ loading voice data
└─ cause: Invalid open mode 0x0: expected a combination of read, write and append
Trace:    0: iohook_engine::io::open
```
*/

impl fmt::Debug for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.kind)?;
        self.fmt_tree(f, "")?;
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            writeln!(f, "Trace: {}", self.span_trace)?;
        }
        Ok(())
    }
}

/// Standard result type for iohook operations.
pub type HookResult<T> = std::result::Result<T, Box<HookError>>;

/// Extension trait for attaching context to Results.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    fn context(self, context: impl Into<String>) -> HookResult<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    fn with_context<F>(self, f: F) -> HookResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for HookResult<T> {
    fn context(self, context: impl Into<String>) -> HookResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> HookResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}
