use std::fmt;
use std::sync::Arc;

use iohook_base::FileHandle;

/// Decides which paths bypass mode translation and the override seam.
///
/// Virtual paths (URLs in the library's case) are opened by the host's own
/// resolver and the handle it returns is passed back to the caller untouched.
pub trait VirtualResolver: fmt::Debug + Send + Sync + 'static {
    fn is_virtual(&self, path: &str) -> bool;

    /// Opens a path for which `is_virtual` returned true.
    fn open_virtual(&self, path: &str) -> Option<FileHandle>;
}

/// Resolver for hosts without virtual paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVirtualPaths;

impl VirtualResolver for NoVirtualPaths {
    fn is_virtual(&self, _path: &str) -> bool {
        false
    }

    fn open_virtual(&self, _path: &str) -> Option<FileHandle> {
        None
    }
}

/// Host callable opening a virtual path.
pub type VirtualOpener = dyn Fn(&str) -> Option<FileHandle> + Send + Sync;

/// Treats paths starting with one of `prefixes` as virtual.
pub struct PrefixResolver {
    prefixes: Vec<String>,
    opener: Arc<VirtualOpener>,
}

/// Prefixes the library recognizes as URLs.
pub const DEFAULT_VIRTUAL_PREFIXES: [&str; 2] = ["http:", "file:"];

impl PrefixResolver {
    pub fn new<F>(prefixes: Vec<String>, opener: F) -> Self
    where
        F: Fn(&str) -> Option<FileHandle> + Send + Sync + 'static,
    {
        Self {
            prefixes,
            opener: Arc::new(opener),
        }
    }

    /// A resolver with the library's URL prefixes.
    pub fn with_default_prefixes<F>(opener: F) -> Self
    where
        F: Fn(&str) -> Option<FileHandle> + Send + Sync + 'static,
    {
        Self::new(
            DEFAULT_VIRTUAL_PREFIXES.iter().map(|prefix| prefix.to_string()).collect(),
            opener,
        )
    }

    /// Builds a resolver from an already shared opener.
    pub fn from_arc(prefixes: Vec<String>, opener: Arc<VirtualOpener>) -> Self {
        Self { prefixes, opener }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

impl fmt::Debug for PrefixResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefixResolver")
            .field("prefixes", &self.prefixes)
            .finish_non_exhaustive()
    }
}

impl VirtualResolver for PrefixResolver {
    fn is_virtual(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    fn open_virtual(&self, path: &str) -> Option<FileHandle> {
        (self.opener)(path)
    }
}
