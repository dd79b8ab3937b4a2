use std::path::Path;

use serde::Deserialize;

use iohook_base::{ErrorKind, HookError, HookResult};

use crate::resolver::DEFAULT_VIRTUAL_PREFIXES;

/// Which platform default file backend a context falls through to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultIo {
    /// C stdio on the real file system.
    #[default]
    Stdio,
    /// In-memory files, nothing touches the disk.
    Memory,
}

/// Configuration for a hook context.
///
/// ```toml
/// default_io = "memory"
/// virtual_prefixes = ["http:", "pak:"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookConfig {
    #[serde(default)]
    pub default_io: DefaultIo,
    /// Path prefixes handed to the virtual path resolver.
    #[serde(default = "default_virtual_prefixes")]
    pub virtual_prefixes: Vec<String>,
}

fn default_virtual_prefixes() -> Vec<String> {
    DEFAULT_VIRTUAL_PREFIXES.iter().map(|prefix| prefix.to_string()).collect()
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            default_io: DefaultIo::default(),
            virtual_prefixes: default_virtual_prefixes(),
        }
    }
}

impl HookConfig {
    pub fn from_toml_str(content: &str) -> HookResult<Self> {
        toml::from_str(content).map_err(|e| {
            Box::new(HookError::message(format!("Failed to parse hook configuration: {}", e)))
        })
    }
}

/// Load the hook configuration from a TOML file.
pub fn load_config(path: &Path) -> HookResult<HookConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        Box::new(HookError::new(ErrorKind::FileError {
            path: path.to_path_buf(),
            source,
        }))
    })?;
    HookConfig::from_toml_str(&content).map_err(|e| {
        Box::new(
            HookError::message(format!("Failed to load config '{}'", path.display()))
                .caused_by(e),
        )
    })
}
