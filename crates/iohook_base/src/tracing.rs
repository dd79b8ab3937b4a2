use crate::error::{HookError, HookResult};
pub use tracing::instrument;
pub use tracing::{debug, error, info, trace, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber: fmt output filtered by `RUST_LOG`
/// (default `info`) plus the ErrorLayer that feeds `HookError` span traces.
///
/// Dispatch decisions are logged at `trace` level under the `iohook_engine`
/// target, e.g. `RUST_LOG=iohook_engine=trace`.
pub fn init_tracing() -> HookResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| {
            Box::new(HookError::message(format!(
                "Failed to install tracing subscriber: {}",
                e
            )))
        })
}
