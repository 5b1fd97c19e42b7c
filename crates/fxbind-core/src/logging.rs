//! Structured logging helpers.
//!
//! With the `tracing` feature the standard `tracing` macros are re-exported
//! so downstream crates can log through `fxbind_core::{debug, warn, ..}`.
//! With `tracing-json` a JSON subscriber filtered by `RUST_LOG` can be
//! installed for production logging.

#[cfg(feature = "tracing")]
pub use tracing::{debug, error, info, trace, warn};

/// Install a global JSON subscriber honoring `RUST_LOG`.
///
/// Returns `false` when a global subscriber was already installed.
#[cfg(feature = "tracing-json")]
pub fn init_json_logging() -> bool {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .is_ok()
}
