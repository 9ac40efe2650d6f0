//! Tracing subscriber setup for embedding callers and tests.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Install a `fmt` subscriber once per process.
///
/// An explicit `filter` wins; otherwise `RUST_LOG` is honoured and `info` is
/// the fallback. Later calls are no-ops, as is a call made after another
/// global subscriber was installed.
pub fn init_tracing(filter: Option<&str>) {
    INIT.call_once(|| {
        let filter = match filter {
            Some(directives) => EnvFilter::new(directives),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        };
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .try_init();
    });
}
