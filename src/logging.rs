//! Process-wide `tracing` subscriber.

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Install a fmt subscriber on stderr.
///
/// `RUST_LOG` takes precedence over `level`. Safe to call more than once;
/// only the first call installs anything, and an already-installed global
/// subscriber is left alone.
pub fn init(level: &str) {
    INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG")
            .ok()
            .and_then(|expr| EnvFilter::try_new(expr).ok())
            .or_else(|| EnvFilter::try_new(level).ok())
            .unwrap_or_else(|| EnvFilter::new("info"));

        let result = fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_names(true)
            .try_init();

        if result.is_err() {
            tracing::debug!("global tracing subscriber already set");
        }
    });
}
