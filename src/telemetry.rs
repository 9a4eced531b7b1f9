//! Logging setup.
//!
//! `--enable-debug` forces the `debug` level. Otherwise `RUST_LOG` selects the
//! filter when set, falling back to `info`.

use tracing_subscriber::EnvFilter;

fn default_filter(enable_debug: bool) -> EnvFilter {
    if enable_debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    }
}

/// Install the global tracing subscriber.
///
/// `--enable-debug` takes precedence over `RUST_LOG`.
pub fn init(enable_debug: bool) {
    let filter = if enable_debug {
        default_filter(true)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(false))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
