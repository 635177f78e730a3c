//! Tracing subscriber setup for the `tint` binary
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the host. This is the one the CLI uses.

use tracing_subscriber::EnvFilter;

/// Log level requested by `-v` flags, if any. It replaces the configured level.
pub fn verbosity_level(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

/// Install a stderr fmt subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("spritetint={level},tint={level}")));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
