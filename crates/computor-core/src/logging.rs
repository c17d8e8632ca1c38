//! Tracing initialization shared by the server, CLI, and worker
//! binaries, so every entry point gets the same span/field shape.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs a JSON-formatted subscriber honoring `RUST_LOG`, defaulting
/// to `info` when unset.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json())
        .try_init();
}
