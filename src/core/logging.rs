//! Logger setup for binaries built on the engine

use env_logger::{Builder, Env};

/// Installs `env_logger` with an `info` default, overridable through `RUST_LOG`.
///
/// Calling it more than once is harmless; later calls are ignored.
pub fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
