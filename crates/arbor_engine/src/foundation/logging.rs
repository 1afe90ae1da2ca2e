//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// Call once at startup, before any engine objects are created. Log output is
/// controlled through the `RUST_LOG` environment variable.
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system, tolerating repeat calls
///
/// Useful in tests, where several cases may race to install the logger.
pub fn try_init() {
    let _ = env_logger::builder().is_test(true).try_init();
}
