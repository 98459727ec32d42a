//! Tracing and logging setup shared by every binary.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::{LOG_FORMAT_ENV, LogFormat, UnknownLogFormat};

/// Initialize process-wide tracing with the format from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env(), "info");
}

/// Initialize process-wide tracing with an explicit output format and the
/// filter used when `RUST_LOG` is unset (e.g. `"debug"`).
pub fn init_with(format: LogFormat, default_filter: &str) {
    tracing::init(format, default_filter);
}
