//! Logging initialization.
//!
//! Binaries call [`init_logging`] once; library crates only emit `tracing`
//! events.

use crate::Paths;
use observability::LogConfig;

/// Initialize logging for the portal CLI.
///
/// JSONL goes to `<base_dir>/logs/portal.jsonl`; `RUST_LOG` takes precedence
/// over `level`.
pub fn init_logging(paths: &Paths, level: &str) {
    observability::init_with_config(LogConfig {
        service_name: "hr-portal".into(),
        default_level: parse_level(level).as_str().to_ascii_lowercase(),
        log_path: Some(paths.log_file()),
        also_stderr: false,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
