//! # Observability
//!
//! Structured logging for the HR portal workspace.
//!
//! Crates in this workspace only emit `tracing` events. The binary that hosts
//! them calls [`init`] or [`init_with_config`] once at startup and decides
//! where events go:
//!
//! - JSONL lines appended to a log file (`~/.hr-portal/logs/portal.jsonl` by
//!   default), one object per event
//! - an optional compact human-readable stream on stderr
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "hr-portal".into(),
//!         default_level: "debug".into(),
//!         also_stderr: true,
//!         ..Default::default()
//!     });
//!     tracing::info!("ready");
//! }
//! ```

mod json_layer;
mod sink;

use std::io;
use std::path::PathBuf;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use json_layer::{JsonLayer, LogEntry};
pub use sink::{JsonlFileWriter, WriterFactory};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, written into every log line.
    pub service_name: String,

    /// Default filter when `RUST_LOG` is not set (e.g. "debug", "info").
    pub default_level: String,

    /// JSONL file destination. Defaults to `~/.hr-portal/logs/portal.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit compact logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Default JSONL log location, if a home directory can be resolved.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".hr-portal").join("logs").join("portal.jsonl"))
}

/// Initialize logging with default settings for the named service.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with custom configuration.
///
/// Installing a global subscriber twice is not an error: the second call is
/// ignored, which keeps tests and embedded hosts from tripping over each other.
/// When the log file cannot be opened, file output is skipped and stderr is
/// used instead.
pub fn init_with_config(config: LogConfig) {
    let file_writer = config
        .log_path
        .clone()
        .or_else(default_log_path)
        .and_then(|path| match JsonlFileWriter::new(&path) {
            Ok(writer) => Some((path, writer)),
            Err(err) => {
                eprintln!("observability: cannot open {}: {}", path.display(), err);
                None
            }
        });

    let stderr_wanted = config.also_stderr || file_writer.is_none();
    let log_path = file_writer.as_ref().map(|(path, _)| path.clone());

    let json_layer = file_writer.map(|(_, writer)| {
        JsonLayer::new(config.service_name.clone(), WriterFactory::new(writer))
            .with_filter(env_filter(&config.default_level))
    });

    let stderr_layer = stderr_wanted.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .compact()
            .with_writer(io::stderr)
            .with_filter(env_filter(&config.default_level))
    });

    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(
            service = %config.service_name,
            log_path = ?log_path,
            "observability initialized"
        );
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

pub use tracing::{debug, error, info, instrument, trace, warn, Level};
