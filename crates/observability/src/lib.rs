//! # Observability
//!
//! Logging setup shared by every Nutri client component.
//!
//! Components call [`init_with_config`] once at startup and use the plain
//! `tracing` macros everywhere else. Events are written as JSONL to
//! `~/.nutri/logs/client.jsonl` (one object per line) and, optionally, to
//! stderr in a compact human-readable form.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "cli".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! tracing::info!("ready");
//! ```

mod file_writer;
mod json_layer;

use std::path::PathBuf;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use file_writer::{default_log_path, CentralLogWriter, WriterFactory};
pub use json_layer::{JsonLayer, LogEntry};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the component (e.g. "cli"), written into every log line.
    pub service_name: String,

    /// Default filter directive, overridden by `RUST_LOG` when set.
    pub default_level: String,

    /// Custom JSONL file path. Defaults to `~/.nutri/logs/client.jsonl`.
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

/// Initialize logging with default settings for the given component.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with custom configuration.
///
/// If the log file cannot be opened the JSONL layer is skipped and only the
/// stderr layer (when enabled) is installed. Calling this twice is a no-op.
pub fn init_with_config(config: LogConfig) {
    let log_path = config.log_path.clone().or_else(default_log_path);

    let json_layer = log_path.as_ref().and_then(|path| {
        match CentralLogWriter::new(path) {
            Ok(writer) => Some(JsonLayer::new(
                config.service_name.clone(),
                WriterFactory::new(writer),
            )),
            Err(e) => {
                eprintln!("failed to open log file {}: {}", path.display(), e);
                None
            }
        }
    });

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(env_filter(&config.default_level))
    });

    let installed = tracing_subscriber::registry()
        .with(json_layer.map(|l| l.with_filter(env_filter(&config.default_level))))
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
