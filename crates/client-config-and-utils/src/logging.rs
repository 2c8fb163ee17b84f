//! Logging initialization for the client.
//!
//! Thin wrapper over the observability crate: JSONL to the central log file
//! plus stderr output for interactive use.

use crate::Paths;

/// Initialize logging for the client process.
///
/// `RUST_LOG`, when set, takes precedence over `level`. Unknown levels fall
/// back to `info`.
pub fn init_logging(level: &str, paths: &Paths) {
    observability::init_with_config(observability::LogConfig {
        service_name: "nutri-cli".into(),
        default_level: parse_level(level).to_string().to_lowercase(),
        log_path: Some(paths.log_file()),
        also_stderr: true,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
