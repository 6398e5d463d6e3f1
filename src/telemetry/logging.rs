//! Logging configuration and initialization
//!
//! Console output (compact or JSON) and optional file output through a
//! non-blocking writer.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Filter variable checked before `RUST_LOG`
pub const LOG_ENV: &str = "INSTALLATION_LOG";
/// Set to "json" for JSON console output
pub const LOG_FORMAT_ENV: &str = "INSTALLATION_LOG_FORMAT";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Enable console output (default: true)
    pub console_enabled: bool,
    /// Write logs to `file_path` as well
    pub file_enabled: bool,
    pub file_path: Option<PathBuf>,
    /// Use JSON format for console logs (default: false)
    pub json_format: bool,
    /// Filter used when no environment variable is set
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            file_enabled: false,
            file_path: None,
            json_format: false,
            default_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Console logging plus a file when `file_path` is given
    pub fn with_file(file_path: Option<PathBuf>) -> Self {
        Self {
            file_enabled: file_path.is_some(),
            file_path,
            ..Default::default()
        }
    }

    fn wants_json(&self) -> bool {
        std::env::var(LOG_FORMAT_ENV)
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(self.json_format)
    }
}

/// Initialize the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the program.
pub fn init_logging(
    config: &LogConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let use_json = config.wants_json();
    let subscriber = tracing_subscriber::registry().with(env_filter);
    let mut file_guard = None;

    let file_layer = if config.file_enabled {
        let log_path = config
            .file_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("installation.log"));
        let file = std::fs::File::create(&log_path)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        file_guard = Some(guard);
        eprintln!("Logging to file: {}", log_path.display());

        Some(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false),
        )
    } else {
        None
    };

    let (json_layer, console_layer) = match (config.console_enabled, use_json) {
        (true, true) => (
            Some(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            ),
            None,
        ),
        (true, false) => (
            None,
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .compact(),
            ),
        ),
        (false, _) => (None, None),
    };

    subscriber
        .with(file_layer)
        .with(json_layer)
        .with(console_layer)
        .try_init()?;

    tracing::info!(
        target: "immersive_installation",
        version = env!("CARGO_PKG_VERSION"),
        json_format = use_json,
        file_enabled = config.file_enabled,
        "Logging initialized"
    );

    Ok(file_guard)
}

// Re-export WorkerGuard so callers can store it
pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;
