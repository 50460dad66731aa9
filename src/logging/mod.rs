//! Structured logging setup using the `tracing` crate.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log initialization options.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Log level used when `RUST_LOG` is not set (default: INFO)
    pub level: Level,

    /// Whether to include file and line information (default: false)
    pub include_file_line: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        LogOptions {
            level: Level::INFO,
            include_file_line: false,
        }
    }
}

/// Initialize the global subscriber with the given options.
///
/// `RUST_LOG` takes precedence over the configured level. Re-initialization
/// in the same process is ignored, so tests can call this freely.
pub fn init_logging(options: LogOptions) {
    let filter = EnvFilter::from_default_env().add_directive(options.level.into());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(options.include_file_line)
        .with_line_number(options.include_file_line)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Initialize logging with default options.
pub fn init_default_logging() {
    init_logging(LogOptions::default());
}
