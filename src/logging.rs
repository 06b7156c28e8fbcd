//! Tracing setup for scan runs: human-readable console output plus a
//! daily-rotated JSON file under the directory named by `SCANNER_LOG_DIR`.

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config;

const LOG_FILE_PREFIX: &str = "options-scanner.log";

fn scan_filter() -> EnvFilter {
    // RUST_LOG wins; scans default to info
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn file_appender(dir: &str) -> std::io::Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)?;
    Ok(RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX))
}

/// Install the global subscriber for the scanner process. When the log
/// directory cannot be created the file layer is dropped and logging stays
/// console-only; calling this more than once keeps the first subscriber.
pub fn init_logging() {
    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_ansi(true);

    match file_appender(&config::get_log_dir()) {
        Ok(appender) => {
            let file = tracing_subscriber::fmt::layer()
                .with_writer(appender)
                .with_target(true)
                .with_ansi(false)
                .json();
            let _ = tracing_subscriber::registry()
                .with(console)
                .with(file)
                .with(scan_filter())
                .try_init();
        }
        Err(err) => {
            eprintln!("log directory unavailable ({}), logging to console only", err);
            let _ = tracing_subscriber::registry()
                .with(console)
                .with(scan_filter())
                .try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_appender_creates_log_dir() {
        let dir = std::env::temp_dir().join("options-scanner-log-dir");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.to_string_lossy().to_string();
        assert!(file_appender(&path).is_ok());
        assert!(dir.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_repeated_init_keeps_first_subscriber() {
        init_logging();
        init_logging();
        tracing::info!("scanner logging ready");
    }
}
