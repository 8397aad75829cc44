//! Logging setup for the chart client.

use chrono::Local;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::setting::Settings;
use super::utility::{ensure_folder, TEMP_DIR};

/// Log level constants
pub const DEBUG: i32 = 10;
pub const INFO: i32 = 20;
pub const WARNING: i32 = 30;
pub const ERROR: i32 = 40;
pub const CRITICAL: i32 = 50;

/// Convert integer log level to tracing Level
pub fn level_from_int(level: i32) -> Level {
    match level {
        i32::MIN..=10 => Level::DEBUG,
        11..=20 => Level::INFO,
        21..=30 => Level::WARN,
        _ => Level::ERROR,
    }
}

/// Convert integer log level to string
pub fn level_to_string(level: i32) -> &'static str {
    match level {
        i32::MIN..=10 => "DEBUG",
        11..=20 => "INFO",
        21..=30 => "WARNING",
        31..=40 => "ERROR",
        _ => "CRITICAL",
    }
}

/// Initialize the global subscriber from the `log.*` settings.
///
/// `RUST_LOG` directives are honoured on top of `log.level`.
pub fn init_logger(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = settings.get_int("log.level").unwrap_or(INFO as i64) as i32;
    let log_console = settings.get_bool("log.console").unwrap_or(true);
    let log_file = settings.get_bool("log.file").unwrap_or(false);

    let filter = EnvFilter::from_default_env().add_directive(level_from_int(log_level).into());

    let console_layer = log_console.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_ansi(true)
    });

    let file_layer = if log_file {
        let file = open_log_file(&get_log_file_path(&TEMP_DIR))?;
        Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;
    Ok(())
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Get the log file path for today under `base/log`
fn get_log_file_path(base: &Path) -> PathBuf {
    let log_folder = ensure_folder(base, "log");
    let today = Local::now().format("%Y%m%d").to_string();
    log_folder.join(format!("klinewatch_{}.log", today))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_int() {
        assert_eq!(level_from_int(DEBUG), Level::DEBUG);
        assert_eq!(level_from_int(INFO), Level::INFO);
        assert_eq!(level_from_int(WARNING), Level::WARN);
        assert_eq!(level_from_int(ERROR), Level::ERROR);
        assert_eq!(level_from_int(0), Level::DEBUG);
    }

    #[test]
    fn test_level_to_string() {
        assert_eq!(level_to_string(DEBUG), "DEBUG");
        assert_eq!(level_to_string(INFO), "INFO");
        assert_eq!(level_to_string(WARNING), "WARNING");
        assert_eq!(level_to_string(ERROR), "ERROR");
        assert_eq!(level_to_string(CRITICAL), "CRITICAL");
    }

    #[test]
    fn test_log_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = get_log_file_path(dir.path());
        assert!(path.parent().unwrap().ends_with("log"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("klinewatch_") && name.ends_with(".log"));
        assert!(open_log_file(&path).is_ok());
    }
}
