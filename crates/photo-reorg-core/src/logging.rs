use log::{error, info, LevelFilter};
use std::path::{Path, PathBuf};

// For file-based logging with rotation
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

/// Environment variable overriding the file logger's level
pub const LOG_ENV: &str = "PHOTO_REORG_LOG";

/// Platform data directory for log files, e.g. `~/.local/share/photo-reorg/logs`
pub fn default_log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "photo-reorg")
        .map(|dirs| dirs.data_local_dir().join("logs"))
}

/// Initialize the logger with timestamp, log level, and module path
/// Logs are written to a rolling file in `log_dir`
pub fn init_file_logger(
    log_dir: &Path,
    level: LevelFilter,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(log_dir)?;

    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|value| value.parse::<LevelFilter>().ok())
        .unwrap_or(level);

    let log_file_path = log_dir.join("photo-reorg.log");
    let archived_logs_pattern = format!("{}/photo-reorg.{{}}.log", log_dir.display());

    // Rotate at 10MB, keep 5 archived log files
    let file_trigger = SizeTrigger::new(10 * 1024 * 1024);
    let file_roller = FixedWindowRoller::builder()
        .build(&archived_logs_pattern, 5)
        .map_err(|e| format!("Failed to create log roller: {}", e))?;
    let compound_policy = CompoundPolicy::new(Box::new(file_trigger), Box::new(file_roller));

    let rolling_file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] [{M}:{L}] - {m}{n}",
        )))
        .build(&log_file_path, Box::new(compound_policy))
        .map_err(|e| format!("Failed to create log appender: {}", e))?;

    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(rolling_file)))
        .build(Root::builder().appender("file").build(level))
        .map_err(|e| format!("Failed to build log config: {}", e))?;

    log4rs::init_config(config).map_err(|e| format!("Failed to initialize log4rs: {}", e))?;

    info!("Logging to file: {}", log_file_path.display());
    Ok(log_file_path)
}

/// Log file operation that failed
pub fn log_file_error(path: &Path, operation: &str, error: &dyn std::error::Error) {
    error!(
        "File operation failed - Operation: {}, Path: {}, Error: {}",
        operation,
        path.display(),
        error
    );
}

/// Log file system modification
pub fn log_fs_modification(operation: &str, path: &Path, target: Option<&Path>) {
    match target {
        Some(target) => info!("{}: {} -> {}", operation, path.display(), target.display()),
        None => info!("{}: {}", operation, path.display()),
    }
}
