use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_LEVEL_ENV: &str = "TODO_DECK_LOG_LEVEL";

const LOG_FILE_PREFIX: &str = "todo-deck-";

/// Keeps the background writer alive; dropping it flushes pending lines.
pub struct LogHandle {
    path: PathBuf,
    _guard: WorkerGuard,
}

impl LogHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn init_logging() -> anyhow::Result<LogHandle> {
    let log_dir = get_log_directory()?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory '{}'", log_dir.display()))?;

    let log_file_path = get_log_file_path(&log_dir);
    let file = fs::File::create(&log_file_path)
        .with_context(|| format!("failed to create log file '{}'", log_file_path.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(build_log_filter(std::env::var(LOG_LEVEL_ENV).ok().as_deref()))
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    tracing::info!("Logging initialized. Log file: {}", log_file_path.display());

    Ok(LogHandle {
        path: log_file_path,
        _guard: guard,
    })
}

fn build_log_filter(raw_level: Option<&str>) -> EnvFilter {
    let level = raw_level.and_then(normalize_log_level).unwrap_or("warn");
    EnvFilter::new(format!("{level},todo_deck={level}"))
}

fn normalize_log_level(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

pub fn get_log_directory() -> anyhow::Result<PathBuf> {
    let data_dir =
        dirs::data_local_dir().ok_or_else(|| anyhow!("failed to determine local data directory"))?;
    Ok(data_dir.join("todo-deck").join("logs"))
}

pub fn get_log_file_path(log_dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    log_dir.join(format!("{LOG_FILE_PREFIX}{timestamp}.log"))
}

pub fn print_log_location(log_path: &Path) {
    eprintln!("log file: {}", log_path.display());
}
