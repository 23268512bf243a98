//! Logging system initialization
//!
//! This module sets up the tracing subscriber from the `[logging]` section
//! of the loaded configuration.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;

use crate::config::{LoggingConfig, StaticConfig};

/// 默认日志文件名（配置的路径没有文件名时使用）
const DEFAULT_LOG_FILE: &str = "geotrail.log";

/// 日志输出目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    /// 追加写入单个文件
    File(String),
    /// 按天轮转
    Rolling { dir: String, prefix: String },
}

impl LogTarget {
    pub fn from_config(logging: &LoggingConfig) -> Self {
        match logging.file.as_deref() {
            Some(file) if !file.is_empty() && logging.enable_rotation => {
                let path = Path::new(file);
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or(Path::new("."));
                let filename = path
                    .file_name()
                    .and_then(|f| f.to_str())
                    .unwrap_or(DEFAULT_LOG_FILE);
                LogTarget::Rolling {
                    dir: dir.to_string_lossy().into_owned(),
                    prefix: filename.trim_end_matches(".log").to_string(),
                }
            }
            Some(file) if !file.is_empty() => LogTarget::File(file.to_string()),
            _ => LogTarget::Stdout,
        }
    }
}

/// Initialize logging system based on configuration
///
/// Must be called once, after the configuration has been loaded.
///
/// # Returns
/// * `WorkerGuard` - Must be kept alive for the duration of the program
///   to ensure non-blocking log writes are flushed
///
/// # Panics
/// * If creating the log appender fails
/// * If setting the global subscriber fails (e.g., already initialized)
pub fn init_logging(config: &StaticConfig) -> WorkerGuard {
    let target = LogTarget::from_config(&config.logging);

    let writer: Box<dyn std::io::Write + Send + Sync> = match &target {
        LogTarget::Rolling { dir, prefix } => {
            let appender = rolling::Builder::new()
                .rotation(rolling::Rotation::DAILY)
                .filename_prefix(prefix)
                .filename_suffix("log")
                .max_log_files(config.logging.max_backups.max(1) as usize)
                .build(dir)
                .expect("Failed to create rolling log appender");
            Box::new(appender)
        }
        LogTarget::File(file) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .expect("Failed to open log file");
            Box::new(file)
        }
        LogTarget::Stdout => Box::new(std::io::stdout()),
    };

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(writer);
    let filter = tracing_subscriber::EnvFilter::new(config.logging.level.clone());

    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(non_blocking_writer)
        .with_env_filter(filter)
        .with_level(true)
        .with_ansi(target == LogTarget::Stdout);

    if config.logging.format == "json" {
        subscriber_builder.json().init();
    } else {
        subscriber_builder.init();
    }

    guard
}
