use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, Metadata, Record};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::{Config, Credential};

static ROOMGEN_LOGGER: Lazy<RoomGenLogger> = Lazy::new(RoomGenLogger::new);

pub fn init() -> Result<(), String> {
    init_with_config(LoggerConfig::from_env())
}

pub fn init_with_config(config: LoggerConfig) -> Result<(), String> {
    let max_level = config.min_level.to_log_level_filter();
    ROOMGEN_LOGGER.update_config(config);

    log::set_logger(&*ROOMGEN_LOGGER).map_err(|e| format!("Failed to set logger: {:?}", e))?;
    log::set_max_level(max_level);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    pub fn color(&self) -> Color {
        match self {
            LogLevel::Trace => Color::Cyan,
            LogLevel::Debug => Color::Blue,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            LogLevel::Trace => "🔍",
            LogLevel::Debug => "🐛",
            LogLevel::Info => "💡",
            LogLevel::Warn => "⚠️",
            LogLevel::Error => "❌",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn to_log_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::Trace,
            LogLevel::Debug => Level::Debug,
            LogLevel::Info => Level::Info,
            LogLevel::Warn => Level::Warn,
            LogLevel::Error => Level::Error,
        }
    }

    pub fn to_log_level_filter(&self) -> log::LevelFilter {
        self.to_log_level().to_level_filter()
    }

    pub fn from_log_level(level: Level) -> Self {
        match level {
            Level::Trace => LogLevel::Trace,
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warn,
            Level::Error => LogLevel::Error,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("Unknown log level: {}", other)),
        }
    }
}

/// One rendered log line, also the JSON shape written in production mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub module: String,
    pub file: String,
    pub line: u32,
    pub thread_id: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: String, module: String, file: String, line: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level,
            message,
            module,
            file,
            line,
            thread_id: format!("{:?}", std::thread::current().id()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub show_colors: bool,
    pub show_emojis: bool,
    pub show_thread_id: bool,
    pub show_file_location: bool,
    pub show_module: bool,
    pub timestamp_format: String,
    pub output_json: bool,
    pub log_file_path: Option<String>,
    /// Only records from these module prefixes pass; dependency chatter from
    /// hyper and actix stays out of the output.
    pub module_prefixes: Vec<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: true,
            show_emojis: true,
            show_thread_id: false,
            show_file_location: false,
            show_module: true,
            timestamp_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
            output_json: false,
            log_file_path: None,
            module_prefixes: vec!["roomgen".to_string()],
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// `LOG_FORMAT=json` picks the production layout, `LOG_LEVEL` overrides the level
    /// and `LOG_FILE` mirrors every line into a file.
    pub fn from_env() -> Self {
        let mut config = match std::env::var("LOG_FORMAT").ok().as_deref() {
            Some("json") => Self::production(),
            _ => Self::development(),
        };
        if let Some(level) = std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|raw| raw.parse::<LogLevel>().ok())
        {
            config.min_level = level;
        }
        if let Ok(path) = std::env::var("LOG_FILE") {
            if !path.trim().is_empty() {
                config.log_file_path = Some(path);
            }
        }
        config
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.show_colors = enabled;
        self
    }

    pub fn with_file_output(mut self, path: &str) -> Self {
        self.log_file_path = Some(path.to_string());
        self
    }

    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.output_json = enabled;
        self
    }

    pub fn with_module_prefix(mut self, prefix: &str) -> Self {
        self.module_prefixes.push(prefix.to_string());
        self
    }

    pub fn production() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: false,
            show_emojis: false,
            output_json: true,
            ..Default::default()
        }
    }

    pub fn development() -> Self {
        Self {
            min_level: LogLevel::Debug,
            show_colors: true,
            show_emojis: true,
            output_json: false,
            show_file_location: true,
            ..Default::default()
        }
    }

    fn accepts_module(&self, target: &str) -> bool {
        self.module_prefixes.is_empty()
            || self
                .module_prefixes
                .iter()
                .any(|prefix| target.starts_with(prefix.as_str()))
    }
}

pub struct RoomGenLogger {
    config: Mutex<LoggerConfig>,
    log_file: Mutex<Option<File>>,
}

impl RoomGenLogger {
    pub fn new() -> Self {
        Self {
            config: Mutex::new(LoggerConfig::default()),
            log_file: Mutex::new(None),
        }
    }

    pub fn update_config(&self, new_config: LoggerConfig) {
        let file = new_config.log_file_path.as_ref().and_then(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
        if let Ok(mut log_file) = self.log_file.lock() {
            *log_file = file;
        }
        if let Ok(mut config) = self.config.lock() {
            *config = new_config;
        }
    }

    fn format_console_output(&self, entry: &LogEntry, config: &LoggerConfig) -> String {
        let paint = |text: &str, style: fn(&str) -> ColoredString| -> String {
            if config.show_colors {
                style(text).to_string()
            } else {
                text.to_string()
            }
        };

        let mut segments = Vec::with_capacity(5);
        segments.push(paint(
            &entry.timestamp.format(&config.timestamp_format).to_string(),
            |t| t.bright_black(),
        ));

        let level = if config.show_emojis {
            format!("[{} {}]", entry.level.emoji(), entry.level.as_str())
        } else {
            format!("[{}]", entry.level.as_str())
        };
        segments.push(if config.show_colors {
            level.color(entry.level.color()).bold().to_string()
        } else {
            level
        });

        if config.show_module && !entry.module.is_empty() {
            segments.push(format!("{}:", paint(&entry.module, |t| t.bright_blue())));
        }
        segments.push(paint(&entry.message, |t| t.white().bold()));

        let mut line = segments.join(" ");
        if config.show_thread_id {
            line.push_str(&format!(" [worker {}]", entry.thread_id));
        }
        if config.show_file_location {
            let location = format!("({}:{})", entry.file, entry.line);
            line.push(' ');
            line.push_str(&paint(&location, |t| t.bright_black()));
        }
        line
    }

    fn render(&self, entry: &LogEntry, config: &LoggerConfig) -> String {
        if config.output_json {
            serde_json::to_string(entry).unwrap_or_default()
        } else {
            self.format_console_output(entry, config)
        }
    }

    fn write_to_file(&self, line: &str) {
        if let Ok(mut guard) = self.log_file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = writeln!(file, "{}", line);
            }
        }
    }
}

impl Default for RoomGenLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl log::Log for RoomGenLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match self.config.lock() {
            Ok(config) => {
                metadata.level() <= config.min_level.to_log_level()
                    && config.accepts_module(metadata.target())
            }
            Err(_) => true,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let entry = LogEntry::new(
            LogLevel::from_log_level(record.level()),
            record.args().to_string(),
            record.module_path().unwrap_or("unknown").to_string(),
            record.file().unwrap_or("unknown").to_string(),
            record.line().unwrap_or(0),
        );

        let (console, file_line) = match self.config.lock() {
            Ok(config) => {
                let console = self.render(&entry, &config);
                let file_line = config.log_file_path.as_ref().map(|_| {
                    if config.output_json {
                        console.clone()
                    } else {
                        let plain = config.clone().with_colors(false);
                        self.format_console_output(&entry, &plain)
                    }
                });
                (console, file_line)
            }
            Err(_) => return,
        };

        println!("{}", console);
        if let Some(line) = file_line {
            self.write_to_file(&line);
        }
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
        if let Ok(mut guard) = self.log_file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

/// Logs how long a named operation took when stopped or dropped.
pub struct Timer {
    start: Instant,
    name: String,
    stopped: bool,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::debug!("⏱️  Starting: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
            stopped: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn stop(mut self) -> Duration {
        self.finish()
    }

    fn finish(&mut self) -> Duration {
        let duration = self.elapsed();
        if !self.stopped {
            self.stopped = true;
            log::info!("⏱️  '{}' completed in {}ms", self.name, duration.as_millis());
        }
        duration
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.finish();
    }
}

pub fn timer(name: &str) -> Timer {
    Timer::new(name)
}

pub fn log_startup_info(app_name: &str, version: &str, port: u16) {
    log::info!("🚀 Starting {} v{}", app_name, version);
    log::info!("🌐 Server will run on http://0.0.0.0:{}", port);
    log::info!("📝 Logger initialized successfully");
}

fn key_status(credential: &Credential) -> String {
    let marker = if credential.resolve().is_some() { "✅" } else { "❌" };
    format!("{} ({})", marker, credential.describe())
}

/// Logs the effective configuration. Secrets are reported as present or missing, never printed.
pub fn log_config_info(config: &Config) {
    let priority: Vec<&str> = config.model_priority.iter().map(|m| m.as_str()).collect();

    log::info!("⚙️  Configuration loaded:");
    log::info!("   Port: {}", config.server_port());
    log::info!("   Image provider: {:?}", config.provider);
    log::info!("   Model priority: {}", priority.join(" → "));
    log::info!(
        "   Retry: {} attempts, {}ms base delay",
        config.retry.max_attempts,
        config.retry.backoff_base.as_millis()
    );
    log::info!(
        "   Timeouts: connect {}s, read {}s, write {}s",
        config.timeouts.connect.as_secs(),
        config.timeouts.read.as_secs(),
        config.timeouts.write.as_secs()
    );
    log::info!("   Gemini API: {} key {}", config.gemini.base_url, key_status(&config.gemini.credential));
    log::info!("   Grsai API: {} key {}", config.grsai.base_url, key_status(&config.grsai.credential));
    log::info!("   Vision analysis key: {}", key_status(&config.analysis.credential));
    log::info!("   Segmentation token: {}", key_status(&config.segmentation.credential));
    log::info!(
        "   Storage: input={} output={}",
        config.input_dir.display(),
        config.output_dir.display()
    );
}
