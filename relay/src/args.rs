use std::fmt;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "mcp-relay", version, long_about = concat!("mcp-relay v", env!("CARGO_PKG_VERSION")))]
pub struct Args {
    /// Path to the local JSON/YAML configuration file. When omitted, the
    /// config locator searches `PROJECT_PATH` then the current directory.
    #[arg(long, short, env = "RELAY_CONFIG_PATH")]
    pub config: Option<PathBuf>,
    /// Set the logging level, applies to all spans, logs, and trace events.
    #[arg(long = "log", env = "RELAY_LOG", default_value_t = LogLevel::default())]
    pub log_level: LogLevel,
    /// Set the style of log output.
    #[arg(long, env = "RELAY_LOG_STYLE", default_value_t = LogStyle::default())]
    pub log_style: LogStyle,
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for telemetry::LogLevel {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => telemetry::LogLevel::Off,
            LogLevel::Error => telemetry::LogLevel::Error,
            LogLevel::Warn => telemetry::LogLevel::Warn,
            LogLevel::Info => telemetry::LogLevel::Info,
            LogLevel::Debug => telemetry::LogLevel::Debug,
            LogLevel::Trace => telemetry::LogLevel::Trace,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(s)
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogStyle {
    #[default]
    Text,
    Json,
}

impl From<LogStyle> for telemetry::LogStyle {
    fn from(style: LogStyle) -> Self {
        match style {
            LogStyle::Text => telemetry::LogStyle::Text,
            LogStyle::Json => telemetry::LogStyle::Json,
        }
    }
}

impl fmt::Display for LogStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogStyle::Text => "text",
            LogStyle::Json => "json",
        };
        f.write_str(s)
    }
}
