//! Logging/tracing initialization, ambient to every crate in the workspace.
//!
//! The proxy's stdout is reserved for the MCP protocol stream itself (§6's
//! *Logger* collaborator), so unlike the teacher's CLI, every dispatch here
//! appends to stderr rather than stdout.

use std::fmt;
use std::str::FromStr;

use logforth::append::{FastraceEvent, Stderr};
use logforth::diagnostic::FastraceDiagnostic;
use logforth::filter::EnvFilter;
use logforth::layout::{JsonLayout, TextLayout};

/// Logging verbosity, ordered least to most chatty.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Disable logging entirely.
    Off,
    /// Only errors.
    Error,
    /// Errors and warnings.
    Warn,
    /// Errors, warnings, and info.
    #[default]
    Info,
    /// Errors, warnings, info, and debug.
    Debug,
    /// Everything, including trace-level spans.
    Trace,
}

impl LogLevel {
    fn env_filter(self) -> EnvFilter {
        let filter_str = match self {
            LogLevel::Off => "off".to_string(),
            level => format!("warn,relay={level},aggregator={level},config={level},skills={level}"),
        };

        EnvFilter::from_str(&filter_str).expect("statically valid filter strings")
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

/// Output encoding for log lines.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum LogStyle {
    /// Plain text, one line per record.
    #[default]
    Text,
    /// One JSON object per record.
    Json,
}

/// Initializes the process-wide `log` dispatcher plus fastrace event
/// forwarding. Safe to call once; a second call is a logforth-level error
/// that is ignored, since only the binary entry point should call this.
pub fn init(level: LogLevel, style: LogStyle) {
    logforth::builder()
        .dispatch(|d| d.filter(level.env_filter()).append(FastraceEvent::default()))
        .dispatch(|d| {
            let d = d.diagnostic(FastraceDiagnostic::default()).filter(level.env_filter());

            match style {
                LogStyle::Text => d.append(Stderr::default().with_layout(TextLayout::default().no_color())),
                LogStyle::Json => d.append(Stderr::default().with_layout(JsonLayout::default())),
            }
        })
        .apply();
}
