//! Per-call instrumentation options.

use serde::{Deserialize, Serialize};

/// Severity attached to emitted bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// What an instrumented call records
///
/// Error bundles are always emitted at `LogLevel::Error`; `level` applies to
/// start and end bundles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InstrumentOptions {
    pub log_entry: bool,
    pub log_exit: bool,
    pub log_errors: bool,
    pub capture_args: bool,
    pub capture_result: bool,
    pub level: LogLevel,
}

impl Default for InstrumentOptions {
    fn default() -> Self {
        Self {
            log_entry: true,
            log_exit: true,
            log_errors: true,
            capture_args: true,
            capture_result: false,
            level: LogLevel::Info,
        }
    }
}

impl InstrumentOptions {
    pub fn log_entry(mut self, enabled: bool) -> Self {
        self.log_entry = enabled;
        self
    }

    pub fn log_exit(mut self, enabled: bool) -> Self {
        self.log_exit = enabled;
        self
    }

    pub fn log_errors(mut self, enabled: bool) -> Self {
        self.log_errors = enabled;
        self
    }

    pub fn capture_args(mut self, enabled: bool) -> Self {
        self.capture_args = enabled;
        self
    }

    pub fn capture_result(mut self, enabled: bool) -> Self {
        self.capture_result = enabled;
        self
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }
}
