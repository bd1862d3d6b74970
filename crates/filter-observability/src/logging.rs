//! Structured logging with plugin context.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::sink::{LogSink, StderrSink};

/// Log level for plugin logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trace => write!(f, "TRACE"),
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A structured log entry.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// Log level.
    pub level: LogLevel,
    /// Extension name.
    pub plugin: String,
    /// Log message.
    pub message: String,
    /// Additional structured fields.
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl LogEntry {
    /// Format as JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }

    /// Format as `[plugin] message | key=value ...`.
    pub fn to_human(&self) -> String {
        let mut s = format!("[{}] {}", self.plugin, self.message);

        if !self.fields.is_empty() {
            s.push_str(" | ");
            let fields: Vec<String> = self
                .fields
                .iter()
                .map(|(k, v)| match v {
                    serde_json::Value::String(text) => format!("{}={}", k, text),
                    other => format!("{}={}", k, other),
                })
                .collect();
            s.push_str(&fields.join(" "));
        }

        s
    }
}

/// Output format for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// `[plugin] message` lines, what gateway operators expect to grep.
    #[default]
    Human,
    /// JSON format for log aggregation.
    Json,
}

/// Plugin logger handed to every callback.
///
/// Cheap to clone; all clones share the same sink.
#[derive(Clone)]
pub struct Log {
    plugin: Rc<str>,
    sink: Rc<dyn LogSink>,
    min_level: LogLevel,
    format: LogFormat,
}

impl Log {
    /// Create a logger for an extension, writing to stderr.
    pub fn new(plugin: &str) -> Self {
        Self::with_sink(plugin, Rc::new(StderrSink))
    }

    /// Create a logger for an extension with an explicit sink.
    pub fn with_sink(plugin: &str, sink: Rc<dyn LogSink>) -> Self {
        Self {
            plugin: Rc::from(plugin),
            sink,
            min_level: LogLevel::Trace,
            format: LogFormat::Human,
        }
    }

    /// Set minimum log level.
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Set output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Extension name this logger is stamped with.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Check if a level would be emitted.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    /// Log at trace level.
    pub fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message, BTreeMap::new());
    }

    /// Log at debug level.
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message, BTreeMap::new());
    }

    /// Log at info level.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, BTreeMap::new());
    }

    /// Log at warn level.
    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message, BTreeMap::new());
    }

    /// Log at error level.
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message, BTreeMap::new());
    }

    /// Log at critical level.
    pub fn critical(&self, message: &str) {
        self.log(LogLevel::Critical, message, BTreeMap::new());
    }

    /// Log at warn level with fields.
    pub fn warn_with(&self, message: &str, fields: &[(&str, &dyn fmt::Display)]) {
        self.log(LogLevel::Warn, message, display_fields(fields));
    }

    /// Log at error level with fields.
    pub fn error_with(&self, message: &str, fields: &[(&str, &dyn fmt::Display)]) {
        self.log(LogLevel::Error, message, display_fields(fields));
    }

    fn log(&self, level: LogLevel, message: &str, fields: BTreeMap<String, serde_json::Value>) {
        if !self.enabled(level) {
            return;
        }

        let entry = LogEntry {
            level,
            plugin: self.plugin.to_string(),
            message: message.to_string(),
            fields,
        };

        let output = match self.format {
            LogFormat::Human => entry.to_human(),
            LogFormat::Json => entry.to_json(),
        };

        self.sink.write(level, &output);
    }
}

impl fmt::Debug for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Log")
            .field("plugin", &self.plugin)
            .field("min_level", &self.min_level)
            .field("format", &self.format)
            .finish()
    }
}

fn display_fields(fields: &[(&str, &dyn fmt::Display)]) -> BTreeMap<String, serde_json::Value> {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::json!(v.to_string())))
        .collect()
}

/// Builder for log entries with fluent API.
pub struct LogBuilder<'a> {
    logger: &'a Log,
    level: LogLevel,
    message: String,
    fields: BTreeMap<String, serde_json::Value>,
}

impl<'a> LogBuilder<'a> {
    /// Create a new log builder.
    pub fn new(logger: &'a Log, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            logger,
            level,
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a string field.
    pub fn field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields
            .insert(key.to_string(), serde_json::json!(value.into()));
        self
    }

    /// Add an integer field.
    pub fn field_i64(mut self, key: &str, value: i64) -> Self {
        self.fields.insert(key.to_string(), serde_json::json!(value));
        self
    }

    /// Add a boolean field.
    pub fn field_bool(mut self, key: &str, value: bool) -> Self {
        self.fields.insert(key.to_string(), serde_json::json!(value));
        self
    }

    /// Emit the log entry.
    pub fn emit(self) {
        self.logger.log(self.level, &self.message, self.fields);
    }
}

impl Log {
    /// Start building an info log entry.
    pub fn info_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder::new(self, LogLevel::Info, message)
    }

    /// Start building a warn log entry.
    pub fn warn_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder::new(self, LogLevel::Warn, message)
    }

    /// Start building a debug log entry.
    pub fn debug_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder::new(self, LogLevel::Debug, message)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        lines: RefCell<Vec<(LogLevel, String)>>,
    }

    impl LogSink for RecordingSink {
        fn write(&self, level: LogLevel, line: &str) {
            self.lines.borrow_mut().push((level, line.to_string()));
        }
    }

    fn recording(plugin: &str) -> (Log, Rc<RecordingSink>) {
        let sink = Rc::new(RecordingSink::default());
        (Log::with_sink(plugin, sink.clone()), sink)
    }

    #[test]
    fn test_messages_are_stamped_with_plugin_name() {
        let (log, sink) = recording("key-auth");
        log.info("consumer matched");

        let lines = sink.lines.borrow();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], (LogLevel::Info, "[key-auth] consumer matched".to_string()));
    }

    #[test]
    fn test_min_level_filters() {
        let (log, sink) = recording("p");
        let log = log.with_min_level(LogLevel::Warn);
        log.debug("dropped");
        log.info("dropped");
        log.warn("kept");
        log.critical("kept");

        assert_eq!(sink.lines.borrow().len(), 2);
        assert!(!log.enabled(LogLevel::Info));
    }

    #[test]
    fn test_builder_fields_human() {
        let (log, sink) = recording("p");
        log.warn_builder("body read failed")
            .field("direction", "request")
            .field_i64("size", 12)
            .emit();

        let lines = sink.lines.borrow();
        assert_eq!(lines[0].1, "[p] body read failed | direction=request size=12");
    }

    #[test]
    fn test_json_format() {
        let (log, sink) = recording("p");
        let log = log.with_format(LogFormat::Json);
        log.error_with("set property failed", &[("key", &"custom_log")]);

        let lines = sink.lines.borrow();
        let parsed: serde_json::Value = serde_json::from_str(&lines[0].1).unwrap();
        assert_eq!(parsed["level"], "error");
        assert_eq!(parsed["plugin"], "p");
        assert_eq!(parsed["key"], "custom_log");
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Critical > LogLevel::Error);
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert_eq!(LogLevel::Warn.to_string(), "WARN");
    }
}
