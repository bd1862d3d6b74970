//! Log output destinations.

use crate::LogLevel;

/// Destination for rendered log lines.
///
/// On the proxy the host's log call is the sink; native builds and tests
/// plug in their own.
pub trait LogSink {
    /// Write one rendered line at the given level.
    fn write(&self, level: LogLevel, line: &str);
}

/// Sink writing to stderr, used outside the proxy.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn write(&self, level: LogLevel, line: &str) {
        eprintln!("{} {}", level, line);
    }
}
