//! Observability infrastructure for gateway filter extensions.
//!
//! This crate provides:
//! - `Log` - Plugin logger stamped with the extension name
//! - `LogBuilder` - Fluent structured fields for a single entry
//! - `LogSink` - Where rendered entries are written

mod logging;
mod sink;

pub use logging::*;
pub use sink::*;
