//! proxy-wasm hostcall bindings.

use std::time::{Duration, SystemTime};

use filter_core::{Direction, HostError};
use filter_observability::{LogLevel, LogSink};
use proxy_wasm::hostcalls;
use proxy_wasm::types::{BufferType, LogLevel as ProxyLogLevel, MapType, Status};

/// Replace size the gateway treats as "the whole buffered chunk".
const REPLACE_WHOLE_BUFFER: usize = i32::MAX as usize;

/// Host backed by the proxy-wasm ABI of the running gateway.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyWasmHost;

impl ProxyWasmHost {
    /// Create a handle to the gateway.
    pub fn new() -> Self {
        Self
    }
}

fn host_error(status: Status) -> HostError {
    match status {
        Status::NotFound => HostError::NotFound,
        Status::BadArgument => HostError::BadArgument,
        Status::Empty => HostError::Empty,
        Status::CasMismatch => HostError::CasMismatch,
        _ => HostError::InternalFailure,
    }
}

fn body_buffer(direction: Direction) -> BufferType {
    match direction {
        Direction::Request => BufferType::HttpRequestBody,
        Direction::Response => BufferType::HttpResponseBody,
    }
}

fn header_map(direction: Direction) -> MapType {
    match direction {
        Direction::Request => MapType::HttpRequestHeaders,
        Direction::Response => MapType::HttpResponseHeaders,
    }
}

fn proxy_level(level: LogLevel) -> ProxyLogLevel {
    match level {
        LogLevel::Trace => ProxyLogLevel::Trace,
        LogLevel::Debug => ProxyLogLevel::Debug,
        LogLevel::Info => ProxyLogLevel::Info,
        LogLevel::Warn => ProxyLogLevel::Warn,
        LogLevel::Error => ProxyLogLevel::Error,
        LogLevel::Critical => ProxyLogLevel::Critical,
    }
}

impl crate::Host for ProxyWasmHost {
    fn plugin_configuration(&self) -> Result<Option<Vec<u8>>, HostError> {
        hostcalls::get_buffer(BufferType::PluginConfiguration, 0, usize::MAX).map_err(host_error)
    }

    fn set_tick_period(&self, period: Duration) -> Result<(), HostError> {
        hostcalls::set_tick_period(period).map_err(host_error)
    }

    fn current_time(&self) -> SystemTime {
        crate::time_or_epoch(hostcalls::get_current_time())
    }

    fn header(&self, direction: Direction, name: &str) -> Result<Option<String>, HostError> {
        hostcalls::get_map_value(header_map(direction), name).map_err(host_error)
    }

    fn body(
        &self,
        direction: Direction,
        start: usize,
        size: usize,
    ) -> Result<Option<Vec<u8>>, HostError> {
        hostcalls::get_buffer(body_buffer(direction), start, size).map_err(host_error)
    }

    fn replace_body(&self, direction: Direction, body: &[u8]) -> Result<(), HostError> {
        hostcalls::set_buffer(body_buffer(direction), 0, REPLACE_WHOLE_BUFFER, body)
            .map_err(host_error)
    }

    fn property(&self, path: &[&str]) -> Result<Option<Vec<u8>>, HostError> {
        hostcalls::get_property(path.to_vec()).map_err(host_error)
    }

    fn set_property(&self, path: &[&str], value: &[u8]) -> Result<(), HostError> {
        hostcalls::set_property(path.to_vec(), Some(value)).map_err(host_error)
    }

    fn set_effective_context(&self, context_id: u32) -> Result<(), HostError> {
        hostcalls::set_effective_context(context_id).map_err(host_error)
    }

    fn log(&self, level: LogLevel, message: &str) -> Result<(), HostError> {
        hostcalls::log(proxy_level(level), message).map_err(host_error)
    }
}

impl LogSink for ProxyWasmHost {
    fn write(&self, level: LogLevel, line: &str) {
        let _ = crate::Host::log(self, level, line);
    }
}
