//! The host trait and well-known property names.

use std::time::{Duration, SystemTime};

use filter_core::{Direction, HostError};
use filter_observability::LogLevel;

/// Property holding the request id copied from `x-request-id`.
pub const REQUEST_ID_PROPERTY: &str = "x_request_id";
/// Property the gateway reads to decide whether header edits re-route.
pub const CLEAR_ROUTE_CACHE_PROPERTY: &str = "clear_route_cache";
/// Property setting the per-request body buffer limit.
pub const DECODER_BUFFER_LIMIT_PROPERTY: &str = "set_decoder_buffer_limit";
/// Property setting the per-response body buffer limit.
pub const ENCODER_BUFFER_LIMIT_PROPERTY: &str = "set_encoder_buffer_limit";
/// Property exposing the matched route name.
pub const ROUTE_NAME_PROPERTY: &str = "route_name";
/// Property exposing the upstream cluster name.
pub const CLUSTER_NAME_PROPERTY: &str = "cluster_name";

/// Calls the runtime makes into the gateway.
///
/// Every call is synchronous and scoped to the exchange whose signal is
/// currently being delivered, as the proxy-wasm ABI defines it.
pub trait Host {
    /// Raw plugin configuration bytes, `None` if the host has none.
    fn plugin_configuration(&self) -> Result<Option<Vec<u8>>, HostError>;

    /// Ask the host to deliver tick signals at this period.
    fn set_tick_period(&self, period: Duration) -> Result<(), HostError>;

    /// Host wall clock.
    fn current_time(&self) -> SystemTime;

    /// Header value for a direction, `None` if absent.
    fn header(&self, direction: Direction, name: &str) -> Result<Option<String>, HostError>;

    /// Up to `size` bytes of the buffered body starting at `start`.
    fn body(&self, direction: Direction, start: usize, size: usize)
        -> Result<Option<Vec<u8>>, HostError>;

    /// Replace the buffered body chunk that will be forwarded.
    fn replace_body(&self, direction: Direction, body: &[u8]) -> Result<(), HostError>;

    /// Read a property, `None` if absent.
    fn property(&self, path: &[&str]) -> Result<Option<Vec<u8>>, HostError>;

    /// Write a property.
    fn set_property(&self, path: &[&str], value: &[u8]) -> Result<(), HostError>;

    /// Point subsequent calls at another exchange.
    fn set_effective_context(&self, context_id: u32) -> Result<(), HostError>;

    /// Write to the gateway log.
    fn log(&self, level: LogLevel, message: &str) -> Result<(), HostError>;
}

/// Host clock reading, or the Unix epoch when the host cannot answer.
///
/// `wasm32-unknown-unknown` has no system clock to fall back on.
pub fn time_or_epoch<E>(reading: Result<SystemTime, E>) -> SystemTime {
    reading.unwrap_or(SystemTime::UNIX_EPOCH)
}
