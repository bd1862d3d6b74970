//! Configuration parser signatures and the context handed to them.

use std::time::Duration;

use filter_executor::TickRegistry;
use filter_observability::Log;
use serde_json::Value;

/// Parses the global configuration node.
pub type ConfigParser<C> = Box<dyn Fn(&Value, &mut ParseContext<'_>) -> anyhow::Result<C>>;

/// Parses a per-rule node relative to the global configuration.
pub type OverrideConfigParser<C> =
    Box<dyn Fn(&Value, &C, &mut ParseContext<'_>) -> anyhow::Result<C>>;

/// What a configuration parser may touch besides the JSON itself.
///
/// Tick functions can only be registered here, so they are tied to the
/// configuration that created them.
pub struct ParseContext<'a> {
    log: &'a Log,
    ticks: &'a mut TickRegistry,
}

impl<'a> ParseContext<'a> {
    /// Create a parse context over a tick staging registry.
    pub fn new(log: &'a Log, ticks: &'a mut TickRegistry) -> Self {
        Self { log, ticks }
    }

    /// The plugin logger.
    pub fn log(&self) -> &Log {
        self.log
    }

    /// Run `action` every `period` once the configuration is in effect.
    ///
    /// `period` should be a multiple of 100ms; shorter or unaligned
    /// periods fire on the next 100ms tick after they elapse.
    pub fn register_tick(&mut self, period: Duration, action: impl FnMut() + 'static) {
        self.ticks.register(period, action);
    }
}
