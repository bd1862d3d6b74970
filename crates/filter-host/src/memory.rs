//! In-memory host for native development and tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use filter_core::{Direction, HostError};
use filter_observability::{LogLevel, LogSink};

use crate::Host;

/// A host call that can be made to fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    PluginConfiguration,
    SetTickPeriod,
    Header(Direction, String),
    ReadBody(Direction),
    ReplaceBody(Direction),
    Property(String),
    SetProperty(String),
    SetEffectiveContext,
}

#[derive(Debug, Default)]
struct Stream {
    headers: Vec<(String, String)>,
    buffered: Vec<u8>,
    forwarded: Vec<u8>,
    body_reads: usize,
}

#[derive(Debug)]
struct MemoryState {
    plugin_configuration: Option<Vec<u8>>,
    request: Stream,
    response: Stream,
    properties: HashMap<String, Vec<u8>>,
    tick_period: Option<Duration>,
    now: SystemTime,
    effective_context: Option<u32>,
    logs: Vec<(LogLevel, String)>,
    failures: Vec<(HostCall, HostError)>,
}

impl MemoryState {
    fn stream(&self, direction: Direction) -> &Stream {
        match direction {
            Direction::Request => &self.request,
            Direction::Response => &self.response,
        }
    }

    fn stream_mut(&mut self, direction: Direction) -> &mut Stream {
        match direction {
            Direction::Request => &mut self.request,
            Direction::Response => &mut self.response,
        }
    }

    fn failure(&self, call: &HostCall) -> Option<HostError> {
        self.failures
            .iter()
            .find(|(c, _)| c == call)
            .map(|(_, err)| *err)
    }
}

/// Host that keeps headers, body buffers, properties and logs in memory.
///
/// Body buffers follow the gateway model: delivered chunks accumulate in the
/// buffer until the filter lets them through, at which point
/// [`MemoryHost::flush_body`] moves them to the forwarded output.
#[derive(Debug)]
pub struct MemoryHost {
    state: RefCell<MemoryState>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// Create an empty host whose clock starts at the Unix epoch.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(MemoryState {
                plugin_configuration: None,
                request: Stream::default(),
                response: Stream::default(),
                properties: HashMap::new(),
                tick_period: None,
                now: SystemTime::UNIX_EPOCH,
                effective_context: None,
                logs: Vec::new(),
                failures: Vec::new(),
            }),
        }
    }

    /// Set the raw plugin configuration.
    pub fn with_plugin_configuration(self, config: impl Into<Vec<u8>>) -> Self {
        self.set_plugin_configuration(config);
        self
    }

    /// Replace the raw plugin configuration.
    pub fn set_plugin_configuration(&self, config: impl Into<Vec<u8>>) {
        self.state.borrow_mut().plugin_configuration = Some(config.into());
    }

    /// Set a header for a direction, replacing any previous value.
    pub fn set_header(&self, direction: Direction, name: &str, value: &str) {
        let mut state = self.state.borrow_mut();
        let headers = &mut state.stream_mut(direction).headers;
        headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        headers.push((name.to_string(), value.to_string()));
    }

    /// Append a body chunk to the direction's buffer, returning its size.
    pub fn push_body(&self, direction: Direction, chunk: &[u8]) -> usize {
        let mut state = self.state.borrow_mut();
        state.stream_mut(direction).buffered.extend_from_slice(chunk);
        chunk.len()
    }

    /// Forward everything buffered for a direction, returning the forwarded bytes.
    pub fn flush_body(&self, direction: Direction) -> Vec<u8> {
        let mut state = self.state.borrow_mut();
        let stream = state.stream_mut(direction);
        let chunk = std::mem::take(&mut stream.buffered);
        stream.forwarded.extend_from_slice(&chunk);
        chunk
    }

    /// Bytes currently held in the direction's buffer.
    pub fn buffered(&self, direction: Direction) -> Vec<u8> {
        self.state.borrow().stream(direction).buffered.clone()
    }

    /// All bytes forwarded so far for a direction.
    pub fn forwarded(&self, direction: Direction) -> Vec<u8> {
        self.state.borrow().stream(direction).forwarded.clone()
    }

    /// Number of successful body reads for a direction.
    pub fn body_reads(&self, direction: Direction) -> usize {
        self.state.borrow().stream(direction).body_reads
    }

    /// Read a property as text.
    pub fn property_str(&self, name: &str) -> Option<String> {
        self.state
            .borrow()
            .properties
            .get(name)
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }

    /// Seed a property.
    pub fn insert_property(&self, name: &str, value: impl Into<Vec<u8>>) {
        self.state
            .borrow_mut()
            .properties
            .insert(name.to_string(), value.into());
    }

    /// Tick period requested by the plugin, if any.
    pub fn tick_period(&self) -> Option<Duration> {
        self.state.borrow().tick_period
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.state.borrow_mut().now += by;
    }

    /// Context the plugin last pointed host calls at.
    pub fn effective_context(&self) -> Option<u32> {
        self.state.borrow().effective_context
    }

    /// Make a host call fail with the given error from now on.
    pub fn fail_on(&self, call: HostCall, error: HostError) {
        self.state.borrow_mut().failures.push((call, error));
    }

    /// Every log line written so far.
    pub fn logs(&self) -> Vec<(LogLevel, String)> {
        self.state.borrow().logs.clone()
    }

    /// Log lines written at a given level.
    pub fn logs_at(&self, level: LogLevel) -> Vec<String> {
        self.state
            .borrow()
            .logs
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line.clone())
            .collect()
    }

    fn check(&self, call: HostCall) -> Result<(), HostError> {
        match self.state.borrow().failure(&call) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Host for MemoryHost {
    fn plugin_configuration(&self) -> Result<Option<Vec<u8>>, HostError> {
        self.check(HostCall::PluginConfiguration)?;
        Ok(self.state.borrow().plugin_configuration.clone())
    }

    fn set_tick_period(&self, period: Duration) -> Result<(), HostError> {
        self.check(HostCall::SetTickPeriod)?;
        self.state.borrow_mut().tick_period = Some(period);
        Ok(())
    }

    fn current_time(&self) -> SystemTime {
        self.state.borrow().now
    }

    fn header(&self, direction: Direction, name: &str) -> Result<Option<String>, HostError> {
        self.check(HostCall::Header(direction, name.to_string()))?;
        Ok(self
            .state
            .borrow()
            .stream(direction)
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone()))
    }

    fn body(
        &self,
        direction: Direction,
        start: usize,
        size: usize,
    ) -> Result<Option<Vec<u8>>, HostError> {
        self.check(HostCall::ReadBody(direction))?;
        let mut state = self.state.borrow_mut();
        let stream = state.stream_mut(direction);
        stream.body_reads += 1;
        if start >= stream.buffered.len() {
            return Ok(None);
        }
        let end = start.saturating_add(size).min(stream.buffered.len());
        Ok(Some(stream.buffered[start..end].to_vec()))
    }

    fn replace_body(&self, direction: Direction, body: &[u8]) -> Result<(), HostError> {
        self.check(HostCall::ReplaceBody(direction))?;
        self.state.borrow_mut().stream_mut(direction).buffered = body.to_vec();
        Ok(())
    }

    fn property(&self, path: &[&str]) -> Result<Option<Vec<u8>>, HostError> {
        let key = path.join(".");
        self.check(HostCall::Property(key.clone()))?;
        Ok(self.state.borrow().properties.get(&key).cloned())
    }

    fn set_property(&self, path: &[&str], value: &[u8]) -> Result<(), HostError> {
        let key = path.join(".");
        self.check(HostCall::SetProperty(key.clone()))?;
        self.state.borrow_mut().properties.insert(key, value.to_vec());
        Ok(())
    }

    fn set_effective_context(&self, context_id: u32) -> Result<(), HostError> {
        self.check(HostCall::SetEffectiveContext)?;
        self.state.borrow_mut().effective_context = Some(context_id);
        Ok(())
    }

    fn log(&self, level: LogLevel, message: &str) -> Result<(), HostError> {
        self.state
            .borrow_mut()
            .logs
            .push((level, message.to_string()));
        Ok(())
    }
}

impl LogSink for MemoryHost {
    fn write(&self, level: LogLevel, line: &str) {
        let _ = Host::log(self, level, line);
    }
}
