//! Per-exchange state machine and the API extension code sees.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use filter_core::{Action, AttributeError, ContextValue, Direction, ExchangeState};
use filter_host::{
    Host, CLEAR_ROUTE_CACHE_PROPERTY, DECODER_BUFFER_LIMIT_PROPERTY,
    ENCODER_BUFFER_LIMIT_PROPERTY, REQUEST_ID_PROPERTY,
};
use filter_matcher::RuleMatcher;
use filter_observability::Log;

use crate::attribute::{write_attributes_to_log, write_attributes_to_trace, CUSTOM_LOG_KEY};
use crate::hooks::Hooks;
use crate::request::{header_or_empty, is_binary_body, request_metadata};

/// How one direction's body is delivered to extension code.
#[derive(Debug, Clone, Copy, Default)]
struct BodyMode {
    need: bool,
    streaming: bool,
    /// Bytes seen so far while buffering the whole body.
    buffered: usize,
}

/// One request/response transaction.
///
/// Created on the first signal for an exchange and dropped after
/// stream-done. Once header matching fails the configuration stays absent
/// and no hook runs for the exchange again.
pub struct ExchangeContext<C> {
    id: u32,
    hooks: Rc<Hooks<C>>,
    matcher: Option<Rc<dyn RuleMatcher<C>>>,
    host: Rc<dyn Host>,
    log: Log,
    config: Option<Rc<C>>,
    state: ExchangeState,
    request: BodyMode,
    response: BodyMode,
    user_context: HashMap<String, ContextValue>,
    user_attributes: BTreeMap<String, ContextValue>,
}

impl<C> ExchangeContext<C> {
    /// Create the context for exchange `id`.
    ///
    /// `matcher` is `None` until the plugin has started successfully; such
    /// exchanges pass through untouched.
    pub fn new(
        id: u32,
        hooks: Rc<Hooks<C>>,
        matcher: Option<Rc<dyn RuleMatcher<C>>>,
        host: Rc<dyn Host>,
        log: Log,
    ) -> Self {
        let mode = |direction| BodyMode {
            need: hooks.reads_body(direction),
            streaming: hooks.streams_body(direction),
            buffered: 0,
        };
        let request = mode(Direction::Request);
        let response = mode(Direction::Response);
        Self {
            id,
            hooks,
            matcher,
            host,
            log,
            config: None,
            state: ExchangeState::Created,
            request,
            response,
            user_context: HashMap::new(),
            user_attributes: BTreeMap::new(),
        }
    }

    fn mode(&self, direction: Direction) -> &BodyMode {
        match direction {
            Direction::Request => &self.request,
            Direction::Response => &self.response,
        }
    }

    fn mode_mut(&mut self, direction: Direction) -> &mut BodyMode {
        match direction {
            Direction::Request => &mut self.request,
            Direction::Response => &mut self.response,
        }
    }

    // Signals

    /// Request headers are available.
    pub fn on_request_headers(&mut self, _end_of_stream: bool) -> Action {
        if self.state != ExchangeState::Created {
            return Action::Continue;
        }
        self.state = ExchangeState::HeadersResolving;
        self.copy_request_id();

        let request = match request_metadata(self.host.as_ref()) {
            Ok(request) => request,
            Err(e) => {
                self.log
                    .error_with("get match config failed", &[("error", &e)]);
                self.state = ExchangeState::Unmatched;
                return Action::Continue;
            }
        };
        let resolved = self.matcher.as_ref().and_then(|m| m.resolve(&request));
        let Some(config) = resolved else {
            self.log.debug_builder("no config matched")
                .field("host", request.host.as_str())
                .field("path", request.path.as_str())
                .emit();
            self.state = ExchangeState::Unmatched;
            return Action::Continue;
        };

        self.config = Some(Rc::clone(&config));
        self.state = ExchangeState::Matched;
        self.dispatch_headers(Direction::Request, &config)
    }

    /// Response headers are available.
    pub fn on_response_headers(&mut self, _end_of_stream: bool) -> Action {
        match self.active_config() {
            Some(config) => self.dispatch_headers(Direction::Response, &config),
            None => Action::Continue,
        }
    }

    /// A request body chunk of `body_size` bytes is available.
    pub fn on_request_body(&mut self, body_size: usize, end_of_stream: bool) -> Action {
        self.dispatch_body(Direction::Request, body_size, end_of_stream)
    }

    /// A response body chunk of `body_size` bytes is available.
    pub fn on_response_body(&mut self, body_size: usize, end_of_stream: bool) -> Action {
        self.dispatch_body(Direction::Response, body_size, end_of_stream)
    }

    /// The exchange finished. Runs the stream-done hook at most once.
    pub fn on_stream_done(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        let config = self.active_config();
        self.state = ExchangeState::StreamDone;
        let Some(config) = config else {
            return;
        };
        let hooks = Rc::clone(&self.hooks);
        if let Some(hook) = &hooks.stream_done {
            let log = self.log.clone();
            hook(self, &*config, &log);
        }
    }

    fn active_config(&self) -> Option<Rc<C>> {
        if self.state.is_terminal() {
            return None;
        }
        self.config.clone()
    }

    fn copy_request_id(&self) {
        let request_id = header_or_empty(self.host.as_ref(), Direction::Request, "x-request-id");
        self.set_property(REQUEST_ID_PROPERTY, request_id.as_bytes());
    }

    fn dispatch_headers(&mut self, direction: Direction, config: &C) -> Action {
        if is_binary_body(self.host.as_ref(), direction) {
            self.mode_mut(direction).need = false;
        }
        let hooks = Rc::clone(&self.hooks);
        match hooks.headers(direction) {
            Some(hook) => {
                let log = self.log.clone();
                hook(self, config, &log)
            }
            None => Action::Continue,
        }
    }

    fn dispatch_body(&mut self, direction: Direction, body_size: usize, end_of_stream: bool) -> Action {
        let Some(config) = self.active_config() else {
            return Action::Continue;
        };
        self.state = ExchangeState::BodyProcessing;

        let mode = *self.mode(direction);
        if !mode.need {
            return Action::Continue;
        }
        let hooks = Rc::clone(&self.hooks);
        let log = self.log.clone();

        if mode.streaming {
            if let Some(hook) = hooks.streaming_body(direction) {
                let chunk = match self.host.body(direction, 0, body_size) {
                    Ok(chunk) => chunk.unwrap_or_default(),
                    Err(e) => {
                        log.debug(&format!("get {} body chunk failed: {}", direction, e));
                        Vec::new()
                    }
                };
                let modified = hook(self, &*config, &chunk, end_of_stream, &log);
                if let Err(e) = self.host.replace_body(direction, &modified) {
                    log.warn(&format!("replace {} body chunk failed: {}", direction, e));
                }
                return Action::Continue;
            }
        }

        let Some(hook) = hooks.body(direction) else {
            return Action::Continue;
        };
        let mode = self.mode_mut(direction);
        mode.buffered += body_size;
        if !end_of_stream {
            return Action::Pause;
        }
        let total = mode.buffered;
        match self.host.body(direction, 0, total) {
            Ok(body) => hook(self, &*config, &body.unwrap_or_default(), &log),
            Err(e) => {
                log.warn(&format!("get {} body failed: {}", direction, e));
                Action::Continue
            }
        }
    }

    fn set_property(&self, name: &str, value: &[u8]) {
        if let Err(e) = self.host.set_property(&[name], value) {
            self.log
                .warn_with("failed to set property", &[("property", &name), ("error", &e)]);
        }
    }

    // Request metadata

    fn request_header(&self, name: &str) -> String {
        if let Err(e) = self.host.set_effective_context(self.id) {
            self.log.debug(&format!("set effective context failed: {}", e));
        }
        header_or_empty(self.host.as_ref(), Direction::Request, name)
    }

    /// Request scheme, empty if unknown.
    pub fn scheme(&self) -> String {
        self.request_header(":scheme")
    }

    /// Request host, including any port.
    pub fn host(&self) -> String {
        self.request_header(":authority")
    }

    /// Request path, including any query.
    pub fn path(&self) -> String {
        self.request_header(":path")
    }

    /// Request method.
    pub fn method(&self) -> String {
        self.request_header(":method")
    }

    // User storage

    /// Store a value for later phases of this exchange.
    pub fn set_context(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.user_context.insert(key.into(), value.into());
    }

    pub fn get_context(&self, key: &str) -> Option<&ContextValue> {
        self.user_context.get(key)
    }

    /// Stored boolean, or `default` if absent or of another kind.
    pub fn get_bool_context(&self, key: &str, default: bool) -> bool {
        self.get_context(key)
            .and_then(ContextValue::as_bool)
            .unwrap_or(default)
    }

    /// Stored string, or `default` if absent or of another kind.
    pub fn get_string_context<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get_context(key)
            .and_then(ContextValue::as_str)
            .unwrap_or(default)
    }

    // User attributes

    /// Record an attribute for log or trace export.
    pub fn set_user_attribute(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.user_attributes.insert(key.into(), value.into());
    }

    pub fn get_user_attribute(&self, key: &str) -> Option<&ContextValue> {
        self.user_attributes.get(key)
    }

    pub fn user_attributes(&self) -> &BTreeMap<String, ContextValue> {
        &self.user_attributes
    }

    /// Merge attributes into the `custom_log` property.
    pub fn write_user_attribute_to_log(&self) -> Result<(), AttributeError> {
        self.write_user_attribute_to_log_with_key(CUSTOM_LOG_KEY)
    }

    /// Merge attributes into the log property `key`.
    pub fn write_user_attribute_to_log_with_key(&self, key: &str) -> Result<(), AttributeError> {
        write_attributes_to_log(self.host.as_ref(), &self.log, key, &self.user_attributes)
    }

    /// Export every attribute as a trace span tag. Returns how many were written.
    pub fn write_user_attribute_to_trace(&self) -> usize {
        write_attributes_to_trace(self.host.as_ref(), &self.log, &self.user_attributes)
    }

    // Body delivery

    /// Stop delivering the request body to hooks.
    pub fn dont_read_request_body(&mut self) {
        self.set_read_body(Direction::Request, false);
    }

    /// Stop delivering the response body to hooks.
    pub fn dont_read_response_body(&mut self) {
        self.set_read_body(Direction::Response, false);
    }

    /// Deliver the request body whole instead of chunk by chunk.
    pub fn buffer_request_body(&mut self) {
        self.set_streaming_body(Direction::Request, false);
    }

    /// Deliver the response body whole instead of chunk by chunk.
    pub fn buffer_response_body(&mut self) {
        self.set_streaming_body(Direction::Response, false);
    }

    pub fn set_read_body(&mut self, direction: Direction, read: bool) {
        self.mode_mut(direction).need = read;
    }

    pub fn set_streaming_body(&mut self, direction: Direction, streaming: bool) {
        self.mode_mut(direction).streaming = streaming;
    }

    pub fn reads_body(&self, direction: Direction) -> bool {
        self.mode(direction).need
    }

    pub fn streams_body(&self, direction: Direction) -> bool {
        self.mode(direction).streaming
    }

    // Gateway properties

    /// Keep the current route even if hooks modify request headers.
    pub fn disable_reroute(&self) {
        self.set_property(CLEAR_ROUTE_CACHE_PROPERTY, b"off");
    }

    /// Ask the gateway to buffer up to `size` bytes of request body.
    pub fn set_request_body_buffer_limit(&self, size: u32) {
        self.log.info(&format!("set request body buffer limit: {}", size));
        self.set_property(DECODER_BUFFER_LIMIT_PROPERTY, size.to_string().as_bytes());
    }

    /// Ask the gateway to buffer up to `size` bytes of response body.
    pub fn set_response_body_buffer_limit(&self, size: u32) {
        self.log.info(&format!("set response body buffer limit: {}", size));
        self.set_property(ENCODER_BUFFER_LIMIT_PROPERTY, size.to_string().as_bytes());
    }

    // Accessors

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Configuration resolved for this exchange, if any.
    pub fn config(&self) -> Option<&C> {
        self.config.as_deref()
    }

    pub fn log(&self) -> &Log {
        &self.log
    }
}
