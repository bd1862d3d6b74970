//! Registration of an extension's parsers and hooks.

use std::marker::PhantomData;
use std::mem;
use std::rc::Rc;

use filter_core::{Action, StartError};
use filter_host::Host;
use filter_matcher::{RuleMatcher, RuleSet};
use filter_observability::{Log, LogFormat, LogSink};
use serde_json::Value;

use crate::hooks::Hooks;
use crate::parse::{ConfigParser, OverrideConfigParser, ParseContext};
use crate::plugin::PluginContext;
use crate::ExchangeContext;

/// Collects everything an extension registers before it starts.
///
/// `C` is the extension's configuration type, `M` the rule matcher that
/// picks a configuration per request.
pub struct PluginBuilder<C, M = RuleSet<C>> {
    name: String,
    parse_config: Option<ConfigParser<C>>,
    parse_override: Option<OverrideConfigParser<C>>,
    hooks: Hooks<C>,
    log: Option<Log>,
    log_format: LogFormat,
    host: Option<Rc<dyn Host>>,
    sink: Option<Rc<dyn LogSink>>,
    _matcher: PhantomData<fn() -> M>,
}

impl<C: Default + 'static> PluginBuilder<C> {
    /// Start registering an extension called `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parse_config: None,
            parse_override: None,
            hooks: Hooks::default(),
            log: None,
            log_format: LogFormat::default(),
            host: None,
            sink: None,
            _matcher: PhantomData,
        }
    }
}

impl<C: Default + 'static, M: RuleMatcher<C> + 'static> PluginBuilder<C, M> {
    /// Use another rule matcher.
    pub fn with_matcher<N: RuleMatcher<C> + 'static>(self) -> PluginBuilder<C, N> {
        PluginBuilder {
            name: self.name,
            parse_config: self.parse_config,
            parse_override: self.parse_override,
            hooks: self.hooks,
            log: self.log,
            log_format: self.log_format,
            host: self.host,
            sink: self.sink,
            _matcher: PhantomData,
        }
    }

    /// Parser for the global configuration and, without an override
    /// parser, for every rule.
    pub fn parse_config_by(
        mut self,
        parse: impl Fn(&Value, &mut ParseContext<'_>) -> anyhow::Result<C> + 'static,
    ) -> Self {
        self.parse_config = Some(Box::new(parse));
        self
    }

    /// Parser for rule nodes, given the global configuration.
    pub fn parse_override_config_by(
        mut self,
        parse: impl Fn(&Value, &C, &mut ParseContext<'_>) -> anyhow::Result<C> + 'static,
    ) -> Self {
        self.parse_override = Some(Box::new(parse));
        self
    }

    pub fn on_request_headers(
        mut self,
        hook: impl Fn(&mut ExchangeContext<C>, &C, &Log) -> Action + 'static,
    ) -> Self {
        self.hooks.request_headers = Some(Box::new(hook));
        self
    }

    /// Receive the whole request body once it has fully arrived.
    pub fn on_request_body(
        mut self,
        hook: impl Fn(&mut ExchangeContext<C>, &C, &[u8], &Log) -> Action + 'static,
    ) -> Self {
        self.hooks.request_body = Some(Box::new(hook));
        self
    }

    /// Receive and rewrite the request body chunk by chunk.
    ///
    /// Takes precedence over [`Self::on_request_body`] unless the exchange
    /// switches to buffering.
    pub fn on_streaming_request_body(
        mut self,
        hook: impl Fn(&mut ExchangeContext<C>, &C, &[u8], bool, &Log) -> Vec<u8> + 'static,
    ) -> Self {
        self.hooks.streaming_request_body = Some(Box::new(hook));
        self
    }

    pub fn on_response_headers(
        mut self,
        hook: impl Fn(&mut ExchangeContext<C>, &C, &Log) -> Action + 'static,
    ) -> Self {
        self.hooks.response_headers = Some(Box::new(hook));
        self
    }

    /// Receive the whole response body once it has fully arrived.
    pub fn on_response_body(
        mut self,
        hook: impl Fn(&mut ExchangeContext<C>, &C, &[u8], &Log) -> Action + 'static,
    ) -> Self {
        self.hooks.response_body = Some(Box::new(hook));
        self
    }

    /// Receive and rewrite the response body chunk by chunk.
    pub fn on_streaming_response_body(
        mut self,
        hook: impl Fn(&mut ExchangeContext<C>, &C, &[u8], bool, &Log) -> Vec<u8> + 'static,
    ) -> Self {
        self.hooks.streaming_response_body = Some(Box::new(hook));
        self
    }

    /// Run once when the exchange finishes, for cleanup and final exports.
    pub fn on_stream_done(
        mut self,
        hook: impl Fn(&mut ExchangeContext<C>, &C, &Log) + 'static,
    ) -> Self {
        self.hooks.stream_done = Some(Box::new(hook));
        self
    }

    /// Replace the default logger.
    pub fn with_logger(mut self, log: Log) -> Self {
        self.log = Some(log);
        self
    }

    /// Output format of the default logger. Ignored when a logger is supplied.
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Run against a specific host. Its log sink also backs the default logger.
    pub fn with_host<H: Host + LogSink + 'static>(mut self, host: Rc<H>) -> Self {
        self.sink = Some(host.clone());
        self.host = Some(host);
        self
    }

    /// Finish registration.
    ///
    /// Fails when `C` carries data but no config parser was registered.
    pub fn build(self) -> Result<PluginContext<C, M>, StartError> {
        let has_custom_config = self.parse_config.is_some();
        let parse_config: ConfigParser<C> = match self.parse_config {
            Some(parse) => parse,
            None if mem::size_of::<C>() == 0 => {
                Box::new(|_: &Value, _: &mut ParseContext<'_>| -> anyhow::Result<C> {
                    Ok(C::default())
                })
            }
            None => return Err(StartError::MissingConfigParser(self.name)),
        };

        let host = self.host.unwrap_or_else(default_host);
        let log = match (self.log, self.sink) {
            (Some(log), _) => log,
            (None, Some(sink)) => Log::with_sink(&self.name, sink).with_format(self.log_format),
            (None, None) => default_log(&self.name).with_format(self.log_format),
        };

        Ok(PluginContext::new(
            self.name,
            log,
            host,
            Rc::new(self.hooks),
            parse_config,
            self.parse_override,
            has_custom_config,
        ))
    }
}

#[cfg(target_arch = "wasm32")]
fn default_host() -> Rc<dyn Host> {
    Rc::new(filter_host::ProxyWasmHost::new())
}

#[cfg(not(target_arch = "wasm32"))]
fn default_host() -> Rc<dyn Host> {
    Rc::new(filter_host::MemoryHost::new())
}

#[cfg(target_arch = "wasm32")]
fn default_log(name: &str) -> Log {
    Log::with_sink(name, Rc::new(filter_host::ProxyWasmHost::new()))
}

#[cfg(not(target_arch = "wasm32"))]
fn default_log(name: &str) -> Log {
    Log::new(name)
}
