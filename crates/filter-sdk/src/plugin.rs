//! Plugin-wide context: configuration start and periodic ticks.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use filter_core::{HostError, StartError};
use filter_executor::{TickRegistry, TickScheduler, TICK_GRANULARITY};
use filter_host::Host;
use filter_matcher::{RuleMatcher, RuleSet};
use filter_observability::Log;
use serde_json::Value;

use crate::exchange::ExchangeContext;
use crate::hooks::Hooks;
use crate::parse::{ConfigParser, OverrideConfigParser, ParseContext};

/// One running extension instance.
///
/// Holds the registered hooks and parsers, the rule set built by the last
/// successful [`PluginContext::start`], and the installed tick functions.
pub struct PluginContext<C, M = RuleSet<C>> {
    name: String,
    log: Log,
    host: Rc<dyn Host>,
    hooks: Rc<Hooks<C>>,
    parse_config: ConfigParser<C>,
    parse_override: Option<OverrideConfigParser<C>>,
    has_custom_config: bool,
    matcher: Option<Rc<M>>,
    ticks: TickScheduler,
}

impl<C: Default + 'static, M: RuleMatcher<C> + 'static> PluginContext<C, M> {
    pub(crate) fn new(
        name: String,
        log: Log,
        host: Rc<dyn Host>,
        hooks: Rc<Hooks<C>>,
        parse_config: ConfigParser<C>,
        parse_override: Option<OverrideConfigParser<C>>,
        has_custom_config: bool,
    ) -> Self {
        Self {
            name,
            log,
            host,
            hooks,
            parse_config,
            parse_override,
            has_custom_config,
            matcher: None,
            ticks: TickScheduler::new(),
        }
    }

    /// Read the plugin configuration and build the rule set.
    ///
    /// Nothing is committed unless every step succeeds, so a failed start
    /// leaves the previous rule set and tick functions in place.
    pub fn start(&mut self) -> Result<(), StartError> {
        let raw = match self.host.plugin_configuration() {
            Ok(raw) => raw.unwrap_or_default(),
            Err(HostError::NotFound) => Vec::new(),
            Err(e) => {
                self.log
                    .critical(&format!("error reading plugin configuration: {}", e));
                return Err(StartError::ConfigRead(e));
            }
        };

        let json = if raw.is_empty() {
            if self.has_custom_config {
                self.log.warn("config is empty, but a config parser is registered");
            }
            Value::Null
        } else {
            match serde_json::from_slice::<Value>(&raw) {
                Ok(json) => json,
                Err(e) => {
                    self.log.warn(&format!(
                        "the plugin configuration is not a valid json: {}",
                        String::from_utf8_lossy(&raw)
                    ));
                    return Err(StartError::InvalidJson(e.to_string()));
                }
            }
        };

        let staged = RefCell::new(TickRegistry::new());
        let matcher = self.build_matcher(&json, &staged).map_err(|e| {
            self.log.warn(&format!("parse rule config failed: {}", e));
            StartError::RuleSet(e)
        })?;

        let staged = staged.into_inner();
        let scheduler = if staged.is_empty() {
            None
        } else {
            for period in staged.misaligned_periods() {
                self.log.warn_with(
                    "tick period is not a multiple of the tick granularity",
                    &[
                        ("period_ms", &period.as_millis()),
                        ("granularity_ms", &TICK_GRANULARITY.as_millis()),
                    ],
                );
            }
            if let Err(e) = self.host.set_tick_period(TICK_GRANULARITY) {
                self.log
                    .error("set tick period failed, tick functions will not take effect");
                return Err(StartError::TickPeriod(e));
            }
            Some(TickScheduler::arm(staged, self.host.current_time()))
        };

        self.matcher = Some(Rc::new(matcher));
        if let Some(scheduler) = scheduler {
            self.ticks = scheduler;
        }
        self.log.debug_builder("plugin started")
            .field_i64("tick_functions", self.ticks.entries().len() as i64)
            .emit();
        Ok(())
    }

    fn build_matcher(
        &self,
        json: &Value,
        staged: &RefCell<TickRegistry>,
    ) -> Result<M, filter_core::RuleError> {
        let log = &self.log;
        let parse_config = &self.parse_config;

        let mut parse_global = |json: &Value| -> anyhow::Result<C> {
            let mut ticks = staged.borrow_mut();
            let parsed = parse_config(json, &mut ParseContext::new(log, &mut ticks));
            if let Err(e) = &parsed {
                log.warn(&format!("parse global config failed: {:#}", e));
            }
            parsed
        };
        let mut parse_rule = self.parse_override.as_ref().map(|parse| {
            move |json: &Value, global: &C| -> anyhow::Result<C> {
                let mut ticks = staged.borrow_mut();
                parse(json, global, &mut ParseContext::new(log, &mut ticks))
            }
        });

        let parse_rule = parse_rule
            .as_mut()
            .map(|parse| parse as &mut dyn FnMut(&Value, &C) -> anyhow::Result<C>);
        M::build(json, &mut parse_global, parse_rule)
    }

    /// Handle a host tick.
    pub fn on_tick(&mut self) {
        let now = self.host.current_time();
        self.ticks.on_tick(now);
    }

    /// Create the context for a new exchange.
    pub fn new_exchange(&self, id: u32) -> ExchangeContext<C> {
        let matcher = self
            .matcher
            .clone()
            .map(|m| m as Rc<dyn RuleMatcher<C>>);
        ExchangeContext::new(
            id,
            Rc::clone(&self.hooks),
            matcher,
            Rc::clone(&self.host),
            self.log.clone(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn log(&self) -> &Log {
        &self.log
    }

    /// Whether a config parser was registered explicitly.
    pub fn has_custom_config(&self) -> bool {
        self.has_custom_config
    }

    /// Rule set from the last successful start.
    pub fn matcher(&self) -> Option<&M> {
        self.matcher.as_deref()
    }

    /// Installed tick functions.
    pub fn ticks(&self) -> &TickScheduler {
        &self.ticks
    }
}

impl<C, M> fmt::Debug for PluginContext<C, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("name", &self.name)
            .field("has_custom_config", &self.has_custom_config)
            .field("started", &self.matcher.is_some())
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}
