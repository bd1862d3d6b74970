//! proxy-wasm entry points.

use proxy_wasm::traits::{Context, HttpContext, RootContext};
use proxy_wasm::types::{Action as ProxyAction, ContextType};

use filter_core::Action;
use filter_matcher::RuleMatcher;

use crate::{ExchangeContext, PluginBuilder, PluginContext};

fn proxy_action(action: Action) -> ProxyAction {
    match action {
        Action::Continue => ProxyAction::Continue,
        Action::Pause => ProxyAction::Pause,
    }
}

/// Root context driving a [`PluginContext`].
pub struct RootAdapter<C, M> {
    plugin: PluginContext<C, M>,
}

impl<C, M> Context for RootAdapter<C, M> {}

impl<C: Default + 'static, M: RuleMatcher<C> + 'static> RootContext for RootAdapter<C, M> {
    fn on_configure(&mut self, _plugin_configuration_size: usize) -> bool {
        self.plugin.start().is_ok()
    }

    fn on_tick(&mut self) {
        self.plugin.on_tick();
    }

    fn create_http_context(&self, context_id: u32) -> Option<Box<dyn HttpContext>> {
        Some(Box::new(HttpAdapter {
            exchange: self.plugin.new_exchange(context_id),
        }))
    }

    fn get_type(&self) -> Option<ContextType> {
        Some(ContextType::HttpContext)
    }
}

/// HTTP context forwarding host signals to an [`ExchangeContext`].
pub struct HttpAdapter<C> {
    exchange: ExchangeContext<C>,
}

impl<C> Context for HttpAdapter<C> {}

impl<C: 'static> HttpContext for HttpAdapter<C> {
    fn on_http_request_headers(&mut self, _num_headers: usize, end_of_stream: bool) -> ProxyAction {
        proxy_action(self.exchange.on_request_headers(end_of_stream))
    }

    fn on_http_request_body(&mut self, body_size: usize, end_of_stream: bool) -> ProxyAction {
        proxy_action(self.exchange.on_request_body(body_size, end_of_stream))
    }

    fn on_http_response_headers(&mut self, _num_headers: usize, end_of_stream: bool) -> ProxyAction {
        proxy_action(self.exchange.on_response_headers(end_of_stream))
    }

    fn on_http_response_body(&mut self, body_size: usize, end_of_stream: bool) -> ProxyAction {
        proxy_action(self.exchange.on_response_body(body_size, end_of_stream))
    }

    fn on_log(&mut self) {
        self.exchange.on_stream_done();
    }
}

/// Build the root context for an extension.
///
/// A registration error is fatal: it is logged at critical level and the
/// VM is aborted.
pub fn root_context<C, M>(builder: PluginBuilder<C, M>) -> Box<dyn RootContext>
where
    C: Default + 'static,
    M: RuleMatcher<C> + 'static,
{
    match builder.build() {
        Ok(plugin) => Box::new(RootAdapter { plugin }),
        Err(e) => {
            let message = format!("plugin registration failed: {}", e);
            let _ = proxy_wasm::hostcalls::log(proxy_wasm::types::LogLevel::Critical, &message);
            panic!("{}", message);
        }
    }
}

/// Declare the proxy-wasm entry point for an extension.
///
/// Takes the path of a function returning the extension's [`PluginBuilder`].
#[macro_export]
macro_rules! plugin_main {
    ($plugin:path) => {
        $crate::proxy_wasm::main! {{
            $crate::proxy_wasm::set_log_level($crate::proxy_wasm::types::LogLevel::Trace);
            $crate::proxy_wasm::set_root_context(|_| $crate::root_context($plugin()));
        }}
    };
}
