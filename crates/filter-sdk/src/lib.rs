//! Public SDK for writing gateway filter extensions.
//!
//! An extension registers its configuration parser and phase hooks on a
//! [`PluginBuilder`]; the runtime resolves configuration per request and
//! calls the hooks with an [`ExchangeContext`]:
//!
//! ```ignore
//! use filter_sdk::prelude::*;
//!
//! #[derive(Default)]
//! struct Config {
//!     deny_path: String,
//! }
//!
//! fn plugin() -> PluginBuilder<Config> {
//!     PluginBuilder::new("deny-path")
//!         .parse_config_by(|json, _ctx| {
//!             let deny_path = json["deny_path"].as_str().unwrap_or("/admin");
//!             Ok(Config { deny_path: deny_path.to_string() })
//!         })
//!         .on_request_headers(|exchange, config, log| {
//!             if exchange.path().starts_with(&config.deny_path) {
//!                 log.warn("denied");
//!             }
//!             Action::Continue
//!         })
//! }
//!
//! plugin_main!(plugin);
//! ```

mod attribute;
mod builder;
mod exchange;
mod hooks;
mod parse;
mod plugin;
mod request;

#[cfg(target_arch = "wasm32")]
mod proxy;

pub use attribute::*;
pub use builder::*;
pub use exchange::*;
pub use hooks::*;
pub use parse::*;
pub use plugin::*;
pub use request::*;

#[cfg(target_arch = "wasm32")]
pub use proxy::*;
#[cfg(target_arch = "wasm32")]
pub use proxy_wasm;

pub use filter_core;
pub use filter_executor;
pub use filter_host;
pub use filter_matcher;
pub use filter_observability;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        ExchangeContext, ParseContext, PluginBuilder, PluginContext, AI_LOG_KEY, CUSTOM_LOG_KEY,
    };
    pub use filter_core::*;
    pub use filter_host::{Host, MemoryHost};
    pub use filter_matcher::{RuleMatcher, RuleSet};
    pub use filter_observability::{Log, LogFormat, LogLevel};
    pub use serde_json::Value;

    #[cfg(target_arch = "wasm32")]
    pub use crate::plugin_main;
}
