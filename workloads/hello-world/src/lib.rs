//! Reference extension for the gateway filter runtime.
//!
//! This extension shows:
//! - Typed configuration with per-route overrides
//! - Header, whole-body and streaming-body hooks
//! - Per-exchange context and user attributes exported at stream end
//! - A periodic tick registered while parsing configuration

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;

use filter_sdk::prelude::*;

/// Extension configuration.
///
/// ```json
/// {
///   "greeting": "hello",
///   "blocked_paths": ["/admin"],
///   "redact": "secret",
///   "_rules_": [{"_match_route_": ["internal"], "blocked_paths": []}]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HelloConfig {
    pub greeting: String,
    pub blocked_paths: Vec<String>,
    /// Word masked in streamed response bodies.
    pub redact: Option<String>,
    /// Seconds between heartbeat log lines; 0 disables the heartbeat.
    pub heartbeat_secs: u64,
}

impl HelloConfig {
    fn is_blocked(&self, path: &str) -> bool {
        self.blocked_paths.iter().any(|p| path.starts_with(p.as_str()))
    }
}

fn parse_config(json: &Value, ctx: &mut ParseContext<'_>) -> anyhow::Result<HelloConfig> {
    let config: HelloConfig =
        serde_json::from_value(json.clone()).context("invalid hello-world config")?;

    if config.heartbeat_secs > 0 {
        let log = ctx.log().clone();
        let beats = Rc::new(Cell::new(0u64));
        ctx.register_tick(Duration::from_secs(config.heartbeat_secs), move || {
            beats.set(beats.get() + 1);
            log.debug_builder("heartbeat")
                .field_i64("beats", beats.get() as i64)
                .emit();
        });
    }
    Ok(config)
}

fn parse_override(
    json: &Value,
    global: &HelloConfig,
    _ctx: &mut ParseContext<'_>,
) -> anyhow::Result<HelloConfig> {
    let mut config = global.clone();
    if let Some(greeting) = json.get("greeting").and_then(Value::as_str) {
        config.greeting = greeting.to_string();
    }
    if let Some(paths) = json.get("blocked_paths") {
        config.blocked_paths =
            serde_json::from_value(paths.clone()).context("'blocked_paths' must be strings")?;
    }
    if let Some(redact) = json.get("redact").and_then(Value::as_str) {
        config.redact = Some(redact.to_string());
    }
    Ok(config)
}

fn mask(chunk: &[u8], word: &str) -> Vec<u8> {
    if word.is_empty() {
        return chunk.to_vec();
    }
    let text = String::from_utf8_lossy(chunk);
    text.replace(word, &"*".repeat(word.len())).into_bytes()
}

/// Register the extension.
pub fn plugin() -> PluginBuilder<HelloConfig> {
    PluginBuilder::<HelloConfig>::new("hello-world")
        .with_log_format(LogFormat::Json)
        .parse_config_by(parse_config)
        .parse_override_config_by(parse_override)
        .on_request_headers(|exchange, config, log| {
            let path = exchange.path();
            exchange.set_user_attribute("greeting", config.greeting.as_str());
            if config.is_blocked(&path) {
                log.warn_with("blocked path", &[("path", &path)]);
                exchange.set_context("blocked", true);
                exchange.dont_read_request_body();
            }
            exchange.set_request_body_buffer_limit(64 * 1024);
            Action::Continue
        })
        .on_request_body(|exchange, _config, body, _log| {
            exchange.set_user_attribute("request_bytes", body.len() as i64);
            Action::Continue
        })
        .on_response_headers(|exchange, config, _log| {
            if config.redact.is_none() {
                exchange.dont_read_response_body();
            }
            Action::Continue
        })
        .on_streaming_response_body(|exchange, config, chunk, end_of_stream, _log| {
            let seen = exchange
                .get_context("response_bytes")
                .and_then(ContextValue::as_i64)
                .unwrap_or(0);
            exchange.set_context("response_bytes", seen + chunk.len() as i64);
            if end_of_stream {
                exchange.set_user_attribute("response_bytes", seen + chunk.len() as i64);
            }
            match &config.redact {
                Some(word) => mask(chunk, word),
                None => chunk.to_vec(),
            }
        })
        .on_stream_done(|exchange, _config, log| {
            let blocked = exchange.get_bool_context("blocked", false);
            exchange.set_user_attribute("blocked", blocked);
            log.info_builder("exchange done")
                .field("path", exchange.path())
                .field_bool("blocked", blocked)
                .emit();
            if let Err(e) = exchange.write_user_attribute_to_log() {
                log.warn(&format!("failed to export access log fields: {}", e));
            }
            exchange.write_user_attribute_to_trace();
        })
}

#[cfg(target_arch = "wasm32")]
filter_sdk::plugin_main!(plugin);
