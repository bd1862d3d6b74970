//! Export of accumulated user attributes to log and trace properties.
//!
//! Log properties carry a JSON object encoded as an escaped string, so a
//! stored value looks like `{\"a\":\"1\"}`. Every merge unescapes the prior
//! value, overlays the new attributes and escapes the result again.

use std::collections::BTreeMap;

use filter_core::{AttributeError, ContextValue};
use filter_host::Host;
use filter_observability::Log;
use serde_json::{Map, Value};

/// Default property attributes are merged into for access logs.
pub const CUSTOM_LOG_KEY: &str = "custom_log";
/// Property used by AI gateway plugins for their access log fields.
pub const AI_LOG_KEY: &str = "ai_log";
/// Prefix of the properties exported as trace span tags.
pub const TRACE_SPAN_TAG_PREFIX: &str = "trace_span_tag.";

/// Escape a string the way the log property transport expects.
pub fn escape_property(raw: &str) -> String {
    let quoted = Value::String(raw.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// Undo [`escape_property`].
pub fn unescape_property(escaped: &str) -> Result<String, serde_json::Error> {
    serde_json::from_str(&format!("\"{}\"", escaped))
}

fn prior_object(host: &dyn Host, log: &Log, key: &str) -> Result<Map<String, Value>, AttributeError> {
    let prior = match host.property(&[key]) {
        Ok(prior) => prior.unwrap_or_default(),
        Err(e) => {
            log.warn_with("failed to read log property", &[("key", &key), ("error", &e)]);
            Vec::new()
        }
    };
    if prior.is_empty() {
        return Ok(Map::new());
    }

    let prior = String::from_utf8_lossy(&prior);
    let malformed = |reason: String| {
        log.warn(&format!(
            "unmarshal failed, keeping prior {} value: {}",
            key, prior
        ));
        AttributeError::PriorValue {
            key: key.to_string(),
            reason,
        }
    };
    let json = unescape_property(&prior).map_err(|e| malformed(e.to_string()))?;
    match serde_json::from_str::<Value>(&json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(malformed(format!("found {}", other))),
        Err(e) => Err(malformed(e.to_string())),
    }
}

/// Merge `attributes` into the JSON object stored under property `key`.
///
/// A malformed prior value is reported and left untouched.
pub fn write_attributes_to_log(
    host: &dyn Host,
    log: &Log,
    key: &str,
    attributes: &BTreeMap<String, ContextValue>,
) -> Result<(), AttributeError> {
    let mut merged = prior_object(host, log, key)?;
    for (name, value) in attributes {
        merged.insert(name.clone(), value.to_json());
    }

    let escaped = escape_property(&serde_json::to_string(&Value::Object(merged))?);
    host.set_property(&[key], escaped.as_bytes())
        .map_err(|source| {
            log.warn_with(
                "failed to set log property",
                &[("key", &key), ("raw", &escaped), ("error", &source)],
            );
            AttributeError::Write {
                key: key.to_string(),
                source,
            }
        })
}

/// Write each attribute to its own trace property.
///
/// Failures are logged per key and never stop the export. Returns how many
/// properties were written.
pub fn write_attributes_to_trace(
    host: &dyn Host,
    log: &Log,
    attributes: &BTreeMap<String, ContextValue>,
) -> usize {
    let mut written = 0;
    for (name, value) in attributes {
        let tag = format!("{}{}", TRACE_SPAN_TAG_PREFIX, name);
        let value = value.to_string();
        let result = if value.is_empty() {
            Err(AttributeError::EmptyValue(tag.clone()))
        } else {
            host.set_property(&[tag.as_str()], value.as_bytes())
                .map_err(|source| AttributeError::Write {
                    key: tag.clone(),
                    source,
                })
        };
        match result {
            Ok(()) => written += 1,
            Err(e) => log.warn_with(
                "failed to set trace attribute",
                &[("tag", &tag), ("value", &value), ("error", &e)],
            ),
        }
    }
    written
}
