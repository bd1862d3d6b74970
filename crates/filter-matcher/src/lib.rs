//! Rule matching from request metadata to plugin configuration.
//!
//! This crate provides:
//! - `RuleMatcher` - The contract the runtime consumes
//! - `RuleSet` - Reference matcher for the gateway's `_rules_` format
//! - `DomainPattern` / `ServicePattern` - Individual rule selectors

mod pattern;
mod rules;

pub use pattern::*;
pub use rules::*;

use std::rc::Rc;

use filter_core::{RequestMetadata, RuleError};
use serde_json::Value;

/// Applies the primary parser to a JSON node.
pub type GlobalParser<'a, C> = &'a mut dyn FnMut(&Value) -> anyhow::Result<C>;

/// Applies the override parser to a rule node, given the global configuration.
pub type OverrideParser<'a, C> = &'a mut dyn FnMut(&Value, &C) -> anyhow::Result<C>;

/// Maps request metadata to the configuration that applies to it.
pub trait RuleMatcher<C> {
    /// Build a matcher from raw configuration.
    ///
    /// `parse_override` is `None` when the extension registered no override
    /// parser; per-rule nodes are then parsed with `parse_global`.
    fn build(
        raw: &Value,
        parse_global: GlobalParser<'_, C>,
        parse_override: Option<OverrideParser<'_, C>>,
    ) -> Result<Self, RuleError>
    where
        Self: Sized;

    /// Pick the configuration for a request, `None` if nothing applies.
    fn resolve(&self, request: &RequestMetadata) -> Option<Rc<C>>;
}
