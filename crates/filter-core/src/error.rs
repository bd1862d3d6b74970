//! Error types shared across the runtime crates.

use thiserror::Error;

/// Failure status reported by a host call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("not found")]
    NotFound,

    #[error("bad argument")]
    BadArgument,

    #[error("serialization failure")]
    SerializationFailure,

    #[error("parse failure")]
    ParseFailure,

    #[error("empty")]
    Empty,

    #[error("compare-and-swap mismatch")]
    CasMismatch,

    #[error("internal failure")]
    InternalFailure,

    #[error("unimplemented")]
    Unimplemented,
}

/// Fatal errors that abort plugin start.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("plugin '{0}' has a non-empty config type but no config parser")]
    MissingConfigParser(String),

    #[error("error reading plugin configuration: {0}")]
    ConfigRead(HostError),

    #[error("plugin configuration is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("parse rule config failed: {0}")]
    RuleSet(#[from] RuleError),

    #[error("set tick period failed, tick functions will not take effect: {0}")]
    TickPeriod(HostError),
}

/// Errors raised while building a rule set from raw configuration.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("config parse failed: {0}")]
    Parse(String),

    #[error("'_rules_' must be an array")]
    RulesNotArray,

    #[error("rule #{0} needs at least one of '_match_route_', '_match_domain_' or '_match_service_'")]
    MissingMatcher(usize),

    #[error("rule #{index}: '{key}' must be an array of strings")]
    InvalidMatcher { index: usize, key: String },

    #[error("no valid rules and no global config (global config error: {0})")]
    NoValidRules(String),
}

impl From<anyhow::Error> for RuleError {
    fn from(e: anyhow::Error) -> Self {
        RuleError::Parse(format!("{:#}", e))
    }
}

/// Errors raised while exporting user attributes.
#[derive(Debug, Error)]
pub enum AttributeError {
    #[error("prior value of '{key}' is not a JSON object: {reason}")]
    PriorValue { key: String, reason: String },

    #[error("failed to write property '{key}': {source}")]
    Write { key: String, source: HostError },

    #[error("value of '{0}' is empty")]
    EmptyValue(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for AttributeError {
    fn from(e: serde_json::Error) -> Self {
        AttributeError::Json(e.to_string())
    }
}
