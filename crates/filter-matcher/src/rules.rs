//! Reference rule set for the gateway's `_rules_` configuration format.

use std::collections::HashSet;
use std::rc::Rc;

use filter_core::{RequestMetadata, RuleError};
use serde_json::{Map, Value};

use crate::pattern::{DomainPattern, ServicePattern};
use crate::{GlobalParser, OverrideParser, RuleMatcher};

/// Key holding per-rule configuration.
pub const RULES_KEY: &str = "_rules_";
/// Rule selector on gateway route names.
pub const MATCH_ROUTE_KEY: &str = "_match_route_";
/// Rule selector on request hosts.
pub const MATCH_DOMAIN_KEY: &str = "_match_domain_";
/// Rule selector on upstream services.
pub const MATCH_SERVICE_KEY: &str = "_match_service_";

const SELECTOR_KEYS: [&str; 3] = [MATCH_ROUTE_KEY, MATCH_DOMAIN_KEY, MATCH_SERVICE_KEY];

/// One entry of `_rules_`.
#[derive(Debug)]
pub struct Rule<C> {
    routes: HashSet<String>,
    domains: Vec<DomainPattern>,
    services: Vec<ServicePattern>,
    config: Rc<C>,
}

impl<C> Rule<C> {
    /// Every selector present on the rule must accept the request.
    fn matches(&self, request: &RequestMetadata) -> bool {
        if !self.routes.is_empty() {
            match &request.route_name {
                Some(route) if self.routes.contains(route) => {}
                _ => return false,
            }
        }
        if !self.domains.is_empty() && !self.domains.iter().any(|d| d.matches(&request.host)) {
            return false;
        }
        if !self.services.is_empty() {
            match &request.cluster_name {
                Some(cluster) if self.services.iter().any(|s| s.matches(cluster)) => {}
                _ => return false,
            }
        }
        true
    }

    /// Configuration attached to this rule.
    pub fn config(&self) -> &C {
        &self.config
    }
}

/// Global configuration plus ordered per-rule overrides.
///
/// ```json
/// {
///   "greeting": "hello",
///   "_rules_": [
///     { "_match_route_": ["route-a"], "greeting": "hi" },
///     { "_match_domain_": ["*.example.com"], "greeting": "hey" }
///   ]
/// }
/// ```
#[derive(Debug)]
pub struct RuleSet<C> {
    global: Option<Rc<C>>,
    rules: Vec<Rule<C>>,
}

impl<C> RuleSet<C> {
    /// Global configuration, if one is in effect.
    pub fn global(&self) -> Option<&C> {
        self.global.as_deref()
    }

    /// Per-rule entries in declaration order.
    pub fn rules(&self) -> &[Rule<C>] {
        &self.rules
    }
}

fn without_keys(obj: &Map<String, Value>, keys: &[&str]) -> Value {
    Value::Object(
        obj.iter()
            .filter(|(k, _)| !keys.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    )
}

fn string_list(rule: &Map<String, Value>, key: &str, index: usize) -> Result<Vec<String>, RuleError> {
    let Some(value) = rule.get(key) else {
        return Ok(Vec::new());
    };
    let invalid = || RuleError::InvalidMatcher {
        index,
        key: key.to_string(),
    };
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

impl<C: Default> RuleMatcher<C> for RuleSet<C> {
    fn build(
        raw: &Value,
        parse_global: GlobalParser<'_, C>,
        mut parse_override: Option<OverrideParser<'_, C>>,
    ) -> Result<Self, RuleError> {
        let empty = Map::new();
        let obj = match raw {
            Value::Null => &empty,
            Value::Object(obj) => obj,
            other => {
                let global = parse_global(other)?;
                return Ok(Self {
                    global: Some(Rc::new(global)),
                    rules: Vec::new(),
                });
            }
        };

        // An empty configuration enables the plugin everywhere.
        if obj.is_empty() {
            let global = parse_global(&Value::Object(Map::new())).unwrap_or_default();
            return Ok(Self {
                global: Some(Rc::new(global)),
                rules: Vec::new(),
            });
        }

        let rules_json = match obj.get(RULES_KEY) {
            Some(Value::Array(rules)) => rules.as_slice(),
            Some(_) => return Err(RuleError::RulesNotArray),
            None => &[],
        };

        let mut global = None;
        let mut global_error = String::from("no global config");
        if obj.keys().any(|k| k != RULES_KEY) {
            match parse_global(&without_keys(obj, &[RULES_KEY])) {
                Ok(config) => global = Some(Rc::new(config)),
                Err(e) => global_error = format!("{:#}", e),
            }
        }

        if rules_json.is_empty() {
            return match global {
                Some(global) => Ok(Self {
                    global: Some(global),
                    rules: Vec::new(),
                }),
                None => Err(RuleError::NoValidRules(global_error)),
            };
        }

        let fallback = C::default();
        let mut rules = Vec::with_capacity(rules_json.len());
        for (index, rule_json) in rules_json.iter().enumerate() {
            let rule_obj = rule_json.as_object().unwrap_or(&empty);
            let body = without_keys(rule_obj, &SELECTOR_KEYS);

            let config = match parse_override.as_mut() {
                Some(parse) => parse(&body, global.as_deref().unwrap_or(&fallback))?,
                None => parse_global(&body)?,
            };

            let routes: HashSet<String> = string_list(rule_obj, MATCH_ROUTE_KEY, index)?
                .into_iter()
                .collect();
            let domains: Vec<DomainPattern> = string_list(rule_obj, MATCH_DOMAIN_KEY, index)?
                .iter()
                .map(|d| DomainPattern::parse(d))
                .collect();
            let services: Vec<ServicePattern> = string_list(rule_obj, MATCH_SERVICE_KEY, index)?
                .iter()
                .map(|s| ServicePattern::parse(s))
                .collect();

            if routes.is_empty() && domains.is_empty() && services.is_empty() {
                return Err(RuleError::MissingMatcher(index));
            }

            rules.push(Rule {
                routes,
                domains,
                services,
                config: Rc::new(config),
            });
        }

        Ok(Self { global, rules })
    }

    fn resolve(&self, request: &RequestMetadata) -> Option<Rc<C>> {
        self.rules
            .iter()
            .find(|rule| rule.matches(request))
            .map(|rule| Rc::clone(&rule.config))
            .or_else(|| self.global.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Greeting {
        text: String,
        loud: bool,
    }

    fn parse(json: &Value) -> anyhow::Result<Greeting> {
        Ok(Greeting {
            text: json
                .get("text")
                .and_then(Value::as_str)
                .context("missing 'text'")?
                .to_string(),
            loud: json.get("loud").and_then(Value::as_bool).unwrap_or(false),
        })
    }

    fn build(raw: Value) -> Result<RuleSet<Greeting>, RuleError> {
        RuleSet::build(&raw, &mut parse, None)
    }

    #[test]
    fn test_global_only() {
        let set = build(serde_json::json!({"text": "hello"})).unwrap();
        let config = set.resolve(&RequestMetadata::new("a.com", "/")).unwrap();
        assert_eq!(config.text, "hello");
        assert!(set.rules().is_empty());
    }

    #[test]
    fn test_empty_config_enables_globally_with_default() {
        let set = build(serde_json::json!({})).unwrap();
        let config = set.resolve(&RequestMetadata::new("a.com", "/")).unwrap();
        assert_eq!(*config, Greeting::default());

        let set = build(Value::Null).unwrap();
        assert!(set.global().is_some());
    }

    #[test]
    fn test_route_rule_wins_over_global() {
        let set = build(serde_json::json!({
            "text": "global",
            "_rules_": [
                {"_match_route_": ["route-a"], "text": "route"}
            ]
        }))
        .unwrap();

        let routed = RequestMetadata::new("a.com", "/").with_route_name("route-a");
        assert_eq!(set.resolve(&routed).unwrap().text, "route");

        let other = RequestMetadata::new("a.com", "/").with_route_name("route-b");
        assert_eq!(set.resolve(&other).unwrap().text, "global");
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let set = build(serde_json::json!({
            "_rules_": [
                {"_match_domain_": ["*.example.com"], "text": "wildcard"},
                {"_match_domain_": ["api.example.com"], "text": "exact"}
            ]
        }))
        .unwrap();

        let req = RequestMetadata::new("api.example.com:443", "/");
        assert_eq!(set.resolve(&req).unwrap().text, "wildcard");
    }

    #[test]
    fn test_no_match_without_global() {
        let set = build(serde_json::json!({
            "_rules_": [{"_match_domain_": ["a.com"], "text": "a"}]
        }))
        .unwrap();

        assert!(set.global().is_none());
        assert!(set.resolve(&RequestMetadata::new("b.com", "/")).is_none());
    }

    #[test]
    fn test_service_rule() {
        let set = build(serde_json::json!({
            "_rules_": [{"_match_service_": ["svc.ns.svc.cluster.local:80"], "text": "svc"}]
        }))
        .unwrap();

        let req = RequestMetadata::new("a.com", "/")
            .with_cluster_name("outbound|80||svc.ns.svc.cluster.local");
        assert_eq!(set.resolve(&req).unwrap().text, "svc");
        assert!(set.resolve(&RequestMetadata::new("a.com", "/")).is_none());
    }

    #[test]
    fn test_combined_selectors_must_all_match() {
        let set = build(serde_json::json!({
            "_rules_": [{
                "_match_route_": ["r"],
                "_match_domain_": ["a.com"],
                "text": "both"
            }]
        }))
        .unwrap();

        let both = RequestMetadata::new("a.com", "/").with_route_name("r");
        assert!(set.resolve(&both).is_some());
        let route_only = RequestMetadata::new("b.com", "/").with_route_name("r");
        assert!(set.resolve(&route_only).is_none());
    }

    #[test]
    fn test_override_parser_sees_global() {
        let raw = serde_json::json!({
            "text": "global",
            "loud": true,
            "_rules_": [{"_match_route_": ["r"], "text": "rule"}]
        });
        let mut override_parse = |json: &Value, global: &Greeting| -> anyhow::Result<Greeting> {
            let mut config = global.clone();
            if let Some(text) = json.get("text").and_then(Value::as_str) {
                config.text = text.to_string();
            }
            Ok(config)
        };
        let set: RuleSet<Greeting> =
            RuleSet::build(&raw, &mut parse, Some(&mut override_parse)).unwrap();

        let config = set
            .resolve(&RequestMetadata::new("x", "/").with_route_name("r"))
            .unwrap();
        assert_eq!(config.text, "rule");
        assert!(config.loud);
    }

    #[test]
    fn test_rule_without_selector_fails() {
        let err = build(serde_json::json!({"_rules_": [{"text": "x"}]})).unwrap_err();
        assert!(matches!(err, RuleError::MissingMatcher(0)));
    }

    #[test]
    fn test_bad_selector_type_fails() {
        let err = build(serde_json::json!({
            "_rules_": [{"_match_route_": "r", "text": "x"}]
        }))
        .unwrap_err();
        assert!(matches!(err, RuleError::InvalidMatcher { index: 0, .. }));
    }

    #[test]
    fn test_rule_parse_error_fails_build() {
        let err = build(serde_json::json!({
            "text": "g",
            "_rules_": [{"_match_route_": ["r"]}]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("missing 'text'"));
    }

    #[test]
    fn test_invalid_global_without_rules_fails() {
        let err = build(serde_json::json!({"loud": true})).unwrap_err();
        assert!(matches!(err, RuleError::NoValidRules(_)));
    }

    #[test]
    fn test_invalid_global_tolerated_with_rules() {
        let set = build(serde_json::json!({
            "loud": true,
            "_rules_": [{"_match_route_": ["r"], "text": "rule"}]
        }))
        .unwrap();
        assert!(set.global().is_none());
        assert_eq!(set.rules().len(), 1);
    }
}
