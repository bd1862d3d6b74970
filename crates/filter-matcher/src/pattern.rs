//! Rule selectors.

use filter_core::strip_port;

/// A `_match_domain_` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainPattern {
    /// `example.com`
    Exact(String),
    /// `*.example.com`, stored as `.example.com`.
    Suffix(String),
    /// `example.*`, stored as `example.`.
    Prefix(String),
}

impl DomainPattern {
    /// Parse a domain pattern; matching is case-insensitive.
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim().to_ascii_lowercase();
        if let Some(rest) = pattern.strip_prefix('*') {
            Self::Suffix(rest.to_string())
        } else if let Some(rest) = pattern.strip_suffix('*') {
            Self::Prefix(rest.to_string())
        } else {
            Self::Exact(pattern)
        }
    }

    /// Check a request host (port is ignored).
    pub fn matches(&self, host: &str) -> bool {
        let host = strip_port(host).to_ascii_lowercase();
        match self {
            Self::Exact(domain) => host == *domain,
            Self::Suffix(suffix) => host.ends_with(suffix.as_str()),
            Self::Prefix(prefix) => host.starts_with(prefix.as_str()),
        }
    }
}

/// A `_match_service_` entry: `name` or `name:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePattern {
    /// Upstream service FQDN.
    pub name: String,
    /// Port, if the rule pins one.
    pub port: Option<String>,
}

impl ServicePattern {
    /// Parse a service pattern.
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim();
        match pattern.rsplit_once(':') {
            Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
                Self {
                    name: name.to_string(),
                    port: Some(port.to_string()),
                }
            }
            _ => Self {
                name: pattern.to_string(),
                port: None,
            },
        }
    }

    /// Check an upstream cluster name.
    ///
    /// Gateway cluster names look like `outbound|80||svc.ns.svc.cluster.local`;
    /// anything else is compared as a bare service name.
    pub fn matches(&self, cluster_name: &str) -> bool {
        let parts: Vec<&str> = cluster_name.split('|').collect();
        let (port, fqdn) = match parts.as_slice() {
            [_, port, _, fqdn] => (Some(*port), *fqdn),
            _ => (None, cluster_name),
        };
        if fqdn != self.name {
            return false;
        }
        match (&self.port, port) {
            (None, _) => true,
            (Some(want), Some(got)) => want == got,
            (Some(_), None) => false,
        }
    }
}
