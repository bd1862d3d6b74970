//! Request facts used to resolve configuration.

/// Request metadata read during the request-header phase.
///
/// This is what the rule matcher sees when picking a configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    /// `:scheme` pseudo-header.
    pub scheme: String,
    /// `:authority` pseudo-header, possibly with a port.
    pub host: String,
    /// `:path` pseudo-header, including the query string.
    pub path: String,
    /// `:method` pseudo-header.
    pub method: String,
    /// Gateway route name, if the host exposes one.
    pub route_name: Option<String>,
    /// Upstream cluster name, if the host exposes one.
    pub cluster_name: Option<String>,
}

impl RequestMetadata {
    /// Create metadata for a host and path.
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the scheme.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Set the method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Set the route name.
    pub fn with_route_name(mut self, route: impl Into<String>) -> Self {
        self.route_name = Some(route.into());
        self
    }

    /// Set the upstream cluster name.
    pub fn with_cluster_name(mut self, cluster: impl Into<String>) -> Self {
        self.cluster_name = Some(cluster.into());
        self
    }

    /// Host without any `:port` suffix.
    pub fn host_without_port(&self) -> &str {
        strip_port(&self.host)
    }

    /// Path without the query string.
    pub fn path_without_query(&self) -> &str {
        match self.path.find('?') {
            Some(pos) => &self.path[..pos],
            None => &self.path,
        }
    }
}

/// Strip a trailing `:port` from a host, leaving IPv6 literals intact.
pub fn strip_port(host: &str) -> &str {
    if host.ends_with(']') {
        return host;
    }
    match host.rfind(':') {
        Some(pos) if host[pos + 1..].chars().all(|c| c.is_ascii_digit()) => &host[..pos],
        _ => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_without_port() {
        let meta = RequestMetadata::new("example.com:8080", "/");
        assert_eq!(meta.host_without_port(), "example.com");

        let meta = RequestMetadata::new("example.com", "/");
        assert_eq!(meta.host_without_port(), "example.com");
    }

    #[test]
    fn test_ipv6_host_is_kept() {
        assert_eq!(strip_port("[::1]"), "[::1]");
        assert_eq!(strip_port("[::1]:443"), "[::1]");
    }

    #[test]
    fn test_path_without_query() {
        let meta = RequestMetadata::new("a.com", "/search?q=shoes");
        assert_eq!(meta.path_without_query(), "/search");
    }

    #[test]
    fn test_builder_chain() {
        let meta = RequestMetadata::new("a.com", "/")
            .with_scheme("https")
            .with_method("POST")
            .with_route_name("route-a")
            .with_cluster_name("outbound|80||svc.default.svc.cluster.local");

        assert_eq!(meta.scheme, "https");
        assert_eq!(meta.method, "POST");
        assert_eq!(meta.route_name.as_deref(), Some("route-a"));
        assert!(meta.cluster_name.is_some());
    }
}
