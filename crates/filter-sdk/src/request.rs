//! Request metadata and body classification read from the host.

use filter_core::{Direction, HostError, RequestMetadata};
use filter_host::{Host, CLUSTER_NAME_PROPERTY, ROUTE_NAME_PROPERTY};

/// Header value, empty when absent or unreadable.
pub fn header_or_empty(host: &dyn Host, direction: Direction, name: &str) -> String {
    host.header(direction, name)
        .ok()
        .flatten()
        .unwrap_or_default()
}

fn property_string(host: &dyn Host, name: &str) -> Option<String> {
    host.property(&[name])
        .ok()
        .flatten()
        .filter(|bytes| !bytes.is_empty())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Collect the metadata rule matching runs on.
///
/// Only a failure to read `:authority` is an error; every other field
/// degrades to empty.
pub fn request_metadata(host: &dyn Host) -> Result<RequestMetadata, HostError> {
    let authority = host
        .header(Direction::Request, ":authority")?
        .unwrap_or_default();
    let mut request = RequestMetadata::new(
        authority,
        header_or_empty(host, Direction::Request, ":path"),
    )
    .with_scheme(header_or_empty(host, Direction::Request, ":scheme"))
    .with_method(header_or_empty(host, Direction::Request, ":method"));

    if let Some(route) = property_string(host, ROUTE_NAME_PROPERTY) {
        request = request.with_route_name(route);
    }
    if let Some(cluster) = property_string(host, CLUSTER_NAME_PROPERTY) {
        request = request.with_cluster_name(cluster);
    }
    Ok(request)
}

/// Whether a direction's body is binary and should not be read.
///
/// Octet streams, gRPC and any content-encoded payload count as binary.
pub fn is_binary_body(host: &dyn Host, direction: Direction) -> bool {
    let content_type = header_or_empty(host, direction, "content-type");
    if content_type.contains("octet-stream") || content_type.contains("grpc") {
        return true;
    }
    !header_or_empty(host, direction, "content-encoding").is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use filter_host::{HostCall, MemoryHost};

    #[test]
    fn test_request_metadata_from_headers_and_properties() {
        let host = MemoryHost::new();
        host.set_header(Direction::Request, ":authority", "api.example.com");
        host.set_header(Direction::Request, ":path", "/v1/items?x=1");
        host.set_header(Direction::Request, ":scheme", "https");
        host.set_header(Direction::Request, ":method", "POST");
        host.insert_property(ROUTE_NAME_PROPERTY, "items-route");

        let request = request_metadata(&host).unwrap();
        assert_eq!(request.host, "api.example.com");
        assert_eq!(request.path, "/v1/items?x=1");
        assert_eq!(request.scheme, "https");
        assert_eq!(request.method, "POST");
        assert_eq!(request.route_name.as_deref(), Some("items-route"));
        assert_eq!(request.cluster_name, None);
    }

    #[test]
    fn test_authority_failure_is_an_error() {
        let host = MemoryHost::new();
        host.fail_on(
            HostCall::Header(Direction::Request, ":authority".to_string()),
            HostError::InternalFailure,
        );
        assert_eq!(request_metadata(&host), Err(HostError::InternalFailure));
    }

    #[test]
    fn test_binary_body_classification() {
        let host = MemoryHost::new();
        assert!(!is_binary_body(&host, Direction::Response));

        host.set_header(Direction::Response, "content-type", "application/json");
        assert!(!is_binary_body(&host, Direction::Response));

        host.set_header(Direction::Response, "content-type", "application/octet-stream");
        assert!(is_binary_body(&host, Direction::Response));

        host.set_header(Direction::Request, "content-type", "application/grpc+proto");
        assert!(is_binary_body(&host, Direction::Request));
    }

    #[test]
    fn test_content_encoding_is_binary() {
        let host = MemoryHost::new();
        host.set_header(Direction::Response, "content-type", "text/html");
        host.set_header(Direction::Response, "content-encoding", "gzip");
        assert!(is_binary_body(&host, Direction::Response));
    }
}
