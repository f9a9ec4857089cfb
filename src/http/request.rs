//! Request forwarding.
//!
//! # Responsibilities
//! - Map the inbound target into the backend's namespace
//! - Carry method, headers, body and framing across the hop unchanged
//!
//! # Design Decisions
//! - The inbound header map is moved, never shared, into the outbound request
//! - `content-length` / `transfer-encoding` travel with the headers so the
//!   backend sees the same framing the client chose
//! - The body is streamed, never collected
//! - Construction failures are final; nothing here is retried

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Uri, Version};
use url::Url;

use crate::http::error::GatewayError;

/// Path namespace that is proxied to the backend.
pub const API_PREFIX: &str = "/api/v1/";

/// Builds backend requests out of inbound ones.
#[derive(Debug, Clone)]
pub struct RequestForwarder {
    base: Url,
    host: HeaderValue,
}

impl RequestForwarder {
    /// `authority` is what the backend sees as `Host`; it must be a valid
    /// URI authority (checked by config validation).
    pub fn new(authority: &str) -> Result<Self, GatewayError> {
        let invalid = |reason: String| GatewayError::InvalidTarget {
            path: authority.to_string(),
            reason,
        };
        let base = Url::parse(&format!("http://{}/", authority)).map_err(|e| invalid(e.to_string()))?;
        let host = HeaderValue::from_str(authority).map_err(|e| invalid(e.to_string()))?;
        Ok(Self { base, host })
    }

    /// Turn the inbound request into the request sent to the backend.
    pub fn forward(&self, request: Request<Body>) -> Result<Request<Body>, GatewayError> {
        let (parts, body) = request.into_parts();
        let target = self.backend_target(&parts.uri)?;

        let mut outbound = Request::new(body);
        *outbound.method_mut() = parts.method;
        *outbound.uri_mut() = target;
        *outbound.version_mut() = backend_version(parts.version);
        *outbound.headers_mut() = parts.headers;
        outbound.headers_mut().insert(header::HOST, self.host.clone());

        Ok(outbound)
    }

    /// Check the inbound target against the backend base URL and return it in
    /// origin form.
    ///
    /// The client's bytes are forwarded as sent. Only a path with dot
    /// segments is replaced by its resolved form, and the query is never
    /// re-encoded.
    fn backend_target(&self, uri: &Uri) -> Result<Uri, GatewayError> {
        let path = uri.path();
        let invalid = |reason: &str| GatewayError::InvalidTarget {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let raw = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or(path);
        if !raw.starts_with('/') {
            return Err(invalid("target is not an absolute path"));
        }

        let joined = self.base.join(raw).map_err(|e| invalid(&e.to_string()))?;
        if joined.host_str() != self.base.host_str() || joined.port() != self.base.port() {
            return Err(invalid("target changes the backend authority"));
        }
        if !joined.path().starts_with(API_PREFIX) {
            return Err(invalid("target resolves outside the proxied namespace"));
        }

        if !has_dot_segment(path) {
            return raw.parse::<Uri>().map_err(|e| invalid(&e.to_string()));
        }

        let origin_form = match uri.query() {
            Some(query) => format!("{}?{}", joined.path(), query),
            None => joined.path().to_string(),
        };
        origin_form
            .parse::<Uri>()
            .map_err(|e| invalid(&e.to_string()))
    }
}

/// True when a segment of `path` is `.` or `..`, percent-encoded or not.
fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

/// The backend hop speaks HTTP/1 only.
fn backend_version(version: Version) -> Version {
    match version {
        Version::HTTP_10 | Version::HTTP_11 => version,
        other => {
            tracing::debug!(version = ?other, "Forwarding as HTTP/1.1");
            Version::HTTP_11
        }
    }
}
