//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Extract the routing-relevant description of a request (host, port, protocol, path)
//! - Extract the same description as reported by an upstream terminator (`X-Forwarded-*`)
//!
//! # Design Decisions
//! - Extraction never rejects malformed values; an unparsable port is simply absent
//! - Connection security comes from a request extension set by whoever owns the socket

use axum::http::{header, request::Parts, HeaderMap, HeaderValue, Request, Uri};
use std::fmt;
use tower_http::request_id::{MakeRequestId, RequestId};

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_FORWARDED_PORT: &str = "x-forwarded-port";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Scheme used to reach the proxy or an origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    /// Port implied by the scheme when none is written in the authority.
    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Http => 80,
            Protocol::Https => 443,
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, Protocol::Https)
    }

    /// Lenient parse used for forwarded headers: only `https` counts as secure.
    fn from_forwarded(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("https") {
            Protocol::Https
        } else {
            Protocol::Http
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security state of the inbound connection.
///
/// Inserted into request extensions by the component that accepted the socket.
/// Requests without it are treated as plain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionSecurity {
    #[default]
    Plain,
    Encrypted,
}

/// Normalized description of an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub host: String,
    pub port: Option<u16>,
    pub protocol: Protocol,
    pub secure: bool,
    /// Path plus query, as received.
    pub path: String,
}

/// The request as reported by an upstream terminator. Absent fields defer to [`RequestSpec`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardedSpec {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<Protocol>,
    pub secure: Option<bool>,
}

/// Returned when the request carries no host at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("request has no Host header")]
pub struct MissingHost;

impl RequestSpec {
    pub fn from_request<B>(req: &Request<B>) -> Result<Self, MissingHost> {
        let security = req
            .extensions()
            .get::<ConnectionSecurity>()
            .copied()
            .unwrap_or_default();
        Self::extract(req.headers(), req.uri(), security)
    }

    pub fn from_parts(parts: &Parts) -> Result<Self, MissingHost> {
        let security = parts
            .extensions
            .get::<ConnectionSecurity>()
            .copied()
            .unwrap_or_default();
        Self::extract(&parts.headers, &parts.uri, security)
    }

    fn extract(headers: &HeaderMap, uri: &Uri, security: ConnectionSecurity) -> Result<Self, MissingHost> {
        let authority = host_value(headers, uri).ok_or(MissingHost)?;
        let (host, port) = split_host_port(&authority);

        // Absolute-form requests carry their own scheme.
        let secure = security == ConnectionSecurity::Encrypted
            || uri.scheme_str().is_some_and(|s| s.eq_ignore_ascii_case("https"));
        let protocol = if secure { Protocol::Https } else { Protocol::Http };

        Ok(Self {
            host: host.to_string(),
            port,
            protocol,
            secure,
            path: request_path(uri),
        })
    }
}

impl ForwardedSpec {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let protocol = header_str(headers, X_FORWARDED_PROTO).map(Protocol::from_forwarded);
        Self {
            host: header_str(headers, X_FORWARDED_FOR).map(str::to_string),
            port: header_str(headers, X_FORWARDED_PORT).and_then(|p| p.trim().parse().ok()),
            protocol,
            secure: protocol.map(|p| p.is_secure()),
        }
    }

    /// Security flag to use for policy decisions: forwarded when known, else the direct connection.
    pub fn resolve_secure(&self, direct: &RequestSpec) -> bool {
        self.secure.unwrap_or(direct.secure)
    }
}

/// Host header value, falling back to the URI authority (HTTP/2 `:authority`).
pub fn host_value(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.as_str().to_string()))
}

/// Split `host[:port]`. A missing or unparsable port yields `None`.
pub fn split_host_port(authority: &str) -> (&str, Option<u16>) {
    // Bracketed IPv6 literal: [::1]:8080
    if let Some(rest) = authority.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            let host = &authority[..end + 2];
            let port = rest[end + 1..].strip_prefix(':').and_then(|p| p.parse().ok());
            return (host, port);
        }
    }
    match authority.split_once(':') {
        Some((host, port)) => (host, port.parse().ok()),
        None => (authority, None),
    }
}

/// Path and query of a request URI; `/` when the URI has none.
pub fn request_path(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).filter(|v| !v.is_empty())
}

/// Generates `x-request-id` values for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}
