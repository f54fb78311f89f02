//! Host header matching.
//!
//! # Design Decisions
//! - Host matching is case-insensitive (per HTTP spec)
//! - The port segment never takes part in a lookup
//! - A trailing dot (fully-qualified form) is ignored

use axum::http::Request;

use crate::http::request::{host_value, split_host_port};

/// Lookup key for a Host value: lowercase hostname without port.
pub fn normalize_host(raw: &str) -> String {
    let (host, _) = split_host_port(raw.trim());
    host.trim_end_matches('.').to_ascii_lowercase()
}

/// Lookup key of a request, `None` when it names no host at all.
pub fn request_host_key<B>(req: &Request<B>) -> Option<String> {
    host_value(req.headers(), req.uri())
        .map(|h| normalize_host(&h))
        .filter(|h| !h.is_empty())
}
