//! Origin URL reconstruction.
//!
//! Explicit route overrides win over the inbound request. An overridden target host never
//! inherits the client-facing port; only an explicit target port is used with it.

use crate::http::request::{Protocol, RequestSpec};
use crate::proxy::handler::RouteConfig;

/// `protocol://host[:port]path`, eliding the scheme's default port.
pub fn construct_url(protocol: Protocol, host: &str, port: Option<u16>, path: &str) -> String {
    let port = port.filter(|p| *p != protocol.default_port());
    match port {
        Some(port) => format!("{protocol}://{host}:{port}{path}"),
        None => format!("{protocol}://{host}{path}"),
    }
}

/// Fully-qualified origin URL for `path` under `route`.
pub fn target_url(route: &RouteConfig, spec: &RequestSpec, path: &str) -> String {
    let protocol = route.target_protocol.unwrap_or(spec.protocol);
    let host = route.target_host.as_deref().unwrap_or(&spec.host);
    let port = match (&route.target_host, route.target_port) {
        (_, Some(port)) => Some(port),
        (None, None) => spec.port,
        (Some(_), None) => None,
    };
    construct_url(protocol, host, port, path)
}
