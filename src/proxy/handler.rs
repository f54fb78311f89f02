//! Per-route request pipeline.
//!
//! ```text
//! request → access policy → rewrite → target URL → forwarder → origin response
//!              │               │                        │
//!              ▼               ▼                        ▼
//!         302 / 403          404                  503 / 502 / 504 / 500
//! ```

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Duration;

use crate::config::schema::{VHostConfig, DEFAULT_TIMEOUT_MS};
use crate::error::ProxyError;
use crate::http::request::{ForwardedSpec, Protocol, RequestSpec};
use crate::http::response::redirect;
use crate::proxy::forwarder::Forwarder;
use crate::proxy::rewrite::RewriteRule;
use crate::proxy::target::target_url;
use crate::proxy::transport::Transport;
use crate::security::access_policy::{AccessDecision, AccessPolicy};

/// Immutable forwarding rules for one virtual host.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    pub target_host: Option<String>,
    pub target_port: Option<u16>,
    pub target_protocol: Option<Protocol>,
    pub rewrite: RewriteRule,
    pub timeout: Duration,
    pub access: AccessPolicy,
    pub debug: bool,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            target_host: None,
            target_port: None,
            target_protocol: None,
            rewrite: RewriteRule::Identity,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            access: AccessPolicy::Any,
            debug: false,
        }
    }
}

impl RouteConfig {
    pub fn from_vhost(config: &VHostConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            target_host: config.host.clone(),
            target_port: config.effective_port(),
            target_protocol: config.protocol,
            rewrite: RewriteRule::from_config(config.translate.as_ref())?,
            timeout: Duration::from_millis(config.effective_timeout_ms()),
            access: config.access,
            debug: config.debug,
        })
    }
}

/// Handler that proxies every request according to a [`RouteConfig`].
#[derive(Clone)]
pub struct ProxyHandler {
    route: Arc<RouteConfig>,
    forwarder: Forwarder,
}

impl ProxyHandler {
    pub fn new(route: RouteConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            route: Arc::new(route),
            forwarder: Forwarder::new(transport),
        }
    }

    pub fn route(&self) -> &RouteConfig {
        &self.route
    }

    pub async fn handle(&self, req: Request<Body>) -> Response {
        match self.process(req).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }

    async fn process(&self, req: Request<Body>) -> Result<Response, ProxyError> {
        let spec = RequestSpec::from_request(&req)
            .map_err(|_| ProxyError::UnrecognizedVHost { host: String::new() })?;
        if self.route.debug {
            tracing::info!(request = ?spec, "Request");
        }

        let forwarded = ForwardedSpec::from_headers(req.headers());
        match self.route.access.check(&spec, &forwarded) {
            AccessDecision::Allow => {}
            AccessDecision::Redirect(location) => return Ok(redirect(&location)),
            AccessDecision::Forbidden => return Err(ProxyError::PlainOnly),
        }

        let (parts, body) = req.into_parts();
        let path = match self.route.rewrite.apply(&spec.path, &spec, &parts) {
            Some(path) => path,
            None => {
                tracing::warn!(path = %spec.path, host = %spec.host, "Failed to translate URL");
                return Err(ProxyError::RewriteMismatch { path: spec.path });
            }
        };

        let url = target_url(&self.route, &spec, &path);
        if self.route.debug {
            tracing::info!(url = %spec.path, origin = %url, "Forwarding");
        }

        self.forwarder.forward(&url, parts, body, self.route.timeout).await
    }
}
