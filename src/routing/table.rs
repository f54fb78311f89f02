//! Virtual host table.
//!
//! A [`VHostTable`] is an immutable snapshot: hostname → [`Handler`] plus exactly one
//! fallback. Reconfiguration builds a new table; entries are never edited in place.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use futures_util::future::BoxFuture;
use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::future::Future;
use std::sync::Arc;

use crate::config::loader::ConfigError;
use crate::config::schema::{ProxyConfig, VHostConfig, DEFAULT_VHOST};
use crate::http::request::{host_value, request_path, split_host_port, ForwardedSpec, Protocol, RequestSpec};
use crate::http::response::{escape_html, status_page, StatusMessage};
use crate::proxy::handler::{ProxyHandler, RouteConfig};
use crate::proxy::target::construct_url;
use crate::proxy::transport::Transport;
use crate::routing::matcher::normalize_host;

/// Opaque user-supplied request handler.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, req: Request<Body>) -> BoxFuture<'static, Response>;
}

impl<F, Fut> RequestHandler for F
where
    F: Fn(Request<Body>) -> Fut + Send + Sync,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn handle(&self, req: Request<Body>) -> BoxFuture<'static, Response> {
        Box::pin(self(req))
    }
}

/// Value supplied for one hostname when (re)building a table.
pub enum VHostEntry {
    /// Proxy using options as read from a config file.
    Proxy(VHostConfig),
    /// Proxy using a fully built route (allows custom rewrites).
    Route(RouteConfig),
    /// Hand the request to user code.
    Handler(Arc<dyn RequestHandler>),
}

impl VHostEntry {
    pub fn handler<H: RequestHandler + 'static>(handler: H) -> Self {
        VHostEntry::Handler(Arc::new(handler))
    }
}

#[derive(Clone)]
pub enum Handler {
    Custom(Arc<dyn RequestHandler>),
    Proxy(ProxyHandler),
    /// Synthesized fallback listing the configured hosts.
    Listing(ListingHandler),
}

impl Handler {
    pub async fn handle(&self, req: Request<Body>) -> Response {
        match self {
            Handler::Custom(handler) => handler.handle(req).await,
            Handler::Proxy(handler) => handler.handle(req).await,
            Handler::Listing(handler) => handler.handle(&req),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Custom(_) => f.write_str("Custom(..)"),
            Handler::Proxy(handler) => f.debug_tuple("Proxy").field(handler.route()).finish(),
            Handler::Listing(handler) => f.debug_tuple("Listing").field(&handler.hosts).finish(),
        }
    }
}

/// Answers `404` with links to every configured host at the requested path.
#[derive(Debug, Clone)]
pub struct ListingHandler {
    hosts: Arc<[String]>,
}

impl ListingHandler {
    pub fn new(hosts: impl IntoIterator<Item = String>) -> Self {
        Self {
            hosts: hosts.into_iter().collect(),
        }
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn handle<B>(&self, req: &Request<B>) -> Response {
        let spec = RequestSpec::from_request(req).unwrap_or_else(|_| RequestSpec {
            host: String::new(),
            port: None,
            protocol: Protocol::Http,
            secure: false,
            path: request_path(req.uri()),
        });
        let forwarded = ForwardedSpec::from_headers(req.headers());
        let requested = host_value(req.headers(), req.uri())
            .map(|h| split_host_port(&h).0.to_string())
            .unwrap_or_default();

        let protocol = forwarded.protocol.unwrap_or(spec.protocol);
        let port = forwarded.port.or(spec.port);

        status_page(
            StatusCode::NOT_FOUND,
            StatusMessage::Render(Box::new(|out: &mut String| {
                let _ = write!(out, "<p>Unrecognised vhost: {}</p><p>", escape_html(&requested));
                for (i, hostname) in self.hosts.iter().enumerate() {
                    if i == 0 {
                        out.push_str("Did you mean:<br/>");
                    }
                    let url = escape_html(&construct_url(protocol, hostname, port, &spec.path));
                    let _ = write!(out, "<a href=\"{url}\">{url}</a><br/>");
                }
                out.push_str("</p>");
            })),
        )
    }
}

/// Immutable routing snapshot.
#[derive(Debug, Clone)]
pub struct VHostTable {
    hosts: BTreeMap<String, Handler>,
    fallback: Handler,
}

impl VHostTable {
    /// Classify `entries` into a table. The reserved `default` key becomes the fallback;
    /// without it the fallback lists the other hosts.
    pub fn build<I>(entries: I, transport: Arc<dyn Transport>) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, VHostEntry)>,
    {
        let mut hosts = BTreeMap::new();
        let mut fallback = None;

        for (name, entry) in entries {
            let key = normalize_host(&name);
            let handler = match entry {
                VHostEntry::Proxy(config) => {
                    let route = RouteConfig::from_vhost(&config)
                        .map_err(|source| ConfigError::Rewrite { vhost: name.clone(), source })?;
                    Handler::Proxy(ProxyHandler::new(route, transport.clone()))
                }
                VHostEntry::Route(route) => Handler::Proxy(ProxyHandler::new(route, transport.clone())),
                VHostEntry::Handler(handler) => Handler::Custom(handler),
            };

            if key == DEFAULT_VHOST {
                fallback = Some(handler);
            } else {
                hosts.insert(key, handler);
            }
        }

        let fallback =
            fallback.unwrap_or_else(|| Handler::Listing(ListingHandler::new(hosts.keys().cloned())));
        Ok(Self { hosts, fallback })
    }

    pub fn from_config(config: &ProxyConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        let entries = config
            .vhosts
            .iter()
            .map(|(name, vhost)| (name.clone(), VHostEntry::Proxy(vhost.clone())));
        Self::build(entries, transport)
    }

    /// Handler for a normalized host key, if configured.
    pub fn get(&self, key: &str) -> Option<&Handler> {
        self.hosts.get(key)
    }

    pub fn fallback(&self) -> &Handler {
        &self.fallback
    }

    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.hosts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
