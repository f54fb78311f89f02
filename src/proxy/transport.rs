//! Outbound transport.
//!
//! # Responsibilities
//! - Define the [`Transport`] capability the forwarder talks to
//! - Provide the hyper-based implementation used in production
//! - Classify connection failures into the kinds the forwarder maps to statuses
//!
//! # Design Decisions
//! - One attempt per call; no retries, no idle connection pooling
//! - The timeout bounds the wait for response headers only, never the body stream
//! - Bodies are streamed in both directions

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request, Response, Uri, Version},
};
use futures_util::future::BoxFuture;
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::time::Duration;

/// A request ready to leave the proxy.
#[derive(Debug)]
pub struct OutboundRequest {
    pub url: Uri,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Body,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    ConnectionRefused,
    ConnectionReset,
    TimedOut,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportErrorKind::ConnectionRefused => "connection refused",
            TransportErrorKind::ConnectionReset => "connection reset",
            TransportErrorKind::TimedOut => "timed out",
            TransportErrorKind::Other => "transport error",
        })
    }
}

/// Failure to obtain a response from the origin.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timed_out(after: Duration) -> Self {
        Self::new(
            TransportErrorKind::TimedOut,
            format!("no response within {}ms", after.as_millis()),
        )
    }

    /// Classify an arbitrary error by walking its source chain.
    pub fn classify(err: &(dyn StdError + 'static)) -> Self {
        let kind = classify_chain(err);
        Self::new(kind, error_chain_message(err))
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::classify(&err)
    }
}

fn classify_chain(err: &(dyn StdError + 'static)) -> TransportErrorKind {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionRefused => return TransportErrorKind::ConnectionRefused,
                io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof => return TransportErrorKind::ConnectionReset,
                io::ErrorKind::TimedOut => return TransportErrorKind::TimedOut,
                _ => {}
            }
        }
        if let Some(hyper_err) = e.downcast_ref::<hyper::Error>() {
            if hyper_err.is_timeout() {
                return TransportErrorKind::TimedOut;
            }
            // Origin hung up before completing the response head.
            if hyper_err.is_incomplete_message() || hyper_err.is_canceled() {
                return TransportErrorKind::ConnectionReset;
            }
        }
        current = e.source();
    }
    TransportErrorKind::Other
}

fn error_chain_message(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(e) = current {
        message.push_str(": ");
        message.push_str(&e.to_string());
        current = e.source();
    }
    message
}

/// Capability to perform one outbound HTTP exchange.
pub trait Transport: Send + Sync {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'static, Result<Response<Body>, TransportError>>;
}

type HttpsClient = Client<HttpsConnector<HttpConnector>, Body>;

/// HTTP/1.1 transport over plain TCP or TLS, chosen by the URL scheme.
#[derive(Clone)]
pub struct HyperTransport {
    client: HttpsClient,
}

impl HyperTransport {
    pub fn new() -> Self {
        // Both rustls providers are linked into the binary, so one must be chosen explicitly.
        // An error here means a provider is already installed, which is all the builder needs.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_nodelay(true);

        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(https);

        Self { client }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperTransport").finish_non_exhaustive()
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'static, Result<Response<Body>, TransportError>> {
        let client = self.client.clone();
        Box::pin(async move {
            let timeout = request.timeout;
            let outbound = build_request(request)?;

            match tokio::time::timeout(timeout, client.request(outbound)).await {
                Ok(Ok(response)) => {
                    let (parts, body) = response.into_parts();
                    Ok(Response::from_parts(parts, Body::new(body)))
                }
                Ok(Err(err)) => Err(TransportError::classify(&err)),
                Err(_) => Err(TransportError::timed_out(timeout)),
            }
        })
    }
}

fn build_request(request: OutboundRequest) -> Result<Request<Body>, TransportError> {
    let OutboundRequest {
        url,
        method,
        mut headers,
        body,
        ..
    } = request;

    let authority = url
        .authority()
        .ok_or_else(|| TransportError::new(TransportErrorKind::Other, format!("target URL has no authority: {url}")))?;
    let host = HeaderValue::from_str(authority.as_str())
        .map_err(|e| TransportError::new(TransportErrorKind::Other, e.to_string()))?;
    headers.insert(header::HOST, host);

    let mut outbound = Request::new(body);
    *outbound.method_mut() = method;
    *outbound.uri_mut() = url;
    *outbound.version_mut() = Version::HTTP_11;
    *outbound.headers_mut() = headers;
    Ok(outbound)
}
