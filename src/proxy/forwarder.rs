//! Streaming hand-off to the transport.

use axum::{
    body::Body,
    http::{request::Parts, Uri},
    response::Response,
};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ProxyError;
use crate::proxy::transport::{OutboundRequest, Transport, TransportErrorKind};

/// Sends one request per call through the injected [`Transport`].
#[derive(Clone)]
pub struct Forwarder {
    transport: Arc<dyn Transport>,
}

impl Forwarder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Forward the request head and body stream to `url` and return the origin response untouched.
    ///
    /// Dropping the returned future aborts the outbound exchange.
    pub async fn forward(
        &self,
        url: &str,
        parts: Parts,
        body: Body,
        timeout: Duration,
    ) -> Result<Response, ProxyError> {
        let target: Uri = url.parse().map_err(|_| {
            tracing::error!(target_url = %url, "Reconstructed target URL is invalid");
            ProxyError::InvalidTarget { url: url.to_string() }
        })?;

        let request = OutboundRequest {
            url: target,
            method: parts.method,
            headers: parts.headers,
            body,
            timeout,
        };

        self.transport.send(request).await.map_err(|err| {
            match err.kind {
                TransportErrorKind::ConnectionRefused => {
                    tracing::error!(target_url = %url, "Connection refused by origin")
                }
                TransportErrorKind::ConnectionReset => {
                    tracing::error!(target_url = %url, "Connection reset by origin")
                }
                TransportErrorKind::TimedOut => {
                    tracing::error!(target_url = %url, "Timed out waiting for origin")
                }
                TransportErrorKind::Other => {
                    tracing::error!(target_url = %url, error = %err.message, "Internal error while connecting to origin")
                }
            }
            ProxyError::Transport(err)
        })
    }
}
