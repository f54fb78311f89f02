//! Failures the proxy answers with a synthesized response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::http::response::{status_page, StatusMessage};
use crate::proxy::transport::{TransportError, TransportErrorKind};

/// Terminal request failures. Each maps to exactly one status; none is retried.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("no rewrite matched path {path}")]
    RewriteMismatch { path: String },

    #[error("secure request rejected by plain-only policy")]
    PlainOnly,

    #[error("origin request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("invalid target URL {url}")]
    InvalidTarget { url: String },

    #[error("unrecognised vhost {host:?}")]
    UnrecognizedVHost { host: String },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::RewriteMismatch { .. } | ProxyError::UnrecognizedVHost { .. } => StatusCode::NOT_FOUND,
            ProxyError::PlainOnly => StatusCode::FORBIDDEN,
            ProxyError::Transport(err) => transport_status(err.kind),
            ProxyError::InvalidTarget { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Status answered for a failed origin exchange.
pub fn transport_status(kind: TransportErrorKind) -> StatusCode {
    match kind {
        TransportErrorKind::ConnectionRefused => StatusCode::SERVICE_UNAVAILABLE,
        TransportErrorKind::ConnectionReset => StatusCode::BAD_GATEWAY,
        TransportErrorKind::TimedOut => StatusCode::GATEWAY_TIMEOUT,
        TransportErrorKind::Other => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ProxyError::UnrecognizedVHost { host } => {
                let message = format!("Unrecognised vhost: {host}");
                status_page(status, StatusMessage::Text(&message))
            }
            _ => status_page(status, StatusMessage::None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_status_mapping() {
        let cases = [
            (TransportErrorKind::ConnectionRefused, 503),
            (TransportErrorKind::ConnectionReset, 502),
            (TransportErrorKind::TimedOut, 504),
            (TransportErrorKind::Other, 500),
        ];
        for (kind, status) in cases {
            let err = ProxyError::from(TransportError::new(kind, "x"));
            assert_eq!(err.status().as_u16(), status, "{kind}");
        }
    }

    #[test]
    fn test_local_failures() {
        assert_eq!(ProxyError::RewriteMismatch { path: "/x".into() }.status(), StatusCode::NOT_FOUND);
        assert_eq!(ProxyError::PlainOnly.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ProxyError::InvalidTarget { url: "x".into() }.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_into_response_is_status_page() {
        let response = ProxyError::PlainOnly.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers()[axum::http::header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
    }
}
