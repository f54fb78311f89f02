//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router that hands every request to the [`Dispatcher`]
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener
//! - Apply configuration updates while serving
//! - Stop accepting on shutdown and drain in-flight requests

use axum::{body::Body, extract::State, http::Request, response::Response, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::loader::ConfigError;
use crate::config::schema::ProxyConfig;
use crate::http::request::MakeRequestUuid;
use crate::proxy::transport::{HyperTransport, Transport};
use crate::routing::Dispatcher;

/// HTTP server for the virtual host proxy.
pub struct HttpServer {
    dispatcher: Arc<Dispatcher>,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server forwarding over a real HTTP(S) client.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        Self::with_transport(config, Arc::new(HyperTransport::new()))
    }

    /// Create a server forwarding through `transport`.
    pub fn with_transport(config: ProxyConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        let dispatcher = Arc::new(Dispatcher::from_config(&config, transport)?);
        Ok(Self { dispatcher, config })
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(self.dispatcher.clone())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Get a reference to the startup config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Every config received on `config_updates` rebuilds the vhost table; a config that
    /// fails to build is logged and the current table stays active.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            vhosts = self.dispatcher.table().len(),
            "HTTP server starting"
        );

        let dispatcher = self.dispatcher.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match dispatcher.reset_from_config(&config) {
                    Ok(()) => tracing::info!("Configuration reloaded"),
                    Err(e) => tracing::error!(error = %e, "Failed to apply configuration, keeping current vhost table"),
                }
            }
        });

        let app = self.router();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        result
    }
}

async fn dispatch_handler(State(dispatcher): State<Arc<Dispatcher>>, request: Request<Body>) -> Response {
    dispatcher.dispatch(request).await
}
