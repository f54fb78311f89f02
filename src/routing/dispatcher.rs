//! Host-based dispatch.
//!
//! # Responsibilities
//! - Hold the active [`VHostTable`] snapshot
//! - Route each request by Host header (port ignored) or to the fallback
//! - Replace the whole table on `reset`
//!
//! # Design Decisions
//! - `ArcSwap` gives lock-free reads; a request loads one snapshot and keeps it
//!   until its response is produced, so it never sees a mix of old and new entries
//! - A failed rebuild leaves the current table active

use arc_swap::ArcSwap;
use axum::{body::Body, http::Request, response::Response};
use std::sync::Arc;
use std::time::Instant;

use crate::config::loader::ConfigError;
use crate::config::schema::{ProxyConfig, DEFAULT_VHOST};
use crate::observability::metrics;
use crate::proxy::transport::Transport;
use crate::routing::matcher::request_host_key;
use crate::routing::table::{VHostEntry, VHostTable};

pub struct Dispatcher {
    table: ArcSwap<VHostTable>,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new<I>(entries: I, transport: Arc<dyn Transport>) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, VHostEntry)>,
    {
        let table = VHostTable::build(entries, transport.clone())?;
        Ok(Self {
            table: ArcSwap::from_pointee(table),
            transport,
        })
    }

    pub fn from_config(config: &ProxyConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        let table = VHostTable::from_config(config, transport.clone())?;
        Ok(Self {
            table: ArcSwap::from_pointee(table),
            transport,
        })
    }

    /// Build a new table from `entries` and swap it in atomically.
    pub fn reset<I>(&self, entries: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, VHostEntry)>,
    {
        let table = VHostTable::build(entries, self.transport.clone())?;
        self.install(table);
        Ok(())
    }

    pub fn reset_from_config(&self, config: &ProxyConfig) -> Result<(), ConfigError> {
        let table = VHostTable::from_config(config, self.transport.clone())?;
        self.install(table);
        Ok(())
    }

    fn install(&self, table: VHostTable) {
        tracing::info!(vhosts = table.len(), "VHost table replaced");
        self.table.store(Arc::new(table));
    }

    /// Current snapshot.
    pub fn table(&self) -> Arc<VHostTable> {
        self.table.load_full()
    }

    pub async fn dispatch(&self, req: Request<Body>) -> Response {
        let start = Instant::now();
        let method = req.method().clone();
        let table = self.table.load_full();
        let key = request_host_key(&req);

        let (label, handler) = match key.as_deref().and_then(|k| table.get(k).map(|h| (k, h))) {
            Some((k, handler)) => (k.to_string(), handler),
            None => {
                tracing::debug!(host = ?key, "No vhost matched, using fallback");
                (DEFAULT_VHOST.to_string(), table.fallback())
            }
        };

        let response = handler.handle(req).await;
        metrics::record_request(method.as_str(), response.status().as_u16(), &label, start);
        response
    }
}
