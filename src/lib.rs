//! Host-based HTTP reverse proxy library.
//!
//! Requests are dispatched on their `Host` header to a per-vhost pipeline
//! (access policy, path rewrite, origin forwarding), to a user handler, or to a
//! fallback that lists the configured hosts.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;
pub mod security;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{Dispatcher, VHostEntry};
