//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! RequestSpec + RouteConfig
//!     → rewrite.rs (translate the path, or reject)
//!     → target.rs (build the absolute origin URL)
//!     → forwarder.rs (send through a Transport, map failures)
//!     → transport.rs (HTTP/1.1 client, per-request timeout)
//! ```
//!
//! # Design Decisions
//! - The outbound client sits behind the `Transport` trait so tests can inject failures
//! - Origin responses stream back untouched; only failures are rewritten
//! - No retries and no connection reuse

pub mod forwarder;
pub mod handler;
pub mod rewrite;
pub mod target;
pub mod transport;

pub use handler::{ProxyHandler, RouteConfig};
pub use rewrite::RewriteRule;
pub use transport::{HyperTransport, Transport, TransportError, TransportErrorKind};
