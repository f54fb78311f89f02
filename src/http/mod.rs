//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span)
//!     → routing::Dispatcher (vhost lookup)
//!     → request.rs (RequestSpec / ForwardedSpec extraction)
//!     → proxy pipeline, or response.rs for locally generated pages
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{ConnectionSecurity, ForwardedSpec, Protocol, RequestSpec, X_REQUEST_ID};
pub use server::HttpServer;
