//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build vhost table → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C / SIGTERM → broadcast → Stop accepting → Drain in-flight requests → Exit
//! ```
//!
//! # Design Decisions
//! - One broadcast channel; every long-running task subscribes
//! - In-flight requests finish against the table they started with

pub mod shutdown;

pub use shutdown::Shutdown;
