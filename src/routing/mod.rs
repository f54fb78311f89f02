//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (Host header)
//!     → matcher.rs (lowercase, strip port)
//!     → dispatcher.rs (load current table snapshot)
//!     → table.rs (exact hostname lookup, else fallback)
//!     → Handler: proxy pipeline, user handler, or host listing
//!
//! Table Compilation (startup and every reload):
//!     vhost entries
//!     → Classify (`default` becomes the fallback)
//!     → Compile rewrite rules
//!     → Freeze as immutable VHostTable
//!     → Atomic swap into the Dispatcher
//! ```
//!
//! # Design Decisions
//! - Tables are immutable at runtime; reconfiguration replaces the whole table
//! - Exact hostname matching only, no wildcards
//! - The fallback always exists, synthesized when not configured

pub mod dispatcher;
pub mod matcher;
pub mod table;

pub use dispatcher::Dispatcher;
pub use table::{Handler, RequestHandler, VHostEntry, VHostTable};
