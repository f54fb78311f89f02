//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (after vhost lookup):
//!     → access_policy.rs (compare connection security with the vhost policy)
//!     → Allow: continue to rewrite
//!     → Redirect: 302 to the https URL
//!     → Forbidden: 403
//! ```
//!
//! # Design Decisions
//! - Checked before any rewrite or origin contact
//! - Forwarded protocol wins over the direct connection when present

pub mod access_policy;

pub use access_policy::{AccessDecision, AccessPolicy};
