//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Vhost keys are bare hostnames, never `host:port`
//! - No two vhost keys name the same host once case and trailing dots are ignored
//! - Rewrite patterns compile
//! - Addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashMap;
use std::net::SocketAddr;

use crate::config::schema::{ProxyConfig, TranslateConfig};
use crate::routing::matcher::normalize_host;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("vhost name must not be empty")]
    EmptyVHost,

    #[error("vhost {0:?} must not include a port")]
    VHostWithPort(String),

    #[error("vhosts {first:?} and {second:?} name the same host")]
    DuplicateVHost { first: String, second: String },

    #[error("vhost {0:?}: target host must not be empty")]
    EmptyTargetHost(String),

    #[error("vhost {vhost:?}: invalid rewrite pattern: {reason}")]
    InvalidPattern { vhost: String, reason: String },

    #[error("invalid {field} {value:?}")]
    InvalidAddress { field: &'static str, value: String },
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let mut seen: HashMap<String, &String> = HashMap::new();
    for (name, vhost) in &config.vhosts {
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyVHost);
        } else if name.contains(':') {
            errors.push(ValidationError::VHostWithPort(name.clone()));
        } else if let Some(first) = seen.insert(normalize_host(name), name) {
            errors.push(ValidationError::DuplicateVHost {
                first: first.clone(),
                second: name.clone(),
            });
        }

        if vhost.host.as_deref().is_some_and(|h| h.trim().is_empty()) {
            errors.push(ValidationError::EmptyTargetHost(name.clone()));
        }

        if let Some(TranslateConfig::Pattern { pattern, .. }) = &vhost.translate {
            if let Err(e) = regex::Regex::new(pattern) {
                errors.push(ValidationError::InvalidPattern {
                    vhost: name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
