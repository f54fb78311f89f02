//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::http::request::Protocol;
use crate::security::access_policy::AccessPolicy;

/// Reserved vhost key holding the fallback route.
pub const DEFAULT_VHOST: &str = "default";

/// Origin wait used when a vhost does not set `timeout_ms` (5 minutes).
pub const DEFAULT_TIMEOUT_MS: u64 = 300_000;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Virtual hosts keyed by hostname; `default` is the fallback.
    pub vhosts: BTreeMap<String, VHostConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Forwarding options for one virtual host.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct VHostConfig {
    /// Origin hostname. Unset forwards to the requested host.
    pub host: Option<String>,

    /// Origin port. Unset (or 0) uses the requested port, unless `host` is set.
    pub port: Option<u16>,

    /// Origin scheme. Unset keeps the inbound scheme.
    pub protocol: Option<Protocol>,

    /// Path rewrite applied before forwarding.
    pub translate: Option<TranslateConfig>,

    /// How long to wait for the origin's response head, in milliseconds. 0 means the default.
    pub timeout_ms: Option<u64>,

    /// Transport-security admission policy.
    pub access: AccessPolicy,

    /// Log every request's spec and origin URL.
    pub debug: bool,
}

/// Path rewrite as written in a config file.
///
/// ```toml
/// translate = ["/api", "/v2/api"]
/// translate = { pattern = "^/u/(\\d+)", template = "/users/$1" }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TranslateConfig {
    /// `[prefix, replacement]`
    Prefix(String, String),
    Pattern { pattern: String, template: String },
}

impl VHostConfig {
    pub fn effective_port(&self) -> Option<u16> {
        self.port.filter(|p| *p != 0)
    }

    pub fn effective_timeout_ms(&self) -> u64 {
        self.timeout_ms.filter(|t| *t != 0).unwrap_or(DEFAULT_TIMEOUT_MS)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
