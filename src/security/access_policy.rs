//! Transport-security admission policy.
//!
//! The effective security flag is the forwarded one when an upstream terminator reported a
//! protocol, otherwise the direct connection's.

use serde::{Deserialize, Serialize};

use crate::http::request::{ForwardedSpec, Protocol, RequestSpec};
use crate::proxy::target::construct_url;

/// Which transports a route accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPolicy {
    /// No restriction.
    #[default]
    Any,
    /// Plain requests are redirected to https.
    Secure,
    /// Secure requests are rejected.
    Plain,
}

/// Result of evaluating a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    /// Respond `302` to this location.
    Redirect(String),
    /// Respond `403 Forbidden`.
    Forbidden,
}

impl AccessPolicy {
    pub fn check(&self, spec: &RequestSpec, forwarded: &ForwardedSpec) -> AccessDecision {
        let secure = forwarded.resolve_secure(spec);
        match self {
            AccessPolicy::Any => AccessDecision::Allow,
            AccessPolicy::Secure if !secure => {
                AccessDecision::Redirect(construct_url(Protocol::Https, &spec.host, None, &spec.path))
            }
            AccessPolicy::Plain if secure => AccessDecision::Forbidden,
            _ => AccessDecision::Allow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(secure: bool) -> RequestSpec {
        RequestSpec {
            host: "site.example.com".into(),
            port: Some(8080),
            protocol: if secure { Protocol::Https } else { Protocol::Http },
            secure,
            path: "/a?b=1".into(),
        }
    }

    fn forwarded(secure: Option<bool>) -> ForwardedSpec {
        ForwardedSpec {
            protocol: secure.map(|s| if s { Protocol::Https } else { Protocol::Http }),
            secure,
            ..ForwardedSpec::default()
        }
    }

    #[test]
    fn test_any_never_blocks() {
        for direct in [false, true] {
            for fwd in [None, Some(false), Some(true)] {
                assert_eq!(AccessPolicy::Any.check(&spec(direct), &forwarded(fwd)), AccessDecision::Allow);
            }
        }
    }

    #[test]
    fn test_secure_redirects_plain() {
        assert_eq!(
            AccessPolicy::Secure.check(&spec(false), &forwarded(None)),
            AccessDecision::Redirect("https://site.example.com/a?b=1".into())
        );
        assert_eq!(AccessPolicy::Secure.check(&spec(true), &forwarded(None)), AccessDecision::Allow);
    }

    #[test]
    fn test_forwarded_flag_takes_precedence() {
        // Terminated upstream: plain hop, secure client.
        assert_eq!(
            AccessPolicy::Secure.check(&spec(false), &forwarded(Some(true))),
            AccessDecision::Allow
        );
        assert_eq!(
            AccessPolicy::Plain.check(&spec(false), &forwarded(Some(true))),
            AccessDecision::Forbidden
        );
        assert_eq!(
            AccessPolicy::Plain.check(&spec(true), &forwarded(Some(false))),
            AccessDecision::Allow
        );
    }

    #[test]
    fn test_plain_rejects_secure() {
        assert_eq!(AccessPolicy::Plain.check(&spec(true), &forwarded(None)), AccessDecision::Forbidden);
        assert_eq!(AccessPolicy::Plain.check(&spec(false), &forwarded(None)), AccessDecision::Allow);
    }

    #[test]
    fn test_policy_from_config_value() {
        #[derive(Deserialize)]
        struct Wrapper {
            access: AccessPolicy,
        }
        let parsed: Wrapper = toml::from_str("access = \"secure\"").unwrap();
        assert_eq!(parsed.access, AccessPolicy::Secure);
        assert!(toml::from_str::<Wrapper>("access = \"sometimes\"").is_err());
    }
}
