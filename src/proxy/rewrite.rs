//! Path rewriting.
//!
//! A [`RewriteRule`] is classified once, when the route is built, and applied with a single
//! `match` per request. `None` from [`RewriteRule::apply`] means "no match" and is the only
//! failure a rule can report.

use axum::http::{request::Parts, uri::PathAndQuery};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::config::schema::TranslateConfig;
use crate::http::request::RequestSpec;

/// User supplied rewrite: `(path, request spec, request head) -> new path`.
pub type CustomRewrite = Arc<dyn Fn(&str, &RequestSpec, &Parts) -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub enum RewriteRule {
    /// Path is forwarded unchanged.
    Identity,
    /// Replace a leading `prefix` with `replacement`; paths without the prefix do not match.
    Prefix { prefix: String, replacement: String },
    /// Substitute the first match of `pattern` using `template` (`$1`, `$&`, `$$`, `${name}`).
    Pattern { pattern: Regex, template: String },
    Custom(CustomRewrite),
}

impl RewriteRule {
    /// Classify a configuration value.
    pub fn from_config(config: Option<&TranslateConfig>) -> Result<Self, regex::Error> {
        Ok(match config {
            None => RewriteRule::Identity,
            Some(TranslateConfig::Prefix(prefix, replacement)) => RewriteRule::Prefix {
                prefix: prefix.clone(),
                replacement: replacement.clone(),
            },
            Some(TranslateConfig::Pattern { pattern, template }) => {
                let pattern = Regex::new(pattern)?;
                let template = expand_template(template, pattern.captures_len() - 1);
                RewriteRule::Pattern { pattern, template }
            }
        })
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str, &RequestSpec, &Parts) -> Option<String> + Send + Sync + 'static,
    {
        RewriteRule::Custom(Arc::new(f))
    }

    /// Rewrite `path`. Never panics on a non-matching path and never mutates its inputs.
    pub fn apply(&self, path: &str, spec: &RequestSpec, parts: &Parts) -> Option<String> {
        match self {
            RewriteRule::Identity => Some(path.to_string()),
            RewriteRule::Prefix { prefix, replacement } => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => Some(format!("{replacement}{rest}")),
                None => {
                    tracing::warn!(path = %path, expected_prefix = %prefix, "Path rewrite failed to match prefix");
                    None
                }
            },
            RewriteRule::Pattern { pattern, template } => {
                let rewritten = pattern.replace(path, template.as_str());
                match validate_path(&rewritten) {
                    Ok(()) => Some(rewritten.into_owned()),
                    Err(reason) => {
                        tracing::error!(
                            path = %path,
                            pattern = %pattern,
                            result = %rewritten,
                            reason,
                            "Path pattern translation error"
                        );
                        None
                    }
                }
            }
            RewriteRule::Custom(f) => f(path, spec, parts),
        }
    }
}

/// Translate a config template into `regex` replacement syntax.
///
/// `$N` and `$NN` name a capture group only when that group exists, and never swallow the
/// characters after them (`$1_x` is group 1 then `_x`). `$&` is the whole match and `$$` a
/// literal dollar. Any other `$` is literal, except `${name}`.
fn expand_template(template: &str, groups: usize) -> String {
    let mut out = String::with_capacity(template.len() + 8);
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push_str("$$");
            rest = tail;
            continue;
        }
        if let Some(tail) = after.strip_prefix('&') {
            out.push_str("${0}");
            rest = tail;
            continue;
        }
        if after.starts_with('{') {
            out.push('$');
            rest = after;
            continue;
        }

        let digits = after.bytes().take(2).take_while(u8::is_ascii_digit).count();
        let group = (1..=digits)
            .rev()
            .map(|len| (len, after[..len].parse::<usize>().unwrap_or(0)))
            .find(|&(_, n)| n >= 1 && n <= groups);
        match group {
            Some((len, n)) => {
                out.push_str(&format!("${{{n}}}"));
                rest = &after[len..];
            }
            None => {
                out.push_str("$$");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn validate_path(path: &str) -> Result<(), &'static str> {
    if !path.starts_with('/') {
        return Err("rewritten path must start with '/'");
    }
    PathAndQuery::try_from(path)
        .map(|_| ())
        .map_err(|_| "rewritten path is not a valid request target")
}

impl fmt::Debug for RewriteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteRule::Identity => f.write_str("Identity"),
            RewriteRule::Prefix { prefix, replacement } => f
                .debug_struct("Prefix")
                .field("prefix", prefix)
                .field("replacement", replacement)
                .finish(),
            RewriteRule::Pattern { pattern, template } => f
                .debug_struct("Pattern")
                .field("pattern", &pattern.as_str())
                .field("template", template)
                .finish(),
            RewriteRule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::Protocol;
    use axum::http::Request;

    fn fixture() -> (RequestSpec, Parts) {
        let spec = RequestSpec {
            host: "a.example.com".into(),
            port: None,
            protocol: Protocol::Http,
            secure: false,
            path: "/api/users".into(),
        };
        let (parts, _) = Request::builder().uri("/api/users").body(()).unwrap().into_parts();
        (spec, parts)
    }

    fn prefix(p: &str, r: &str) -> RewriteRule {
        RewriteRule::from_config(Some(&TranslateConfig::Prefix(p.into(), r.into()))).unwrap()
    }

    fn pattern(p: &str, t: &str) -> RewriteRule {
        RewriteRule::from_config(Some(&TranslateConfig::Pattern {
            pattern: p.into(),
            template: t.into(),
        }))
        .unwrap()
    }

    #[test]
    fn test_identity() {
        let (spec, parts) = fixture();
        let rule = RewriteRule::from_config(None).unwrap();
        for path in ["/", "/api/users", "/a?b=c", ""] {
            assert_eq!(rule.apply(path, &spec, &parts).as_deref(), Some(path));
        }
    }

    #[test]
    fn test_prefix_match() {
        let (spec, parts) = fixture();
        let rule = prefix("/api", "/v2/api");
        assert_eq!(rule.apply("/api/users", &spec, &parts).as_deref(), Some("/v2/api/users"));
        assert_eq!(rule.apply("/api", &spec, &parts).as_deref(), Some("/v2/api"));
        assert_eq!(rule.apply("/apiary", &spec, &parts).as_deref(), Some("/v2/apiary"));
    }

    #[test]
    fn test_prefix_mismatch() {
        let (spec, parts) = fixture();
        let rule = prefix("/api", "/v2/api");
        assert_eq!(rule.apply("/other", &spec, &parts), None);
        // Prefix must sit at offset 0.
        assert_eq!(rule.apply("/x/api/users", &spec, &parts), None);
        assert_eq!(rule.apply("", &spec, &parts), None);
    }

    #[test]
    fn test_pattern_substitutes_first_match() {
        let (spec, parts) = fixture();
        let rule = pattern(r"^/u/(\d+)", "/users/$1");
        assert_eq!(rule.apply("/u/42/profile", &spec, &parts).as_deref(), Some("/users/42/profile"));

        let rule = pattern("a", "b");
        assert_eq!(rule.apply("/aaa", &spec, &parts).as_deref(), Some("/baa"));
    }

    #[test]
    fn test_pattern_group_followed_by_word_chars() {
        let (spec, parts) = fixture();
        let rule = pattern(r"^/u/(\d+)", "/users/$1_profile");
        assert_eq!(rule.apply("/u/42", &spec, &parts).as_deref(), Some("/users/42_profile"));
    }

    #[test]
    fn test_template_references() {
        assert_eq!(expand_template("/a/$1b", 1), "/a/${1}b");
        assert_eq!(expand_template("/$12", 1), "/${1}2");
        assert_eq!(expand_template("/$12", 12), "/${12}");
        assert_eq!(expand_template("/$2", 1), "/$$2");
        assert_eq!(expand_template("/$0", 1), "/$$0");
        assert_eq!(expand_template("/$&/x", 0), "/${0}/x");
        assert_eq!(expand_template("/$$1", 1), "/$$1");
        assert_eq!(expand_template("/$name/${name}", 1), "/$$name/${name}");
        assert_eq!(expand_template("/cost$", 0), "/cost$$");
    }

    #[test]
    fn test_pattern_whole_match_and_literal_dollar() {
        let (spec, parts) = fixture();
        let rule = pattern("^/v[0-9]+", "$&/legacy");
        assert_eq!(rule.apply("/v3/items", &spec, &parts).as_deref(), Some("/v3/legacy/items"));

        let rule = pattern("^/(\\w+)", "/$3/$1");
        assert_eq!(rule.apply("/abc", &spec, &parts).as_deref(), Some("/$3/abc"));
    }

    #[test]
    fn test_pattern_without_match_keeps_path() {
        let (spec, parts) = fixture();
        let rule = pattern(r"^/u/(\d+)", "/users/$1");
        assert_eq!(rule.apply("/static/app.js", &spec, &parts).as_deref(), Some("/static/app.js"));
    }

    #[test]
    fn test_pattern_fault_reports_none() {
        let (spec, parts) = fixture();
        let rule = pattern("^/", "");
        assert_eq!(rule.apply("/x", &spec, &parts), None);

        let rule = pattern("^/(.*)$", "/$1 with spaces");
        assert_eq!(rule.apply("/x", &spec, &parts), None);
    }

    #[test]
    fn test_invalid_pattern_rejected_at_build() {
        let result = RewriteRule::from_config(Some(&TranslateConfig::Pattern {
            pattern: "(".into(),
            template: "/".into(),
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_receives_request() {
        let (spec, parts) = fixture();
        let rule = RewriteRule::custom(|path, spec, parts| {
            if parts.uri.path() == "/api/users" {
                Some(format!("/{}{}", spec.host, path))
            } else {
                None
            }
        });
        assert_eq!(
            rule.apply("/api/users", &spec, &parts).as_deref(),
            Some("/a.example.com/api/users")
        );
    }
}
