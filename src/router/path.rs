//! Proxy Path Parsing
//!
//! Requests routed through the default gateway use paths of the form
//! `/proxy/<provider>/<rest>`. Direct calls to a provider use `<rest>` alone.

use crate::error::{CustomApiError, Result};

/// First path segment of gateway-routed requests
pub const PROXY_PREFIX: &str = "proxy";

/// A request path split along the proxy convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyPath<'a> {
    /// Provider segment, as written in the path
    pub provider: &'a str,

    /// Everything after the provider segment, empty or starting with `/`, `?` or `#`
    pub rest: &'a str,
}

impl<'a> ProxyPath<'a> {
    /// Split `path`, or `None` if it is not a `/proxy/<provider>...` path
    pub fn parse(path: &'a str) -> Option<Self> {
        let after_prefix = path
            .strip_prefix('/')?
            .strip_prefix(PROXY_PREFIX)?
            .strip_prefix('/')?;

        let end = after_prefix
            .find(['/', '?', '#'])
            .unwrap_or(after_prefix.len());
        let (provider, rest) = after_prefix.split_at(end);

        if provider.is_empty() {
            return None;
        }

        Some(Self { provider, rest })
    }
}

/// Provider named by a `/proxy/<provider>/...` path, lowercased
pub fn get_provider_from_path(path: &str) -> Option<String> {
    ProxyPath::parse(path).map(|p| p.provider.to_ascii_lowercase())
}

/// Remove the leading `/proxy/<provider>` from `path`
///
/// Only the leading segments are considered, and the remainder must be a
/// path of its own (starting with `/`).
pub fn strip_proxy_prefix<'a>(path: &'a str, provider: &str) -> Result<&'a str> {
    let error = |reason| CustomApiError::PathTransform {
        path: path.to_string(),
        provider: provider.to_string(),
        reason,
    };

    let parsed = ProxyPath::parse(path)
        .ok_or_else(|| error("path does not start with /proxy/<provider>"))?;

    if !parsed.provider.eq_ignore_ascii_case(provider) {
        return Err(error("proxy segment names a different provider"));
    }

    if !parsed.rest.starts_with('/') {
        return Err(error("nothing left after the proxy prefix"));
    }

    Ok(parsed.rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_proxy_path() {
        let parsed = ProxyPath::parse("/proxy/openai/v1/images/generations").unwrap();
        assert_eq!(parsed.provider, "openai");
        assert_eq!(parsed.rest, "/v1/images/generations");
    }

    #[test]
    fn test_parse_provider_only() {
        let parsed = ProxyPath::parse("/proxy/luma").unwrap();
        assert_eq!(parsed.provider, "luma");
        assert_eq!(parsed.rest, "");

        let parsed = ProxyPath::parse("/proxy/luma?page=2").unwrap();
        assert_eq!(parsed.provider, "luma");
        assert_eq!(parsed.rest, "?page=2");
    }

    #[test]
    fn test_parse_rejects_other_paths() {
        assert!(ProxyPath::parse("/v1/images/generations").is_none());
        assert!(ProxyPath::parse("proxy/openai/v1").is_none());
        assert!(ProxyPath::parse("/proxyx/openai/v1").is_none());
        assert!(ProxyPath::parse("/proxy//v1").is_none());
        assert!(ProxyPath::parse("/proxy").is_none());
        assert!(ProxyPath::parse("").is_none());
    }

    #[test]
    fn test_get_provider_from_path() {
        assert_eq!(
            get_provider_from_path("/proxy/stability/v1/generate").as_deref(),
            Some("stability")
        );
        assert_eq!(
            get_provider_from_path("/proxy/Kling/v1/videos").as_deref(),
            Some("kling")
        );
        // Not limited to known providers
        assert_eq!(
            get_provider_from_path("/proxy/acme/v1").as_deref(),
            Some("acme")
        );
        assert_eq!(get_provider_from_path("/v1/generate"), None);
    }

    #[test]
    fn test_strip_proxy_prefix() {
        assert_eq!(
            strip_proxy_prefix("/proxy/openai/v1/images/generations", "openai").unwrap(),
            "/v1/images/generations"
        );
        assert_eq!(strip_proxy_prefix("/proxy/openai/", "openai").unwrap(), "/");
        assert_eq!(
            strip_proxy_prefix("/proxy/OpenAI/v1/chat", "openai").unwrap(),
            "/v1/chat"
        );
    }

    #[test]
    fn test_strip_only_leading_segments() {
        assert_eq!(
            strip_proxy_prefix("/proxy/pika/v1/proxy/pika/x", "pika").unwrap(),
            "/v1/proxy/pika/x"
        );
    }

    #[test]
    fn test_strip_errors() {
        for (path, provider) in [
            ("/v1/images/generations", "openai"),
            ("/proxy/openai-compat/v1", "openai"),
            ("/proxy/luma", "luma"),
            ("/proxy/luma?page=2", "luma"),
        ] {
            let err = strip_proxy_prefix(path, provider).unwrap_err();
            assert!(
                matches!(err, CustomApiError::PathTransform { path: ref p, .. } if p == path),
                "{path}"
            );
        }
    }
}
