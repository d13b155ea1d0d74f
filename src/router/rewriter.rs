//! Request Rewriting
//!
//! Turns a gateway-bound request (provider, auth material, `/proxy/...` path)
//! into a direct call to the provider's configured endpoint. Providers without
//! custom configuration pass through untouched.

use crate::config::{provider_descriptor, AuthField, ConfigStore, ProviderConfig, ProviderTable};
use crate::error::Result;
use crate::router::path::{get_provider_from_path, strip_proxy_prefix};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix marking a custom key as a bearer token
const BEARER_PREFIX: &str = "Bearer ";

/// Auth fields handed to the request layer, e.g. `comfy_api_key`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthMaterial(BTreeMap<String, String>);

impl AuthMaterial {
    /// Empty auth material
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `field`, if present
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Set `field`, replacing any previous value
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    /// Whether no fields are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fields and values in field order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Underlying field map
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AuthMaterial {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Outcome of rewriting one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenRequest {
    /// Provider the request was attributed to
    pub provider: Option<String>,

    /// Custom base URL, `None` means use the default gateway
    pub base_url: Option<String>,

    /// Auth material with the custom key applied
    pub auth: AuthMaterial,

    /// Path relative to `base_url` (or to the gateway)
    pub path: String,
}

impl RewrittenRequest {
    /// Whether the request bypasses the default gateway
    pub fn is_direct(&self) -> bool {
        self.base_url.is_some()
    }

    /// Full URL, using `default_base` when no custom base URL applies
    pub fn url(&self, default_base: &str) -> String {
        let base = self
            .base_url
            .as_deref()
            .unwrap_or(default_base)
            .trim_end_matches('/');

        if self.path.starts_with('/') {
            format!("{}{}", base, self.path)
        } else {
            format!("{}/{}", base, self.path)
        }
    }
}

/// Applies custom provider configuration to outgoing requests
///
/// Holds no state besides the store handle. Each call reads one snapshot of
/// the store.
#[derive(Debug, Clone, Copy)]
pub struct RequestRewriter<'a> {
    store: &'a ConfigStore,
}

impl<'a> RequestRewriter<'a> {
    pub fn new(store: &'a ConfigStore) -> Self {
        Self { store }
    }

    /// Provider named by a `/proxy/<provider>/...` path
    pub fn get_provider_from_path(path: &str) -> Option<String> {
        get_provider_from_path(path)
    }

    /// Path to use against the provider's endpoint
    ///
    /// Unconfigured providers get `path` back unchanged. Configured providers
    /// get it with the leading `/proxy/<provider>` removed, failing if the
    /// path does not carry that prefix.
    pub fn transform_path_for_custom_api(&self, path: &str, provider: &str) -> Result<String> {
        transform_path(&self.store.snapshot(), path, provider)
    }

    /// Effective base URL and auth material for `provider`
    ///
    /// When `provider` is `None` it is taken from `path`. A custom key
    /// replaces the provider's auth field wholesale; without one the auth
    /// material comes back unchanged.
    pub fn apply_custom_config(
        &self,
        provider: Option<&str>,
        auth: &AuthMaterial,
        path: &str,
    ) -> (Option<String>, AuthMaterial) {
        let provider = resolve_provider(provider, path);
        let table = self.store.snapshot();
        let config = provider.as_deref().and_then(|p| table.get(p));
        apply_config(config, auth)
    }

    /// Apply base URL, auth and path rewriting in one step
    pub fn rewrite(
        &self,
        provider: Option<&str>,
        auth: &AuthMaterial,
        path: &str,
    ) -> Result<RewrittenRequest> {
        let provider = resolve_provider(provider, path);
        let table = self.store.snapshot();

        let Some(name) = provider.as_deref() else {
            tracing::debug!(path, "No provider for request, using default routing");
            return Ok(RewrittenRequest {
                provider: None,
                base_url: None,
                auth: auth.clone(),
                path: path.to_string(),
            });
        };

        let (base_url, auth) = apply_config(table.get(name), auth);
        let rewritten_path = transform_path(&table, path, name)?;

        tracing::debug!(
            provider = name,
            direct = base_url.is_some(),
            path = %rewritten_path,
            "Rewrote request"
        );

        Ok(RewrittenRequest {
            provider,
            base_url,
            auth,
            path: rewritten_path,
        })
    }
}

fn resolve_provider(provider: Option<&str>, path: &str) -> Option<String> {
    match provider.filter(|p| !p.is_empty()) {
        Some(p) => Some(p.to_ascii_lowercase()),
        None => get_provider_from_path(path),
    }
}

fn transform_path(table: &ProviderTable, path: &str, provider: &str) -> Result<String> {
    if !table.get(provider).is_some_and(ProviderConfig::is_custom) {
        return Ok(path.to_string());
    }

    strip_proxy_prefix(path, provider).map(str::to_string)
}

fn apply_config(
    config: Option<&ProviderConfig>,
    auth: &AuthMaterial,
) -> (Option<String>, AuthMaterial) {
    let Some(config) = config else {
        return (None, auth.clone());
    };

    let mut auth = auth.clone();
    if let Some(key) = &config.api_key {
        let default_field =
            provider_descriptor(config.provider).map_or(AuthField::ApiKey, |d| d.auth_field);
        let (field, value) = credential_target(default_field, key);
        auth.insert(field.key(), value);
    }

    (config.base_url.clone(), auth)
}

/// Field and value a custom key is written as
fn credential_target(default_field: AuthField, key: &str) -> (AuthField, &str) {
    match key.strip_prefix(BEARER_PREFIX) {
        Some(token) => (AuthField::BearerToken, token),
        None => (default_field, key),
    }
}
