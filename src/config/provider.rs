//! Provider Configuration
//!
//! Known providers, their environment variable names, and the schema of the
//! per-provider overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix shared by every provider environment variable
pub const ENV_PREFIX: &str = "COMFY_API";

/// Auth field a custom API key is written into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    /// Gateway-style API key (`comfy_api_key`)
    ApiKey,

    /// Bearer token (`auth_token`)
    BearerToken,
}

impl AuthField {
    /// Key used for this field inside the consumer's auth material
    pub fn key(self) -> &'static str {
        match self {
            AuthField::ApiKey => "comfy_api_key",
            AuthField::BearerToken => "auth_token",
        }
    }
}

/// Static description of a known provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderDescriptor {
    /// Lowercase identifier, also the `/proxy/<id>/` path segment
    pub id: &'static str,

    /// Environment variable overriding the base URL
    pub base_url_env: &'static str,

    /// Environment variable overriding the API key
    pub api_key_env: &'static str,

    /// Field replaced by a custom API key
    pub auth_field: AuthField,
}

macro_rules! providers {
    ($( $id:literal => $upper:literal, $auth:ident; )*) => {
        &[$(
            ProviderDescriptor {
                id: $id,
                base_url_env: concat!("COMFY_API_", $upper, "_BASE_URL"),
                api_key_env: concat!("COMFY_API_", $upper, "_API_KEY"),
                auth_field: AuthField::$auth,
            },
        )*]
    };
}

/// Every provider that may carry a custom configuration
pub const PROVIDERS: &[ProviderDescriptor] = providers! {
    "openai" => "OPENAI", ApiKey;
    "stability" => "STABILITY", ApiKey;
    "bfl" => "BFL", ApiKey;
    "bytedance" => "BYTEDANCE", ApiKey;
    "gemini" => "GEMINI", ApiKey;
    "ideogram" => "IDEOGRAM", ApiKey;
    "kling" => "KLING", ApiKey;
    "ltxv" => "LTXV", ApiKey;
    "luma" => "LUMA", ApiKey;
    "minimax" => "MINIMAX", ApiKey;
    "moonvalley" => "MOONVALLEY", ApiKey;
    "pika" => "PIKA", ApiKey;
    "pixverse" => "PIXVERSE", ApiKey;
    "recraft" => "RECRAFT", ApiKey;
    "rodin" => "RODIN", ApiKey;
    "runway" => "RUNWAY", ApiKey;
    "sora" => "SORA", ApiKey;
    "tripo" => "TRIPO", ApiKey;
    "veo2" => "VEO2", ApiKey;
    "vidu" => "VIDU", ApiKey;
    "wan" => "WAN", ApiKey;
};

/// Look up a provider by name, ignoring ASCII case
pub fn provider_descriptor(name: &str) -> Option<&'static ProviderDescriptor> {
    if name.is_empty() {
        return None;
    }

    PROVIDERS.iter().find(|p| p.id.eq_ignore_ascii_case(name))
}

/// Identifiers of all known providers, in table order
pub fn provider_ids() -> Vec<&'static str> {
    PROVIDERS.iter().map(|p| p.id).collect()
}

/// Overrides for one provider as stored in the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Base URL requests are sent to instead of the default gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Credential used instead of the gateway credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ProviderSettings {
    /// Neither field is set
    pub fn is_empty(&self) -> bool {
        self.base_url.is_none() && self.api_key.is_none()
    }
}

/// Config file schema: provider identifier to overrides
pub type SettingsFile = BTreeMap<String, ProviderSettings>;

/// Resolved configuration for a single provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Provider identifier
    pub provider: &'static str,

    /// Effective base URL, `None` means use the default gateway
    pub base_url: Option<String>,

    /// Effective API key, `None` means keep the caller's credential
    pub api_key: Option<String>,
}

impl ProviderConfig {
    /// An empty configuration for `provider`
    pub fn unset(provider: &'static str) -> Self {
        Self {
            provider,
            base_url: None,
            api_key: None,
        }
    }

    /// At least one override is present
    pub fn is_custom(&self) -> bool {
        self.base_url.is_some() || self.api_key.is_some()
    }

    /// File representation of this configuration
    pub fn to_settings(&self) -> ProviderSettings {
        ProviderSettings {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
        }
    }
}
