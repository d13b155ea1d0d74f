//! Configuration Loader
//!
//! Reads the settings file and the environment and merges them into one
//! resolved table, per field, with the environment taking precedence.

use crate::config::provider::{
    provider_descriptor, ProviderConfig, ProviderDescriptor, ProviderSettings, SettingsFile,
    PROVIDERS,
};
use crate::error::ConfigLoadWarning;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable that relocates the settings file
pub const CONFIG_PATH_ENV: &str = "COMFY_API_CONFIG_PATH";

/// File name of the settings file
pub const CONFIG_FILE_NAME: &str = "custom_api_config.json";

/// Where environment overrides are read from
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    /// The process environment
    #[default]
    Process,

    /// A fixed set of variables
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    /// Build a fixed source from name/value pairs
    pub fn fixed<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        EnvSource::Fixed(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Value of `name`, treating empty values as unset
    pub fn get(&self, name: &str) -> Option<String> {
        let value = match self {
            EnvSource::Process => std::env::var(name).ok(),
            EnvSource::Fixed(vars) => vars.get(name).cloned(),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Resolved provider table with the warnings produced while building it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderTable {
    entries: BTreeMap<&'static str, ProviderConfig>,
    warnings: Vec<ConfigLoadWarning>,
}

impl ProviderTable {
    /// Resolved configuration of a known provider, if it has any override
    pub fn get(&self, provider: &str) -> Option<&ProviderConfig> {
        let descriptor = provider_descriptor(provider)?;
        self.entries.get(descriptor.id)
    }

    /// Configurations with at least one override, ordered by identifier
    pub fn configured(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.entries.values().filter(|c| c.is_custom())
    }

    /// Warnings recorded while loading
    pub fn warnings(&self) -> &[ConfigLoadWarning] {
        &self.warnings
    }

    /// Replace a provider's configuration, dropping it when empty
    pub(crate) fn insert(&mut self, config: ProviderConfig) {
        if config.is_custom() {
            self.entries.insert(config.provider, config);
        } else {
            self.entries.remove(config.provider);
        }
    }

    /// Settings file content for this table, skipping empty entries
    pub fn to_settings_file(&self) -> SettingsFile {
        self.configured()
            .map(|c| (c.provider.to_string(), c.to_settings()))
            .collect()
    }
}

/// Loads provider overrides from a settings file and the environment
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
    env: EnvSource,
}

impl ConfigLoader {
    /// Loader for the default file location and the process environment
    pub fn new() -> Self {
        Self::from_path(Self::default_path())
    }

    /// Loader for a specific settings file and the process environment
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            env: EnvSource::Process,
        }
    }

    /// Replace the environment source
    pub fn with_env(mut self, env: EnvSource) -> Self {
        self.env = env;
        self
    }

    /// Path of the settings file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Default settings file location
    ///
    /// `$COMFY_API_CONFIG_PATH` if set, otherwise
    /// `<config dir>/comfy_api_nodes/custom_api_config.json`, otherwise the
    /// file name in the working directory.
    pub fn default_path() -> PathBuf {
        if let Ok(custom_path) = std::env::var(CONFIG_PATH_ENV) {
            if !custom_path.is_empty() {
                return PathBuf::from(custom_path);
            }
        }

        dirs::config_dir()
            .map(|dir| dir.join("comfy_api_nodes").join(CONFIG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    }

    /// Read both sources and build the resolved table
    pub fn load(&self) -> ProviderTable {
        let mut warnings = Vec::new();
        let file = self.read_file(&mut warnings);

        let mut table = ProviderTable::default();
        for descriptor in PROVIDERS {
            let config = self.resolve(descriptor, file.get(descriptor.id), &mut warnings);
            table.insert(config);
        }

        for warning in &warnings {
            tracing::warn!("{}", warning);
        }
        table.warnings = warnings;

        tracing::debug!(
            path = %self.path.display(),
            configured = table.entries.len(),
            "Loaded custom API configuration"
        );
        table
    }

    /// Read the settings file, keyed by canonical provider id
    fn read_file(
        &self,
        warnings: &mut Vec<ConfigLoadWarning>,
    ) -> HashMap<&'static str, ProviderSettings> {
        let mut settings = HashMap::new();

        if !self.path.exists() {
            return settings;
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warnings.push(ConfigLoadWarning::UnreadableFile {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
                return settings;
            }
        };

        let file: SettingsFile = match serde_json::from_str(&content) {
            Ok(file) => file,
            Err(e) => {
                warnings.push(ConfigLoadWarning::MalformedFile {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
                return settings;
            }
        };

        for (name, entry) in file {
            let Some(descriptor) = provider_descriptor(&name) else {
                warnings.push(ConfigLoadWarning::UnknownProvider {
                    path: self.path.clone(),
                    provider: name,
                });
                continue;
            };

            match settings.entry(descriptor.id) {
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
                Entry::Occupied(mut slot) => {
                    warnings.push(ConfigLoadWarning::DuplicateProvider {
                        path: self.path.clone(),
                        provider: descriptor.id.to_string(),
                    });
                    // The canonical lowercase spelling wins over variants
                    if name == descriptor.id {
                        slot.insert(entry);
                    }
                }
            }
        }

        settings
    }

    /// Merge file and environment values for one provider
    fn resolve(
        &self,
        descriptor: &'static ProviderDescriptor,
        file: Option<&ProviderSettings>,
        warnings: &mut Vec<ConfigLoadWarning>,
    ) -> ProviderConfig {
        let from_file = |field: Option<&String>| field.filter(|v| !v.is_empty()).cloned();

        // Env first, then file; an invalid value falls through to the next one
        let env_url = self
            .env
            .get(descriptor.base_url_env)
            .map(|url| (url, descriptor.base_url_env.to_string()));
        let file_url = from_file(file.and_then(|f| f.base_url.as_ref()))
            .map(|url| (url, self.path.display().to_string()));

        let base_url = env_url
            .into_iter()
            .chain(file_url)
            .find_map(|(url, source)| match validate_base_url(&url) {
                Ok(()) => Some(url),
                Err(reason) => {
                    warnings.push(ConfigLoadWarning::InvalidBaseUrl {
                        provider: descriptor.id.to_string(),
                        source,
                        reason,
                    });
                    None
                }
            });

        let api_key = self
            .env
            .get(descriptor.api_key_env)
            .or_else(|| from_file(file.and_then(|f| f.api_key.as_ref())));

        ProviderConfig {
            provider: descriptor.id,
            base_url,
            api_key,
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that `url` is an absolute http(s) URL
pub fn validate_base_url(url: &str) -> std::result::Result<(), String> {
    let parsed = Url::parse(url).map_err(|e| e.to_string())?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}
