//! Configuration Store
//!
//! Owns the resolved provider table. The table is built from the loader on
//! first access and replaced wholesale by reloads and setters, so readers
//! always see one consistent snapshot.

use crate::config::loader::{validate_base_url, ConfigLoader, ProviderTable};
use crate::config::provider::{provider_descriptor, provider_ids, ProviderConfig};
use crate::error::{ConfigLoadWarning, CustomApiError, Result};
use parking_lot::{RwLock, RwLockUpgradableReadGuard, RwLockWriteGuard};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Per-provider base URL and credential overrides
#[derive(Debug)]
pub struct ConfigStore {
    /// Sources the table is built from
    loader: ConfigLoader,

    /// Resolved table, `None` until first access
    table: RwLock<Option<Arc<ProviderTable>>>,
}

impl ConfigStore {
    /// Store backed by the default settings file and the process environment
    pub fn new() -> Self {
        Self::with_loader(ConfigLoader::new())
    }

    /// Store backed by a specific settings file and the process environment
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self::with_loader(ConfigLoader::from_path(path))
    }

    /// Store backed by an explicit loader. Nothing is read until first use.
    pub fn with_loader(loader: ConfigLoader) -> Self {
        Self {
            loader,
            table: RwLock::new(None),
        }
    }

    /// Path of the settings file
    pub fn config_file(&self) -> &Path {
        self.loader.path()
    }

    /// Current resolved table, building it on first call
    pub fn snapshot(&self) -> Arc<ProviderTable> {
        if let Some(table) = self.table.read().as_ref() {
            return Arc::clone(table);
        }

        let guard = self.table.upgradable_read();
        if let Some(table) = guard.as_ref() {
            return Arc::clone(table);
        }

        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        let table = Arc::new(self.loader.load());
        *guard = Some(Arc::clone(&table));
        table
    }

    /// Re-read the file and environment, discarding runtime overrides
    ///
    /// Returns the warnings produced while loading.
    pub fn load(&self) -> Vec<ConfigLoadWarning> {
        let mut guard = self.table.write();
        let table = Arc::new(self.loader.load());
        let warnings = table.warnings().to_vec();
        *guard = Some(table);

        tracing::info!(
            path = %self.loader.path().display(),
            warnings = warnings.len(),
            "Reloaded custom API configuration"
        );
        warnings
    }

    /// Warnings recorded by the most recent load
    pub fn warnings(&self) -> Vec<ConfigLoadWarning> {
        self.snapshot().warnings().to_vec()
    }

    /// Resolved configuration for `provider`, if it has any override
    pub fn provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.snapshot().get(provider).cloned()
    }

    /// Custom base URL for `provider`
    pub fn get_base_url(&self, provider: &str) -> Option<String> {
        self.snapshot()
            .get(provider)
            .and_then(|c| c.base_url.clone())
    }

    /// Custom base URL for `provider`, or `default` when none is configured
    pub fn get_base_url_or(&self, provider: &str, default: &str) -> String {
        self.get_base_url(provider)
            .unwrap_or_else(|| default.to_string())
    }

    /// Custom API key for `provider`
    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        self.snapshot()
            .get(provider)
            .and_then(|c| c.api_key.clone())
    }

    /// Whether `provider` has a base URL or API key override
    pub fn is_custom_configured(&self, provider: &str) -> bool {
        self.snapshot()
            .get(provider)
            .is_some_and(ProviderConfig::is_custom)
    }

    /// All known provider identifiers
    pub fn providers(&self) -> Vec<&'static str> {
        provider_ids()
    }

    /// Providers that currently carry an override
    pub fn configured_providers(&self) -> Vec<&'static str> {
        self.snapshot().configured().map(|c| c.provider).collect()
    }

    /// Override the configuration of a known provider at runtime
    ///
    /// `None` leaves a field unchanged, an empty string clears it. Unknown
    /// providers and non-http(s) base URLs are rejected without touching the
    /// table.
    pub fn set_provider_config(
        &self,
        provider: &str,
        base_url: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<()> {
        let descriptor = provider_descriptor(provider)
            .ok_or_else(|| CustomApiError::UnknownProvider(provider.to_string()))?;

        if let Some(url) = base_url.filter(|u| !u.is_empty()) {
            validate_base_url(url).map_err(|reason| CustomApiError::InvalidBaseUrl {
                provider: descriptor.id.to_string(),
                url: url.to_string(),
                reason,
            })?;
        }

        let mut guard = self.table.write();
        let mut table = match guard.as_ref() {
            Some(current) => ProviderTable::clone(current),
            None => self.loader.load(),
        };

        let mut config = table
            .get(descriptor.id)
            .cloned()
            .unwrap_or_else(|| ProviderConfig::unset(descriptor.id));
        update_field(&mut config.base_url, base_url);
        update_field(&mut config.api_key, api_key);

        tracing::info!(
            provider = descriptor.id,
            base_url = config.base_url.as_deref().unwrap_or("<default>"),
            has_api_key = config.api_key.is_some(),
            "Updated custom API configuration"
        );

        table.insert(config);
        *guard = Some(Arc::new(table));
        Ok(())
    }

    /// Write the current table to the settings file
    ///
    /// Providers without overrides are left out. Saves are serialized with
    /// each other and with setters and reloads; readers are not blocked. On
    /// failure the in-memory table is still authoritative.
    pub fn save(&self) -> Result<()> {
        let path = self.loader.path();
        let save_error = |source| CustomApiError::ConfigSave {
            path: path.to_path_buf(),
            source,
        };

        // Upgradable guard excludes writers and other saves, not readers
        let mut guard = self.table.upgradable_read();
        if guard.is_none() {
            let mut write = RwLockUpgradableReadGuard::upgrade(guard);
            *write = Some(Arc::new(self.loader.load()));
            guard = RwLockWriteGuard::downgrade_to_upgradable(write);
        }

        let settings = guard
            .as_ref()
            .map(|table| table.to_settings_file())
            .unwrap_or_default();
        let content = serde_json::to_string_pretty(&settings)
            .map_err(|e| save_error(io::Error::other(e)))?;

        write_atomic(path, &content).map_err(save_error)?;
        drop(guard);

        tracing::info!(
            path = %path.display(),
            providers = settings.len(),
            "Saved custom API configuration"
        );
        Ok(())
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

fn update_field(field: &mut Option<String>, value: Option<&str>) {
    match value {
        None => {}
        Some("") => *field = None,
        Some(v) => *field = Some(v.to_string()),
    }
}

/// Write through a uniquely named sibling temp file so readers never see a
/// partial file. The temp file is created owner-only (0600 on unix).
fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
