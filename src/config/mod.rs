//! Configuration Module
//!
//! Loading, merging and serving per-provider overrides.

pub mod loader;
pub mod provider;
pub mod store;

pub use loader::{ConfigLoader, EnvSource, ProviderTable, CONFIG_FILE_NAME, CONFIG_PATH_ENV};
pub use provider::{
    provider_descriptor, provider_ids, AuthField, ProviderConfig, ProviderDescriptor,
    ProviderSettings, SettingsFile, ENV_PREFIX, PROVIDERS,
};
pub use store::ConfigStore;
