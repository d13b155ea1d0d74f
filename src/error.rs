//! Error Types
//!
//! Hard failures raised by write and rewrite paths, plus the non-fatal
//! warnings collected while loading configuration.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for configuration and rewrite operations
#[derive(Debug, Error)]
pub enum CustomApiError {
    /// Write targeted a provider outside the known table
    #[error("Unknown provider '{0}'. Known providers: {known}", known = crate::config::provider_ids().join(", "))]
    UnknownProvider(String),

    /// Base URL given to a setter is not an absolute http(s) URL
    #[error("Invalid base URL '{url}' for provider '{provider}': {reason}")]
    InvalidBaseUrl {
        provider: String,
        url: String,
        reason: String,
    },

    /// Path does not follow the `/proxy/<provider>/...` convention
    #[error("Cannot rewrite path '{path}' for provider '{provider}': {reason}")]
    PathTransform {
        path: String,
        provider: String,
        reason: &'static str,
    },

    /// Persisting the configuration file failed
    #[error("Failed to save custom API config to {}: {source}", path.display())]
    ConfigSave {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Non-fatal problem found while loading configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLoadWarning {
    /// File exists but could not be read
    UnreadableFile { path: PathBuf, reason: String },

    /// File content is not a provider → settings mapping
    MalformedFile { path: PathBuf, reason: String },

    /// File names a provider outside the known table
    UnknownProvider { path: PathBuf, provider: String },

    /// File lists the same provider under more than one spelling
    DuplicateProvider { path: PathBuf, provider: String },

    /// A source supplied a base URL that is not an absolute http(s) URL
    InvalidBaseUrl {
        provider: String,
        source: String,
        reason: String,
    },
}

impl fmt::Display for ConfigLoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigLoadWarning::UnreadableFile { path, reason } => {
                write!(f, "Failed to read {}: {}", path.display(), reason)
            }
            ConfigLoadWarning::MalformedFile { path, reason } => {
                write!(
                    f,
                    "Failed to parse {}: {}. File-based configuration ignored",
                    path.display(),
                    reason
                )
            }
            ConfigLoadWarning::UnknownProvider { path, provider } => {
                write!(
                    f,
                    "Ignoring unknown provider '{}' in {}",
                    provider,
                    path.display()
                )
            }
            ConfigLoadWarning::DuplicateProvider { path, provider } => {
                write!(
                    f,
                    "Provider '{}' appears more than once in {}, keeping one entry",
                    provider,
                    path.display()
                )
            }
            ConfigLoadWarning::InvalidBaseUrl {
                provider,
                source,
                reason,
            } => {
                write!(
                    f,
                    "Ignoring base URL for '{}' from {}: {}",
                    provider, source, reason
                )
            }
        }
    }
}

/// Result type alias for configuration and rewrite operations
pub type Result<T> = std::result::Result<T, CustomApiError>;
