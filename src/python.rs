//! Python Bindings
//!
//! Exposes the store and the rewriter to the Python API nodes. The module
//! keeps one shared store (`get_config()`), built on first use.

use crate::config::ConfigStore;
use crate::error::CustomApiError;
use crate::router::{get_provider_from_path, AuthMaterial, RequestRewriter};
use pyo3::create_exception;
use pyo3::exceptions::{PyOSError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

create_exception!(_comfy_custom_api, UnknownProviderError, PyValueError);
create_exception!(_comfy_custom_api, InvalidBaseUrlError, PyValueError);
create_exception!(_comfy_custom_api, PathTransformError, PyValueError);
create_exception!(_comfy_custom_api, ConfigSaveError, PyOSError);

impl From<CustomApiError> for PyErr {
    fn from(err: CustomApiError) -> PyErr {
        let msg = err.to_string();
        match &err {
            CustomApiError::UnknownProvider(_) => UnknownProviderError::new_err(msg),
            CustomApiError::InvalidBaseUrl { .. } => InvalidBaseUrlError::new_err(msg),
            CustomApiError::PathTransform { .. } => PathTransformError::new_err(msg),
            CustomApiError::ConfigSave { .. } => ConfigSaveError::new_err(msg),
        }
    }
}

static SHARED_STORE: OnceLock<Arc<ConfigStore>> = OnceLock::new();

fn shared_store() -> Arc<ConfigStore> {
    let store = SHARED_STORE.get_or_init(|| {
        // Load .env file if present
        let _ = dotenvy::dotenv();
        Arc::new(ConfigStore::new())
    });
    Arc::clone(store)
}

/// Convert a Python auth kwargs dict, dropping `None` values
fn auth_from_dict(auth_kwargs: Option<&Bound<'_, PyDict>>) -> PyResult<AuthMaterial> {
    let mut auth = AuthMaterial::new();
    if let Some(dict) = auth_kwargs {
        for (key, value) in dict.iter() {
            if value.is_none() {
                continue;
            }
            auth.insert(key.extract::<String>()?, value.extract::<String>()?);
        }
    }
    Ok(auth)
}

/// Python wrapper for the configuration store
#[pyclass(name = "CustomAPIConfig")]
struct PyCustomApiConfig {
    inner: Arc<ConfigStore>,
}

#[pymethods]
impl PyCustomApiConfig {
    /// Create a store for `config_file`, or the default location
    #[new]
    #[pyo3(signature = (config_file=None))]
    fn new(config_file: Option<PathBuf>) -> Self {
        let _ = dotenvy::dotenv();

        let inner = match config_file {
            Some(path) => ConfigStore::from_path(path),
            None => ConfigStore::new(),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    #[getter]
    fn config_file(&self) -> String {
        self.inner.config_file().display().to_string()
    }

    #[pyo3(signature = (provider, default=None))]
    fn get_base_url(&self, provider: &str, default: Option<&str>) -> Option<String> {
        match default {
            Some(default) => Some(self.inner.get_base_url_or(provider, default)),
            None => self.inner.get_base_url(provider),
        }
    }

    fn get_api_key(&self, provider: &str) -> Option<String> {
        self.inner.get_api_key(provider)
    }

    fn is_custom_configured(&self, provider: &str) -> bool {
        self.inner.is_custom_configured(provider)
    }

    #[pyo3(signature = (provider, base_url=None, api_key=None))]
    fn set_provider_config(
        &self,
        provider: &str,
        base_url: Option<&str>,
        api_key: Option<&str>,
    ) -> PyResult<()> {
        Ok(self.inner.set_provider_config(provider, base_url, api_key)?)
    }

    fn save(&self) -> PyResult<()> {
        Ok(self.inner.save()?)
    }

    /// Reload from file and environment, returning warning messages
    fn load(&self) -> Vec<String> {
        self.inner.load().iter().map(ToString::to_string).collect()
    }

    fn warnings(&self) -> Vec<String> {
        self.inner.warnings().iter().map(ToString::to_string).collect()
    }

    fn providers(&self) -> Vec<&'static str> {
        self.inner.providers()
    }

    fn configured_providers(&self) -> Vec<&'static str> {
        self.inner.configured_providers()
    }
}

/// Python wrapper for the request rewriter
#[pyclass(name = "RequestRewriter")]
struct PyRequestRewriter {
    store: Arc<ConfigStore>,
}

#[pymethods]
impl PyRequestRewriter {
    /// Create a rewriter over `config`, or the shared configuration
    #[new]
    #[pyo3(signature = (config=None))]
    fn new(config: Option<PyRef<'_, PyCustomApiConfig>>) -> Self {
        let store = match config {
            Some(config) => Arc::clone(&config.inner),
            None => shared_store(),
        };
        Self { store }
    }

    #[staticmethod]
    fn get_provider_from_path(path: &str) -> Option<String> {
        get_provider_from_path(path)
    }

    #[pyo3(signature = (path, provider=None))]
    fn transform_path_for_custom_api(
        &self,
        path: &str,
        provider: Option<&str>,
    ) -> PyResult<String> {
        transform_with(&self.store, path, provider)
    }

    #[pyo3(signature = (provider=None, auth_kwargs=None, path=None))]
    fn apply_custom_config(
        &self,
        provider: Option<&str>,
        auth_kwargs: Option<&Bound<'_, PyDict>>,
        path: Option<&str>,
    ) -> PyResult<(Option<String>, BTreeMap<String, String>)> {
        apply_with(&self.store, provider, auth_kwargs, path)
    }

    /// Returns `(base_url, auth_kwargs, path)`
    #[pyo3(signature = (path, provider=None, auth_kwargs=None))]
    fn rewrite(
        &self,
        path: &str,
        provider: Option<&str>,
        auth_kwargs: Option<&Bound<'_, PyDict>>,
    ) -> PyResult<(Option<String>, BTreeMap<String, String>, String)> {
        let auth = auth_from_dict(auth_kwargs)?;
        let rewritten = RequestRewriter::new(&self.store).rewrite(provider, &auth, path)?;
        Ok((rewritten.base_url, rewritten.auth.into_inner(), rewritten.path))
    }
}

fn transform_with(store: &ConfigStore, path: &str, provider: Option<&str>) -> PyResult<String> {
    let provider = match provider {
        Some(p) => Some(p.to_string()),
        None => get_provider_from_path(path),
    };

    match provider {
        Some(p) => Ok(RequestRewriter::new(store).transform_path_for_custom_api(path, &p)?),
        None => Ok(path.to_string()),
    }
}

fn apply_with(
    store: &ConfigStore,
    provider: Option<&str>,
    auth_kwargs: Option<&Bound<'_, PyDict>>,
    path: Option<&str>,
) -> PyResult<(Option<String>, BTreeMap<String, String>)> {
    let auth = auth_from_dict(auth_kwargs)?;
    let (base_url, auth) =
        RequestRewriter::new(store).apply_custom_config(provider, &auth, path.unwrap_or(""));
    Ok((base_url, auth.into_inner()))
}

/// The shared configuration used by the module-level helpers
#[pyfunction]
fn get_config() -> PyCustomApiConfig {
    PyCustomApiConfig {
        inner: shared_store(),
    }
}

#[pyfunction(name = "get_provider_from_path")]
fn py_get_provider_from_path(path: &str) -> Option<String> {
    get_provider_from_path(path)
}

#[pyfunction]
#[pyo3(signature = (path, provider=None))]
fn transform_path_for_custom_api(path: &str, provider: Option<&str>) -> PyResult<String> {
    transform_with(&shared_store(), path, provider)
}

#[pyfunction]
#[pyo3(signature = (provider=None, auth_kwargs=None, path=None))]
fn apply_custom_config(
    provider: Option<&str>,
    auth_kwargs: Option<&Bound<'_, PyDict>>,
    path: Option<&str>,
) -> PyResult<(Option<String>, BTreeMap<String, String>)> {
    apply_with(&shared_store(), provider, auth_kwargs, path)
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`)
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // Another extension may already have installed one
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Python module definition
#[pymodule]
fn _comfy_custom_api(m: &Bound<'_, PyModule>) -> PyResult<()> {
    init_tracing();

    let py = m.py();
    m.add_class::<PyCustomApiConfig>()?;
    m.add_class::<PyRequestRewriter>()?;
    m.add_function(wrap_pyfunction!(get_config, m)?)?;
    m.add_function(wrap_pyfunction!(py_get_provider_from_path, m)?)?;
    m.add_function(wrap_pyfunction!(transform_path_for_custom_api, m)?)?;
    m.add_function(wrap_pyfunction!(apply_custom_config, m)?)?;
    m.add("UnknownProviderError", py.get_type::<UnknownProviderError>())?;
    m.add("InvalidBaseUrlError", py.get_type::<InvalidBaseUrlError>())?;
    m.add("PathTransformError", py.get_type::<PathTransformError>())?;
    m.add("ConfigSaveError", py.get_type::<ConfigSaveError>())?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
