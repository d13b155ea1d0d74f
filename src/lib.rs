//! Comfy Custom API - per-provider endpoint and credential overrides
//!
//! Lets API nodes send requests straight to a user-chosen endpoint with a
//! user-chosen key instead of the default gateway. Overrides come from a JSON
//! settings file and `COMFY_API_<PROVIDER>_*` environment variables.
//!
//! ```no_run
//! use comfy_custom_api::{AuthMaterial, ConfigStore, RequestRewriter};
//!
//! let store = ConfigStore::new();
//! let rewriter = RequestRewriter::new(&store);
//! let auth: AuthMaterial = [("comfy_api_key", "gateway-key")].into_iter().collect();
//!
//! let request = rewriter
//!     .rewrite(None, &auth, "/proxy/openai/v1/images/generations")
//!     .unwrap();
//! println!("POST {}", request.url("https://api.comfy.org"));
//! ```

pub mod config;
pub mod error;
pub mod router;

#[cfg(feature = "python")]
mod python;

pub use config::{
    ConfigLoader, ConfigStore, EnvSource, ProviderConfig, ProviderDescriptor, ProviderSettings,
    PROVIDERS,
};
pub use error::{ConfigLoadWarning, CustomApiError, Result};
pub use router::{get_provider_from_path, AuthMaterial, RequestRewriter, RewrittenRequest};
