//! Router Module
//!
//! Proxy path handling and request rewriting.

pub mod path;
pub mod rewriter;

pub use path::{get_provider_from_path, strip_proxy_prefix, ProxyPath, PROXY_PREFIX};
pub use rewriter::{AuthMaterial, RequestRewriter, RewrittenRequest};
