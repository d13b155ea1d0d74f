//! End-to-end checks of the flow an API node follows before sending a request:
//! detect the provider, apply the custom config, rewrite the path.

use comfy_custom_api::{
    get_provider_from_path, AuthMaterial, ConfigLoader, ConfigStore, CustomApiError, EnvSource,
    RequestRewriter, PROVIDERS,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const GATEWAY: &str = "https://api.comfy.org";

fn config_path(dir: &TempDir) -> PathBuf {
    dir.path().join("custom_api_config.json")
}

fn store(dir: &TempDir, env: &[(&str, &str)]) -> ConfigStore {
    ConfigStore::with_loader(
        ConfigLoader::from_path(config_path(dir)).with_env(EnvSource::fixed(env.iter().copied())),
    )
}

fn gateway_auth() -> AuthMaterial {
    [("comfy_api_key", "gateway-key")].into_iter().collect()
}

#[test]
fn unconfigured_providers_are_untouched() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir, &[]);
    let rewriter = RequestRewriter::new(&store);

    for provider in PROVIDERS {
        let path = format!("/proxy/{}/v1/generate", provider.id);

        assert!(!store.is_custom_configured(provider.id));
        assert_eq!(store.get_base_url(provider.id), None);
        assert_eq!(store.get_api_key(provider.id), None);
        assert_eq!(
            rewriter
                .transform_path_for_custom_api(&path, provider.id)
                .unwrap(),
            path
        );

        let request = rewriter.rewrite(None, &gateway_auth(), &path).unwrap();
        assert_eq!(request.url(GATEWAY), format!("{GATEWAY}{path}"));
        assert_eq!(request.auth, gateway_auth());
    }
}

#[test]
fn environment_wins_per_field() {
    let dir = TempDir::new().unwrap();
    fs::write(
        config_path(&dir),
        r#"{
            "gemini": {"base_url": "https://file.example.com", "api_key": "file-key"},
            "ltxv": {"api_key": "ltxv-file"}
        }"#,
    )
    .unwrap();

    let store = store(
        &dir,
        &[
            ("COMFY_API_GEMINI_BASE_URL", "https://generativelanguage.googleapis.com"),
            ("COMFY_API_MOONVALLEY_API_KEY", "mv-env"),
        ],
    );

    assert_eq!(
        store.get_base_url("gemini").as_deref(),
        Some("https://generativelanguage.googleapis.com")
    );
    assert_eq!(store.get_api_key("gemini").as_deref(), Some("file-key"));
    assert_eq!(store.get_api_key("ltxv").as_deref(), Some("ltxv-file"));
    assert_eq!(store.get_api_key("moonvalley").as_deref(), Some("mv-env"));
    assert_eq!(store.get_base_url("moonvalley"), None);
}

#[test]
fn stability_scenario() {
    let dir = TempDir::new().unwrap();
    fs::write(
        config_path(&dir),
        r#"{"stability": {"base_url": "https://api.stability.ai", "api_key": "k1"}}"#,
    )
    .unwrap();
    let store = store(&dir, &[]);
    let rewriter = RequestRewriter::new(&store);
    let path = "/proxy/stability/v1/generate";

    assert_eq!(get_provider_from_path(path).as_deref(), Some("stability"));

    let auth: AuthMaterial = [("auth", "old")].into_iter().collect();
    let (base_url, auth) = rewriter.apply_custom_config(Some("stability"), &auth, path);
    assert_eq!(base_url.as_deref(), Some("https://api.stability.ai"));
    assert!(auth.iter().any(|(_, value)| value == "k1"));

    assert_eq!(
        rewriter
            .transform_path_for_custom_api(path, "stability")
            .unwrap(),
        "/v1/generate"
    );
}

#[test]
fn runtime_override_then_save_and_reopen() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir, &[]);

    store
        .set_provider_config("openai", Some("https://api.openai.com"), Some("sk-test"))
        .unwrap();
    assert_eq!(
        store.get_base_url("openai").as_deref(),
        Some("https://api.openai.com")
    );
    assert_eq!(store.get_api_key("openai").as_deref(), Some("sk-test"));

    let err = store
        .set_provider_config("not-a-real-provider", None, Some("x"))
        .unwrap_err();
    assert!(matches!(err, CustomApiError::UnknownProvider(_)));
    assert_eq!(store.configured_providers(), vec!["openai"]);

    store.save().unwrap();

    let reopened = ConfigStore::with_loader(
        ConfigLoader::from_path(config_path(&dir)).with_env(EnvSource::fixed(
            Vec::<(String, String)>::new(),
        )),
    );
    let rewriter = RequestRewriter::new(&reopened);
    let request = rewriter
        .rewrite(None, &gateway_auth(), "/proxy/openai/v1/images/generations")
        .unwrap();

    assert_eq!(
        request.url(GATEWAY),
        "https://api.openai.com/v1/images/generations"
    );
    assert_eq!(request.auth.get("comfy_api_key"), Some("sk-test"));
}

#[test]
fn malformed_file_does_not_block_startup() {
    let dir = TempDir::new().unwrap();
    fs::write(config_path(&dir), "openai: {base_url: nope}").unwrap();
    let store = store(&dir, &[("COMFY_API_RODIN_API_KEY", "rodin")]);

    assert_eq!(store.warnings().len(), 1);
    assert!(store.is_custom_configured("rodin"));
    assert!(!store.is_custom_configured("openai"));
}
