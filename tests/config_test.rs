//! Tests for loading configuration and secrets from disk.

use std::fs;
use std::time::Duration;

use muninn::{Config, Muninn, MuninnError, Secrets};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn explicit_config_file_is_loaded() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "config.toml",
        r#"
            [cache]
            max_entries = 10
            ttl_secs = 30

            [providers]
            timeout_secs = 2
        "#,
    );

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.cache.max_entries, 10);
    assert_eq!(config.cache.to_cache_config().ttl, Duration::from_secs(30));
    assert_eq!(config.providers.timeout_secs, 2);
}

#[test]
fn invalid_toml_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "config.toml", "[cache\nmax_entries = ");
    assert!(matches!(
        Config::load(Some(&path)),
        Err(MuninnError::Configuration(_))
    ));
}

#[test]
fn zero_timeout_fails_validation() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "config.toml", "[providers]\ntimeout_secs = 0\n");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn cache_ttl_beyond_one_year_fails_validation() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "config.toml", "[cache]\nttl_secs = 9223372036854775807\n");
    assert!(Config::from_file(&path).is_err());

    let path = write(&dir, "year.toml", "[cache]\nttl_secs = 31536000\n");
    assert!(Config::from_file(&path).is_ok());
}

#[test]
fn zero_retry_attempts_fail_validation() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "config.toml", "[providers.retry]\nmax_attempts = 0\n");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn zero_ttl_with_cache_enabled_fails_validation() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "config.toml", "[cache]\nttl_secs = 0\n");
    assert!(Config::from_file(&path).is_err());

    let path = write(&dir, "disabled.toml", "[cache]\nmax_entries = 0\nttl_secs = 0\n");
    assert!(Config::from_file(&path).is_ok());
}

#[cfg(unix)]
mod secrets {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    const SECRETS: &str = r#"
        [remote]
        api_key = "sk-from-file"

        [auth]
        secret_key = "file-signing-secret-value"
    "#;

    fn secrets_file(dir: &TempDir, mode: u32) -> std::path::PathBuf {
        let path = write(dir, "secrets.toml", SECRETS);
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[test]
    fn owner_only_file_is_accepted() {
        let dir = TempDir::new().unwrap();
        let secrets = Secrets::from_file(&secrets_file(&dir, 0o600)).unwrap();
        assert_eq!(secrets.remote_api_key().as_deref(), Some("sk-from-file"));
        assert_eq!(secrets.signing_secret().unwrap(), "file-signing-secret-value");
    }

    #[test]
    fn read_only_file_is_accepted() {
        let dir = TempDir::new().unwrap();
        assert!(Secrets::from_file(&secrets_file(&dir, 0o400)).is_ok());
    }

    #[test]
    fn group_readable_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = Secrets::from_file(&secrets_file(&dir, 0o644)).unwrap_err();
        assert!(err.to_string().contains("insecure permissions"));
    }
}

#[test]
fn placeholder_signing_secret_is_refused() {
    let secrets: Secrets = toml::from_str(&format!(
        "[auth]\nsecret_key = \"{}\"\n",
        muninn::config::PLACEHOLDER_SECRET
    ))
    .unwrap();
    assert!(matches!(
        secrets.signing_secret(),
        Err(MuninnError::Configuration(_))
    ));
}

#[tokio::test]
async fn engine_from_config_without_remote_key_uses_rules() {
    let config: Config = toml::from_str("[cache]\nmax_entries = 0\n").unwrap();
    let secrets = Secrets {
        remote: Some(muninn::config::ApiKeySecret {
            api_key: String::new(),
        }),
        auth: None,
    };

    let engine = Muninn::from_config(&config, &secrets).unwrap().build().unwrap();
    let metrics = engine.get_metrics().await;

    assert_eq!(metrics.providers_available, vec![muninn::ProviderKind::RuleBased]);
    assert_eq!(metrics.cache_size, 0);
}

#[tokio::test]
async fn engine_from_config_enables_remote_with_key() {
    let config: Config =
        toml::from_str("[providers.remote]\nbase_url = \"http://127.0.0.1:9\"\n").unwrap();
    let secrets = Secrets {
        remote: Some(muninn::config::ApiKeySecret {
            api_key: "sk-from-file".into(),
        }),
        auth: None,
    };

    let engine = Muninn::from_config(&config, &secrets).unwrap().build().unwrap();

    assert_eq!(
        engine.get_metrics().await.providers_available,
        vec![muninn::ProviderKind::RemoteLlm, muninn::ProviderKind::RuleBased]
    );
}

#[cfg(not(feature = "local-inference"))]
#[tokio::test]
async fn unloadable_local_model_is_skipped() {
    let config: Config =
        toml::from_str("[providers.local.python]\nrepo_id = \"org/model\"\n").unwrap();
    let engine = Muninn::from_config(&config, &Secrets::default())
        .unwrap()
        .build()
        .unwrap();
    assert!(engine.get_metrics().await.models_loaded.is_empty());
}
