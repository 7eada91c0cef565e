//! Integration tests for ferry-config

use ferry_config::*;
use ferry_storage::BackendConfig;
use std::env;
use std::io::Write;
use std::time::Duration;

fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn test_from_toml_file_with_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "ferry.toml",
        r#"
storage_type = "minio"
progress_addr = "127.0.0.1:6000"
sweep_interval_secs = 120

[backend]
type = "minio"
endpoint = "localhost:9000"
access_key_id = "minioadmin"
secret_access_key = "minioadmin"
bucket_name = "uploads"
use_ssl = false
"#,
    );

    let config = AppConfig::from_file(&path).unwrap();
    assert_eq!(config.storage_type, "minio");
    assert_eq!(config.progress_addr.port(), 6000);
    assert_eq!(config.sweep_interval, Duration::from_secs(120));
    assert_eq!(config.progress_path, DEFAULT_PROGRESS_PATH);

    let backend = config
        .backend_config(&EnvLoader::new(Some("FERRY_IT_UNUSED".into())))
        .unwrap();
    assert!(matches!(backend, BackendConfig::Minio(ref m) if !m.use_ssl));
}

#[test]
fn test_file_backend_with_missing_field_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "ferry.toml",
        r#"
storage_type = "ali-oss"

[backend]
type = "ali-oss"
access_key_id = "id"
access_key_secret = ""
region = "cn-hangzhou"
bucket_name = "media"
"#,
    );

    let config = AppConfig::from_file(&path).unwrap();
    let err = config
        .backend_config(&EnvLoader::new(Some("FERRY_IT_UNUSED".into())))
        .unwrap_err();
    assert!(err.is_invalid_backend());
}

#[test]
fn test_cli_override_falls_back_to_env_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "ferry.json",
        r#"{"storage_type": "ali-oss", "verbose": true}"#,
    );
    let loader = EnvLoader::new(Some("FERRY_IT_LOCAL".into()));
    unsafe {
        env::set_var("FERRY_IT_LOCAL_LOCAL_STORAGE_ROOT", dir.path().join("objects"));
        env::set_var("FERRY_IT_LOCAL_LOCAL_PUBLIC_URL", "http://localhost:8080/files");
        env::set_var("FERRY_IT_LOCAL_LOCAL_SIGNING_SECRET", "s3cret");
    }

    let config = AppConfig::from_file(&path)
        .unwrap()
        .with_storage_override(Some("local".into()));
    assert!(config.verbose);
    let backend = config.backend_config(&loader).unwrap();
    assert_eq!(backend.storage_type(), "local");

    unsafe {
        env::remove_var("FERRY_IT_LOCAL_LOCAL_STORAGE_ROOT");
        env::remove_var("FERRY_IT_LOCAL_LOCAL_PUBLIC_URL");
        env::remove_var("FERRY_IT_LOCAL_LOCAL_SIGNING_SECRET");
    }
}

#[test]
fn test_dotenv_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, ".env", "FERRY_IT_DOTENV_VALUE=from-dotenv\n");

    let loaded = load_dotenv(Some(&path)).unwrap();
    assert_eq!(loaded.as_deref(), Some(path.as_path()));
    assert_eq!(
        EnvLoader::new(None).load_var("FERRY_IT_DOTENV_VALUE").unwrap(),
        "from-dotenv"
    );

    unsafe {
        env::remove_var("FERRY_IT_DOTENV_VALUE");
    }
}

#[test]
fn test_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "ferry.yaml", "storage_type: minio");
    assert!(matches!(AppConfig::from_file(&path), Err(ConfigError::LoadError(_))));
}

#[test]
fn test_config_error_display() {
    let err = ConfigError::ParseError("test_key".to_string());
    assert!(err.to_string().contains("test_key"));
}
