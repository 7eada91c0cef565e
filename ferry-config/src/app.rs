// Application settings

use crate::{ConfigLoader, ConfigValidator, EnvLoader, Result, Validate, backend_from_env};
use ferry_storage::{BackendConfig, TYPE_ALI_OSS};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default progress server address.
pub const DEFAULT_PROGRESS_ADDR: &str = "0.0.0.0:5051";
/// Default progress route prefix.
pub const DEFAULT_PROGRESS_PATH: &str = "/api/ws/progress";
/// Default link sweep interval.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Default log directory.
pub const DEFAULT_LOG_DIR: &str = "./logs";

/// Process-wide settings.
///
/// Storage type precedence is CLI flag, then the `OSS` environment variable,
/// then `ali-oss`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Storage type tag used to pick a backend
    pub storage_type: String,
    /// Verbose logging
    pub verbose: bool,
    /// Progress server bind address
    pub progress_addr: SocketAddr,
    /// Progress server route prefix
    pub progress_path: String,
    /// Time between link sweeps
    #[serde(rename = "sweep_interval_secs", with = "duration_secs")]
    pub sweep_interval: Duration,
    /// Directory for `app.log`
    pub log_dir: PathBuf,
    /// Backend settings from a file; the environment is used when absent
    pub backend: Option<BackendConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_type: TYPE_ALI_OSS.to_string(),
            verbose: false,
            progress_addr: SocketAddr::from(([0, 0, 0, 0], 5051)),
            progress_path: DEFAULT_PROGRESS_PATH.to_string(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            backend: None,
        }
    }
}

impl AppConfig {
    /// Load settings from the environment.
    ///
    /// Reads `OSS`, `FERRY_DEBUG`, `FERRY_PROGRESS_ADDR`, `FERRY_PROGRESS_PATH`,
    /// `FERRY_SWEEP_INTERVAL_SECS` and `FERRY_LOG_DIR`.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(&EnvLoader::default())
    }

    /// Load settings through a specific loader.
    pub fn from_env_with(env: &EnvLoader) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            storage_type: env.load_var_or("OSS", &defaults.storage_type),
            verbose: env.load_bool_or("FERRY_DEBUG", defaults.verbose),
            progress_addr: env.load_parse_or("FERRY_PROGRESS_ADDR", defaults.progress_addr)?,
            progress_path: env.load_var_or("FERRY_PROGRESS_PATH", &defaults.progress_path),
            sweep_interval: Duration::from_secs(
                env.load_parse_or("FERRY_SWEEP_INTERVAL_SECS", defaults.sweep_interval.as_secs())?,
            ),
            log_dir: env
                .load_var_opt("FERRY_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            backend: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a TOML or JSON file.
    ///
    /// ```toml
    /// storage_type = "minio"
    /// progress_addr = "127.0.0.1:5051"
    ///
    /// [backend]
    /// type = "minio"
    /// endpoint = "localhost:9000"
    /// access_key_id = "minioadmin"
    /// secret_access_key = "minioadmin"
    /// bucket_name = "uploads"
    /// ```
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: Self = ConfigLoader::auto(path)?.load_file(path)?;
        config.validate()?;
        info!(path = %path.display(), storage_type = %config.storage_type, "Loaded settings file");
        Ok(config)
    }

    /// Apply a CLI storage type, which wins over every other source.
    pub fn with_storage_override(mut self, storage_type: Option<String>) -> Self {
        if let Some(storage_type) = storage_type.filter(|s| !s.trim().is_empty()) {
            self.storage_type = storage_type;
        }
        self
    }

    /// Apply the CLI verbose flag.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose |= verbose;
        self
    }

    /// Resolve the backend configuration for the selected storage type.
    ///
    /// A file-provided backend is used when its type matches; otherwise the
    /// environment is read. The result is validated.
    pub fn backend_config(&self, env: &EnvLoader) -> Result<BackendConfig> {
        match &self.backend {
            Some(backend) if backend.storage_type() == self.storage_type => {
                debug!(storage_type = %self.storage_type, "Using backend settings from file");
                backend.validate()?;
                Ok(backend.clone())
            }
            _ => {
                debug!(storage_type = %self.storage_type, "Reading backend settings from environment");
                backend_from_env(env, &self.storage_type)
            }
        }
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.storage_type, "storage_type")?;
        ConfigValidator::is_route(&self.progress_path, "progress_path")?;
        ConfigValidator::is_port(self.progress_addr.port(), "progress_addr")?;
        ConfigValidator::non_zero(self.sweep_interval, "sweep_interval_secs")
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.storage_type, "ali-oss");
        assert_eq!(config.progress_addr.to_string(), DEFAULT_PROGRESS_ADDR);
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_storage_precedence() {
        let loader = EnvLoader::new(Some("FERRY_APP_PRECEDENCE".to_string()));
        unsafe {
            env::set_var("FERRY_APP_PRECEDENCE_OSS", "minio");
        }

        let from_env = AppConfig::from_env_with(&loader).unwrap();
        assert_eq!(from_env.storage_type, "minio");

        let from_cli = from_env.clone().with_storage_override(Some("local".into()));
        assert_eq!(from_cli.storage_type, "local");
        let blank_cli = from_env.with_storage_override(Some(" ".into()));
        assert_eq!(blank_cli.storage_type, "minio");

        unsafe {
            env::remove_var("FERRY_APP_PRECEDENCE_OSS");
        }
    }

    #[test]
    fn test_env_without_overrides_uses_defaults() {
        let loader = EnvLoader::new(Some("FERRY_APP_UNSET".to_string()));
        let config = AppConfig::from_env_with(&loader).unwrap();
        assert_eq!(config.storage_type, "ali-oss");
        assert_eq!(config.progress_path, "/api/ws/progress");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.sweep_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.progress_path = "progress".into();
        assert!(config.validate().is_err());
    }
}
