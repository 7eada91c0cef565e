// Backend configuration from the environment

use crate::{ConfigError, EnvLoader, Result};
use ferry_storage::{
    AliOssConfig, BackendConfig, LocalConfig, MinioConfig, StorageError, TYPE_ALI_OSS, TYPE_LOCAL,
    TYPE_MINIO,
};

/// Build and validate the backend configuration for `storage_type` from
/// environment variables.
///
/// | type      | variables                                                                 |
/// |-----------|---------------------------------------------------------------------------|
/// | `ali-oss` | `OSS_ACCESS_KEY_ID`, `OSS_ACCESS_KEY_SECRET`, `OSS_REGION`, `OSS_BUCKET_NAME`, `OSS_ENDPOINT`? |
/// | `minio`   | `MINIO_ENDPOINT`, `MINIO_ACCESS_KEY_ID`, `MINIO_SECRET_ACCESS_KEY`, `MINIO_BUCKET_NAME`, `MINIO_USE_SSL`?, `MINIO_REGION`? |
/// | `local`   | `LOCAL_STORAGE_ROOT`, `LOCAL_PUBLIC_URL`, `LOCAL_SIGNING_SECRET`          |
pub fn backend_from_env(env: &EnvLoader, storage_type: &str) -> Result<BackendConfig> {
    let config: BackendConfig = match storage_type {
        TYPE_ALI_OSS => {
            let mut config = AliOssConfig::new(
                require(env, "OSS_ACCESS_KEY_ID", storage_type)?,
                require(env, "OSS_ACCESS_KEY_SECRET", storage_type)?,
                require(env, "OSS_REGION", storage_type)?,
                require(env, "OSS_BUCKET_NAME", storage_type)?,
            );
            config.endpoint = env.load_var_opt("OSS_ENDPOINT");
            config.into()
        }
        TYPE_MINIO => {
            let mut config = MinioConfig::new(
                require(env, "MINIO_ENDPOINT", storage_type)?,
                require(env, "MINIO_ACCESS_KEY_ID", storage_type)?,
                require(env, "MINIO_SECRET_ACCESS_KEY", storage_type)?,
                require(env, "MINIO_BUCKET_NAME", storage_type)?,
            )
            .use_ssl(env.load_bool_or("MINIO_USE_SSL", true));
            config.region = env.load_var_opt("MINIO_REGION");
            config.into()
        }
        TYPE_LOCAL => LocalConfig::new(
            require(env, "LOCAL_STORAGE_ROOT", storage_type)?,
            require(env, "LOCAL_PUBLIC_URL", storage_type)?,
            require(env, "LOCAL_SIGNING_SECRET", storage_type)?,
        )
        .into(),
        other => return Err(StorageError::UnsupportedBackend(other.to_string()).into()),
    };

    config.validate()?;
    Ok(config)
}

fn require(env: &EnvLoader, key: &str, storage_type: &str) -> Result<String> {
    env.load_var(key).map_err(|_| {
        ConfigError::Storage(StorageError::InvalidConfig(format!(
            "{}: {} is not set",
            storage_type,
            env.key(key)
        )))
    })
}
