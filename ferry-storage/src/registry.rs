//! Backend registry.
//!
//! Maps a storage type tag to a constructor. Registration overwrites any
//! previous constructor for the same tag.

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::{BackendConfig, Result, StorageBackend, StorageError};

/// Future returned by a backend constructor.
pub type BackendFuture = BoxFuture<'static, Result<Arc<dyn StorageBackend>>>;

/// Builds a backend from a configuration.
///
/// Constructors must validate the configuration themselves and fail fast on
/// bad credentials, region or bucket.
pub type BackendConstructor = Arc<dyn Fn(BackendConfig) -> BackendFuture + Send + Sync>;

/// Registry of backend constructors keyed by storage type.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    constructors: Arc<RwLock<HashMap<String, BackendConstructor>>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every compiled-in backend registered.
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        crate::local::register(&registry);
        #[cfg(feature = "s3")]
        {
            crate::alioss::register(&registry);
            crate::minio::register(&registry);
        }
        registry
    }

    /// Register a constructor, replacing any previous one for `storage_type`.
    pub fn register<F>(&self, storage_type: impl Into<String>, constructor: F)
    where
        F: Fn(BackendConfig) -> BackendFuture + Send + Sync + 'static,
    {
        let storage_type = storage_type.into();
        debug!(storage_type = %storage_type, "Registering storage backend");
        let mut constructors = self
            .constructors
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        constructors.insert(storage_type, Arc::new(constructor));
    }

    /// Remove the constructor for `storage_type`.
    pub fn unregister(&self, storage_type: &str) -> bool {
        let mut constructors = self
            .constructors
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        constructors.remove(storage_type).is_some()
    }

    /// Check whether a constructor is registered for `storage_type`.
    pub fn is_registered(&self, storage_type: &str) -> bool {
        self.constructor(storage_type).is_some()
    }

    /// Registered storage types, sorted.
    pub fn storage_types(&self) -> Vec<String> {
        let constructors = self
            .constructors
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut types: Vec<String> = constructors.keys().cloned().collect();
        types.sort();
        types
    }

    fn constructor(&self, storage_type: &str) -> Option<BackendConstructor> {
        let constructors = self
            .constructors
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        constructors.get(storage_type).cloned()
    }

    /// Resolve a configuration to a live backend.
    ///
    /// Fails with [`StorageError::UnsupportedBackend`] before any constructor
    /// runs when the tag is unknown, and with [`StorageError::InvalidConfig`]
    /// when a required field is missing.
    pub async fn resolve(&self, config: BackendConfig) -> Result<Arc<dyn StorageBackend>> {
        let storage_type = config.storage_type();
        let constructor = self
            .constructor(storage_type)
            .ok_or_else(|| StorageError::UnsupportedBackend(storage_type.to_string()))?;

        config.validate()?;

        // The lock is released before awaiting the constructor.
        let backend = constructor(config).await?;
        info!(storage_type = %storage_type, "Storage backend ready");
        Ok(backend)
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("storage_types", &self.storage_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AliOssConfig, MinioConfig};

    #[tokio::test]
    async fn test_unknown_tag_is_unsupported() {
        let registry = BackendRegistry::new();
        let config = BackendConfig::from(MinioConfig::new("h:9000", "id", "secret", "b"));
        let err = registry.resolve(config).await.err().unwrap();
        assert!(err.is_unsupported());
        assert_eq!(err.to_string(), "Unsupported storage type: minio");
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_construction() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let called = Arc::new(AtomicBool::new(false));
        let registry = BackendRegistry::new();
        let flag = called.clone();
        registry.register("ali-oss", move |_config| {
            flag.store(true, Ordering::SeqCst);
            Box::pin(async { Err(StorageError::construction("ali-oss", "unexpected")) })
        });

        let config = BackendConfig::from(AliOssConfig::new("id", "", "cn-hangzhou", "b"));
        let err = registry.resolve(config).await.err().unwrap();
        assert!(err.is_invalid_config());
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_storage_types_sorted() {
        let registry = BackendRegistry::new();
        registry.register("minio", |_| Box::pin(async { Err(StorageError::construction("minio", "x")) }));
        registry.register("ali-oss", |_| Box::pin(async { Err(StorageError::construction("ali-oss", "x")) }));
        assert_eq!(registry.storage_types(), vec!["ali-oss", "minio"]);
        assert!(registry.unregister("minio"));
        assert!(!registry.is_registered("minio"));
    }

    #[test]
    fn test_builtin_includes_local() {
        let registry = BackendRegistry::with_builtin();
        assert!(registry.is_registered("local"));
        #[cfg(feature = "s3")]
        {
            assert!(registry.is_registered("ali-oss"));
            assert!(registry.is_registered("minio"));
        }
    }
}
