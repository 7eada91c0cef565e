//! Explicitly constructed service bundle shared by every request.

use ferry_config::{AppConfig, EnvLoader};
use ferry_links::LinkRegistry;
use ferry_progress::ProgressService;
use ferry_storage::{BackendRegistry, StorageBackend};
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::Result;

/// Backend, progress service and link registry for one process.
#[derive(Clone)]
pub struct AppContext {
    backend: Arc<dyn StorageBackend>,
    progress: Arc<ProgressService>,
    links: Arc<LinkRegistry>,
}

impl AppContext {
    /// Wrap an already-built backend with fresh progress and link state.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            progress: Arc::new(ProgressService::new()),
            links: Arc::new(LinkRegistry::new()),
        }
    }

    /// Resolve the configured backend with the built-in registry.
    pub async fn from_config(config: &AppConfig, env: &EnvLoader) -> Result<Self> {
        Self::from_registry(&BackendRegistry::with_builtin(), config, env).await
    }

    /// Resolve the configured backend with a specific registry.
    pub async fn from_registry(
        registry: &BackendRegistry,
        config: &AppConfig,
        env: &EnvLoader,
    ) -> Result<Self> {
        let backend_config = config.backend_config(env)?;
        let backend = registry.resolve(backend_config).await?;
        info!(
            storage_type = backend.storage_type(),
            domain = %backend.public_domain(),
            "Storage service initialized"
        );
        Ok(Self::new(backend))
    }

    /// The storage backend.
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// The progress service.
    pub fn progress(&self) -> &Arc<ProgressService> {
        &self.progress
    }

    /// The short link registry.
    pub fn links(&self) -> &Arc<LinkRegistry> {
        &self.links
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("storage_type", &self.backend.storage_type())
            .field("links", &self.links.len())
            .finish()
    }
}
