//! Ferry - file uploads to pluggable object storage
//!
//! Ferry moves files into a configurable storage backend (Alibaba Cloud OSS,
//! MinIO or a local directory), streams live progress to subscribers over
//! WebSocket, and hands out expiring short links to signed download URLs.
//!
//! The service pieces live in their own crates and are re-exported here:
//!
//! - [`ferry_storage`]: backend contract, registry and built-in backends
//! - [`ferry_progress`]: progress tracking, connection hub and WebSocket server
//! - [`ferry_links`]: expiring short link registry and sweeper
//! - [`ferry_config`]: environment, `.env` and file configuration
//! - [`ferry_log`]: tracing subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use ferry::prelude::*;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> ferry::Result<()> {
//! let backend = LocalBackend::new(LocalConfig::new("./data", "http://localhost:8080", "secret")).await?;
//! let context = AppContext::new(Arc::new(backend));
//!
//! let outcome = Uploader::new(&context)
//!     .upload("upload-1", "reports/q1.pdf", Path::new("/tmp/q1.pdf"))
//!     .await?;
//! println!("stored at {}", outcome.url());
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod presign;
pub mod share;
pub mod upload;

pub use context::AppContext;
pub use error::{FerryError, Result};
pub use presign::{Presigner, download_ttl, parse_ttl, upload_ttl};
pub use share::{Redirect, ShareService, SharedLink};
pub use upload::{UploadOutcome, Uploader};

pub use ferry_config;
pub use ferry_links;
pub use ferry_log;
pub use ferry_progress;
pub use ferry_storage;

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        AppContext, FerryError, Presigner, Redirect, Result, ShareService, SharedLink,
        UploadOutcome, Uploader,
    };
    pub use ferry_config::{AppConfig, EnvLoader};
    pub use ferry_links::{LinkRegistry, LinkSweeper};
    pub use ferry_progress::{ProgressServer, ProgressServerConfig, ProgressService};
    pub use ferry_storage::{
        BackendConfig, BackendRegistry, LocalBackend, LocalConfig, SignedUrl, StorageBackend,
        UploadReceipt,
    };
}
