//! Pluggable object storage for Ferry
//!
//! This crate provides:
//! - The [`StorageBackend`] contract every backend satisfies
//! - [`BackendConfig`], a tagged configuration over the known backends
//! - [`BackendRegistry`], mapping storage type tags to constructors
//! - Built-in backends for Alibaba Cloud OSS, MinIO and the local filesystem
//!
//! # Quick Start
//!
//! ```no_run
//! use ferry_storage::*;
//! use std::path::Path;
//!
//! # async fn example() -> Result<()> {
//! let registry = BackendRegistry::with_builtin();
//! let config = LocalConfig::new("./uploads", "http://localhost:8080/files", "secret");
//! let backend = registry.resolve(config.into()).await?;
//!
//! let receipt = backend
//!     .upload("reports/q1.pdf", Path::new("/tmp/q1.pdf"), None)
//!     .await?;
//! println!("Stored {} bytes at {}", receipt.size, backend.public_url("reports/q1.pdf"));
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod local;
pub mod registry;

#[cfg(feature = "s3")]
pub mod alioss;
#[cfg(feature = "s3")]
pub mod minio;
#[cfg(feature = "s3")]
pub mod s3compat;

pub use backend::*;
pub use config::*;
pub use error::*;
pub use local::LocalBackend;
pub use registry::*;

#[cfg(feature = "s3")]
pub use s3compat::S3CompatBackend;
