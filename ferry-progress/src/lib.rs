//! # Ferry Progress
//!
//! Upload progress tracking with WebSocket push.
//!
//! ## Features
//!
//! - Latest-snapshot progress tracking per upload-id, with speed in KB/s
//! - One push subscriber per upload-id, best-effort delivery
//! - 10% step throttling for progress logging
//! - WebSocket server accepting `GET <path>/<upload-id>` subscriptions
//!
//! ## Example
//!
//! ```rust,no_run
//! use ferry_progress::{ProgressServer, ProgressServerConfig, ProgressService};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), ferry_progress::PushError> {
//! let service = Arc::new(ProgressService::new());
//! let server = ProgressServer::new(ProgressServerConfig::default(), Arc::clone(&service));
//! let shutdown = CancellationToken::new();
//! tokio::spawn({
//!     let shutdown = shutdown.clone();
//!     async move { server.run(shutdown).await }
//! });
//!
//! let on_progress = service.callback("upload-42", "video.mp4");
//! on_progress(1024, 1024, 4096);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod hub;
mod message;
mod server;
mod service;
mod subscriber;
mod throttle;
mod tracker;

pub use error::{PushError, PushResult};
pub use hub::{ConnectionHub, PushOutcome};
pub use message::PushMessage;
pub use server::{DEFAULT_PROGRESS_PATH, ProgressServer, ProgressServerConfig};
pub use service::ProgressService;
pub use subscriber::{ConnectionId, Subscriber, SubscriberState};
pub use throttle::ProgressThrottle;
pub use tracker::{ProgressTracker, UploadProgress, percentage};
