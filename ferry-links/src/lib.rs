//! Expiring short links for Ferry
//!
//! A [`LinkRegistry`] maps short tokens to long signed URLs. Links resolve
//! until their expiration, then disappear on the next read or the next sweep
//! by a [`LinkSweeper`].
//!
//! ```
//! use chrono::{Duration, Utc};
//! use ferry_links::LinkRegistry;
//!
//! let registry = LinkRegistry::new();
//! let link = registry
//!     .create_link("https://bucket/report.pdf?sig=abc", "report.pdf", Utc::now() + Duration::hours(1))
//!     .unwrap();
//! let target = registry.resolve(&link.token).unwrap();
//! assert_eq!(target.file_name, "report.pdf");
//! ```

pub mod error;
pub mod link;
pub mod registry;
pub mod sweeper;
pub mod token;

pub use error::*;
pub use link::*;
pub use registry::*;
pub use sweeper::*;
pub use token::{TOKEN_LEN, generate_token};
