//! In-memory short link table.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, info};

use crate::error::{LinkError, LinkResult};
use crate::link::{ResolvedLink, ShortLink, composite_id};
use crate::token::generate_token;

/// Attempts at finding an unused token before giving up.
pub const MAX_TOKEN_ATTEMPTS: usize = 8;

/// Maps short tokens to signed URLs until they expire.
///
/// Expired links are removed on the read that finds them, or by
/// [`LinkRegistry::sweep`], whichever comes first.
#[derive(Debug, Default)]
pub struct LinkRegistry {
    links: RwLock<HashMap<String, ShortLink>>,
}

impl LinkRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a link to `long_url` valid until `expiration`.
    pub fn create_link(
        &self,
        long_url: impl Into<String>,
        file_name: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> LinkResult<ShortLink> {
        self.create_link_at(long_url, file_name, expiration, Utc::now())
    }

    /// Create a link as of `now`.
    pub fn create_link_at(
        &self,
        long_url: impl Into<String>,
        file_name: impl Into<String>,
        expiration: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> LinkResult<ShortLink> {
        let long_url = long_url.into();
        let file_name = file_name.into();
        if long_url.is_empty() {
            return Err(LinkError::EmptyUrl);
        }
        if expiration <= now {
            return Err(LinkError::AlreadyExpired(expiration));
        }

        let mut links = self.links.write();
        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let token = generate_token();
            if let Entry::Vacant(slot) = links.entry(token.clone()) {
                let link = ShortLink {
                    composite_id: composite_id(&token, &file_name),
                    token,
                    long_url,
                    file_name,
                    expiration,
                };
                debug!(token = %link.token, expiration = %link.expiration, "Short link created");
                slot.insert(link.clone());
                return Ok(link);
            }
        }
        Err(LinkError::TokenExhausted(MAX_TOKEN_ATTEMPTS))
    }

    /// Resolve a bare token.
    pub fn resolve(&self, token: &str) -> Option<ResolvedLink> {
        self.resolve_at(token, Utc::now())
    }

    /// Resolve a bare token as of `now`, deleting it if it has expired.
    pub fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Option<ResolvedLink> {
        {
            let links = self.links.read();
            let link = links.get(token)?;
            if !link.is_expired_at(now) {
                return Some(link.target());
            }
        }

        self.remove_if_expired(token, now);
        None
    }

    /// Resolve either a composite id (`token/<encoded file name>`) or a bare
    /// token by scanning every link.
    pub fn resolve_composite(&self, id: &str) -> Option<ResolvedLink> {
        self.resolve_composite_at(id, Utc::now())
    }

    /// Composite lookup as of `now`.
    pub fn resolve_composite_at(&self, id: &str, now: DateTime<Utc>) -> Option<ResolvedLink> {
        let token = {
            let links = self.links.read();
            let link = links
                .values()
                .find(|link| link.composite_id == id)
                .or_else(|| links.get(id))?;
            if !link.is_expired_at(now) {
                return Some(link.target());
            }
            link.token.clone()
        };

        self.remove_if_expired(&token, now);
        None
    }

    fn remove_if_expired(&self, token: &str, now: DateTime<Utc>) {
        let mut links = self.links.write();
        if links.get(token).is_some_and(|link| link.is_expired_at(now)) {
            links.remove(token);
            debug!(token = %token, "Expired short link removed on read");
        }
    }

    /// Look up a link without expiring it.
    pub fn get(&self, token: &str) -> Option<ShortLink> {
        self.links.read().get(token).cloned()
    }

    /// Delete a link.
    pub fn remove(&self, token: &str) -> Option<ShortLink> {
        self.links.write().remove(token)
    }

    /// Delete every expired link.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// Delete every link expired at `now`; returns how many were removed.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut links = self.links.write();
        let before = links.len();
        links.retain(|_, link| !link.is_expired_at(now));
        let removed = before - links.len();
        if removed > 0 {
            info!(removed, remaining = links.len(), "Swept expired short links");
        }
        removed
    }

    /// Number of stored links, expired or not.
    pub fn len(&self) -> usize {
        self.links.read().len()
    }

    /// Check if no links are stored.
    pub fn is_empty(&self) -> bool {
        self.links.read().is_empty()
    }
}
