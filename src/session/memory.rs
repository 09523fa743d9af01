//! In-process session cache.

use super::{SessionCache, SessionKey, SessionToken};
use crate::error::CacheError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Session cache backed by a map; lives only as long as the process.
///
/// Entries past their hard expiration are reported as misses.
#[derive(Debug, Default)]
pub struct InMemorySessionCache {
    entries: RwLock<HashMap<SessionKey, SessionToken>>,
}

impl InMemorySessionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove the entry for `key`, if any.
    pub fn remove(&self, key: &SessionKey) -> Option<SessionToken> {
        self.entries.write().remove(key)
    }
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    async fn retrieve(&self, key: &SessionKey) -> Result<Option<SessionToken>, CacheError> {
        Ok(self
            .entries
            .read()
            .get(key)
            .filter(|token| !token.is_expired())
            .cloned())
    }

    async fn store(&self, key: &SessionKey, token: &SessionToken) -> Result<(), CacheError> {
        self.entries.write().insert(key.clone(), token.clone());
        Ok(())
    }
}
