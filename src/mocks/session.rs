//! Mock session cache for testing.

use crate::error::CacheError;
use crate::session::{SessionCache, SessionKey, SessionToken};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Mock session cache that returns whatever was stored, expired or not.
#[derive(Default)]
pub struct MockSessionCache {
    entries: Mutex<HashMap<SessionKey, SessionToken>>,
    retrieve_count: AtomicUsize,
    store_count: AtomicUsize,
    fail_retrieve: AtomicBool,
    fail_store: AtomicBool,
}

impl MockSessionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry without counting a store.
    pub fn insert(&self, key: SessionKey, token: SessionToken) {
        self.entries.lock().unwrap().insert(key, token);
    }

    /// Peek at an entry without counting a retrieve.
    pub fn get(&self, key: &SessionKey) -> Option<SessionToken> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Make every `retrieve` fail.
    pub fn set_fail_retrieve(&self, fail: bool) {
        self.fail_retrieve.store(fail, Ordering::SeqCst);
    }

    /// Make every `store` fail.
    pub fn set_fail_store(&self, fail: bool) {
        self.fail_store.store(fail, Ordering::SeqCst);
    }

    /// Number of `retrieve` calls.
    pub fn retrieve_count(&self) -> usize {
        self.retrieve_count.load(Ordering::SeqCst)
    }

    /// Number of `store` calls, failed ones included.
    pub fn store_count(&self) -> usize {
        self.store_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionCache for MockSessionCache {
    async fn retrieve(&self, key: &SessionKey) -> Result<Option<SessionToken>, CacheError> {
        self.retrieve_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_retrieve.load(Ordering::SeqCst) {
            return Err(CacheError::Backend {
                message: "mock retrieve failure".to_string(),
            });
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn store(&self, key: &SessionKey, token: &SessionToken) -> Result<(), CacheError> {
        self.store_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(CacheError::Backend {
                message: "mock store failure".to_string(),
            });
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.clone(), token.clone());
        Ok(())
    }
}
