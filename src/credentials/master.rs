//! Access to the long-lived master secret.

use super::{AwsCredentials, ChainCredentialsProvider, CredentialsProvider};
use crate::error::TempCredsError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Supplies the long-lived root credential temporary credentials are
/// derived from.
#[async_trait]
pub trait MasterSecretAccessor: Send + Sync {
    /// Return the master credential.
    async fn get(&self) -> Result<AwsCredentials, TempCredsError>;

    /// Mark any held master material unusable so the next `get()` loads it
    /// again.
    fn invalidate(&self);
}

/// Caches the master credential loaded from an inner provider until it is
/// invalidated or expires.
pub struct MasterCredentials {
    provider: Arc<dyn CredentialsProvider>,
    cached: Mutex<Option<AwsCredentials>>,
}

impl MasterCredentials {
    /// Wrap an arbitrary credentials provider.
    pub fn new(provider: Arc<dyn CredentialsProvider>) -> Self {
        Self {
            provider,
            cached: Mutex::new(None),
        }
    }

    /// Master credentials for `credentials_name` from the environment or the
    /// shared credentials file.
    pub fn for_account(credentials_name: impl Into<String>) -> Self {
        Self::new(Arc::new(ChainCredentialsProvider::for_account(
            credentials_name,
        )))
    }

    /// Master credentials for `credentials_name` from the OS keyring.
    #[cfg(feature = "keyring")]
    pub fn from_keyring(credentials_name: impl Into<String>) -> Self {
        Self::new(Arc::new(super::KeyringCredentialsProvider::new(
            credentials_name,
        )))
    }

    /// Returns true if a usable credential is currently held.
    pub fn is_cached(&self) -> bool {
        self.cached
            .lock()
            .as_ref()
            .map_or(false, |creds| !creds.is_expired())
    }
}

#[async_trait]
impl MasterSecretAccessor for MasterCredentials {
    async fn get(&self) -> Result<AwsCredentials, TempCredsError> {
        let cached = self.cached.lock().clone();
        if let Some(creds) = cached {
            if !creds.is_expired() {
                return Ok(creds);
            }
        }

        debug!("Loading master credentials from {} provider", self.provider.name());
        let creds = self.provider.credentials().await?;
        *self.cached.lock() = Some(creds.clone());
        Ok(creds)
    }

    fn invalidate(&self) {
        *self.cached.lock() = None;
    }
}

impl fmt::Debug for MasterCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterCredentials")
            .field("provider", &self.provider.name())
            .field("cached", &self.is_cached())
            .finish()
    }
}
