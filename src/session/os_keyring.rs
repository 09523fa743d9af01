//! Session cache in the operating system keyring.

use super::{decode_live, SessionCache, SessionKey, SessionToken};
use crate::error::CacheError;
use async_trait::async_trait;
use keyring::Entry;
use tracing::debug;

/// Keyring service name used when none is given.
pub const DEFAULT_SERVICE: &str = "aws-tempcreds";

/// Session cache backed by the OS keyring (Keychain, Secret Service,
/// Windows Credential Manager).
///
/// Each session is stored as a JSON record under the entry
/// `(service, "session:<account>[:<mfa serial>]")`. Expired entries are
/// reported as misses.
#[derive(Debug, Clone)]
pub struct KeyringSessionCache {
    service: String,
}

impl KeyringSessionCache {
    /// Cache under [`DEFAULT_SERVICE`].
    pub fn new() -> Self {
        Self::with_service(DEFAULT_SERVICE)
    }

    /// Cache under a custom keyring service name.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &SessionKey) -> Result<Entry, CacheError> {
        Entry::new(&self.service, &key.to_string()).map_err(backend_error)
    }
}

impl Default for KeyringSessionCache {
    fn default() -> Self {
        Self::new()
    }
}

fn backend_error(e: keyring::Error) -> CacheError {
    CacheError::Backend {
        message: format!("keyring: {}", e),
    }
}

fn join_error(e: tokio::task::JoinError) -> CacheError {
    CacheError::Backend {
        message: format!("keyring task failed: {}", e),
    }
}

fn read_record(
    password: keyring::Result<String>,
    key: &SessionKey,
) -> Result<Option<SessionToken>, CacheError> {
    let json = match password {
        Ok(json) => json,
        Err(keyring::Error::NoEntry) => return Ok(None),
        Err(e) => return Err(backend_error(e)),
    };

    let token = decode_live(&json)?;
    if token.is_none() {
        debug!("Ignoring expired keyring session for {}", key);
    }
    Ok(token)
}

#[async_trait]
impl SessionCache for KeyringSessionCache {
    async fn retrieve(&self, key: &SessionKey) -> Result<Option<SessionToken>, CacheError> {
        let entry = self.entry(key)?;
        let password = tokio::task::spawn_blocking(move || entry.get_password())
            .await
            .map_err(join_error)?;

        read_record(password, key)
    }

    async fn store(&self, key: &SessionKey, token: &SessionToken) -> Result<(), CacheError> {
        let entry = self.entry(key)?;
        let json = token.to_json()?;
        tokio::task::spawn_blocking(move || entry.set_password(&json))
            .await
            .map_err(join_error)?
            .map_err(backend_error)?;

        debug!("Stored session for {} in keyring service {}", key, self.service);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn key() -> SessionKey {
        SessionKey::new("prod", "arn:aws:iam::123456789012:mfa/dev")
    }

    fn record(ttl: Duration) -> String {
        SessionToken::new("ASIAKEYRING", "secret", "token", Utc::now() + ttl)
            .to_json()
            .unwrap()
    }

    #[test]
    fn test_live_record_is_a_hit() {
        let token = read_record(Ok(record(Duration::hours(1))), &key())
            .unwrap()
            .unwrap();
        assert_eq!(token.access_key_id(), "ASIAKEYRING");
        assert_eq!(token.session_token(), "token");
    }

    #[test]
    fn test_expired_record_is_a_miss() {
        assert!(read_record(Ok(record(-Duration::minutes(1))), &key())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_missing_entry_is_a_miss() {
        assert!(read_record(Err(keyring::Error::NoEntry), &key())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_malformed_record() {
        assert!(matches!(
            read_record(Ok("not json".to_string()), &key()),
            Err(CacheError::Serialization(_))
        ));
    }

    #[test]
    fn test_backend_failure() {
        let err = read_record(Err(keyring::Error::NoStorageAccess("locked".into())), &key())
            .unwrap_err();
        assert!(matches!(err, CacheError::Backend { message } if message.starts_with("keyring")));
    }

    #[test]
    fn test_entry_name() {
        assert_eq!(
            key().to_string(),
            "session:prod:arn:aws:iam::123456789012:mfa/dev"
        );
        assert_eq!(KeyringSessionCache::default().service, DEFAULT_SERVICE);
    }
}
