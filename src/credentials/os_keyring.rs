//! Master keys stored in the operating system keyring.

use super::{AwsCredentials, CredentialsProvider};
use crate::error::{CredentialsError, TempCredsError};
use async_trait::async_trait;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Keyring service name used when none is given.
pub const DEFAULT_SERVICE: &str = "aws-tempcreds";

/// Reads long-lived keys for one account from the OS keyring.
///
/// The keys live in the entry `(service, <credentials name>)` as a JSON
/// record with `AccessKeyID` and `SecretAccessKey`. Records carrying a
/// session token are rejected, as in [`ProfileCredentialsProvider`].
///
/// [`ProfileCredentialsProvider`]: super::ProfileCredentialsProvider
#[derive(Debug, Clone)]
pub struct KeyringCredentialsProvider {
    service: String,
    credentials_name: String,
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct MasterRecord {
    #[serde(rename = "AccessKeyID", alias = "AccessKeyId")]
    access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    secret_access_key: String,
    #[serde(rename = "SessionToken", default, skip_serializing_if = "String::is_empty")]
    session_token: String,
}

impl KeyringCredentialsProvider {
    /// Keys for `credentials_name` under [`DEFAULT_SERVICE`].
    pub fn new(credentials_name: impl Into<String>) -> Self {
        Self::with_service(DEFAULT_SERVICE, credentials_name)
    }

    /// Keys for `credentials_name` under a custom keyring service name.
    pub fn with_service(service: impl Into<String>, credentials_name: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            credentials_name: credentials_name.into(),
        }
    }

    /// The account identity name.
    pub fn credentials_name(&self) -> &str {
        &self.credentials_name
    }

    /// Save long-lived keys for the account, replacing any previous record.
    pub async fn store(&self, credentials: &AwsCredentials) -> Result<(), TempCredsError> {
        if credentials.session_token().is_some() {
            return Err(invalid("temporary credentials cannot be stored as master keys"));
        }
        let record = MasterRecord {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: String::new(),
        };
        let json = serde_json::to_string(&record).map_err(|e| invalid(&e.to_string()))?;

        let entry = self.entry()?;
        tokio::task::spawn_blocking(move || entry.set_password(&json))
            .await
            .map_err(join_error)?
            .map_err(keyring_error)?;

        debug!(
            "Stored master credentials {} for {}",
            credentials.masked_access_key_id(),
            self.credentials_name
        );
        Ok(())
    }

    fn entry(&self) -> Result<Entry, TempCredsError> {
        Entry::new(&self.service, &self.credentials_name).map_err(keyring_error)
    }
}

fn invalid(message: &str) -> TempCredsError {
    TempCredsError::Credentials(CredentialsError::Invalid {
        message: message.to_string(),
    })
}

fn keyring_error(e: keyring::Error) -> TempCredsError {
    TempCredsError::Credentials(CredentialsError::Keyring {
        message: e.to_string(),
    })
}

fn join_error(e: tokio::task::JoinError) -> TempCredsError {
    TempCredsError::Credentials(CredentialsError::Keyring {
        message: format!("keyring task failed: {}", e),
    })
}

fn parse_record(
    password: keyring::Result<String>,
    credentials_name: &str,
) -> Result<AwsCredentials, TempCredsError> {
    let json = match password {
        Ok(json) => json,
        Err(keyring::Error::NoEntry) => {
            return Err(TempCredsError::Credentials(CredentialsError::Missing {
                message: format!("no keyring entry for {}", credentials_name),
            }))
        }
        Err(e) => return Err(keyring_error(e)),
    };

    let record: MasterRecord = serde_json::from_str(&json)
        .map_err(|e| invalid(&format!("malformed keyring record for {}: {}", credentials_name, e)))?;

    if record.access_key_id.is_empty() || record.secret_access_key.is_empty() {
        return Err(invalid(&format!(
            "keyring record for {} is missing keys",
            credentials_name
        )));
    }
    if !record.session_token.is_empty() {
        return Err(invalid(&format!(
            "keyring record for {} holds temporary credentials",
            credentials_name
        )));
    }

    Ok(AwsCredentials::new(
        record.access_key_id.clone(),
        record.secret_access_key.clone(),
    ))
}

#[async_trait]
impl CredentialsProvider for KeyringCredentialsProvider {
    async fn credentials(&self) -> Result<AwsCredentials, TempCredsError> {
        let entry = self.entry()?;
        let password = tokio::task::spawn_blocking(move || entry.get_password())
            .await
            .map_err(join_error)?;

        parse_record(password, &self.credentials_name)
    }

    fn name(&self) -> &'static str {
        "keyring"
    }
}
