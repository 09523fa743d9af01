//! Environment variable credentials provider.

use super::{AwsCredentials, CredentialsProvider};
use crate::error::{CredentialsError, TempCredsError};
use async_trait::async_trait;
use std::env;

/// Environment variable names for AWS credentials.
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Secret key variable.
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// Alternate secret key variable used by older tooling.
pub const AWS_SECRET_KEY: &str = "AWS_SECRET_KEY";

/// Credentials provider that reads master keys from environment variables.
///
/// Only long-lived keys are useful as a master secret, so a session token in
/// the environment is ignored: elevating a session token with
/// `GetSessionToken` is rejected by STS.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialsProvider;

impl EnvCredentialsProvider {
    /// Create a new environment credentials provider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialsProvider for EnvCredentialsProvider {
    async fn credentials(&self) -> Result<AwsCredentials, TempCredsError> {
        let access_key_id = env::var(AWS_ACCESS_KEY_ID).map_err(|_| {
            TempCredsError::Credentials(CredentialsError::Missing {
                message: format!("{} environment variable not set", AWS_ACCESS_KEY_ID),
            })
        })?;

        if access_key_id.is_empty() {
            return Err(TempCredsError::Credentials(CredentialsError::Invalid {
                message: format!("{} is empty", AWS_ACCESS_KEY_ID),
            }));
        }

        let secret_access_key = env::var(AWS_SECRET_ACCESS_KEY)
            .or_else(|_| env::var(AWS_SECRET_KEY))
            .map_err(|_| {
                TempCredsError::Credentials(CredentialsError::Missing {
                    message: format!("{} environment variable not set", AWS_SECRET_ACCESS_KEY),
                })
            })?;

        if secret_access_key.is_empty() {
            return Err(TempCredsError::Credentials(CredentialsError::Invalid {
                message: format!("{} is empty", AWS_SECRET_ACCESS_KEY),
            }));
        }

        Ok(AwsCredentials::new(access_key_id, secret_access_key))
    }

    fn name(&self) -> &'static str {
        "environment"
    }
}
