//! Role assumption.

use crate::config::TempCredentialsConfig;
use crate::credentials::{mask_access_key, AwsCredentials};
use crate::error::{ConfigurationError, TempCredsError};
use crate::mfa::resolve_mfa_code;
use crate::sts::{AssumeRoleRequest, StsApi};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use tracing::debug;

/// Temporary credentials for an assumed role. Never cached.
#[derive(Clone)]
pub struct AssumedRoleCredential {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: SecretString,
    expiration: DateTime<Utc>,
    assumed_role_arn: Option<String>,
}

impl AssumedRoleCredential {
    /// Create a role credential.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        expiration: DateTime<Utc>,
        assumed_role_arn: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into()),
            session_token: SecretString::new(session_token.into()),
            expiration,
            assumed_role_arn,
        }
    }

    /// Get the access key ID.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Get the secret access key.
    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    /// Get the session token.
    pub fn session_token(&self) -> &str {
        self.session_token.expose_secret()
    }

    /// Absolute expiration reported by STS.
    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    /// ARN of the assumed-role session, if STS reported one.
    pub fn assumed_role_arn(&self) -> Option<&str> {
        self.assumed_role_arn.as_deref()
    }

    /// The role keys as a credential value.
    pub fn to_credentials(&self) -> AwsCredentials {
        AwsCredentials::temporary(
            self.access_key_id.clone(),
            self.secret_access_key().to_string(),
            self.session_token().to_string(),
            self.expiration,
        )
    }
}

impl fmt::Debug for AssumedRoleCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssumedRoleCredential")
            .field("access_key_id", &mask_access_key(&self.access_key_id))
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &"[REDACTED]")
            .field("expiration", &self.expiration)
            .field("assumed_role_arn", &self.assumed_role_arn)
            .finish()
    }
}

/// Builds and sends `AssumeRole` requests for a configuration.
pub struct RoleAssumer<'a> {
    config: &'a TempCredentialsConfig,
    sts: &'a dyn StsApi,
}

impl<'a> RoleAssumer<'a> {
    /// Create an assumer over `config` and `sts`.
    pub fn new(config: &'a TempCredentialsConfig, sts: &'a dyn StsApi) -> Self {
        Self { config, sts }
    }

    /// Assume the configured role using `base`.
    ///
    /// With `present_mfa` set and an MFA device configured, the device serial
    /// and a code (literal or prompted) are included in the request. Fails
    /// with [`ConfigurationError::MissingRole`] before any network call when
    /// no role, or an empty role, is configured.
    pub async fn assume(
        &self,
        base: &AwsCredentials,
        present_mfa: bool,
    ) -> Result<AssumedRoleCredential, TempCredsError> {
        let role_arn = match self.config.role_arn() {
            Some(arn) if !arn.is_empty() => arn.to_string(),
            _ => return Err(ConfigurationError::MissingRole.into()),
        };

        let mfa = if present_mfa {
            resolve_mfa_code(self.config).await?
        } else {
            None
        };

        let request = AssumeRoleRequest {
            role_arn,
            role_session_name: self.role_session_name(),
            duration: self.config.assume_role_duration(),
            external_id: self.config.external_id().map(str::to_string),
            mfa,
        };
        debug!(
            "Assuming role {} as {}",
            request.role_arn, request.role_session_name
        );

        Ok(self.sts.assume_role(base, &request).await?)
    }

    /// The explicit session name, or the current UTC time in nanoseconds.
    pub fn role_session_name(&self) -> String {
        match self.config.role_session_name() {
            Some(name) => name.to_string(),
            None => {
                let now = Utc::now();
                now.timestamp_nanos_opt()
                    .unwrap_or_else(|| now.timestamp_micros())
                    .to_string()
            }
        }
    }
}
