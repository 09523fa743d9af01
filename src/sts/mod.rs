//! AWS Security Token Service operations.
//!
//! Only the two calls needed to derive temporary credentials are modelled:
//! `GetSessionToken` ("elevate") and `AssumeRole`.

mod client;
mod xml;

pub use client::{HttpStsClient, DEFAULT_TIMEOUT};

use crate::credentials::AwsCredentials;
use crate::error::StsError;
use crate::role::AssumedRoleCredential;
use crate::session::SessionToken;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// STS API version sent with every request.
pub const API_VERSION: &str = "2011-06-15";

/// An MFA device serial together with the code read from it.
#[derive(Clone, PartialEq, Eq)]
pub struct MfaCode {
    /// Device serial number or ARN.
    pub serial: String,
    /// One-time code.
    pub code: String,
}

impl MfaCode {
    /// Create a new MFA code.
    pub fn new(serial: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            code: code.into(),
        }
    }
}

impl fmt::Debug for MfaCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MfaCode")
            .field("serial", &self.serial)
            .field("code", &"[REDACTED]")
            .finish()
    }
}

/// Parameters for `GetSessionToken`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetSessionTokenRequest {
    /// Requested session lifetime.
    pub duration: Duration,
    /// MFA device and code, if the session should be MFA-authenticated.
    pub mfa: Option<MfaCode>,
}

impl GetSessionTokenRequest {
    /// Query parameters for the request body.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("Action".to_string(), "GetSessionToken".to_string()),
            ("Version".to_string(), API_VERSION.to_string()),
            (
                "DurationSeconds".to_string(),
                self.duration.as_secs().to_string(),
            ),
        ];
        push_mfa(&mut params, self.mfa.as_ref());
        params
    }
}

/// Parameters for `AssumeRole`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    /// ARN of the role to assume.
    pub role_arn: String,
    /// Name recorded in CloudTrail for the role session.
    pub role_session_name: String,
    /// Requested role session lifetime.
    pub duration: Duration,
    /// External ID required by the role's trust policy, if any.
    pub external_id: Option<String>,
    /// MFA device and code, presented inline when assuming from master keys.
    pub mfa: Option<MfaCode>,
}

impl AssumeRoleRequest {
    /// Query parameters for the request body.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("Action".to_string(), "AssumeRole".to_string()),
            ("Version".to_string(), API_VERSION.to_string()),
            ("RoleArn".to_string(), self.role_arn.clone()),
            ("RoleSessionName".to_string(), self.role_session_name.clone()),
            (
                "DurationSeconds".to_string(),
                self.duration.as_secs().to_string(),
            ),
        ];
        if let Some(external_id) = &self.external_id {
            params.push(("ExternalId".to_string(), external_id.clone()));
        }
        push_mfa(&mut params, self.mfa.as_ref());
        params
    }
}

fn push_mfa(params: &mut Vec<(String, String)>, mfa: Option<&MfaCode>) {
    if let Some(mfa) = mfa {
        params.push(("SerialNumber".to_string(), mfa.serial.clone()));
        params.push(("TokenCode".to_string(), mfa.code.clone()));
    }
}

/// The STS operations used by the resolver.
///
/// `base` is the credential the request is signed with: the master keys, or
/// a session's temporary keys when a role is assumed from a session.
#[async_trait]
pub trait StsApi: Send + Sync {
    /// Exchange `base` for a session token.
    async fn get_session_token(
        &self,
        base: &AwsCredentials,
        request: &GetSessionTokenRequest,
    ) -> Result<SessionToken, StsError>;

    /// Assume a role using `base`.
    async fn assume_role(
        &self,
        base: &AwsCredentials,
        request: &AssumeRoleRequest,
    ) -> Result<AssumedRoleCredential, StsError>;
}
