//! Mock STS client for testing.

use crate::credentials::AwsCredentials;
use crate::error::StsError;
use crate::role::AssumedRoleCredential;
use crate::session::SessionToken;
use crate::sts::{AssumeRoleRequest, GetSessionTokenRequest, StsApi};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// A recorded STS call.
#[derive(Debug, Clone)]
pub enum StsCall {
    /// `GetSessionToken` signed with `base_access_key_id`.
    GetSessionToken {
        /// Access key ID of the signing credential.
        base_access_key_id: String,
        /// The request sent.
        request: GetSessionTokenRequest,
    },
    /// `AssumeRole` signed with `base_access_key_id`.
    AssumeRole {
        /// Access key ID of the signing credential.
        base_access_key_id: String,
        /// The request sent.
        request: AssumeRoleRequest,
    },
}

/// Mock STS client issuing numbered credentials.
///
/// Session keys are `ASIASESSION<n>` and role keys `ASIAROLE<n>`, both
/// expiring after the requested duration unless an expiration is set.
#[derive(Default)]
pub struct MockStsClient {
    calls: Mutex<Vec<StsCall>>,
    session_expiration: Mutex<Option<DateTime<Utc>>>,
    role_expiration: Mutex<Option<DateTime<Utc>>>,
    session_error: Mutex<Option<StsError>>,
    role_error: Mutex<Option<StsError>>,
}

impl MockStsClient {
    /// Create a mock client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `expiration` for every issued session token.
    pub fn set_session_expiration(&self, expiration: DateTime<Utc>) {
        *self.session_expiration.lock().unwrap() = Some(expiration);
    }

    /// Report `expiration` for every assumed role.
    pub fn set_role_expiration(&self, expiration: DateTime<Utc>) {
        *self.role_expiration.lock().unwrap() = Some(expiration);
    }

    /// Fail the next `GetSessionToken` with `error`.
    pub fn fail_next_session(&self, error: StsError) {
        *self.session_error.lock().unwrap() = Some(error);
    }

    /// Fail the next `AssumeRole` with `error`.
    pub fn fail_next_assume_role(&self, error: StsError) {
        *self.role_error.lock().unwrap() = Some(error);
    }

    /// Every call received, in order.
    pub fn calls(&self) -> Vec<StsCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of `GetSessionToken` calls.
    pub fn get_session_token_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, StsCall::GetSessionToken { .. }))
            .count()
    }

    /// Number of `AssumeRole` calls.
    pub fn assume_role_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, StsCall::AssumeRole { .. }))
            .count()
    }

    /// The most recent `GetSessionToken` request.
    pub fn last_get_session_token(&self) -> Option<GetSessionTokenRequest> {
        self.calls.lock().unwrap().iter().rev().find_map(|c| match c {
            StsCall::GetSessionToken { request, .. } => Some(request.clone()),
            _ => None,
        })
    }

    /// The most recent `AssumeRole` request.
    pub fn last_assume_role(&self) -> Option<AssumeRoleRequest> {
        self.calls.lock().unwrap().iter().rev().find_map(|c| match c {
            StsCall::AssumeRole { request, .. } => Some(request.clone()),
            _ => None,
        })
    }

    /// Access key ID that signed the most recent `AssumeRole`.
    pub fn last_assume_role_base(&self) -> Option<String> {
        self.calls.lock().unwrap().iter().rev().find_map(|c| match c {
            StsCall::AssumeRole {
                base_access_key_id, ..
            } => Some(base_access_key_id.clone()),
            _ => None,
        })
    }

    fn expires_after(duration: std::time::Duration) -> DateTime<Utc> {
        Utc::now() + Duration::seconds(duration.as_secs() as i64)
    }
}

#[async_trait]
impl StsApi for MockStsClient {
    async fn get_session_token(
        &self,
        base: &AwsCredentials,
        request: &GetSessionTokenRequest,
    ) -> Result<SessionToken, StsError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(StsCall::GetSessionToken {
                base_access_key_id: base.access_key_id().to_string(),
                request: request.clone(),
            });
            calls.len()
        };

        if let Some(error) = self.session_error.lock().unwrap().take() {
            return Err(error);
        }

        let expiration = self
            .session_expiration
            .lock()
            .unwrap()
            .unwrap_or_else(|| Self::expires_after(request.duration));
        Ok(SessionToken::new(
            format!("ASIASESSION{}", n),
            format!("sessionSecret{}", n),
            format!("sessionToken{}", n),
            expiration,
        ))
    }

    async fn assume_role(
        &self,
        base: &AwsCredentials,
        request: &AssumeRoleRequest,
    ) -> Result<AssumedRoleCredential, StsError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(StsCall::AssumeRole {
                base_access_key_id: base.access_key_id().to_string(),
                request: request.clone(),
            });
            calls.len()
        };

        if let Some(error) = self.role_error.lock().unwrap().take() {
            return Err(error);
        }

        let expiration = self
            .role_expiration
            .lock()
            .unwrap()
            .unwrap_or_else(|| Self::expires_after(request.duration));
        Ok(AssumedRoleCredential::new(
            format!("ASIAROLE{}", n),
            format!("roleSecret{}", n),
            format!("roleToken{}", n),
            expiration,
            Some(format!(
                "arn:aws:sts::123456789012:assumed-role/mock/{}",
                request.role_session_name
            )),
        ))
    }
}
