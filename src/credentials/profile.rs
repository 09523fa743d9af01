//! Shared credentials file provider for master keys.

use super::{AwsCredentials, CredentialsProvider};
use crate::error::{CredentialsError, TempCredsError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use tracing::debug;

/// Default profile name.
pub const DEFAULT_PROFILE: &str = "default";

/// AWS credentials file environment variable.
pub const AWS_SHARED_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";

type Profiles = HashMap<String, HashMap<String, String>>;

/// Reads long-lived keys for one account from `~/.aws/credentials`
/// (or `AWS_SHARED_CREDENTIALS_FILE`).
///
/// The account identity name of the resolver doubles as the profile name.
/// Profiles holding an `aws_session_token` are rejected: temporary keys
/// cannot be elevated again and must not be used as a master secret.
#[derive(Debug, Clone)]
pub struct ProfileCredentialsProvider {
    profile_name: String,
    credentials_file: Option<PathBuf>,
}

impl ProfileCredentialsProvider {
    /// Create a provider for the given profile.
    pub fn new(profile_name: impl Into<String>) -> Self {
        Self {
            profile_name: profile_name.into(),
            credentials_file: None,
        }
    }

    /// Use a custom credentials file path.
    pub fn with_credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    /// The profile this provider reads.
    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    fn credentials_file_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.credentials_file {
            return Some(path.clone());
        }

        if let Ok(path) = env::var(AWS_SHARED_CREDENTIALS_FILE) {
            return Some(PathBuf::from(path));
        }

        dirs::home_dir().map(|home| home.join(".aws").join("credentials"))
    }

    fn parse_credentials_file(content: &str) -> Profiles {
        let mut profiles = Profiles::new();
        let mut current_profile: Option<String> = None;

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].trim();
                let name = name.strip_prefix("profile ").unwrap_or(name);
                current_profile = Some(name.to_string());
                profiles.entry(name.to_string()).or_default();
                continue;
            }

            if let Some(profile) = &current_profile {
                if let Some((key, value)) = line.split_once('=') {
                    profiles
                        .entry(profile.clone())
                        .or_default()
                        .insert(key.trim().to_string(), value.trim().to_string());
                }
            }
        }

        profiles
    }

    fn profile_error(&self, message: String) -> TempCredsError {
        TempCredsError::Credentials(CredentialsError::ProfileError { message })
    }
}

impl Default for ProfileCredentialsProvider {
    fn default() -> Self {
        Self::new(DEFAULT_PROFILE)
    }
}

#[async_trait]
impl CredentialsProvider for ProfileCredentialsProvider {
    async fn credentials(&self) -> Result<AwsCredentials, TempCredsError> {
        let path = self
            .credentials_file_path()
            .ok_or_else(|| self.profile_error("Unable to locate home directory".to_string()))?;

        debug!("Reading master credentials for profile {} from {:?}", self.profile_name, path);

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            self.profile_error(format!("Failed to read credentials file at {:?}: {}", path, e))
        })?;

        let profiles = Self::parse_credentials_file(&content);

        let profile = profiles.get(&self.profile_name).ok_or_else(|| {
            self.profile_error(format!(
                "Profile '{}' not found in credentials file",
                self.profile_name
            ))
        })?;

        let access_key_id = profile.get("aws_access_key_id").ok_or_else(|| {
            self.profile_error(format!(
                "aws_access_key_id not found in profile '{}'",
                self.profile_name
            ))
        })?;

        let secret_access_key = profile.get("aws_secret_access_key").ok_or_else(|| {
            self.profile_error(format!(
                "aws_secret_access_key not found in profile '{}'",
                self.profile_name
            ))
        })?;

        if profile.contains_key("aws_session_token") {
            return Err(TempCredsError::Credentials(CredentialsError::Invalid {
                message: format!(
                    "profile '{}' holds temporary credentials, master keys must be long-lived",
                    self.profile_name
                ),
            }));
        }

        Ok(AwsCredentials::new(access_key_id, secret_access_key))
    }

    fn name(&self) -> &'static str {
        "profile"
    }
}
