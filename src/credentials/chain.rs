//! Chain credentials provider that tries multiple sources.

use super::{CredentialsProvider, EnvCredentialsProvider, ProfileCredentialsProvider};
use crate::credentials::AwsCredentials;
use crate::error::{CredentialsError, TempCredsError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, trace};

/// Credentials provider that tries each provider in order until one
/// succeeds.
///
/// The default master chain for an account is:
/// 1. Environment variables (`AWS_ACCESS_KEY_ID`, ...)
/// 2. The account's profile in the shared credentials file
///
/// The chain does not cache; wrap it in
/// [`MasterCredentials`](super::MasterCredentials) for that.
pub struct ChainCredentialsProvider {
    providers: Vec<Arc<dyn CredentialsProvider>>,
}

impl ChainCredentialsProvider {
    /// The default master chain for the named account.
    pub fn for_account(credentials_name: impl Into<String>) -> Self {
        Self {
            providers: vec![
                Arc::new(EnvCredentialsProvider::new()),
                Arc::new(ProfileCredentialsProvider::new(credentials_name)),
            ],
        }
    }

    /// Create a chain with custom providers.
    pub fn with_providers(providers: Vec<Arc<dyn CredentialsProvider>>) -> Self {
        Self { providers }
    }

    /// Add a provider to the end of the chain.
    pub fn add_provider(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Add a provider to the beginning of the chain.
    pub fn prepend_provider(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.providers.insert(0, provider);
        self
    }
}

#[async_trait]
impl CredentialsProvider for ChainCredentialsProvider {
    async fn credentials(&self) -> Result<AwsCredentials, TempCredsError> {
        let mut last_error: Option<TempCredsError> = None;

        for provider in &self.providers {
            let name = provider.name();
            trace!("Trying credentials provider: {}", name);

            match provider.credentials().await {
                Ok(creds) => {
                    debug!("Credentials loaded from provider: {}", name);
                    return Ok(creds);
                }
                Err(e) => {
                    trace!("Provider {} failed: {}", name, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(TempCredsError::Credentials(CredentialsError::NotFound)))
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

impl std::fmt::Debug for ChainCredentialsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainCredentialsProvider")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
