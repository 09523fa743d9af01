//! The temporary credential resolver.

use crate::config::TempCredentialsConfig;
use crate::credentials::{
    default_expiration_window, AwsCredentials, CredentialsProvider, ExpiryTracker,
    MasterSecretAccessor,
};
use crate::error::{Result, TempCredsError};
use crate::mfa::resolve_mfa_code;
use crate::role::RoleAssumer;
use crate::session::{SessionCache, SessionKey, SessionToken};
use crate::sts::{GetSessionTokenRequest, StsApi};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// How credentials are obtained, fixed when the provider is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPath {
    /// Master credentials are returned as-is.
    MasterOnly,
    /// A role is assumed directly with master credentials.
    RoleFromMaster,
    /// A session token is returned.
    SessionOnly,
    /// A role is assumed with a session token's keys.
    SessionThenRole,
}

impl ResolutionPath {
    /// Select the path for `config`.
    pub fn from_config(config: &TempCredentialsConfig) -> Self {
        match (config.no_session(), config.has_role()) {
            (true, false) => ResolutionPath::MasterOnly,
            (true, true) => ResolutionPath::RoleFromMaster,
            (false, false) => ResolutionPath::SessionOnly,
            (false, true) => ResolutionPath::SessionThenRole,
        }
    }
}

impl fmt::Display for ResolutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolutionPath::MasterOnly => "master-only",
            ResolutionPath::RoleFromMaster => "role-from-master",
            ResolutionPath::SessionOnly => "session-only",
            ResolutionPath::SessionThenRole => "session-then-role",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct ResolutionState {
    force_session_refresh: bool,
}

/// Resolves temporary credentials from master credentials, a cached or
/// freshly issued session token, and an optional role.
///
/// # Example
///
/// ```no_run
/// use aws_tempcreds::{
///     FileSessionCache, HttpStsClient, MasterCredentials, TempCredentialsConfig,
///     TempCredentialsProvider,
/// };
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = TempCredentialsConfig::builder("prod")
///     .mfa_serial("arn:aws:iam::123456789012:mfa/alice")
///     .build()?;
///
/// let provider = TempCredentialsProvider::new(
///     config.clone(),
///     Arc::new(MasterCredentials::for_account(config.credentials_name())),
///     Arc::new(FileSessionCache::default_location()?),
///     Arc::new(HttpStsClient::new(config.region())?),
/// )?;
///
/// let credentials = provider.retrieve().await?;
/// println!("{}", credentials.access_key_id());
/// # Ok(())
/// # }
/// ```
pub struct TempCredentialsProvider {
    config: Arc<TempCredentialsConfig>,
    master: Arc<dyn MasterSecretAccessor>,
    sessions: Arc<dyn SessionCache>,
    sts: Arc<dyn StsApi>,
    path: ResolutionPath,
    state: Mutex<ResolutionState>,
    expiry: parking_lot::Mutex<ExpiryTracker>,
}

impl TempCredentialsProvider {
    /// Validate `config` and build a provider over the given collaborators.
    pub fn new(
        config: TempCredentialsConfig,
        master: Arc<dyn MasterSecretAccessor>,
        sessions: Arc<dyn SessionCache>,
        sts: Arc<dyn StsApi>,
    ) -> Result<Self> {
        config.validate()?;
        let path = ResolutionPath::from_config(&config);

        Ok(Self {
            config: Arc::new(config),
            master,
            sessions,
            sts,
            path,
            state: Mutex::new(ResolutionState::default()),
            expiry: parking_lot::Mutex::new(ExpiryTracker::new()),
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &TempCredentialsConfig {
        &self.config
    }

    /// The resolution path selected for the configuration.
    pub fn path(&self) -> ResolutionPath {
        self.path
    }

    /// Resolve credentials along the configured path.
    ///
    /// At most one MFA prompt and two STS calls happen per call.
    pub async fn retrieve(&self) -> Result<AwsCredentials> {
        let mut state = self.state.lock().await;
        debug!(
            "Resolving credentials for {} via {}",
            self.config.credentials_name(),
            self.path
        );

        let credentials = match self.path {
            ResolutionPath::MasterOnly => {
                let master = self.master.get().await?;
                info!(
                    "Using master credentials {}",
                    master.masked_access_key_id()
                );
                return Ok(master);
            }
            ResolutionPath::RoleFromMaster => {
                let master = self.master.get().await?;
                let role = RoleAssumer::new(&self.config, self.sts.as_ref())
                    .assume(&master, true)
                    .await?;
                role.to_credentials()
            }
            ResolutionPath::SessionOnly => self.get_session(&mut state).await?.to_credentials(),
            ResolutionPath::SessionThenRole => {
                let session = self.get_session(&mut state).await?.to_credentials();
                let role = RoleAssumer::new(&self.config, self.sts.as_ref())
                    .assume(&session, false)
                    .await?;
                role.to_credentials()
            }
        };

        if let Some(expiration) = credentials.expiration() {
            self.expiry
                .lock()
                .set_expiration(*expiration, default_expiration_window());
            info!(
                "Using {} credentials {} (expires in {}m)",
                self.path,
                credentials.masked_access_key_id(),
                (*expiration - Utc::now()).num_minutes()
            );
        }

        Ok(credentials)
    }

    /// Discard the master credential and bypass the session cache on the
    /// next `retrieve()`.
    ///
    /// Waits for any `retrieve()` in progress, including one blocked on an
    /// MFA prompt.
    pub async fn force_refresh(&self) {
        let mut state = self.state.lock().await;
        state.force_session_refresh = true;
        self.master.invalidate();
        debug!("Forced refresh requested for {}", self.config.credentials_name());
    }

    /// Returns true once the last resolved credentials are within the
    /// expiration window, or if nothing has been resolved yet.
    pub fn is_expired(&self) -> bool {
        self.expiry.lock().is_expired()
    }

    /// Effective expiration of the last resolved credentials.
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiry.lock().expiration()
    }

    fn session_key(&self) -> SessionKey {
        SessionKey::new(
            self.config.credentials_name(),
            self.config.mfa_serial().unwrap_or_default(),
        )
    }

    async fn get_session(&self, state: &mut ResolutionState) -> Result<SessionToken> {
        let key = self.session_key();

        if !state.force_session_refresh {
            match self.sessions.retrieve(&key).await {
                Ok(Some(token)) => {
                    debug!("Using cached session for {}", key);
                    return Ok(token);
                }
                Ok(None) => debug!("No cached session for {}", key),
                Err(e) => warn!("Failed to read cached session for {}: {}", key, e),
            }
        } else {
            debug!("Skipping session cache for {}", key);
        }

        let master = self.master.get().await?;
        let request = GetSessionTokenRequest {
            duration: self.config.session_duration(),
            mfa: resolve_mfa_code(&self.config).await?,
        };
        let token = self.sts.get_session_token(&master, &request).await?;

        self.sessions
            .store(&key, &token)
            .await
            .map_err(TempCredsError::Cache)?;
        state.force_session_refresh = false;

        Ok(token)
    }
}

#[async_trait]
impl CredentialsProvider for TempCredentialsProvider {
    async fn credentials(&self) -> Result<AwsCredentials> {
        self.retrieve().await
    }

    fn is_expired(&self) -> bool {
        TempCredentialsProvider::is_expired(self)
    }

    fn name(&self) -> &'static str {
        "temporary"
    }
}

impl fmt::Debug for TempCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TempCredentialsProvider")
            .field("config", &self.config)
            .field("path", &self.path)
            .field("expiration", &self.expiration())
            .finish()
    }
}
