//! AWS Temporary Credentials
//!
//! Resolves short-lived AWS credentials from long-lived master keys, with
//! MFA support and a persistent session cache.
//!
//! # Features
//!
//! - **Session tokens**: `GetSessionToken`, cached per account and MFA device
//! - **Role assumption**: `AssumeRole` from master keys or from a session
//! - **MFA**: literal codes or interactive prompts, asked only when needed
//! - **Expiry tracking**: credentials report expired five minutes early
//! - **Pluggable**: master keys, cache, STS client and prompt are traits
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use aws_tempcreds::{
//!     FileSessionCache, HttpStsClient, MasterCredentials, TempCredentialsConfig,
//!     TempCredentialsProvider,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TempCredentialsConfig::from_env()?;
//!
//!     let provider = TempCredentialsProvider::new(
//!         config.clone(),
//!         Arc::new(MasterCredentials::for_account(config.credentials_name())),
//!         Arc::new(FileSessionCache::default_location()?),
//!         Arc::new(HttpStsClient::new(config.region())?),
//!     )?;
//!
//!     let credentials = provider.retrieve().await?;
//!     println!("Using {}", credentials.masked_access_key_id());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod credentials;
pub mod error;
pub mod mfa;
pub mod mocks;
pub mod provider;
pub mod role;
pub mod session;
pub mod signing;
pub mod sts;

// Re-export main types at crate root
pub use config::{TempCredentialsConfig, TempCredentialsConfigBuilder};
pub use credentials::{
    AwsCredentials, ChainCredentialsProvider, CredentialsProvider, EnvCredentialsProvider,
    ExpiryTracker, MasterCredentials, MasterSecretAccessor, ProfileCredentialsProvider,
    StaticCredentialsProvider,
};
pub use error::{
    CacheError, ConfigurationError, CredentialsError, ErrorKind, MfaPromptError, Result,
    StsError, TempCredsError,
};
pub use mfa::{resolve_mfa_code, MfaPrompt, StaticPrompt, TerminalPrompt};
pub use provider::{ResolutionPath, TempCredentialsProvider};
pub use role::{AssumedRoleCredential, RoleAssumer};
#[cfg(feature = "keyring")]
pub use credentials::KeyringCredentialsProvider;
#[cfg(feature = "keyring")]
pub use session::KeyringSessionCache;
pub use session::{FileSessionCache, InMemorySessionCache, SessionCache, SessionKey, SessionToken};
pub use sts::{AssumeRoleRequest, GetSessionTokenRequest, HttpStsClient, MfaCode, StsApi};
