//! Error types for temporary credential resolution.
//!
//! Errors are grouped by the collaborator they originate from so callers can
//! decide what to do with them: configuration problems are fatal, prompt
//! failures and network failures can be retried by calling `retrieve()` again.

use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TempCredsError>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum TempCredsError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The MFA prompt failed or was cancelled.
    #[error("MFA prompt failed: {0}")]
    MfaPrompt(#[from] MfaPromptError),

    /// The STS call failed.
    #[error("STS error: {0}")]
    Sts(#[from] StsError),

    /// The session cache backend failed.
    #[error("Session cache error: {0}")]
    Cache(#[from] CacheError),

    /// Master credentials could not be loaded.
    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),
}

/// Coarse classification of a [`TempCredsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or incomplete configuration. Never retried.
    ConfigurationError,
    /// The user cancelled the prompt or the prompt itself errored.
    MfaPromptFailed,
    /// An elevate or assume-role call failed.
    NetworkError,
    /// The session cache failed to persist a token.
    CacheError,
    /// Master credentials are unavailable.
    CredentialsError,
}

impl TempCredsError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TempCredsError::Configuration(_) => ErrorKind::ConfigurationError,
            TempCredsError::MfaPrompt(_) => ErrorKind::MfaPromptFailed,
            TempCredsError::Sts(_) => ErrorKind::NetworkError,
            TempCredsError::Cache(_) => ErrorKind::CacheError,
            TempCredsError::Credentials(_) => ErrorKind::CredentialsError,
        }
    }

    /// Returns true if calling `retrieve()` again may succeed.
    ///
    /// The resolver never retries on its own; this is a hint for the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            TempCredsError::MfaPrompt(_) => true,
            TempCredsError::Sts(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Role assumption was attempted without a role ARN.
    #[error("No role defined")]
    MissingRole,

    /// A required configuration field is missing.
    #[error("Missing required configuration: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },

    /// A duration is outside the bounds accepted by STS.
    #[error("Invalid {field}: {value:?} is outside the allowed range {min:?}..={max:?}")]
    InvalidDuration {
        /// The configuration field name.
        field: String,
        /// The configured value.
        value: Duration,
        /// Lower bound.
        min: Duration,
        /// Upper bound.
        max: Duration,
    },

    /// Invalid configuration value or combination.
    #[error("Invalid configuration: {field} - {message}")]
    Invalid {
        /// The configuration field name.
        field: String,
        /// Error message.
        message: String,
    },
}

/// Errors raised by an MFA prompt.
#[derive(Debug, Error)]
pub enum MfaPromptError {
    /// The user cancelled the prompt (e.g. closed stdin).
    #[error("prompt cancelled")]
    Cancelled,

    /// The user submitted an empty code.
    #[error("no token code entered")]
    Empty,

    /// Reading from the terminal failed.
    #[error("failed to read token: {0}")]
    Io(#[from] std::io::Error),

    /// Any other prompt implementation failure.
    #[error("{message}")]
    Failed {
        /// Details about the failure.
        message: String,
    },
}

/// Errors from the STS network operations.
#[derive(Debug, Error)]
pub enum StsError {
    /// STS returned an error document.
    #[error("{code} ({status}): {message}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// STS error code, e.g. `AccessDenied`.
        code: String,
        /// Error message from STS.
        message: String,
        /// AWS request ID, if reported.
        request_id: Option<String>,
    },

    /// The request never produced an HTTP response.
    #[error("transport failure: {message}")]
    Transport {
        /// Details about the failure.
        message: String,
        /// Whether the failure was a timeout.
        timeout: bool,
    },

    /// The response body could not be understood.
    #[error("invalid response: {message}")]
    InvalidResponse {
        /// Details about the parse failure.
        message: String,
    },

    /// The request could not be signed.
    #[error("signing failed: {message}")]
    Signing {
        /// Details about the signing failure.
        message: String,
    },
}

impl StsError {
    /// Returns true if the error is transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            StsError::Transport { .. } => true,
            StsError::Service { status, code, .. } => {
                *status >= 500 || code == "Throttling" || code == "IDPCommunicationError"
            }
            _ => false,
        }
    }

    /// Returns the STS error code if available.
    pub fn code(&self) -> Option<&str> {
        match self {
            StsError::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Returns the AWS request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            StsError::Service { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }
}

/// Session cache backend errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other backend failure (keyring, injected test failures, ...).
    #[error("{message}")]
    Backend {
        /// Details about the failure.
        message: String,
    },
}

/// Credential-related errors.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// No credentials could be found.
    #[error("Credentials not found: no credentials could be loaded from any source")]
    NotFound,

    /// Required credentials are missing.
    #[error("Missing credentials: {message}")]
    Missing {
        /// Details about which credentials are missing.
        message: String,
    },

    /// Credentials are invalid.
    #[error("Invalid credentials: {message}")]
    Invalid {
        /// Details about why credentials are invalid.
        message: String,
    },

    /// Credentials have expired.
    #[error("Credentials expired at {expiration}")]
    Expired {
        /// When the credentials expired.
        expiration: String,
    },

    /// Profile file error.
    #[error("Profile error: {message}")]
    ProfileError {
        /// Details about the profile error.
        message: String,
    },

    /// The OS keyring could not be read.
    #[error("Keyring error: {message}")]
    Keyring {
        /// Details about the keyring failure.
        message: String,
    },
}
